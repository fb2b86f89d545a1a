//! Serve command - relay rooms for networked matches
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server()
//! - Level 3: (delegated to menagerie-server crate)
//! - Level 4: client directory check

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;

use menagerie_server::{run_server, ServerConfig};

use crate::play::{load_setup, RuleArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8000")]
    pub port: u16,

    /// Browser client served next to the relay
    #[arg(long, default_value = "public")]
    pub static_dir: PathBuf,

    /// Board and rules advertised on /api/rules
    #[command(flatten)]
    pub setup: RuleArgs,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: ServerArgs) -> Result<()> {
    let config = configure_server(&args)?;

    tracing::info!(
        dice = config.rules.with_dice,
        color_protection = config.rules.color_protection,
        "Rooms open at ws://0.0.0.0:{}/ws/game_server/<room>/",
        config.port
    );

    tokio::runtime::Runtime::new()?.block_on(run_server(config))
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Resolve the advertised board and rules, then the listen address
fn configure_server(args: &ServerArgs) -> Result<ServerConfig> {
    check_client_dir(&args.static_dir)?;
    let (engine, rules) = load_setup(&args.setup)?;

    Ok(ServerConfig::default()
        .with_port(args.port)
        .with_static_dir(args.static_dir.to_string_lossy())
        .with_engine(engine)
        .with_rules(rules))
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// A missing client only disables the fallback; a file in its place is a mistake
fn check_client_dir(dir: &Path) -> Result<()> {
    if dir.is_file() {
        bail!("Client directory is a file: {}", dir.display());
    }
    if !dir.exists() {
        tracing::warn!("No client at {}; serving the API and relay only", dir.display());
    }
    Ok(())
}

//! Menagerie CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the room relay server
//! - play: AI self-play, one game or a parallel batch
//! - duel: Host and guest AIs over an in-process relay

mod duel;
mod play;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "menagerie")]
#[command(about = "Animal capture board game: relay server and AI self-play")]
struct Cli {
    /// Seed for boards, dice and AI tie-breaks
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve(server::ServerArgs),
    /// Let the AI play against itself
    Play(play::PlayArgs),
    /// Replicate an AI match between a host and a guest session
    Duel(duel::DuelArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::Play(args) => play::run(args, cli.seed),
        Commands::Duel(args) => duel::run(args, cli.seed),
    }
}

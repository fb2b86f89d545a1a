//! Duel command - a networked match with both seats played by the AI
//!
//! Host and guest sessions share an in-process relay room. After every
//! turn the two engines' snapshots are compared; any difference aborts.
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: connect(), play_duel(), report()
//! - Level 3: play_turn(), await_replays()
//! - Level 4: engine construction

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use menagerie_core::{Action, EngineConfig, RuleFlags, RulesEngine, SearchAI, Team};
use menagerie_net::{ChannelConfig, MemoryRelay, Replay, Session};

use crate::play::{load_setup, RuleArgs};

/// How long a peer waits for a replayed frame before giving up
const REPLAY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct DuelArgs {
    /// AI look-ahead in plies
    #[arg(long, default_value = "2")]
    pub depth: u32,

    /// Turns before the duel is abandoned
    #[arg(long, default_value = "200")]
    pub max_turns: usize,

    /// Relay room name
    #[arg(long, default_value = "duel")]
    pub room: String,

    #[command(flatten)]
    pub setup: RuleArgs,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DuelReport {
    pub winner: Option<Team>,
    pub turns: usize,
    /// Frames the watching peer replayed
    pub replayed: usize,
    pub history: Vec<Action>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run duel command
///
/// 1. Build both engines
/// 2. Connect host and guest through the relay
/// 3. Play until someone wins, checking sync every turn
/// 4. Report
pub fn run(args: DuelArgs, seed: Option<u64>) -> Result<()> {
    let (config, rules) = load_setup(&args.setup)?;
    let seed = seed.unwrap_or(42);

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let (host, guest) = connect(&config, rules, &args.room, seed).await?;
        play_duel(host, guest, args.depth, args.max_turns, seed).await
    })?;

    print_report(&report, args.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Create both sessions and complete the board handshake
pub async fn connect(config: &EngineConfig, rules: RuleFlags, room: &str, seed: u64) -> Result<(Session, Session)> {
    let relay = MemoryRelay::new();
    let channel = ChannelConfig::default().with_poll_interval(Duration::from_millis(5));

    let mut host_engine = build_engine(config, rules, seed)?;
    host_engine.generate_board();
    // the guest's own rules are irrelevant; the host's board carries them
    let guest_engine = build_engine(config, RuleFlags::default(), seed.wrapping_add(1))?;

    let mut host = Session::host(host_engine, relay.join(room), channel.clone());
    let mut guest = Session::guest(guest_engine, relay.join(room), channel);

    guest.request_board().await.context("guest could not reach the relay")?;
    await_replays(&mut host, 1).await.context("host never answered")?;
    await_replays(&mut guest, 1).await.context("guest never got the board")?;

    anyhow::ensure!(guest.is_ready(), "guest rejected the host board");
    tracing::info!(room, "host and guest connected");
    Ok((host, guest))
}

/// Alternate AI turns between the two seats
pub async fn play_duel(
    mut host: Session,
    mut guest: Session,
    depth: u32,
    max_turns: usize,
    seed: u64,
) -> Result<DuelReport> {
    let mut host_ai = SearchAI::with_seed(depth, seed);
    let mut guest_ai = SearchAI::with_seed(depth, seed.wrapping_add(1));
    let mut history = Vec::new();
    let mut replayed = 0;

    while !host.engine().is_game_finished() && history.len() < max_turns {
        let (action, frames) = if host.is_my_turn() {
            play_turn(&mut host, &mut guest, &mut host_ai).await?
        } else {
            play_turn(&mut guest, &mut host, &mut guest_ai).await?
        };
        replayed += frames;
        history.push(action);

        if host.engine().snapshot() != guest.engine().snapshot() {
            anyhow::bail!("host and guest diverged after turn {}", history.len());
        }
    }

    let winner = host.engine().winning_team().cloned();
    tracing::info!(?winner, turns = history.len(), "duel finished");
    Ok(DuelReport {
        winner,
        turns: history.len(),
        replayed,
        history,
    })
}

fn print_report(report: &DuelReport, json: bool) {
    if json {
        if let Ok(text) = serde_json::to_string_pretty(report) {
            println!("{}", text);
        }
        return;
    }
    println!("\n=== Duel Result ===");
    match &report.winner {
        Some(team) => println!("Winner: {}", team),
        None => println!("No winner"),
    }
    println!("Turns:    {}", report.turns);
    println!("Replayed: {} frames, engines in sync", report.replayed);
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// One AI turn on `mover`, then wait until `watcher` has replayed it.
/// Returns the action and how many frames were replayed.
async fn play_turn(mover: &mut Session, watcher: &mut Session, ai: &mut SearchAI) -> Result<(Action, usize)> {
    let rolls = !mover.engine().is_dice_rolled();
    let action = mover.play_ai_turn(ai).await?;
    let frames = 1 + usize::from(rolls);
    await_replays(watcher, frames).await?;
    Ok((action, frames))
}

/// Step `session` until it has applied or answered `count` frames
async fn await_replays(session: &mut Session, count: usize) -> Result<()> {
    let mut done = 0;
    while done < count {
        let replay = tokio::time::timeout(REPLAY_TIMEOUT, session.step())
            .await
            .context("timed out waiting for the peer")??;
        match replay {
            Replay::Applied | Replay::Answered => done += 1,
            Replay::Ignored => {}
            Replay::Rejected(e) => anyhow::bail!("{} rejected a replay: {}", session.player(), e),
        }
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn build_engine(config: &EngineConfig, rules: RuleFlags, seed: u64) -> Result<RulesEngine> {
    Ok(RulesEngine::with_seed(config.clone(), rules, seed)?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duel_without_dice_stays_in_sync() {
        let config = EngineConfig::default();
        let (host, guest) = connect(&config, RuleFlags::new(false, false), "t1", 3).await.unwrap();
        assert_eq!(host.engine().snapshot(), guest.engine().snapshot());

        let report = play_duel(host, guest, 1, 30, 3).await.unwrap();
        assert_eq!(report.history.len(), report.turns);
        // one frame per turn when nothing is rolled
        assert_eq!(report.replayed, report.turns);
    }

    #[tokio::test]
    async fn test_duel_with_dice_replays_rolls() {
        let config = EngineConfig::default();
        let (host, guest) = connect(&config, RuleFlags::new(true, true), "t2", 8).await.unwrap();

        let report = play_duel(host, guest, 1, 20, 8).await.unwrap();
        assert!(report.turns > 0);
        assert_eq!(report.replayed, report.turns * 2);
    }
}

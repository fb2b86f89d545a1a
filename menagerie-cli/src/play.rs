//! Play command - AI self-play
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_setup(), play_games(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: seeding and formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use menagerie_core::{Action, AiConfig, EngineConfig, RuleFlags, RulesEngine, SearchAI, Team};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

/// Board and rule options shared by `serve`, `play` and `duel`
#[derive(Args, Clone)]
pub struct RuleArgs {
    /// Derive the dice from the last move instead of rolling
    #[arg(long)]
    pub no_dice: bool,

    /// Pawns on a cell of their own color cannot be captured
    #[arg(long)]
    pub color_protection: bool,

    /// Rule toggles JSON (`{"colorProtection": .., "withDice": ..}`); overrides the flags
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Engine config JSON (teams, board size, roster)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlayArgs {
    /// Number of games; more than one runs in parallel
    #[arg(long, default_value = "1")]
    pub games: usize,

    /// AI look-ahead in plies
    #[arg(long, default_value = "2")]
    pub depth: u32,

    /// Turns before a game is abandoned
    #[arg(long, default_value = "200")]
    pub max_turns: usize,

    #[command(flatten)]
    pub setup: RuleArgs,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    pub game_number: usize,
    pub seed: u64,
    pub winner: Option<Team>,
    pub turns: usize,
    pub captures: usize,
    pub skips: usize,
}

/// Aggregated results
#[derive(Clone, Debug, Serialize)]
pub struct PlayResults {
    pub total_games: usize,
    /// (team, wins) in turn order
    pub wins: Vec<(Team, usize)>,
    pub unfinished: usize,
    pub avg_turns: f32,
    pub games: Vec<GameRecord>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Load engine config and rule toggles
/// 2. Play the games
/// 3. Report results
pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let (config, rules) = load_setup(&args.setup)?;

    tracing::info!(
        "Starting self-play: {} games, depth={}, dice={}, color protection={}",
        args.games,
        args.depth,
        rules.with_dice,
        rules.color_protection
    );

    let results = play_games(&config, rules, &args, seed)?;

    report_results(&results, args.json);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Resolve the engine config and rule toggles from arguments
pub fn load_setup(args: &RuleArgs) -> Result<(EngineConfig, RuleFlags)> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load engine config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    let rules = match &args.rules {
        Some(path) => RuleFlags::load(path)
            .with_context(|| format!("Failed to load rules: {}", path.display()))?,
        None => RuleFlags::new(args.color_protection, !args.no_dice),
    };

    Ok((config, rules))
}

/// Play every game, in parallel when there is more than one
fn play_games(config: &EngineConfig, rules: RuleFlags, args: &PlayArgs, seed: Option<u64>) -> Result<PlayResults> {
    let base_seed = seed.unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());

    let progress = if args.games > 1 && !args.json {
        progress_bar(args.games)
    } else {
        ProgressBar::hidden()
    };

    let games = (0..args.games)
        .into_par_iter()
        .map(|index| {
            let record = play_single_game(
                config,
                rules,
                args.depth,
                args.max_turns,
                index + 1,
                base_seed.wrapping_add(index as u64),
            );
            progress.inc(1);
            record
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish_and_clear();

    for record in &games {
        tracing::debug!(
            "Game {}: winner={:?} ({} turns, {} captures)",
            record.game_number,
            record.winner,
            record.turns,
            record.captures
        );
    }

    Ok(compute_statistics(&config.teams, games))
}

/// Report results
fn report_results(results: &PlayResults, json: bool) {
    if json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one seeded game to completion or `max_turns`
pub fn play_single_game(
    config: &EngineConfig,
    rules: RuleFlags,
    depth: u32,
    max_turns: usize,
    game_number: usize,
    seed: u64,
) -> Result<GameRecord> {
    let mut engine = RulesEngine::with_seed(config.clone(), rules, seed)?;
    engine.generate_board();
    let mut ai = SearchAI::from_config(&AiConfig::default().with_depth(depth).with_seed(seed));

    let mut turns = 0;
    let mut captures = 0;
    let mut skips = 0;

    while !engine.is_game_finished() && turns < max_turns {
        if !engine.is_dice_rolled() {
            engine.roll_dice();
        }
        let action = ai.best_next_move(&engine);
        if action == Action::Skip {
            skips += 1;
        }
        if engine.execute(&action)?.is_some() {
            captures += 1;
        }
        turns += 1;
    }

    Ok(GameRecord {
        game_number,
        seed,
        winner: engine.winning_team().cloned(),
        turns,
        captures,
        skips,
    })
}

/// Aggregate game records
pub fn compute_statistics(teams: &[Team], games: Vec<GameRecord>) -> PlayResults {
    let wins = teams
        .iter()
        .map(|team| {
            let count = games.iter().filter(|g| g.winner.as_ref() == Some(team)).count();
            (team.clone(), count)
        })
        .collect();
    let unfinished = games.iter().filter(|g| g.winner.is_none()).count();

    let total_turns: usize = games.iter().map(|g| g.turns).sum();
    let avg_turns = if games.is_empty() {
        0.0
    } else {
        total_turns as f32 / games.len() as f32
    };

    PlayResults {
        total_games: games.len(),
        wins,
        unfinished,
        avg_turns,
        games,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} games") {
        bar.set_style(style);
    }
    bar
}

/// Print results as JSON
fn print_json_results(results: &PlayResults) {
    if let Ok(json) = serde_json::to_string_pretty(results) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &PlayResults) {
    let total = results.total_games;
    let percent = |n: usize| if total > 0 { n as f32 * 100.0 / total as f32 } else { 0.0 };

    println!("\n=== Self-play Results ===");
    println!("Total games: {}", total);
    for (team, wins) in &results.wins {
        println!("{:<12} {} ({:.1}%)", format!("{} wins:", team), wins, percent(*wins));
    }
    println!("{:<12} {} ({:.1}%)", "Unfinished:", results.unfinished, percent(results.unfinished));
    println!("Avg turns:   {:.1}", results.avg_turns);
}

// ============================================================================
// TESTS
// ============================================================================

//! Shallow look-ahead AI
//!
//! Every candidate action is tried on a cloned engine, then the opponent's
//! replies are tried on clones of that, and so on for `depth` plies. No
//! minimax: a candidate is judged only by the pawn totals reachable below it.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::board::Team;
use crate::error::RulesError;
use crate::game::{Action, RulesEngine};
use crate::movegen::MoveGenerator;

// ============================================================================
// CONFIG
// ============================================================================

/// Default look-ahead: our move, then the opponent's reply
pub const DEFAULT_DEPTH: u32 = 2;

#[derive(Clone, Debug)]
pub struct AiConfig {
    /// Plies searched, counting our own move
    pub depth: u32,
    /// Seed for tie-breaking (None = entropy)
    pub seed: Option<u64>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            seed: None,
        }
    }
}

impl AiConfig {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// How a first-ply candidate fared
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    /// Some continuation costs us a pawn
    VeryBad,
    /// No continuation costs us a pawn
    NotBad,
    /// Not bad, and some continuation costs the opponent a pawn
    VeryGood,
}

/// A first-ply candidate and what was found below it
#[derive(Clone, Debug)]
pub struct Candidate {
    pub action: Action,
    /// Every continuation keeps our total at or above the current one
    pub keeps_ours: bool,
    /// Some continuation leaves the opponent below its current total
    pub hurts_theirs: bool,
}

impl Candidate {
    pub fn verdict(&self) -> Verdict {
        match (self.keeps_ours, self.hurts_theirs) {
            (true, true) => Verdict::VeryGood,
            (true, false) => Verdict::NotBad,
            (false, _) => Verdict::VeryBad,
        }
    }
}

// ============================================================================
// SEARCH AI
// ============================================================================

pub struct SearchAI {
    pub depth: u32,
    rng: ChaCha8Rng,
}

impl SearchAI {
    pub fn new(depth: u32) -> Self {
        Self {
            depth: depth.max(1),
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(depth: u32, seed: u64) -> Self {
        Self {
            depth: depth.max(1),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_seed(config.depth, seed),
            None => Self::new(config.depth),
        }
    }

    /// Pick the next action for the playing team. Never mutates `engine`.
    pub fn best_next_move(&mut self, engine: &RulesEngine) -> Action {
        let candidates = evaluate(engine, self.depth);
        if candidates.is_empty() {
            tracing::debug!(team = %engine.playing_team(), "no option, skipping");
            return Action::Skip;
        }

        let best = candidates
            .iter()
            .map(Candidate::verdict)
            .max()
            .unwrap_or(Verdict::VeryBad);
        let pool: Vec<&Candidate> = candidates.iter().filter(|c| c.verdict() == best).collect();
        tracing::debug!(
            team = %engine.playing_team(),
            verdict = ?best,
            pool = pool.len(),
            candidates = candidates.len(),
            "picked tier"
        );

        match pool.choose(&mut self.rng) {
            Some(candidate) => candidate.action.clone(),
            None => Action::Skip,
        }
    }

    /// Roll if needed, choose, and execute one full turn
    pub fn play_turn(&mut self, engine: &mut RulesEngine) -> Result<Action, RulesError> {
        if engine.is_game_finished() {
            return Err(RulesError::GameOver);
        }
        if !engine.is_dice_rolled() {
            engine.roll_dice();
        }
        let action = self.best_next_move(engine);
        engine.execute(&action)?;
        Ok(action)
    }

    /// Play until someone wins or `max_turns` turns have passed
    pub fn play_game(
        &mut self,
        mut engine: RulesEngine,
        max_turns: usize,
    ) -> Result<(RulesEngine, Vec<Action>), RulesError> {
        let mut history = Vec::new();
        while !engine.is_game_finished() && history.len() < max_turns {
            history.push(self.play_turn(&mut engine)?);
        }
        Ok((engine, history))
    }
}

// ============================================================================
// TREE EXPANSION
// ============================================================================

/// Expand the look-ahead tree and summarise it per first-ply action.
///
/// Iterative: an explicit stack of (engine after the move, candidate index,
/// plies left). Engines awaiting a roll are expanded once per distinct face.
pub fn evaluate(engine: &RulesEngine, depth: u32) -> Vec<Candidate> {
    let me = engine.playing_team().clone();
    let opponent = engine.next_team(&me).clone();
    let my_pawns = engine.total_pawns(&me);
    let their_pawns = engine.total_pawns(&opponent);

    let mut candidates = Vec::new();
    let mut stack: Vec<(RulesEngine, usize, u32)> = Vec::new();

    for action in MoveGenerator::new(engine).all_movements() {
        let mut child = engine.clone();
        if child.execute(&action).is_err() {
            continue;
        }
        candidates.push(Candidate {
            action,
            keeps_ours: true,
            hurts_theirs: false,
        });
        stack.push((child, candidates.len() - 1, depth.saturating_sub(1)));
    }

    while let Some((node, index, plies_left)) = stack.pop() {
        if plies_left == 0 {
            continue;
        }
        for variant in dice_variants(&node) {
            for action in MoveGenerator::new(&variant).all_movements() {
                let mut child = variant.clone();
                if child.execute(&action).is_err() {
                    continue;
                }
                record(&mut candidates[index], &child, &me, &opponent, my_pawns, their_pawns);
                stack.push((child, index, plies_left - 1));
            }
        }
    }

    candidates
}

fn record(
    candidate: &mut Candidate,
    engine: &RulesEngine,
    me: &Team,
    opponent: &Team,
    my_pawns: usize,
    their_pawns: usize,
) {
    if engine.total_pawns(me) < my_pawns {
        candidate.keeps_ours = false;
    }
    if engine.total_pawns(opponent) < their_pawns {
        candidate.hurts_theirs = true;
    }
}

/// The engine as-is if it has a dice value, otherwise one copy per face
fn dice_variants(engine: &RulesEngine) -> Vec<RulesEngine> {
    if engine.is_dice_rolled() {
        return vec![engine.clone()];
    }
    engine
        .dice()
        .distinct_faces()
        .into_iter()
        .map(|face| {
            let mut variant = engine.clone();
            variant.set_dice_value(Some(face));
            variant
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

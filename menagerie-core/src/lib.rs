//! Menagerie Core - Rules engine and AI
//!
//! This crate provides the core game logic for Menagerie:
//! - Board geometry (orthogonal grid of colored cells)
//! - Pawns and the cyclic capture law
//! - Dice, rule toggles and the turn/win state machine
//! - Legal action generation
//! - Shallow look-ahead AI

pub mod board;
pub mod pawn;
pub mod dice;
pub mod error;
pub mod game;
pub mod movegen;
pub mod ai;
pub mod ruleset;

// Re-exports for convenient access
pub use board::{BoardState, Color, Pos, Selection, Snapshot, Team, DIRECTIONS};
pub use pawn::Pawn;
pub use dice::{Dice, DiceMode, DiceValue};
pub use error::RulesError;
pub use game::{Action, RulesEngine, TurnPhase, ELIMINATION_THRESHOLD};
pub use movegen::MoveGenerator;
pub use ai::{AiConfig, Candidate, SearchAI, Verdict};
pub use ruleset::{EngineConfig, KeyValueStore, MemoryStore, RuleFlags};

//! Rules engine errors

use crate::board::{Pos, Team};
use crate::game::Action;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid dice value {0} (expected -1 or a color id)")]
    InvalidDiceValue(i16),

    #[error("position {0} is outside the board")]
    OutOfBounds(Pos),

    #[error("no pawn at {0}")]
    EmptySource(Pos),

    #[error("reserve slot {rank} of team {team} is empty")]
    EmptyReserve { rank: usize, team: Team },

    #[error("destination {0} is occupied")]
    Occupied(Pos),

    #[error("illegal action {0:?}")]
    IllegalAction(Action),

    #[error("team {0} is not on turn")]
    OutOfTurn(Team),

    #[error("the game is already over")]
    GameOver,

    #[error("unknown team {0}")]
    UnknownTeam(Team),

    #[error("snapshot does not fit this engine: {0}")]
    InvalidSnapshot(String),
}

//! Pawns and the cyclic capture law

use serde::{Deserialize, Serialize};

use crate::board::{Color, Team};

/// A pawn. Identity is (team, rank); `species` is only a rendering tag.
///
/// Field names on the wire follow the browser client (`index`, `animal`,
/// `color`, `lastAnimalIndex`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pawn {
    #[serde(rename = "index")]
    pub rank: usize,
    #[serde(rename = "animal")]
    pub species: String,
    #[serde(rename = "color")]
    pub color: Color,
    pub team: Team,
    /// Top rank of the roster. Engines overwrite it from their own config.
    #[serde(rename = "lastAnimalIndex", default)]
    pub last_rank: usize,
}

impl Pawn {
    pub fn new(rank: usize, species: impl Into<String>, color: Color, team: Team, last_rank: usize) -> Self {
        Self {
            rank,
            species: species.into(),
            color,
            team,
            last_rank,
        }
    }

    /// Whether this pawn may step onto a slot holding `other`.
    ///
    /// Empty slots are always enterable. Rank R captures an opposing R-1,
    /// and rank 0 captures the opposing highest rank.
    pub fn can_beat(&self, other: Option<&Pawn>) -> bool {
        let other = match other {
            Some(p) => p,
            None => return true,
        };
        if self.team == other.team {
            return false;
        }
        if self.rank == 0 && other.rank == self.last_rank {
            return true;
        }
        self.rank == other.rank + 1
    }
}

//! Board geometry and the raw match state

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dice::DiceValue;
use crate::pawn::Pawn;
use crate::ruleset::RuleFlags;

/// Cell color / category id
pub type Color = u8;

/// Orthogonal neighbour offsets, in generation order: up, down, left, right
pub const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Team name; the order of teams in the engine config defines turn rotation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Team(String);

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Team {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Board coordinates. Serialized as `{x, y}` with x = row, y = column,
/// which is what peers put on the wire.
///
/// Signed so that off-board candidates (row -1, ...) can be expressed and
/// rejected instead of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    #[serde(rename = "x")]
    pub row: i32,
    #[serde(rename = "y")]
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(&self, dr: i32, dc: i32) -> Pos {
        Pos::new(self.row + dr, self.col + dc)
    }

    /// Same row with |dcol| <= 1, or same column with |drow| <= 1.
    /// Identical positions count as adjacent here; callers reject them first.
    pub fn is_adjacent(&self, other: Pos) -> bool {
        (self.row == other.row && (self.col - other.col).abs() <= 1)
            || (self.col == other.col && (self.row - other.row).abs() <= 1)
    }

    /// Orthogonal neighbours in generation order (may be off-board)
    pub fn neighbors(&self) -> impl Iterator<Item = Pos> + '_ {
        DIRECTIONS.iter().map(move |&(dr, dc)| self.offset(dr, dc))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// What the local player currently has picked up
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Board(Pos),
    Reserve { team: Team, rank: usize },
}

/// Full exportable state, sent once by the host in the `board` message.
///
/// Browser hosts send only cells, pawns, dice and the playing team, so
/// reserves, cemeteries and rules may be absent or short on the way in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: Vec<Vec<Color>>,
    pub pawns: Vec<Vec<Option<Pawn>>>,
    #[serde(default)]
    pub storage: FxHashMap<Team, Vec<Option<Pawn>>>,
    #[serde(default)]
    pub cemetery: FxHashMap<Team, Vec<Option<Pawn>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleFlags>,
    pub dice: Option<DiceValue>,
    pub playing_team: Team,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<Pos>,
}

/// Cell grid, pawn grid, reserves and cemeteries
#[derive(Clone, Debug)]
pub struct BoardState {
    pub(crate) cells: Vec<Vec<Color>>,
    pub(crate) pawns: Vec<Vec<Option<Pawn>>>,
    pub(crate) storage: FxHashMap<Team, Vec<Option<Pawn>>>,
    pub(crate) cemetery: FxHashMap<Team, Vec<Option<Pawn>>>,
    pub(crate) playing_team: Team,
    pub(crate) selection: Selection,
    pub(crate) last_move: Option<Pos>,
}

impl BoardState {
    /// Empty grids of the given size, no reserves
    pub(crate) fn empty(rows: usize, columns: usize, first_team: Team) -> Self {
        Self {
            cells: vec![vec![0; columns]; rows],
            pawns: vec![vec![None; columns]; rows],
            storage: FxHashMap::default(),
            cemetery: FxHashMap::default(),
            playing_team: first_team,
            selection: Selection::None,
            last_move: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Check if a position is on the board
    pub fn is_valid(&self, pos: Pos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows()
            && (pos.col as usize) < self.columns()
    }

    pub fn cell_at(&self, pos: Pos) -> Option<Color> {
        if !self.is_valid(pos) {
            return None;
        }
        Some(self.cells[pos.row as usize][pos.col as usize])
    }

    pub fn pawn_at(&self, pos: Pos) -> Option<&Pawn> {
        if !self.is_valid(pos) {
            return None;
        }
        self.pawns[pos.row as usize][pos.col as usize].as_ref()
    }

    pub(crate) fn slot_mut(&mut self, pos: Pos) -> Option<&mut Option<Pawn>> {
        if !self.is_valid(pos) {
            return None;
        }
        Some(&mut self.pawns[pos.row as usize][pos.col as usize])
    }

    pub fn storage_at(&self, rank: usize, team: &Team) -> Option<&Pawn> {
        self.storage.get(team)?.get(rank)?.as_ref()
    }

    /// Every on-board position, row-major
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let rows = self.rows() as i32;
        let columns = self.columns() as i32;
        (0..rows).flat_map(move |row| (0..columns).map(move |col| Pos::new(row, col)))
    }

    /// Pawns of `team` currently on the board
    pub fn number_of_pawns(&self, team: &Team) -> usize {
        self.pawns
            .iter()
            .flatten()
            .flatten()
            .filter(|pawn| &pawn.team == team)
            .count()
    }

    /// Pawns of `team` still waiting in reserve
    pub fn number_in_storage(&self, team: &Team) -> usize {
        self.storage
            .get(team)
            .map_or(0, |slots| slots.iter().flatten().count())
    }

    /// Pawns of `team` captured so far
    pub fn number_in_cemetery(&self, team: &Team) -> usize {
        self.cemetery
            .get(team)
            .map_or(0, |slots| slots.iter().flatten().count())
    }

    pub(crate) fn to_snapshot(&self, rules: RuleFlags, dice: Option<DiceValue>) -> Snapshot {
        Snapshot {
            cells: self.cells.clone(),
            pawns: self.pawns.clone(),
            storage: self.storage.clone(),
            cemetery: self.cemetery.clone(),
            rules: Some(rules),
            dice,
            playing_team: self.playing_team.clone(),
            last_move: self.last_move,
        }
    }
}

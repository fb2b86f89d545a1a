//! Rules engine: legality, mutation and the turn/win state machine

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{BoardState, Color, Pos, Selection, Snapshot, Team};
use crate::dice::{Dice, DiceMode, DiceValue};
use crate::error::RulesError;
use crate::pawn::Pawn;
use crate::ruleset::{EngineConfig, RuleFlags};

// ============================================================================
// CONSTANTS
// ============================================================================

/// A team whose board + reserve total drops to this many pawns is eliminated
pub const ELIMINATION_THRESHOLD: usize = 2;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A replayable action
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Step a board pawn onto an adjacent cell, capturing whatever is there
    Move { from: Pos, to: Pos },
    /// Deploy a reserve pawn onto an empty cell
    StorageMove { rank: usize, team: Team, to: Pos },
    /// Give up the turn
    Skip,
}

/// Where the current turn stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    /// Active team has to roll
    AwaitingRoll,
    /// Dice value known, nothing picked up
    ReadyToAct,
    /// A board pawn or reserve slot is selected
    Selecting,
    GameOver,
}

// ============================================================================
// RULES ENGINE
// ============================================================================

/// Single-threaded rules engine. Clone for speculative search.
#[derive(Clone, Debug)]
pub struct RulesEngine {
    config: Arc<EngineConfig>,
    rules: RuleFlags,
    board: BoardState,
    dice: Dice,
    rng: ChaCha8Rng,
}

impl RulesEngine {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Create an engine with a blank board. Call `generate_board` (host) or
    /// `load_board` (guest) before playing.
    pub fn new(config: EngineConfig, rules: RuleFlags) -> Result<Self, RulesError> {
        Self::with_rng(config, rules, ChaCha8Rng::from_entropy())
    }

    /// Same as `new` with a fixed seed for board generation and dice
    pub fn with_seed(config: EngineConfig, rules: RuleFlags, seed: u64) -> Result<Self, RulesError> {
        Self::with_rng(config, rules, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rules: RuleFlags, rng: ChaCha8Rng) -> Result<Self, RulesError> {
        config.validate()?;
        let board = BoardState::empty(config.rows, config.columns, config.teams[0].clone());
        let dice = Dice::new(dice_mode(rules), config.dice_faces.clone());
        let mut engine = Self {
            config: Arc::new(config),
            rules,
            board,
            dice,
            rng,
        };
        engine.reset_pawns();
        Ok(engine)
    }

    /// Randomize the cells and put every pawn back in reserve
    pub fn generate_board(&mut self) {
        let mut colors: Vec<Color> = (0..self.config.colors())
            .flat_map(|color| std::iter::repeat(color as Color).take(self.config.items))
            .collect();
        colors.shuffle(&mut self.rng);

        let columns = self.config.columns;
        self.board.cells = colors.chunks(columns).map(<[Color]>::to_vec).collect();
        self.reset_pawns();
        self.dice = Dice::new(dice_mode(self.rules), self.config.dice_faces.clone());

        tracing::debug!(
            rows = self.config.rows,
            columns = self.config.columns,
            "generated board"
        );
    }

    fn reset_pawns(&mut self) {
        let rows = self.config.rows;
        let columns = self.config.columns;
        let last_rank = self.config.ranks() - 1;

        self.board.pawns = vec![vec![None; columns]; rows];
        self.board.storage = FxHashMap::default();
        self.board.cemetery = FxHashMap::default();
        for team in &self.config.teams {
            let reserve = self
                .config
                .species
                .iter()
                .zip(&self.config.color_affinities)
                .enumerate()
                .map(|(rank, (species, &color))| {
                    Some(Pawn::new(rank, species.clone(), color, team.clone(), last_rank))
                })
                .collect();
            self.board.storage.insert(team.clone(), reserve);
            self.board.cemetery.insert(team.clone(), vec![None; self.config.ranks()]);
        }
        self.board.playing_team = self.config.teams[0].clone();
        self.board.selection = Selection::None;
        self.board.last_move = None;
    }

    /// Replace the whole state with a host snapshot. Rules travel with the
    /// snapshot when present; otherwise the current ones stay.
    pub fn load_board(&mut self, snapshot: Snapshot) -> Result<(), RulesError> {
        let snapshot = self.fill_snapshot(snapshot);
        self.check_snapshot(&snapshot)?;

        if let Some(rules) = snapshot.rules {
            self.rules = rules;
        }
        self.dice = Dice::new(dice_mode(self.rules), self.config.dice_faces.clone());
        self.dice.set_value(snapshot.dice);
        self.board.cells = snapshot.cells;
        self.board.pawns = snapshot.pawns;
        self.board.storage = snapshot.storage;
        self.board.cemetery = snapshot.cemetery;
        self.board.playing_team = snapshot.playing_team;
        self.board.last_move = snapshot.last_move;
        self.board.selection = Selection::None;
        Ok(())
    }

    /// Complete a partial snapshot: absent reserves hold every rank not on
    /// the board or in the cemetery, short slot lists are padded, and
    /// `last_rank` comes from our roster rather than the wire.
    fn fill_snapshot(&self, mut snapshot: Snapshot) -> Snapshot {
        let ranks = self.config.ranks();

        for team in &self.config.teams {
            let graves = snapshot.cemetery.entry(team.clone()).or_default();
            if graves.len() < ranks {
                graves.resize(ranks, None);
            }
            if !snapshot.storage.contains_key(team) {
                let placed: Vec<usize> = snapshot
                    .pawns
                    .iter()
                    .flatten()
                    .flatten()
                    .chain(graves.iter().flatten())
                    .filter(|p| &p.team == team)
                    .map(|p| p.rank)
                    .collect();
                let reserve = (0..ranks)
                    .map(|rank| (!placed.contains(&rank)).then(|| self.reserve_pawn(rank, team)))
                    .collect();
                snapshot.storage.insert(team.clone(), reserve);
            }
            if let Some(reserve) = snapshot.storage.get_mut(team) {
                if reserve.len() < ranks {
                    reserve.resize(ranks, None);
                }
            }
        }

        let pawns = snapshot
            .pawns
            .iter_mut()
            .flatten()
            .flatten()
            .chain(snapshot.storage.values_mut().flatten().flatten())
            .chain(snapshot.cemetery.values_mut().flatten().flatten());
        for pawn in pawns {
            pawn.last_rank = ranks - 1;
        }
        snapshot
    }

    fn reserve_pawn(&self, rank: usize, team: &Team) -> Pawn {
        Pawn::new(
            rank,
            self.config.species[rank].clone(),
            self.config.color_affinities[rank],
            team.clone(),
            self.config.ranks() - 1,
        )
    }

    fn check_snapshot(&self, snapshot: &Snapshot) -> Result<(), RulesError> {
        let invalid = |msg: String| Err(RulesError::InvalidSnapshot(msg));
        let (rows, columns) = (self.config.rows, self.config.columns);
        let ranks = self.config.ranks();

        if snapshot.cells.len() != rows || snapshot.cells.iter().any(|r| r.len() != columns) {
            return invalid(format!("cell grid is not {}x{}", rows, columns));
        }
        if snapshot.pawns.len() != rows || snapshot.pawns.iter().any(|r| r.len() != columns) {
            return invalid(format!("pawn grid is not {}x{}", rows, columns));
        }
        if self.config.team_index(&snapshot.playing_team).is_none() {
            return Err(RulesError::UnknownTeam(snapshot.playing_team.clone()));
        }
        if let Some(c) = snapshot.cells.iter().flatten().find(|&&c| c as usize >= self.config.colors()) {
            return invalid(format!("unknown cell color {}", c));
        }

        // every rank of every team exactly once across board, reserve, cemetery
        for team in &self.config.teams {
            let mut seen = vec![0usize; ranks];
            let mut count = |pawn: &Pawn, expected_slot: Option<usize>| -> Result<(), RulesError> {
                if &pawn.team != team || pawn.rank >= ranks {
                    return Err(RulesError::InvalidSnapshot(format!(
                        "misplaced pawn {} of team {}",
                        pawn.rank, pawn.team
                    )));
                }
                if expected_slot.is_some_and(|slot| slot != pawn.rank) {
                    return Err(RulesError::InvalidSnapshot(format!(
                        "pawn {} of team {} stored in the wrong slot",
                        pawn.rank, pawn.team
                    )));
                }
                seen[pawn.rank] += 1;
                Ok(())
            };
            for pawn in snapshot.pawns.iter().flatten().flatten().filter(|p| &p.team == team) {
                count(pawn, None)?;
            }
            for key in [&snapshot.storage, &snapshot.cemetery] {
                let slots = key
                    .get(team)
                    .ok_or_else(|| RulesError::InvalidSnapshot(format!("no slots for team {}", team)))?;
                if slots.len() != ranks {
                    return invalid(format!("team {} has {} slots, expected {}", team, slots.len(), ranks));
                }
                for (slot, pawn) in slots.iter().enumerate() {
                    if let Some(pawn) = pawn {
                        count(pawn, Some(slot))?;
                    }
                }
            }
            if let Some(rank) = seen.iter().position(|&n| n != 1) {
                return invalid(format!("rank {} of team {} appears {} times", rank, team, seen[rank]));
            }
        }
        if snapshot
            .pawns
            .iter()
            .flatten()
            .flatten()
            .any(|p| self.config.team_index(&p.team).is_none())
        {
            return invalid("pawn of an unknown team on the board".to_string());
        }
        Ok(())
    }

    /// Export everything a guest needs
    pub fn snapshot(&self) -> Snapshot {
        self.board.to_snapshot(self.rules, self.dice.value())
    }

    /// Switch rule toggles. Resets the dice to the new mode's starting value.
    pub fn load_rules(&mut self, rules: RuleFlags) {
        self.rules = rules;
        self.dice = Dice::new(dice_mode(rules), self.config.dice_faces.clone());
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> RuleFlags {
        self.rules
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn teams(&self) -> &[Team] {
        &self.config.teams
    }

    pub fn rows(&self) -> usize {
        self.config.rows
    }

    pub fn columns(&self) -> usize {
        self.config.columns
    }

    pub fn playing_team(&self) -> &Team {
        &self.board.playing_team
    }

    /// Team after `team` in rotation
    pub fn next_team(&self, team: &Team) -> &Team {
        let teams = &self.config.teams;
        let index = self.config.team_index(team).unwrap_or(0);
        &teams[(index + 1) % teams.len()]
    }

    pub fn is_valid(&self, pos: Pos) -> bool {
        self.board.is_valid(pos)
    }

    pub fn cell_at(&self, pos: Pos) -> Option<Color> {
        self.board.cell_at(pos)
    }

    pub fn pawn_at(&self, pos: Pos) -> Option<&Pawn> {
        self.board.pawn_at(pos)
    }

    pub fn storage_at(&self, rank: usize, team: &Team) -> Option<&Pawn> {
        self.board.storage_at(rank, team)
    }

    /// Captured pawns of `team`, indexed by rank
    pub fn cemetery_of(&self, team: &Team) -> &[Option<Pawn>] {
        self.board.cemetery.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn number_of_pawns(&self, team: &Team) -> usize {
        self.board.number_of_pawns(team)
    }

    pub fn number_in_storage(&self, team: &Team) -> usize {
        self.board.number_in_storage(team)
    }

    /// Board + reserve: the pawns still in play
    pub fn total_pawns(&self, team: &Team) -> usize {
        self.number_of_pawns(team) + self.number_in_storage(team)
    }

    pub fn last_move(&self) -> Option<Pos> {
        self.board.last_move
    }

    // ========================================================================
    // LEGALITY
    // ========================================================================

    /// Whether the playing team may move the pawn at `from` onto `to`
    pub fn can_move(&self, from: Pos, to: Pos) -> bool {
        if from == to {
            return false;
        }
        if !self.is_valid(from) || !self.is_valid(to) {
            return false;
        }
        if !from.is_adjacent(to) {
            return false;
        }
        let start = match self.pawn_at(from) {
            Some(p) if p.team == self.board.playing_team => p,
            _ => return false,
        };
        let end = self.pawn_at(to);
        if !start.can_beat(end) {
            return false;
        }
        if self.rules.color_protection {
            if let Some(defender) = end {
                if Some(defender.color) == self.cell_at(to) {
                    return false;
                }
            }
        }
        match self.dice.value() {
            None => false,
            Some(DiceValue::Wild) => true,
            Some(value) => {
                self.cell_at(from).is_some_and(|c| value.accepts(c)) || value.accepts(start.color)
            }
        }
    }

    /// Whether the reserve pawn `rank` of `team` may be deployed on `to`
    pub fn can_storage_move(&self, rank: usize, team: &Team, to: Pos) -> bool {
        if !self.is_valid(to) {
            return false;
        }
        let pawn = match self.storage_at(rank, team) {
            Some(p) if p.team == self.board.playing_team => p,
            _ => return false,
        };
        if self.pawn_at(to).is_some() {
            return false;
        }
        self.dice.value().is_some_and(|value| value.accepts(pawn.color))
    }

    /// A friendly pawn stands on `pos`
    pub fn can_select(&self, pos: Pos) -> bool {
        self.pawn_at(pos).is_some_and(|p| p.team == self.board.playing_team)
    }

    /// The reserve slot holds a pawn and `team` is on turn
    pub fn can_select_storage(&self, rank: usize, team: &Team) -> bool {
        team == &self.board.playing_team && self.storage_at(rank, team).is_some_and(|p| &p.team == team)
    }

    /// Legality of any action for the playing team. Skipping needs a dice
    /// value and is only legal when nothing else is.
    pub fn is_legal(&self, action: &Action) -> bool {
        if self.is_game_finished() {
            return false;
        }
        match action {
            Action::Move { from, to } => self.can_move(*from, *to),
            Action::StorageMove { rank, team, to } => self.can_storage_move(*rank, team, *to),
            Action::Skip => self.is_dice_rolled() && !self.has_legal_action(),
        }
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Relocate the pawn at `from` onto `to`. Does not check game rules;
    /// an occupied destination must be cleared with `send_to_cemetery` first.
    pub fn move_pawn(&mut self, from: Pos, to: Pos) -> Result<(), RulesError> {
        if !self.is_valid(to) {
            return Err(RulesError::OutOfBounds(to));
        }
        if self.pawn_at(to).is_some() {
            return Err(RulesError::Occupied(to));
        }
        let pawn = self
            .board
            .slot_mut(from)
            .ok_or(RulesError::OutOfBounds(from))?
            .take()
            .ok_or(RulesError::EmptySource(from))?;
        if let Some(slot) = self.board.slot_mut(to) {
            *slot = Some(pawn);
        }
        self.board.last_move = Some(to);
        Ok(())
    }

    /// Deploy reserve pawn `rank` of `team` onto `to`. Does not check game rules.
    pub fn storage_move(&mut self, rank: usize, team: &Team, to: Pos) -> Result<(), RulesError> {
        if !self.is_valid(to) {
            return Err(RulesError::OutOfBounds(to));
        }
        if self.pawn_at(to).is_some() {
            return Err(RulesError::Occupied(to));
        }
        let pawn = self
            .board
            .storage
            .get_mut(team)
            .ok_or_else(|| RulesError::UnknownTeam(team.clone()))?
            .get_mut(rank)
            .and_then(Option::take)
            .ok_or_else(|| RulesError::EmptyReserve {
                rank,
                team: team.clone(),
            })?;
        if let Some(slot) = self.board.slot_mut(to) {
            *slot = Some(pawn);
        }
        self.board.last_move = Some(to);
        Ok(())
    }

    /// Move the pawn on `pos` (if any) to its team's cemetery
    pub fn send_to_cemetery(&mut self, pos: Pos) -> Option<Pawn> {
        let pawn = self.board.slot_mut(pos)?.take()?;
        let ranks = self.config.ranks();
        let graves = self
            .board
            .cemetery
            .entry(pawn.team.clone())
            .or_insert_with(|| vec![None; ranks]);
        if pawn.rank >= graves.len() {
            graves.resize(pawn.rank + 1, None);
        }
        graves[pawn.rank] = Some(pawn.clone());
        Some(pawn)
    }

    /// Validate and apply an action for the playing team, then end the turn.
    /// Returns the captured pawn, if any. Illegal actions leave the state untouched.
    pub fn execute(&mut self, action: &Action) -> Result<Option<Pawn>, RulesError> {
        if self.is_game_finished() {
            return Err(RulesError::GameOver);
        }
        if !self.is_legal(action) {
            return Err(RulesError::IllegalAction(action.clone()));
        }

        let captured = match action {
            Action::Move { from, to } => {
                let captured = self.send_to_cemetery(*to);
                self.move_pawn(*from, *to)?;
                captured
            }
            Action::StorageMove { rank, team, to } => {
                self.storage_move(*rank, team, *to)?;
                None
            }
            Action::Skip => None,
        };

        if let Some(pawn) = &captured {
            tracing::debug!(rank = pawn.rank, team = %pawn.team, "captured");
        }
        self.end_turn();
        Ok(captured)
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    pub fn selection(&self) -> &Selection {
        &self.board.selection
    }

    /// Pick up a friendly board pawn
    pub fn select(&mut self, pos: Pos) -> bool {
        if !self.can_select(pos) {
            return false;
        }
        self.board.selection = Selection::Board(pos);
        true
    }

    /// Pick up a reserve pawn
    pub fn select_storage(&mut self, rank: usize, team: &Team) -> bool {
        if !self.can_select_storage(rank, team) {
            return false;
        }
        self.board.selection = Selection::Reserve {
            team: team.clone(),
            rank,
        };
        true
    }

    pub fn clear_selection(&mut self) {
        self.board.selection = Selection::None;
    }

    /// The action that dropping the current selection on `to` would perform
    pub fn selection_action(&self, to: Pos) -> Option<Action> {
        match &self.board.selection {
            Selection::None => None,
            Selection::Board(from) => Some(Action::Move { from: *from, to }),
            Selection::Reserve { team, rank } => Some(Action::StorageMove {
                rank: *rank,
                team: team.clone(),
                to,
            }),
        }
    }

    // ========================================================================
    // DICE
    // ========================================================================

    pub fn roll_dice(&mut self) -> Option<DiceValue> {
        self.dice.roll(&mut self.rng)
    }

    pub fn dice_value(&self) -> Option<DiceValue> {
        self.dice.value()
    }

    pub fn set_dice_value(&mut self, value: Option<DiceValue>) {
        self.dice.set_value(value);
    }

    pub fn is_dice_rolled(&self) -> bool {
        self.dice.value().is_some()
    }

    pub fn dice(&self) -> &Dice {
        &self.dice
    }

    // ========================================================================
    // TURNS
    // ========================================================================

    pub fn can_player_roll(&self, team: &Team) -> bool {
        team == &self.board.playing_team && !self.is_dice_rolled()
    }

    pub fn can_player_move(&self, team: &Team) -> bool {
        team == &self.board.playing_team && self.is_dice_rolled()
    }

    /// Hand the turn to the next team and prepare its dice value
    pub fn end_turn(&mut self) {
        let next = self.next_team(&self.board.playing_team).clone();
        self.board.playing_team = next;
        self.board.selection = Selection::None;
        let last_cell = self.board.last_move.and_then(|pos| self.cell_at(pos));
        self.dice.next_turn(last_cell);
    }

    pub fn phase(&self) -> TurnPhase {
        if self.is_game_finished() {
            TurnPhase::GameOver
        } else if !self.is_dice_rolled() {
            TurnPhase::AwaitingRoll
        } else if self.board.selection != Selection::None {
            TurnPhase::Selecting
        } else {
            TurnPhase::ReadyToAct
        }
    }

    /// First team in rotation at or below the threshold hands the win to
    /// the team after it
    pub fn winning_team(&self) -> Option<&Team> {
        let teams = &self.config.teams;
        teams
            .iter()
            .position(|team| self.total_pawns(team) <= ELIMINATION_THRESHOLD)
            .map(|index| &teams[(index + 1) % teams.len()])
    }

    pub fn is_game_finished(&self) -> bool {
        self.winning_team().is_some()
    }
}

fn dice_mode(rules: RuleFlags) -> DiceMode {
    if rules.with_dice {
        DiceMode::Random
    } else {
        DiceMode::Derived
    }
}

// ============================================================================
// TESTS
// ============================================================================

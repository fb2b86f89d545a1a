//! Legal action enumeration for the playing team

use crate::board::{Pos, Team};
use crate::game::{Action, RulesEngine};

/// Enumerates legal actions in a fixed order: board pawns row-major (each
/// trying up, down, left, right), then reserve pawns by rank over every
/// cell row-major.
pub struct MoveGenerator<'a> {
    engine: &'a RulesEngine,
    team: Team,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(engine: &'a RulesEngine) -> Self {
        Self {
            engine,
            team: engine.playing_team().clone(),
        }
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    /// Every legal non-skip action. Empty once the game is over.
    pub fn all_movements(&self) -> Vec<Action> {
        if self.engine.is_game_finished() {
            return Vec::new();
        }
        let mut actions = self.movements();
        actions.extend(self.storage_movements());
        actions
    }

    /// Whether the playing team can do anything besides skipping
    pub fn has_any(&self) -> bool {
        if self.engine.is_game_finished() {
            return false;
        }
        self.engine
            .board()
            .positions()
            .any(|pos| !self.movements_for(pos).is_empty())
            || (0..self.engine.config().ranks()).any(|rank| !self.storage_movements_for(rank).is_empty())
    }

    pub fn movements(&self) -> Vec<Action> {
        self.engine
            .board()
            .positions()
            .flat_map(|pos| self.movements_for(pos))
            .collect()
    }

    pub fn storage_movements(&self) -> Vec<Action> {
        (0..self.engine.config().ranks())
            .flat_map(|rank| self.storage_movements_for(rank))
            .collect()
    }

    pub fn movements_for(&self, from: Pos) -> Vec<Action> {
        if !self.engine.can_select(from) {
            return Vec::new();
        }
        from.neighbors()
            .filter(|&to| self.engine.can_move(from, to))
            .map(|to| Action::Move { from, to })
            .collect()
    }

    pub fn storage_movements_for(&self, rank: usize) -> Vec<Action> {
        if !self.engine.can_select_storage(rank, &self.team) {
            return Vec::new();
        }
        self.engine
            .board()
            .positions()
            .filter(|&to| self.engine.can_storage_move(rank, &self.team, to))
            .map(|to| Action::StorageMove {
                rank,
                team: self.team.clone(),
                to,
            })
            .collect()
    }
}

impl RulesEngine {
    /// Legal actions for the playing team (see [`MoveGenerator`])
    pub fn all_movements(&self) -> Vec<Action> {
        MoveGenerator::new(self).all_movements()
    }

    /// Skip-turn gate: false means the only option is `Action::Skip`
    pub fn has_legal_action(&self) -> bool {
        MoveGenerator::new(self).has_any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DiceValue;
    use crate::ruleset::{EngineConfig, RuleFlags};

    fn engine() -> RulesEngine {
        let mut engine =
            RulesEngine::with_seed(EngineConfig::default(), RuleFlags::new(false, false), 3).unwrap();
        engine.generate_board();
        engine
    }

    #[test]
    fn test_opening_is_all_deployments() {
        let engine = engine();
        let actions = engine.all_movements();
        // wild dice, empty board: 5 reserve pawns x 25 cells
        assert_eq!(actions.len(), 125);
        assert!(actions.iter().all(|a| matches!(a, Action::StorageMove { .. })));
        assert_eq!(
            actions[0],
            Action::StorageMove { rank: 0, team: Team::from("red"), to: Pos::new(0, 0) }
        );
        assert!(engine.has_legal_action());
    }

    #[test]
    fn test_board_moves_come_first_in_direction_order() {
        let mut engine = engine();
        let red = Team::from("red");
        engine.storage_move(1, &red, Pos::new(2, 2)).unwrap();

        let gen = MoveGenerator::new(&engine);
        let moves = gen.movements();
        assert_eq!(
            moves,
            vec![
                Action::Move { from: Pos::new(2, 2), to: Pos::new(1, 2) },
                Action::Move { from: Pos::new(2, 2), to: Pos::new(3, 2) },
                Action::Move { from: Pos::new(2, 2), to: Pos::new(2, 1) },
                Action::Move { from: Pos::new(2, 2), to: Pos::new(2, 3) },
            ]
        );
        assert!(matches!(engine.all_movements()[0], Action::Move { .. }));
    }

    #[test]
    fn test_corner_pawn_has_two_moves() {
        let mut engine = engine();
        engine.storage_move(0, &Team::from("red"), Pos::new(0, 0)).unwrap();
        assert_eq!(MoveGenerator::new(&engine).movements_for(Pos::new(0, 0)).len(), 2);
    }

    #[test]
    fn test_unmatched_dice_blocks_deployment() {
        let mut engine = engine();
        // only rank 2 has affinity 2
        engine.set_dice_value(Some(DiceValue::Color(2)));
        let actions = engine.all_movements();
        assert_eq!(actions.len(), 25);
        assert!(actions
            .iter()
            .all(|a| matches!(a, Action::StorageMove { rank: 2, .. })));
    }

    #[test]
    fn test_no_dice_no_actions() {
        let mut engine = engine();
        engine.set_dice_value(None);
        assert!(engine.all_movements().is_empty());
        assert!(!engine.has_legal_action());
    }
}

//! Integration tests for the rules engine, move generator and AI
//!
//! Exercises whole-match behaviour: deployment, capture sequencing,
//! elimination, rotation and the per-rank location invariant.

use menagerie_core::{
    Action, DiceValue, EngineConfig, MoveGenerator, Pos, RuleFlags, RulesEngine, SearchAI, Team,
    TurnPhase,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn red() -> Team {
    Team::from("red")
}

fn blue() -> Team {
    Team::from("blue")
}

fn green() -> Team {
    Team::from("green")
}

fn no_dice_engine(seed: u64) -> RulesEngine {
    let mut engine = RulesEngine::with_seed(EngineConfig::default(), RuleFlags::new(false, false), seed).unwrap();
    engine.generate_board();
    engine
}

fn three_team_engine() -> RulesEngine {
    let config = EngineConfig {
        teams: vec![red(), blue(), green()],
        ..Default::default()
    };
    let mut engine = RulesEngine::with_seed(config, RuleFlags::new(false, false), 5).unwrap();
    engine.generate_board();
    engine
}

/// Each rank of each team sits in exactly one of board, reserve, cemetery
fn assert_rank_invariant(engine: &RulesEngine) {
    for team in engine.teams() {
        for rank in 0..engine.config().ranks() {
            let on_board = engine
                .board()
                .positions()
                .filter(|&pos| engine.pawn_at(pos).is_some_and(|p| &p.team == team && p.rank == rank))
                .count();
            let in_reserve = usize::from(engine.storage_at(rank, team).is_some());
            let in_cemetery = usize::from(engine.cemetery_of(team)[rank].is_some());
            assert_eq!(
                on_board + in_reserve + in_cemetery,
                1,
                "rank {} of team {} is in {} places",
                rank,
                team,
                on_board + in_reserve + in_cemetery
            );
        }
    }
}

/// Capture through the primitive path: check, evict, relocate
fn capture(engine: &mut RulesEngine, from: Pos, to: Pos) {
    assert!(engine.can_move(from, to), "capture {} -> {} should be legal", from, to);
    let evicted = engine.send_to_cemetery(to).expect("defender present");
    engine.move_pawn(from, to).unwrap();
    assert_eq!(engine.cemetery_of(&evicted.team)[evicted.rank].as_ref(), Some(&evicted));
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_deploy_row_then_eliminate() {
    let mut engine = no_dice_engine(1);
    assert_eq!(engine.dice_value(), Some(DiceValue::Wild));

    for rank in 0..5 {
        let to = Pos::new(0, rank as i32);
        assert!(engine.can_storage_move(rank, &red(), to));
        engine.storage_move(rank, &red(), to).unwrap();
    }
    assert_eq!(engine.number_in_storage(&red()), 0);
    assert_eq!(engine.number_of_pawns(&red()), 5);
    assert_rank_invariant(&engine);

    engine.end_turn();
    engine.set_dice_value(Some(DiceValue::Wild));
    assert_eq!(engine.playing_team(), &blue());

    // blue 3 takes red 2, blue 2 takes red 1, blue 1 takes red 0
    engine.storage_move(3, &blue(), Pos::new(1, 2)).unwrap();
    engine.storage_move(2, &blue(), Pos::new(1, 1)).unwrap();
    engine.storage_move(1, &blue(), Pos::new(1, 0)).unwrap();

    capture(&mut engine, Pos::new(1, 2), Pos::new(0, 2));
    assert_eq!(engine.pawn_at(Pos::new(0, 2)).unwrap().rank, 3);
    assert_eq!(engine.winning_team(), None);

    capture(&mut engine, Pos::new(1, 1), Pos::new(0, 1));
    assert_eq!(engine.total_pawns(&red()), 3);
    assert_eq!(engine.winning_team(), None);

    capture(&mut engine, Pos::new(1, 0), Pos::new(0, 0));
    assert_eq!(engine.total_pawns(&red()), 2);
    assert_eq!(engine.winning_team(), Some(&blue()));
    assert_eq!(engine.phase(), TurnPhase::GameOver);
    assert_rank_invariant(&engine);

    assert!(MoveGenerator::new(&engine).all_movements().is_empty());
}

#[test]
fn test_rotation_returns_to_start() {
    let mut engine = three_team_engine();
    let start = engine.playing_team().clone();
    let mut seen = Vec::new();
    for _ in 0..engine.teams().len() {
        seen.push(engine.playing_team().clone());
        engine.end_turn();
    }
    assert_eq!(engine.playing_team(), &start);
    assert_eq!(seen, vec![red(), blue(), green()]);
}

#[test]
fn test_winner_follows_first_eliminated_in_rotation() {
    let mut engine = three_team_engine();

    // blue and green both drop to two pawns
    for team in [blue(), green()] {
        for rank in 0..3 {
            let pos = Pos::new(rank as i32, 0);
            engine.storage_move(rank, &team, pos).unwrap();
            engine.send_to_cemetery(pos).unwrap();
        }
    }
    assert_eq!(engine.total_pawns(&blue()), 2);
    assert_eq!(engine.total_pawns(&green()), 2);

    // blue comes first in rotation, so the team after blue wins
    assert_eq!(engine.winning_team(), Some(&green()));
    assert_rank_invariant(&engine);
}

#[test]
fn test_last_team_eliminated_wraps_to_first() {
    let mut engine = three_team_engine();
    for rank in 0..3 {
        let pos = Pos::new(2, rank as i32);
        engine.storage_move(rank, &green(), pos).unwrap();
        engine.send_to_cemetery(pos).unwrap();
    }
    assert_eq!(engine.winning_team(), Some(&red()));
}

#[test]
fn test_execute_sequences_capture() {
    let mut engine = no_dice_engine(2);
    engine.storage_move(0, &red(), Pos::new(3, 3)).unwrap();
    engine.storage_move(4, &blue(), Pos::new(3, 4)).unwrap();

    let captured = engine
        .execute(&Action::Move { from: Pos::new(3, 3), to: Pos::new(3, 4) })
        .unwrap()
        .unwrap();
    assert_eq!((captured.team.clone(), captured.rank), (blue(), 4));
    assert_eq!(engine.pawn_at(Pos::new(3, 4)).unwrap().rank, 0);
    assert_eq!(engine.playing_team(), &blue());
    assert_eq!(engine.last_move(), Some(Pos::new(3, 4)));
    assert_rank_invariant(&engine);
}

#[test]
fn test_repeated_move_is_rejected() {
    let mut engine = no_dice_engine(4);
    engine.storage_move(1, &red(), Pos::new(2, 2)).unwrap();
    let mv = Action::Move { from: Pos::new(2, 2), to: Pos::new(2, 3) };
    engine.execute(&mv).unwrap();

    // back on red's turn with a wild roll, the source is now empty
    engine.end_turn();
    engine.set_dice_value(Some(DiceValue::Wild));
    assert!(!engine.can_move(Pos::new(2, 2), Pos::new(2, 3)));
    assert!(engine.execute(&mv).is_err());
    assert_rank_invariant(&engine);
}

// ============================================================================
// SELF-PLAY PROPERTIES
// ============================================================================

#[test]
fn test_invariants_hold_through_self_play() {
    for (seed, with_dice) in [(1u64, false), (2, true), (3, false)] {
        let mut engine =
            RulesEngine::with_seed(EngineConfig::default(), RuleFlags::new(seed == 3, with_dice), seed).unwrap();
        engine.generate_board();
        let mut ai = SearchAI::with_seed(1, seed);

        for _ in 0..80 {
            if engine.is_game_finished() {
                break;
            }
            let mover = engine.playing_team().clone();
            let action = ai.play_turn(&mut engine).unwrap();
            if let Action::StorageMove { team, .. } = &action {
                assert_eq!(team, &mover);
            }
            assert_ne!(engine.playing_team(), &mover);
            assert_rank_invariant(&engine);
        }
    }
}

#[test]
fn test_ai_returns_legal_action_when_available() {
    let mut engine = no_dice_engine(8);
    let mut ai = SearchAI::with_seed(2, 8);
    for _ in 0..6 {
        let legal = engine.all_movements();
        let chosen = ai.best_next_move(&engine);
        if legal.is_empty() {
            assert_eq!(chosen, Action::Skip);
        } else {
            assert!(legal.contains(&chosen));
        }
        engine.execute(&chosen).unwrap();
    }
}

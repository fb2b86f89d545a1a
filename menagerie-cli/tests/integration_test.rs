//! Integration tests for the Menagerie stack
//!
//! Tests the crates together: rules engine, AI, sessions and the relay
//! state the server hands out.

use std::sync::Arc;
use std::time::Duration;

use menagerie_core::{
    Action, DiceValue, EngineConfig, KeyValueStore, MemoryStore, RuleFlags, RulesEngine, SearchAI, Team, TurnPhase,
};
use menagerie_net::{ChannelConfig, Replay, Session};
use menagerie_server::ServerState;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn three_teams() -> EngineConfig {
    EngineConfig {
        teams: vec![Team::from("red"), Team::from("blue"), Team::from("green")],
        ..Default::default()
    }
}

fn channel() -> ChannelConfig {
    ChannelConfig::default().with_poll_interval(Duration::from_millis(1))
}

// ============================================================================
// PREFERENCES -> ENGINE
// ============================================================================

#[test]
fn test_stored_preferences_select_dice_mode() {
    let mut store = MemoryStore::new();
    store.set("withDice", "false".to_string());
    store.set("colorProtection", "true".to_string());

    let rules = RuleFlags::from_store(&store);
    assert_eq!(rules, RuleFlags::new(true, false));

    let mut engine = RulesEngine::with_seed(EngineConfig::default(), rules, 1).unwrap();
    engine.generate_board();
    assert_eq!(engine.dice_value(), Some(DiceValue::Wild));
    assert_eq!(engine.phase(), TurnPhase::ReadyToAct);

    let mut copy = MemoryStore::new();
    rules.save(&mut copy);
    assert_eq!(RuleFlags::from_store(&copy), rules);
}

#[test]
fn test_garbage_preferences_fall_back_to_defaults() {
    let mut store = MemoryStore::new();
    store.set("withDice", "maybe".to_string());
    assert_eq!(RuleFlags::from_store(&store), RuleFlags::default());
}

// ============================================================================
// LOCAL PLAY
// ============================================================================

#[tokio::test]
async fn test_three_team_hot_seat_rotates() {
    let mut engine = RulesEngine::with_seed(three_teams(), RuleFlags::new(false, true), 12).unwrap();
    engine.generate_board();
    let mut session = Session::local(engine);
    let mut ai = SearchAI::with_seed(1, 12);
    let order = [Team::from("red"), Team::from("blue"), Team::from("green")];

    for turn in 0..45 {
        if session.engine().is_game_finished() {
            break;
        }
        assert_eq!(session.engine().playing_team(), &order[turn % 3]);
        let action = session.play_ai_turn(&mut ai).await.unwrap();
        if let Action::StorageMove { team, .. } = action {
            assert_eq!(team, order[turn % 3]);
        }
    }
}

// ============================================================================
// NETWORKED PLAY THROUGH THE SERVER'S RELAY
// ============================================================================

#[tokio::test]
async fn test_sessions_on_server_relay() {
    let state = Arc::new(ServerState::default());

    let mut host_engine = RulesEngine::with_seed(state.engine.clone(), state.rules, 5).unwrap();
    host_engine.generate_board();
    let guest_engine = RulesEngine::with_seed(state.engine.clone(), state.rules, 6).unwrap();

    let mut host = Session::host(host_engine, state.relay.join("den"), channel());
    let mut guest = Session::guest(guest_engine, state.relay.join("den"), channel());
    assert_eq!(state.relay.member_count("den"), 2);

    guest.request_board().await.unwrap();
    assert_eq!(host.step().await.unwrap(), Replay::Answered);
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);

    // host rolls and acts; guest replays both frames
    let mut ai = SearchAI::with_seed(2, 5);
    host.play_ai_turn(&mut ai).await.unwrap();
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);

    assert_eq!(host.engine().snapshot(), guest.engine().snapshot());
    assert!(guest.is_my_turn());
    assert!(!host.is_my_turn());
}

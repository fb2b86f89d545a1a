//! Host/guest replication over the in-process relay
//!
//! Each test runs two sessions on one relay room and checks that the
//! guest's engine tracks the host's frame by frame.

use std::time::Duration;

use menagerie_core::{Action, DiceValue, EngineConfig, Pos, RuleFlags, RulesEngine, RulesError, SearchAI, Team};
use menagerie_net::{
    ChannelConfig, ChannelError, Link, LinkState, MemoryRelay, Message, Payload, Replay, Session, SessionError,
};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

// ============================================================================
// FIXTURES
// ============================================================================

fn red() -> Team {
    Team::from("red")
}

fn blue() -> Team {
    Team::from("blue")
}

fn fast() -> ChannelConfig {
    ChannelConfig::default().with_poll_interval(Duration::from_millis(1))
}

fn host_engine(seed: u64, with_dice: bool) -> RulesEngine {
    let mut engine = RulesEngine::with_seed(EngineConfig::default(), RuleFlags::new(false, with_dice), seed).unwrap();
    engine.generate_board();
    engine
}

/// A guest engine deliberately built with other rules and another seed
fn guest_engine() -> RulesEngine {
    RulesEngine::with_seed(EngineConfig::default(), RuleFlags::new(true, true), 99).unwrap()
}

async fn connected_pair(relay: &MemoryRelay, room: &str, with_dice: bool) -> (Session, Session) {
    let mut host = Session::host(host_engine(7, with_dice), relay.join(room), fast());
    let mut guest = Session::guest(guest_engine(), relay.join(room), fast());

    guest.request_board().await.unwrap();
    assert_eq!(host.step().await.unwrap(), Replay::Answered);
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);
    (host, guest)
}

/// One AI turn on `mover`, replayed on `watcher`
async fn relay_turn(mover: &mut Session, watcher: &mut Session, ai: &mut SearchAI, frames: usize) -> Action {
    let action = mover.play_ai_turn(ai).await.unwrap();
    for _ in 0..frames {
        assert_eq!(watcher.step().await.unwrap(), Replay::Applied);
    }
    action
}

// ============================================================================
// HANDSHAKE
// ============================================================================

#[tokio::test]
async fn test_connect_delivers_host_board() {
    let relay = MemoryRelay::new();
    let (host, guest) = connected_pair(&relay, "den", false).await;

    assert!(guest.is_ready());
    assert_eq!(guest.player(), &blue());
    assert_eq!(host.player(), &red());
    assert_eq!(guest.engine().rules(), host.engine().rules());
    assert_eq!(guest.engine().snapshot(), host.engine().snapshot());
}

#[tokio::test]
async fn test_guest_cannot_act_before_board() {
    let relay = MemoryRelay::new();
    let mut guest = Session::guest(guest_engine(), relay.join("den"), fast());
    let err = guest.act(Action::Skip).await.unwrap_err();
    assert!(matches!(err, SessionError::AwaitingBoard));
}

#[tokio::test]
async fn test_board_frame_wire_fields() {
    let relay = MemoryRelay::new();
    let mut observer = relay.join("den");
    let _pair = connected_pair(&relay, "den", true).await;

    let connect: Value = serde_json::from_str(&observer.incoming.recv().await.unwrap()).unwrap();
    assert_eq!(connect["action"], "connect");
    assert_eq!(connect["player"], "blue");

    let board: Value = serde_json::from_str(&observer.incoming.recv().await.unwrap()).unwrap();
    assert_eq!(board["action"], "board");
    assert_eq!(board["player"], "red");
    let details = &board["details"];
    for key in ["cells", "pawns", "storage", "cemetery", "rules", "dice", "playing_team"] {
        assert!(details.get(key).is_some(), "board details missing {}", key);
    }
    assert_eq!(details["rules"]["withDice"], true);
    assert_eq!(details["rules"]["colorProtection"], false);
    assert_eq!(details["playing_team"], "red");
    assert_eq!(details["storage"]["red"][0]["index"], 0);
}

// ============================================================================
// REPLAY
// ============================================================================

#[tokio::test]
async fn test_ai_match_stays_in_sync_without_dice() {
    let relay = MemoryRelay::new();
    let (mut host, mut guest) = connected_pair(&relay, "den", false).await;
    let mut host_ai = SearchAI::with_seed(1, 3);
    let mut guest_ai = SearchAI::with_seed(1, 4);

    for _ in 0..30 {
        if host.engine().is_game_finished() {
            break;
        }
        if host.engine().playing_team() == host.player() {
            relay_turn(&mut host, &mut guest, &mut host_ai, 1).await;
        } else {
            relay_turn(&mut guest, &mut host, &mut guest_ai, 1).await;
        }
        assert_eq!(guest.engine().snapshot(), host.engine().snapshot());
    }
}

#[tokio::test]
async fn test_ai_match_stays_in_sync_with_dice() {
    let relay = MemoryRelay::new();
    let (mut host, mut guest) = connected_pair(&relay, "den", true).await;
    let mut host_ai = SearchAI::with_seed(1, 5);
    let mut guest_ai = SearchAI::with_seed(1, 6);

    for _ in 0..20 {
        if host.engine().is_game_finished() {
            break;
        }
        // a roll frame, then the action frame
        if host.engine().playing_team() == host.player() {
            relay_turn(&mut host, &mut guest, &mut host_ai, 2).await;
        } else {
            relay_turn(&mut guest, &mut host, &mut guest_ai, 2).await;
        }
        assert_eq!(guest.engine().snapshot(), host.engine().snapshot());
    }
}

#[tokio::test]
async fn test_own_echo_is_not_replayed() {
    let relay = MemoryRelay::new();
    let (mut host, mut guest) = connected_pair(&relay, "den", false).await;

    host.act(Action::StorageMove { rank: 2, team: red(), to: Pos::new(1, 1) })
        .await
        .unwrap();
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);

    // give the echo time to come back, then drain it
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(host.pump().await.unwrap().is_empty());
    assert_eq!(host.engine().snapshot(), guest.engine().snapshot());
}

#[tokio::test]
async fn test_duplicate_move_is_rejected() {
    let relay = MemoryRelay::new();
    let (_host, mut guest) = connected_pair(&relay, "den", true).await;

    let frames = [
        Message::new(red(), Payload::Dice { color: DiceValue::Wild }),
        Message::from_action(red(), &Action::StorageMove { rank: 1, team: red(), to: Pos::new(2, 2) }),
        Message::new(blue(), Payload::Dice { color: DiceValue::Wild }),
        Message::from_action(blue(), &Action::StorageMove { rank: 0, team: blue(), to: Pos::new(0, 0) }),
        Message::new(red(), Payload::Dice { color: DiceValue::Wild }),
    ];
    for frame in frames {
        assert_eq!(guest.handle(frame).await.unwrap(), Replay::Applied);
    }

    let step = Message::from_action(red(), &Action::Move { from: Pos::new(2, 2), to: Pos::new(2, 3) });
    assert_eq!(guest.handle(step.clone()).await.unwrap(), Replay::Applied);
    assert!(!guest.engine().can_move(Pos::new(2, 2), Pos::new(2, 3)));

    let replay = guest.handle(step).await.unwrap();
    assert_eq!(replay, Replay::Rejected(RulesError::OutOfTurn(red())));
    assert_eq!(guest.engine().pawn_at(Pos::new(2, 3)).map(|p| p.rank), Some(1));
    assert_eq!(guest.engine().playing_team(), &blue());
}

#[tokio::test]
async fn test_frames_from_team_off_turn_are_rejected() {
    let relay = MemoryRelay::new();
    let (mut host, mut guest) = connected_pair(&relay, "den", false).await;

    let opening = host.engine().all_movements()[0].clone();
    host.act(opening).await.unwrap();
    assert_eq!(guest.step().await.unwrap(), Replay::Applied);
    let synced = guest.engine().snapshot();

    // red again while blue is on turn
    let late = [
        Message::from_action(red(), &Action::Skip),
        Message::from_action(red(), &Action::StorageMove { rank: 4, team: red(), to: Pos::new(4, 4) }),
    ];
    for frame in late {
        assert_eq!(
            guest.handle(frame).await.unwrap(),
            Replay::Rejected(RulesError::OutOfTurn(red()))
        );
    }

    // blue on turn, but the pawn is red's
    let forged = Message::from_action(blue(), &Action::StorageMove { rank: 4, team: red(), to: Pos::new(4, 4) });
    assert!(matches!(
        guest.handle(forged).await.unwrap(),
        Replay::Rejected(RulesError::IllegalAction(_))
    ));
    assert_eq!(guest.engine().snapshot(), synced);
    assert_eq!(guest.engine().snapshot(), host.engine().snapshot());
}

#[tokio::test]
async fn test_duplicated_skip_is_rejected() {
    let mut engine = host_engine(3, true);
    // red's only color-2 pawn is gone and a 2 was rolled: nothing to do
    engine.storage_move(2, &red(), Pos::new(0, 0)).unwrap();
    engine.send_to_cemetery(Pos::new(0, 0));
    engine.set_dice_value(Some(DiceValue::Color(2)));
    let mut session = Session::local(engine);

    let skip = Message::from_action(red(), &Action::Skip);
    assert_eq!(session.handle(skip.clone()).await.unwrap(), Replay::Applied);
    assert_eq!(session.engine().playing_team(), &blue());

    assert_eq!(
        session.handle(skip).await.unwrap(),
        Replay::Rejected(RulesError::OutOfTurn(red()))
    );
    assert_eq!(session.engine().playing_team(), &blue());
}

#[tokio::test]
async fn test_guest_loads_browser_host_board() {
    let relay = MemoryRelay::new();
    let mut engine = host_engine(4, false);
    engine
        .execute(&Action::StorageMove { rank: 3, team: red(), to: Pos::new(1, 1) })
        .unwrap();
    let host = Session::host(engine, relay.join("den"), fast());
    let mut guest = Session::guest(guest_engine(), relay.join("den"), fast());

    // a browser host sends cells, pawns, dice and the playing team only,
    // and its pawns carry no lastAnimalIndex
    let mut details = serde_json::to_value(host.engine().snapshot()).unwrap();
    for row in details["pawns"].as_array_mut().unwrap() {
        for cell in row.as_array_mut().unwrap() {
            if let Some(pawn) = cell.as_object_mut() {
                pawn.remove("lastAnimalIndex");
            }
        }
    }
    let fields = details.as_object_mut().unwrap();
    for key in ["storage", "cemetery", "rules", "last_move"] {
        fields.remove(key);
    }
    let text = serde_json::json!({"player": "red", "action": "board", "details": details}).to_string();
    assert!(!text.contains("lastAnimalIndex"));

    let message = Message::decode(&text).unwrap();
    assert_eq!(guest.handle(message).await.unwrap(), Replay::Applied);
    assert!(guest.is_ready());
    assert_eq!(guest.engine().pawn_at(Pos::new(1, 1)).map(|p| p.last_rank), Some(4));
    assert_eq!(guest.engine().playing_team(), &blue());
    assert_eq!(guest.engine().number_in_storage(&blue()), 5);
    assert_eq!(guest.engine().cemetery_of(&red()).len(), 5);
    assert_eq!(guest.engine().snapshot().storage, host.engine().snapshot().storage);
}

#[tokio::test]
async fn test_unreadable_frames_are_dropped() {
    let relay = MemoryRelay::new();
    let mut host = Session::host(host_engine(2, false), relay.join("den"), fast());
    let stranger = relay.join("den");

    stranger.outgoing.send("<<not json>>".to_string()).unwrap();
    stranger
        .outgoing
        .send(r#"{"player":"blue","action":"chat","details":{"text":"hi"}}"#.to_string())
        .unwrap();
    stranger
        .outgoing
        .send(Message::new(blue(), Payload::Connect).encode().unwrap())
        .unwrap();

    assert_eq!(host.step().await.unwrap(), Replay::Answered);
}

#[tokio::test]
async fn test_host_refuses_to_act_on_guest_turn() {
    let relay = MemoryRelay::new();
    let (mut host, _guest) = connected_pair(&relay, "den", false).await;
    let opening = host.engine().all_movements()[0].clone();
    host.act(opening).await.unwrap();

    let err = host.act(Action::Skip).await.unwrap_err();
    assert!(matches!(err, SessionError::NotYourTurn(team) if team == red()));
}

// ============================================================================
// TRANSPORT FAILURE
// ============================================================================

#[tokio::test]
async fn test_link_that_never_opens_reports_not_ready() {
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    let (_in_tx, in_rx) = mpsc::unbounded_channel();
    let (_state_tx, state_rx) = watch::channel(LinkState::Connecting);
    let link = Link {
        outgoing: out_tx,
        incoming: in_rx,
        state: state_rx,
    };
    let config = fast().with_max_attempts(5);
    let mut guest = Session::guest(guest_engine(), link, config);

    let err = guest.request_board().await.unwrap_err();
    assert!(matches!(err, SessionError::Channel(ChannelError::NotReady { attempts: 5 })));
}

//! Wire format shared by host and guest
//!
//! Every frame is a JSON object
//! `{"player": <team>, "action": <tag>, "details": <payload>}`; `details`
//! is omitted for `connect` and `skip`.

use menagerie_core::{Action, DiceValue, Pos, Snapshot, Team};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

pub const CONNECT: &str = "connect";
pub const BOARD: &str = "board";
pub const DICE: &str = "dice";
pub const MOVE: &str = "move";
pub const STORAGE_MOVE: &str = "storage_move";
pub const SKIP: &str = "skip";

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Guest asks the host for the current board
    Connect,
    /// Host's full state, sent once per connect
    Board(Box<Snapshot>),
    /// Result of a roll
    Dice { color: DiceValue },
    Move { before: Pos, after: Pos },
    StorageMove { rank: usize, team: Team, after: Pos },
    Skip,
}

/// One relayed frame
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Sender; peers drop frames carrying their own team
    pub player: Team,
    pub payload: Payload,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    player: Team,
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct DiceDetails {
    color: DiceValue,
}

#[derive(Serialize, Deserialize)]
struct MoveDetails {
    before: Pos,
    after: Pos,
}

#[derive(Serialize, Deserialize)]
struct StorageRef {
    #[serde(rename = "animalIndex")]
    animal_index: usize,
    team: Team,
}

#[derive(Serialize, Deserialize)]
struct StorageMoveDetails {
    before: StorageRef,
    after: Pos,
}

impl Message {
    pub fn new(player: Team, payload: Payload) -> Self {
        Self { player, payload }
    }

    /// Frame announcing an action `player` just applied locally
    pub fn from_action(player: Team, action: &Action) -> Self {
        let payload = match action {
            Action::Move { from, to } => Payload::Move {
                before: *from,
                after: *to,
            },
            Action::StorageMove { rank, team, to } => Payload::StorageMove {
                rank: *rank,
                team: team.clone(),
                after: *to,
            },
            Action::Skip => Payload::Skip,
        };
        Self::new(player, payload)
    }

    /// The engine action carried by this frame, if it carries one
    pub fn action(&self) -> Option<Action> {
        match &self.payload {
            Payload::Move { before, after } => Some(Action::Move {
                from: *before,
                to: *after,
            }),
            Payload::StorageMove { rank, team, after } => Some(Action::StorageMove {
                rank: *rank,
                team: team.clone(),
                to: *after,
            }),
            Payload::Skip => Some(Action::Skip),
            Payload::Connect | Payload::Board(_) | Payload::Dice { .. } => None,
        }
    }

    /// The `action` tag on the wire
    pub fn kind(&self) -> &'static str {
        match self.payload {
            Payload::Connect => CONNECT,
            Payload::Board(_) => BOARD,
            Payload::Dice { .. } => DICE,
            Payload::Move { .. } => MOVE,
            Payload::StorageMove { .. } => STORAGE_MOVE,
            Payload::Skip => SKIP,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        let details = match &self.payload {
            Payload::Connect | Payload::Skip => None,
            Payload::Board(snapshot) => Some(serde_json::to_value(snapshot)?),
            Payload::Dice { color } => Some(serde_json::to_value(DiceDetails { color: *color })?),
            Payload::Move { before, after } => Some(serde_json::to_value(MoveDetails {
                before: *before,
                after: *after,
            })?),
            Payload::StorageMove { rank, team, after } => Some(serde_json::to_value(StorageMoveDetails {
                before: StorageRef {
                    animal_index: *rank,
                    team: team.clone(),
                },
                after: *after,
            })?),
        };
        let envelope = Envelope {
            player: self.player.clone(),
            action: self.kind().to_string(),
            details,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let payload = match envelope.action.as_str() {
            CONNECT => Payload::Connect,
            SKIP => Payload::Skip,
            BOARD => Payload::Board(Box::new(details(envelope.details, BOARD)?)),
            DICE => {
                let d: DiceDetails = details(envelope.details, DICE)?;
                Payload::Dice { color: d.color }
            }
            MOVE => {
                let d: MoveDetails = details(envelope.details, MOVE)?;
                Payload::Move {
                    before: d.before,
                    after: d.after,
                }
            }
            STORAGE_MOVE => {
                let d: StorageMoveDetails = details(envelope.details, STORAGE_MOVE)?;
                Payload::StorageMove {
                    rank: d.before.animal_index,
                    team: d.before.team,
                    after: d.after,
                }
            }
            other => return Err(ProtocolError::UnknownAction(other.to_string())),
        };
        Ok(Self::new(envelope.player, payload))
    }
}

fn details<T: for<'de> Deserialize<'de>>(value: Option<Value>, action: &'static str) -> Result<T, ProtocolError> {
    let value = value.ok_or(ProtocolError::MissingDetails(action))?;
    Ok(serde_json::from_value(value)?)
}

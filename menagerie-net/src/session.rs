//! Session: one engine, one role, one channel
//!
//! Local actions go through `roll_dice`/`act`, which apply them to the
//! engine first and then announce them. Remote frames go through `handle`,
//! which replays them through the same legality checks.

use menagerie_core::{Action, DiceValue, Pawn, RulesEngine, RulesError, SearchAI, Team};

use crate::channel::{ChannelConfig, Link, ReplicationChannel};
use crate::error::SessionError;
use crate::protocol::{Message, Payload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Owns the authoritative initial board; plays the first team
    Host,
    /// Loads the host's board; plays the second team
    Guest,
}

/// What `handle` did with a frame
#[derive(Clone, Debug, PartialEq)]
pub enum Replay {
    /// Applied to the local engine
    Applied,
    /// Failed the legality checks and was dropped
    Rejected(RulesError),
    /// Not meant for this role or arrived before the board
    Ignored,
    /// A connect request answered with the board
    Answered,
}

pub struct Session {
    role: Role,
    player: Team,
    engine: RulesEngine,
    channel: Option<ReplicationChannel>,
    ready: bool,
}

impl Session {
    /// Hot-seat session: no channel, any team may act on its turn
    pub fn local(engine: RulesEngine) -> Self {
        let player = engine.teams()[0].clone();
        Self {
            role: Role::Host,
            player,
            engine,
            channel: None,
            ready: true,
        }
    }

    /// Host over `link`. The engine should already have a generated board.
    pub fn host(engine: RulesEngine, link: Link, config: ChannelConfig) -> Self {
        let player = engine.teams()[0].clone();
        let channel = ReplicationChannel::new(player.clone(), link, config);
        tracing::info!(team = %player, "hosting");
        Self {
            role: Role::Host,
            player,
            engine,
            channel: Some(channel),
            ready: true,
        }
    }

    /// Guest over `link`. The engine's board is replaced by the host's.
    pub fn guest(engine: RulesEngine, link: Link, config: ChannelConfig) -> Self {
        let player = engine.next_team(&engine.teams()[0]).clone();
        let channel = ReplicationChannel::new(player.clone(), link, config);
        tracing::info!(team = %player, "joining as guest");
        Self {
            role: Role::Guest,
            player,
            engine,
            channel: Some(channel),
            ready: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn player(&self) -> &Team {
        &self.player
    }

    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    /// Whether the board is in place (always for hosts)
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_local(&self) -> bool {
        self.channel.is_none()
    }

    /// Whether local input may drive the engine right now
    pub fn is_my_turn(&self) -> bool {
        self.ready && (self.is_local() || self.engine.playing_team() == &self.player)
    }

    // ========================================================================
    // LOCAL ACTIONS
    // ========================================================================

    /// Guest only: ask the host for its board
    pub async fn request_board(&mut self) -> Result<(), SessionError> {
        if self.is_host() {
            return Ok(());
        }
        self.announce(Payload::Connect).await
    }

    /// Roll for the playing team and announce the value
    pub async fn roll_dice(&mut self) -> Result<Option<DiceValue>, SessionError> {
        self.check_turn()?;
        let team = self.engine.playing_team().clone();
        if !self.engine.can_player_roll(&team) {
            return Ok(self.engine.dice_value());
        }
        let value = self.engine.roll_dice();
        if let Some(color) = value {
            tracing::debug!(team = %team, dice = ?color, "rolled");
            self.announce(Payload::Dice { color }).await?;
        }
        Ok(value)
    }

    /// Apply `action` locally, then announce it. Returns the captured pawn.
    pub async fn act(&mut self, action: Action) -> Result<Option<Pawn>, SessionError> {
        self.check_turn()?;
        let captured = self.engine.execute(&action)?;
        if let Some(channel) = &mut self.channel {
            channel.send(&Message::from_action(self.player.clone(), &action)).await?;
        }
        Ok(captured)
    }

    /// Roll if needed, let `ai` choose, and play the choice
    pub async fn play_ai_turn(&mut self, ai: &mut SearchAI) -> Result<Action, SessionError> {
        if !self.engine.is_dice_rolled() {
            self.roll_dice().await?;
        }
        let action = ai.best_next_move(&self.engine);
        self.act(action.clone()).await?;
        Ok(action)
    }

    fn check_turn(&self) -> Result<(), SessionError> {
        if !self.ready {
            return Err(SessionError::AwaitingBoard);
        }
        if self.engine.is_game_finished() {
            return Err(RulesError::GameOver.into());
        }
        if !self.is_my_turn() {
            return Err(SessionError::NotYourTurn(self.player.clone()));
        }
        Ok(())
    }

    async fn announce(&mut self, payload: Payload) -> Result<(), SessionError> {
        if let Some(channel) = &mut self.channel {
            channel.send(&Message::new(self.player.clone(), payload)).await?;
        }
        Ok(())
    }

    // ========================================================================
    // REMOTE FRAMES
    // ========================================================================

    /// Replay one frame from the peer
    pub async fn handle(&mut self, message: Message) -> Result<Replay, SessionError> {
        let kind = message.kind();
        let from = message.player.clone();

        let replay = match message.payload {
            Payload::Connect if self.is_host() => {
                let snapshot = self.engine.snapshot();
                self.announce(Payload::Board(Box::new(snapshot))).await?;
                tracing::info!(guest = %from, "sent board");
                Replay::Answered
            }
            Payload::Board(snapshot) if !self.is_host() => match self.engine.load_board(*snapshot) {
                Ok(()) => {
                    self.ready = true;
                    tracing::info!(host = %from, "board loaded");
                    Replay::Applied
                }
                Err(e) => {
                    tracing::warn!(host = %from, error = %e, "rejected board");
                    Replay::Rejected(e)
                }
            },
            Payload::Connect | Payload::Board(_) => Replay::Ignored,
            _ if !self.ready => {
                tracing::debug!(from = %from, kind, "frame before board, ignoring");
                Replay::Ignored
            }
            Payload::Dice { .. } if !self.engine.can_player_roll(&from) => {
                reject(&from, kind, RulesError::OutOfTurn(from.clone()))
            }
            Payload::Dice { color } => {
                self.engine.set_dice_value(Some(color));
                Replay::Applied
            }
            _ if !self.engine.can_player_move(&from) => {
                reject(&from, kind, RulesError::OutOfTurn(from.clone()))
            }
            payload => {
                let action = Message::new(from.clone(), payload).action();
                match action.map(|action| self.engine.execute(&action)) {
                    Some(Ok(_)) => Replay::Applied,
                    Some(Err(e)) => reject(&from, kind, e),
                    None => Replay::Ignored,
                }
            }
        };
        tracing::debug!(from = %from, kind, replay = ?replay, "handled frame");
        Ok(replay)
    }

    /// Wait for the next peer frame and replay it
    pub async fn step(&mut self) -> Result<Replay, SessionError> {
        let message = match &mut self.channel {
            Some(channel) => channel.recv().await?,
            None => return Ok(Replay::Ignored),
        };
        self.handle(message).await
    }

    /// Replay every frame already delivered, without waiting
    pub async fn pump(&mut self) -> Result<Vec<Replay>, SessionError> {
        let mut replays = Vec::new();
        loop {
            let message = match &mut self.channel {
                Some(channel) => channel.try_recv()?,
                None => None,
            };
            match message {
                Some(message) => replays.push(self.handle(message).await?),
                None => return Ok(replays),
            }
        }
    }
}

fn reject(from: &Team, kind: &str, error: RulesError) -> Replay {
    tracing::warn!(from = %from, kind, error = %error, "rejected replay");
    Replay::Rejected(error)
}

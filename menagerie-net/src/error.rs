//! Replication errors

use menagerie_core::{RulesError, Team};

/// A relayed message could not be understood
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action {0} requires details")]
    MissingDetails(&'static str),
}

/// The link to the relay failed
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("link not open after {attempts} attempts")]
    NotReady { attempts: u32 },

    #[error("link closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("it is not {0}'s turn")]
    NotYourTurn(Team),

    #[error("waiting for the host's board")]
    AwaitingBoard,
}

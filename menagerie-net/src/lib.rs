//! Menagerie Net - Host/guest replication
//!
//! - JSON wire protocol (`protocol`)
//! - Queued, echo-filtering channel over a relay link (`channel`)
//! - In-process room relay (`relay`)
//! - Session tying an engine to a role and a channel (`session`)

pub mod channel;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod session;

pub use channel::{ChannelConfig, Link, LinkState, ReplicationChannel};
pub use error::{ChannelError, ProtocolError, SessionError};
pub use protocol::{Message, Payload};
pub use relay::MemoryRelay;
pub use session::{Replay, Role, Session};

//! Server state
//!
//! The relay rooms plus the defaults advertised to clients.

use menagerie_core::{EngineConfig, RuleFlags};
use menagerie_net::MemoryRelay;

/// Server-wide shared state
pub struct ServerState {
    pub relay: MemoryRelay,
    pub engine: EngineConfig,
    pub rules: RuleFlags,
}

impl ServerState {
    pub fn new(engine: EngineConfig, rules: RuleFlags) -> Self {
        Self {
            relay: MemoryRelay::new(),
            engine,
            rules,
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(EngineConfig::default(), RuleFlags::default())
    }
}

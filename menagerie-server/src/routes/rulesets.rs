//! Rules endpoint

use axum::{extract::State, Json};
use menagerie_core::{EngineConfig, RuleFlags};
use serde::Serialize;
use std::sync::Arc;

use crate::state::ServerState;

#[derive(Serialize)]
pub struct RulesResponse {
    pub config: EngineConfig,
    pub rules: RuleFlags,
}

/// Engine config and default rule toggles clients should start from
pub async fn get_rules(State(state): State<Arc<ServerState>>) -> Json<RulesResponse> {
    Json(RulesResponse {
        config: state.engine.clone(),
        rules: state.rules,
    })
}

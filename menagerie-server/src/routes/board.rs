//! Fresh board endpoint
//!
//! Lets a browser host get a generated board without running the engine
//! itself. Guests never call this; they get the host's board over the relay.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use menagerie_core::{RuleFlags, RulesEngine, Snapshot};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    pub seed: Option<u64>,
    #[serde(rename = "withDice")]
    pub with_dice: Option<bool>,
    #[serde(rename = "colorProtection")]
    pub color_protection: Option<bool>,
}

pub async fn new_board(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Snapshot>, (StatusCode, String)> {
    let rules = RuleFlags::new(
        query.color_protection.unwrap_or(state.rules.color_protection),
        query.with_dice.unwrap_or(state.rules.with_dice),
    );
    let config = state.engine.clone();
    let engine = match query.seed {
        Some(seed) => RulesEngine::with_seed(config, rules, seed),
        None => RulesEngine::new(config, rules),
    };
    let mut engine = engine.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    engine.generate_board();
    Ok(Json(engine.snapshot()))
}

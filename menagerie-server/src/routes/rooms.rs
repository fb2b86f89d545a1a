//! Open relay rooms

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::ServerState;

#[derive(Serialize)]
pub struct RoomInfo {
    pub room: String,
    pub members: usize,
}

/// Rooms with at least one member, sorted by name
pub async fn list_rooms(State(state): State<Arc<ServerState>>) -> Json<Vec<RoomInfo>> {
    let pruned = state.relay.prune();
    if pruned > 0 {
        tracing::debug!(pruned, "dropped empty rooms");
    }
    let rooms = state
        .relay
        .list()
        .into_iter()
        .map(|(room, members)| RoomInfo { room, members })
        .collect();
    Json(rooms)
}

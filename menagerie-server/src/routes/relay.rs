//! WebSocket relay
//!
//! Each socket joins one room. Text frames holding JSON are broadcast to
//! every socket in the room, the sender included; anything else is dropped.
//! The relay never interprets the game messages.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use menagerie_net::Link;
use serde_json::Value;
use std::sync::Arc;

use crate::state::ServerState;

pub async fn relay_socket(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| {
        let link = state.relay.join(&room);
        bridge(socket, link, room)
    })
}

async fn bridge(mut socket: WebSocket, mut link: Link, room: String) {
    tracing::info!(room = %room, "client connected");
    loop {
        tokio::select! {
            frame = socket.recv() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if serde_json::from_str::<Value>(&text).is_err() {
                        tracing::warn!(room = %room, "dropping non-JSON frame");
                        continue;
                    }
                    if link.outgoing.send(text).is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(room = %room, error = %e, "socket error");
                    break;
                }
            },
            relayed = link.incoming.recv() => match relayed {
                Some(text) => {
                    if socket.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
    tracing::info!(room = %room, "client disconnected");
}

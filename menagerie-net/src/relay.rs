//! In-process room relay
//!
//! One broadcast channel per room. Every frame a member sends is delivered
//! to every member of the room, the sender included. The WebSocket server
//! bridges sockets onto the same relay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use tokio::sync::{broadcast, mpsc, watch};

use crate::channel::{Link, LinkState};

/// Frames buffered per room before slow members start lagging
pub const ROOM_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct MemoryRelay {
    rooms: Arc<Mutex<FxHashMap<String, broadcast::Sender<String>>>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    fn rooms(&self) -> MutexGuard<'_, FxHashMap<String, broadcast::Sender<String>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Broadcast handle for `room`, created on first use
    pub fn room(&self, room: &str) -> broadcast::Sender<String> {
        self.rooms()
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone()
    }

    /// Join `room` and get a link to it. Must be called inside a tokio runtime.
    pub fn join(&self, room: &str) -> Link {
        let sender = self.room(room);
        // subscribe before the task starts so nothing sent after join is missed
        let mut from_room = sender.subscribe();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);
        let name = room.to_string();

        tokio::spawn(async move {
            let _ = state_tx.send(LinkState::Open);
            tracing::debug!(room = %name, "member joined");
            loop {
                tokio::select! {
                    outbound = out_rx.recv() => match outbound {
                        Some(text) => {
                            let _ = sender.send(text);
                        }
                        None => break,
                    },
                    inbound = from_room.recv() => match inbound {
                        Ok(text) => {
                            if in_tx.send(text).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(room = %name, skipped, "member lagged, frames lost");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            drop(from_room);
            let _ = state_tx.send(LinkState::Closed);
            tracing::debug!(room = %name, "member left");
        });

        Link {
            outgoing: out_tx,
            incoming: in_rx,
            state: state_rx,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    /// Live members of `room`, zero if it does not exist
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms().get(room).map_or(0, broadcast::Sender::receiver_count)
    }

    /// (room, members) pairs sorted by name
    pub fn list(&self) -> Vec<(String, usize)> {
        let mut rooms: Vec<(String, usize)> = self
            .rooms()
            .iter()
            .map(|(name, sender)| (name.clone(), sender.receiver_count()))
            .collect();
        rooms.sort();
        rooms
    }

    /// Forget rooms nobody is in. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut rooms = self.rooms();
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }
}

//! Replication channel
//!
//! Wraps one duplex link to a relay room. Outbound frames are queued while
//! the link is still connecting and flushed once it opens. Inbound frames
//! carrying our own team are dropped, since the relay echoes every frame
//! back to its sender.

use std::collections::VecDeque;
use std::time::Duration;

use menagerie_core::Team;
use tokio::sync::{mpsc, watch};

use crate::error::ChannelError;
use crate::protocol::Message;

// ============================================================================
// LINK
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closed,
}

/// Raw text halves of a connection plus its state
pub struct Link {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<String>,
    pub state: watch::Receiver<LinkState>,
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Delay between link state checks
    pub poll_interval: Duration,
    /// Checks before giving up with `NotReady`
    pub max_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            max_attempts: 100,
        }
    }
}

impl ChannelConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

pub struct ReplicationChannel {
    player: Team,
    link: Link,
    pending: VecDeque<String>,
    config: ChannelConfig,
}

impl ReplicationChannel {
    pub fn new(player: Team, link: Link, config: ChannelConfig) -> Self {
        Self {
            player,
            link,
            pending: VecDeque::new(),
            config,
        }
    }

    /// Team stamped on outbound frames and filtered from inbound ones
    pub fn player(&self) -> &Team {
        &self.player
    }

    pub fn state(&self) -> LinkState {
        *self.link.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == LinkState::Open
    }

    /// Frames waiting for the link to open
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Encode and enqueue without touching the link
    pub fn queue(&mut self, message: &Message) -> Result<(), ChannelError> {
        let text = message.encode()?;
        self.pending.push_back(text);
        Ok(())
    }

    /// Queue, wait for the link, then flush everything pending in order.
    /// On `NotReady` the frame stays queued for the next successful send.
    pub async fn send(&mut self, message: &Message) -> Result<(), ChannelError> {
        self.queue(message)?;
        self.wait_ready().await?;
        self.flush()?;
        Ok(())
    }

    /// Push pending frames onto an open link. Returns how many went out.
    pub fn flush(&mut self) -> Result<usize, ChannelError> {
        match self.state() {
            LinkState::Connecting => return Ok(0),
            LinkState::Closed => return Err(ChannelError::Closed),
            LinkState::Open => {}
        }
        let mut sent = 0;
        while let Some(text) = self.pending.pop_front() {
            if self.link.outgoing.send(text).is_err() {
                tracing::error!(player = %self.player, "link dropped while flushing");
                return Err(ChannelError::Closed);
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Poll the link state until it opens, at most `max_attempts` times
    pub async fn wait_ready(&self) -> Result<(), ChannelError> {
        for _ in 0..self.config.max_attempts {
            match self.state() {
                LinkState::Open => return Ok(()),
                LinkState::Closed => return Err(ChannelError::Closed),
                LinkState::Connecting => tokio::time::sleep(self.config.poll_interval).await,
            }
        }
        if self.is_open() {
            return Ok(());
        }
        tracing::error!(
            player = %self.player,
            attempts = self.config.max_attempts,
            "link never opened"
        );
        Err(ChannelError::NotReady {
            attempts: self.config.max_attempts,
        })
    }

    /// Next frame from a peer. Own echoes and unreadable frames are skipped.
    pub async fn recv(&mut self) -> Result<Message, ChannelError> {
        loop {
            let text = self.link.incoming.recv().await.ok_or(ChannelError::Closed)?;
            if let Some(message) = self.accept(&text) {
                return Ok(message);
            }
        }
    }

    /// Like `recv` but returns `None` instead of waiting
    pub fn try_recv(&mut self) -> Result<Option<Message>, ChannelError> {
        loop {
            match self.link.incoming.try_recv() {
                Ok(text) => {
                    if let Some(message) = self.accept(&text) {
                        return Ok(Some(message));
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => return Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => return Err(ChannelError::Closed),
            }
        }
    }

    /// Hand every peer frame to `handler` until the link closes
    pub async fn on_receive<F>(&mut self, mut handler: F)
    where
        F: FnMut(Message),
    {
        while let Ok(message) = self.recv().await {
            handler(message);
        }
        tracing::debug!(player = %self.player, "link closed, receive loop done");
    }

    fn accept(&self, text: &str) -> Option<Message> {
        match Message::decode(text) {
            Ok(message) if message.player == self.player => None,
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(player = %self.player, error = %e, "dropping frame");
                None
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

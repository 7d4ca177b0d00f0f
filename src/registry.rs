//! Connection registry for live push delivery
//!
//! Maps a player identity to its currently-live push channel. The registry
//! is a delivery hint, not an identity authority: a missing or stale entry
//! costs a missed notification, never a correctness violation, so reads
//! and writes interleave freely on the concurrent map.

use crate::types::PushEvent;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Push channel handle for one connected player
pub type PushSender = mpsc::UnboundedSender<PushEvent>;

/// Concurrent map of player identity to live push channel
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, PushSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a player's push channel, replacing any previous one
    pub fn connect(&self, player: &str, sender: PushSender) {
        debug!(player, "push channel connected");
        self.connections.insert(player.to_string(), sender);
    }

    /// Drop a player's push channel on disconnect
    pub fn disconnect(&self, player: &str) {
        if self.connections.remove(player).is_some() {
            debug!(player, "push channel disconnected");
        }
    }

    /// Fire-and-forget delivery to every connected player. Channels whose
    /// receiver has gone away are dropped along the way.
    pub fn broadcast(&self, event: &PushEvent) {
        self.connections
            .retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    /// Targeted fire-and-forget delivery. Returns false when the player has
    /// no live channel; the caller must treat that as a missed
    /// notification, nothing more.
    pub fn send_to(&self, player: &str, event: PushEvent) -> bool {
        match self.connections.get(player) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

//! Room-based broadcast infrastructure.
//!
//! This module provides the fan-out mechanism for realtime updates: named
//! subscription groups ("rooms") that connected clients join, and a publish
//! operation that delivers a message to every current member of a room.
//!
//! # Delivery Semantics
//!
//! Delivery is best-effort. `publish` snapshots the membership under the
//! lock, sends to each member's channel, and reports how many sends
//! succeeded. There is no acknowledgment, retry, or buffering for members
//! whose channel has closed; the message is simply dropped for them.
//! Publishing to an empty or unknown room delivers to zero recipients and
//! is not an error.
//!
//! # Thread Safety
//!
//! [`RoomRegistry`] is `Clone`, `Send`, and `Sync`. All membership
//! mutation (join, leave, disconnect) and publish iteration serialize
//! through one [`RwLock`], so a publish racing a join sees a consistent
//! membership snapshot.
//!
//! # Example
//!
//! ```rust
//! use bustrack_server::rooms::{RoomRegistry, TRACKING_ROOM};
//! use bustrack_server::types::ServerMessage;
//! use uuid::Uuid;
//!
//! let rooms = RoomRegistry::new();
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//!
//! let client = Uuid::new_v4();
//! rooms.join(TRACKING_ROOM, client, tx);
//! assert_eq!(rooms.member_count(TRACKING_ROOM), 1);
//!
//! rooms.remove_client(client);
//! assert_eq!(rooms.member_count(TRACKING_ROOM), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::types::ServerMessage;

/// The well-known room carrying vehicle position updates.
pub const TRACKING_ROOM: &str = "bus-tracking";

/// Identity of one realtime connection.
pub type ClientId = Uuid;

/// Outbound message channel for one connection.
pub type ClientSender = UnboundedSender<ServerMessage>;

/// Registry of named subscription groups and their current members.
///
/// Cloning is cheap; clones share the same membership mapping.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, HashMap<ClientId, ClientSender>>>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client to the named room.
    ///
    /// Idempotent: joining a room twice has the effect of being a member
    /// once (the sender is replaced).
    pub fn join(&self, room: &str, client: ClientId, sender: ClientSender) {
        let mut rooms = self.rooms.write().unwrap();
        let members = rooms.entry(room.to_string()).or_default();
        let replaced = members.insert(client, sender).is_some();

        debug!(
            room = %room,
            client = %client,
            members = members.len(),
            replaced,
            "Client joined room"
        );
    }

    /// Removes a client from the named room. No-op if the client is not a
    /// member; empty rooms are dropped from the registry.
    pub fn leave(&self, room: &str, client: ClientId) {
        let mut rooms = self.rooms.write().unwrap();
        if let Some(members) = rooms.get_mut(room) {
            if members.remove(&client).is_some() {
                debug!(room = %room, client = %client, "Client left room");
            }
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Removes a client from every room it has joined.
    ///
    /// Called on disconnect; unconditional, no graceful drain.
    pub fn remove_client(&self, client: ClientId) {
        let mut rooms = self.rooms.write().unwrap();
        let mut removed_from = 0usize;

        rooms.retain(|_, members| {
            if members.remove(&client).is_some() {
                removed_from += 1;
            }
            !members.is_empty()
        });

        if removed_from > 0 {
            debug!(client = %client, rooms = removed_from, "Client disconnected from rooms");
        }
    }

    /// Delivers a message to every current member of the named room.
    ///
    /// Returns the number of members the message was handed to. Members
    /// whose channel has closed are skipped silently; their membership is
    /// cleaned up on their disconnect path.
    pub fn publish(&self, room: &str, message: &ServerMessage) -> usize {
        let rooms = self.rooms.read().unwrap();

        let Some(members) = rooms.get(room) else {
            trace!(room = %room, "Publish to nonexistent room, zero recipients");
            return 0;
        };

        let mut delivered = 0usize;
        for (client, sender) in members {
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                trace!(room = %room, client = %client, "Dropped message for closed channel");
            }
        }

        if delivered < members.len() {
            warn!(
                room = %room,
                delivered,
                members = members.len(),
                "Some members missed a broadcast"
            );
        }

        trace!(room = %room, delivered, "Published message");
        delivered
    }

    /// Number of current members in the named room.
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .unwrap()
            .get(room)
            .map_or(0, HashMap::len)
    }

    /// Number of distinct clients across all rooms.
    #[must_use]
    pub fn client_count(&self) -> usize {
        let rooms = self.rooms.read().unwrap();
        let mut clients: Vec<ClientId> = rooms.values().flat_map(|m| m.keys().copied()).collect();
        clients.sort_unstable();
        clients.dedup();
        clients.len()
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rooms = self.rooms.read().unwrap();
        f.debug_struct("RoomRegistry")
            .field("rooms", &rooms.len())
            .field("clients", &rooms.values().map(HashMap::len).sum::<usize>())
            .finish()
    }
}

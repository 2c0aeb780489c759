//! Wire types for the realtime channel.
//!
//! This module defines the messages exchanged over an upgraded WebSocket
//! connection and the location event they carry. Field names use
//! `camelCase` and message tags use `kebab-case` to match the JSON API
//! contract of the reference deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stops::Stop;

/// A synthetic vehicle position, generated fresh on every simulator tick.
///
/// Events are transient: they exist only for the duration of one broadcast
/// and are never stored. The current and next stop are drawn independently
/// and may coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    /// Vehicle identity (1..=50 in the reference deployment).
    pub bus_id: u32,

    /// The stop the vehicle is currently at.
    pub current_stop: Stop,

    /// The stop the vehicle is heading to.
    pub next_stop: Stop,

    /// Estimated arrival at the next stop, in minutes.
    pub estimated_arrival: u32,

    /// When the event was generated.
    pub timestamp: DateTime<Utc>,
}

/// Messages a client may send over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join the bus-tracking subscription group.
    #[serde(rename_all = "camelCase")]
    JoinBusTracking {
        /// The joining account's identity; recorded for logging only.
        user_id: u64,
    },
}

/// Messages the server emits over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A vehicle position update, fanned out to the tracking group.
    BusLocationUpdate(LocationEvent),
}

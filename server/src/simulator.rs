//! Periodic location simulation.
//!
//! A background task synthesizes a vehicle position on a fixed period and
//! publishes it to the tracking room, independent of any client action.
//! Each event is independent: stops are drawn uniformly at random (current
//! and next may coincide), there is no continuity between ticks, and
//! generation cannot fail. This is a placeholder for real telemetry, not a
//! simulation of continuous vehicle motion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use crate::rooms::{RoomRegistry, TRACKING_ROOM};
use crate::stops::Stop;
use crate::types::{LocationEvent, ServerMessage};

/// Vehicle identities are drawn from 1..=MAX_BUS_ID.
const MAX_BUS_ID: u32 = 50;

/// Estimated arrival is drawn from 1..=MAX_ETA_MINUTES.
const MAX_ETA_MINUTES: u32 = 60;

/// Synthesizes one location event from the catalog.
///
/// Current and next stop are chosen independently and uniformly; they may
/// be the same stop.
///
/// # Panics
///
/// Panics if `catalog` is empty. The catalog is static and non-empty by
/// construction.
#[must_use]
pub fn synthesize_event(catalog: &[Stop], rng: &mut impl Rng) -> LocationEvent {
    let current = &catalog[rng.random_range(0..catalog.len())];
    let next = &catalog[rng.random_range(0..catalog.len())];

    LocationEvent {
        bus_id: rng.random_range(1..=MAX_BUS_ID),
        current_stop: current.clone(),
        next_stop: next.clone(),
        estimated_arrival: rng.random_range(1..=MAX_ETA_MINUTES),
        timestamp: Utc::now(),
    }
}

/// Spawns the simulator task.
///
/// The task fires every `period`, starting one period after spawn, and
/// publishes a fresh event to the tracking room each time. It holds only
/// the publish capability and the catalog; the caller owns the handle and
/// aborts it at shutdown.
pub fn spawn(rooms: RoomRegistry, catalog: Arc<Vec<Stop>>, period: Duration) -> JoinHandle<()> {
    info!(
        period_secs = period.as_secs(),
        stops = catalog.len(),
        "Location simulator starting"
    );

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;

            let event = synthesize_event(&catalog, &mut rand::rng());
            let bus_id = event.bus_id;
            let delivered = rooms.publish(TRACKING_ROOM, &ServerMessage::BusLocationUpdate(event));

            debug!(bus_id, delivered, "Broadcast location update");
        }
    })
}

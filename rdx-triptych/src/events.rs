//! Defines the events broadcast by a running [`Rotator`](crate::host::Rotator).
//!
//! Renderers that prefer pushing over polling subscribe to this stream and
//! redraw whenever a slot rotates. Every event that changes what is on screen
//! carries a full [`Snapshot`], so a late subscriber never has to replay
//! history.

use crate::engine::{Rotation, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::warn;

#[derive(Debug, Clone)]
pub enum RotationEvent {
    /// A new configuration replaced the previous one.
    ConfigApplied {
        pool_size: usize,
        interval: Duration,
        fade: Duration,
        reinitialized: bool,
        snapshot: Arc<Snapshot>,
        timestamp: DateTime<Utc>,
    },
    /// One slot flipped to a new image.
    SlotRotated {
        rotation: Rotation,
        snapshot: Arc<Snapshot>,
        timestamp: DateTime<Utc>,
    },
    /// The scheduler started (or restarted) with the given period.
    RotationStarted { interval: Duration },
    /// The scheduler stopped; slots hold their last images.
    RotationStopped,
    /// The rotator was torn down. No further events follow.
    Shutdown,
}

/// Receives the next event, riding over lag.
///
/// A subscriber that falls behind the channel capacity loses the oldest
/// events; that is logged and the stream continues with the next available
/// one. Returns `None` once the rotator is gone.
pub async fn next_event(event_rx: &mut Receiver<RotationEvent>) -> Option<RotationEvent> {
    loop {
        match event_rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event listener lagged behind, skipped {} events.", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

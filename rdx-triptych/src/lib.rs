//! # Triptych
//!
//! A double-buffered image rotation engine for multi-slot displays.
//!
//! Triptych keeps a small, fixed row of display slots (three by default) and
//! periodically swaps the image shown in one of them for another image from a
//! shared pool. Each slot holds two layers so a renderer can crossfade from
//! the old image to the new one instead of cutting.
//!
//! ## Core Concepts
//!
//! - **Slot**: a display position with layers A and B and an active-layer
//!   flag. A rotation writes the inactive layer, then flips the flag.
//! - **Tick**: one rotation step. Each tick rotates exactly one randomly
//!   chosen slot, so changes stay sparse and never flash in sync.
//! - **Selection**: the next image is one that is not visible anywhere, if the
//!   pool allows it, and never the slot's own current image unless the pool
//!   leaves no other choice.
//! - **Configuration-Driven**: the pool, rotation interval and fade length
//!   come from a JSON document that is normalized into a `DisplayConfig`.
//!   Any malformed input degrades to an idle engine with default timing.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use triptych::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Build a rotator from default host settings.
//!     let mut rotator = Rotator::new(&HostSettings::default());
//!
//!     // 2. Subscribe to rotation events before applying a configuration.
//!     let mut events = rotator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Received Rotation Event: {:?}", event);
//!         }
//!     });
//!
//!     // 3. Apply a configuration. Rotation starts right away.
//!     let raw = json!({ "images": ["a.png", "b.png", "c.png", "d.png"], "INTERVAL_MS": 4000 });
//!     rotator.apply(Some(&raw)).await;
//!
//!     // 4. Tear down on Ctrl+C.
//!     tokio::signal::ctrl_c().await?;
//!     rotator.shutdown().await;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Triptych Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod loader;
pub mod selection;
pub mod settings;

pub use error::{Error, Result};

/// A prelude module for easy importing of the most common Triptych types.
pub mod prelude {
    pub use crate::common::{ImageId, Layer, SLOT_COUNT};
    pub use crate::components::scheduler::{ActiveToken, Scheduler};
    pub use crate::components::slot::Slot;
    pub use crate::config::{normalize, DisplayConfig, RotationConfig};
    pub use crate::engine::{Reconfigured, Rotation, RotationEngine, Snapshot};
    pub use crate::events::RotationEvent;
    pub use crate::host::{ApplyOutcome, Rotator};
    pub use crate::settings::HostSettings;
}

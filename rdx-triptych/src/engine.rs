//! The rotation state machine at the heart of Triptych.

use crate::common::{ImageId, Layer, SLOT_COUNT};
use crate::components::slot::Slot;
use crate::config::{DisplayConfig, RotationConfig};
use crate::selection::{random_image, select_next};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, trace};

/// The main rotation engine.
///
/// Owns the slot array, the current image pool and the rotation timing. The
/// engine is purely synchronous: it has no timer of its own and only changes
/// state when [`initialize`](Self::initialize), [`reconfigure`](Self::reconfigure)
/// or [`tick`](Self::tick) is called. Consumers read state through
/// [`snapshot`](Self::snapshot), which hands out an owned copy.
///
/// The random source is injected so that tests (and reproducible displays)
/// can use a seeded generator.
pub struct RotationEngine<R = StdRng> {
    slots: Vec<Slot>,
    pool: Vec<ImageId>,
    rotation: RotationConfig,
    rng: R,
}

/// Immutable view of the engine handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub slots: Vec<Slot>,
    pub fade_ms: f64,
}

impl Snapshot {
    /// The images currently shown, in slot order.
    pub fn visible_images(&self) -> Vec<Option<&str>> {
        self.slots.iter().map(Slot::visible_image).collect()
    }
}

/// The effect of a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rotation {
    pub slot: usize,
    pub layer: Layer,
    pub image: ImageId,
}

/// What [`RotationEngine::reconfigure`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconfigured {
    /// Slots were redrawn from the new pool.
    pub reinitialized: bool,
    /// The rotation interval differs from the previous one.
    pub interval_changed: bool,
}

impl RotationEngine<StdRng> {
    /// Creates an engine seeded from system entropy.
    pub fn new(slot_count: usize, rotation: RotationConfig) -> Self {
        Self::with_rng(slot_count, rotation, StdRng::from_entropy())
    }

    /// Creates an engine whose choices are fully determined by `seed`.
    pub fn seeded(slot_count: usize, rotation: RotationConfig, seed: u64) -> Self {
        Self::with_rng(slot_count, rotation, StdRng::seed_from_u64(seed))
    }
}

impl Default for RotationEngine<StdRng> {
    fn default() -> Self {
        Self::new(SLOT_COUNT, RotationConfig::default())
    }
}

// Core state transitions.
impl<R: Rng> RotationEngine<R> {
    /// Creates an idle engine with `slot_count` empty slots and no pool.
    pub fn with_rng(slot_count: usize, rotation: RotationConfig, rng: R) -> Self {
        Self {
            slots: vec![Slot::default(); slot_count],
            pool: Vec::new(),
            rotation,
            rng,
        }
    }

    /// Adopts `pool` and, if it is non-empty, gives every slot a random image
    /// on both layers with layer A active.
    ///
    /// An empty pool leaves the slots exactly as they were. Returns whether the
    /// slots were (re)drawn.
    pub fn initialize(&mut self, pool: Vec<ImageId>) -> bool {
        self.pool = pool;
        if self.pool.is_empty() {
            debug!("Empty pool, slots left untouched.");
            return false;
        }
        for slot in self.slots.iter_mut() {
            if let Some(image) = random_image(&self.pool, &mut self.rng) {
                *slot = Slot::showing(image.to_owned());
            }
        }
        info!(
            slots = self.slots.len(),
            pool = self.pool.len(),
            "Slots initialized."
        );
        true
    }

    /// Replaces the pool and the timing wholesale.
    ///
    /// Slots are redrawn when the pool goes from empty to non-empty, when it is
    /// replaced by a different pool, or when the slots were never filled.
    pub fn reconfigure(&mut self, pool: Vec<ImageId>, rotation: RotationConfig) -> Reconfigured {
        let interval_changed = self.rotation.interval() != rotation.interval();
        self.rotation = rotation;

        let needs_redraw = !pool.is_empty()
            && (self.pool.is_empty() || self.pool != pool || !self.is_initialized());
        let reinitialized = if needs_redraw {
            self.initialize(pool)
        } else {
            self.pool = pool;
            false
        };

        Reconfigured {
            reinitialized,
            interval_changed,
        }
    }

    /// Convenience over [`reconfigure`](Self::reconfigure) for a normalized
    /// configuration.
    pub fn apply(&mut self, config: DisplayConfig) -> Reconfigured {
        self.reconfigure(config.pool, config.rotation)
    }

    /// Rotates one randomly chosen slot.
    ///
    /// The next image is written into the slot's inactive layer, which then
    /// becomes active. Every other slot is left alone. Does nothing and returns
    /// `None` when the pool is empty.
    pub fn tick(&mut self) -> Option<Rotation> {
        if self.pool.is_empty() || self.slots.is_empty() {
            trace!("Tick skipped, nothing to rotate.");
            return None;
        }

        let target = self.rng.gen_range(0..self.slots.len());
        let next = {
            let visible = visible_set(&self.slots);
            let current = self.slots[target].visible_image();
            select_next(&self.pool, &visible, current, &mut self.rng)?.to_owned()
        };

        let layer = self.slots[target].present(next.clone());
        debug!(slot = target, ?layer, image = %next, "Slot rotated.");
        Some(Rotation {
            slot: target,
            layer,
            image: next,
        })
    }
}

// Read-only accessors.
impl<R> RotationEngine<R> {
    /// Returns an owned copy of every slot plus the configured fade length.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self.slots.clone(),
            fade_ms: self.rotation.fade_ms(),
        }
    }

    pub fn pool(&self) -> &[ImageId] {
        &self.pool
    }

    pub fn rotation(&self) -> RotationConfig {
        self.rotation
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The currently applied configuration, as normalization would produce it.
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            pool: self.pool.clone(),
            rotation: self.rotation,
        }
    }

    /// `true` once every slot shows an image.
    pub fn is_initialized(&self) -> bool {
        self.slots.iter().all(|slot| slot.visible_image().is_some())
    }
}

/// Images visible across all slots, empty slots excluded.
fn visible_set(slots: &[Slot]) -> HashSet<&str> {
    slots.iter().filter_map(Slot::visible_image).collect()
}

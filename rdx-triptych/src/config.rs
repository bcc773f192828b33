//! Defines the rotation configuration and its normalization from raw input.
//!
//! Configuration documents arrive already decoded as `serde_json::Value`s and
//! may take one of two shapes:
//!
//! - **Legacy**: a bare array of image identifiers, e.g. `["a.png", "b.png"]`.
//! - **Current**: an object such as
//!   `{ "images": [...], "INTERVAL_MS": 5000, "FADE_MS": 3000 }`, where the
//!   camel-case keys `intervalMs` / `fadeMs` are accepted as well.
//!
//! [`normalize`] turns any value, well-formed or not, into a [`DisplayConfig`].
//! It never fails; the worst case is an empty pool with the default timing.

use crate::common::ImageId;
use crate::components::scheduler::{MAX_PERIOD, MIN_PERIOD};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_INTERVAL_MS: f64 = 5000.0;
pub const DEFAULT_FADE_MS: f64 = 3000.0;

const INTERVAL_KEYS: [&str; 2] = ["INTERVAL_MS", "intervalMs"];
const FADE_KEYS: [&str; 2] = ["FADE_MS", "fadeMs"];

/// Timing for the rotation: how often a slot rotates and how long the
/// crossfade between its two layers lasts.
///
/// Both values are finite and strictly positive. The only way to build one is
/// through [`RotationConfig::new`], which enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationConfig {
    interval_ms: f64,
    fade_ms: f64,
}

impl RotationConfig {
    /// Returns `None` unless both values are finite and strictly positive.
    pub fn new(interval_ms: f64, fade_ms: f64) -> Option<Self> {
        if is_valid_ms(interval_ms) && is_valid_ms(fade_ms) {
            Some(Self {
                interval_ms,
                fade_ms,
            })
        } else {
            None
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn fade_ms(&self) -> f64 {
        self.fade_ms
    }

    /// The rotation period as a timer-safe `Duration`.
    pub fn interval(&self) -> Duration {
        millis_to_duration(self.interval_ms)
    }

    /// The crossfade length as a `Duration`.
    pub fn fade(&self) -> Duration {
        millis_to_duration(self.fade_ms)
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            fade_ms: DEFAULT_FADE_MS,
        }
    }
}

/// A fully normalized configuration: the image pool plus its timing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DisplayConfig {
    pub pool: Vec<ImageId>,
    pub rotation: RotationConfig,
}

impl DisplayConfig {
    /// An empty pool with the given timing. This is what every unusable
    /// input collapses to.
    pub fn empty(rotation: RotationConfig) -> Self {
        Self {
            pool: Vec::new(),
            rotation,
        }
    }
}

/// Normalizes a decoded configuration value.
///
/// `raw` is `None` when the loader had nothing to offer (missing source,
/// transport or parse failure); that is treated exactly like a malformed
/// document. Pool entries that are not non-empty strings are skipped.
pub fn normalize(raw: Option<&Value>, defaults: RotationConfig) -> DisplayConfig {
    match raw {
        Some(Value::Array(items)) => DisplayConfig {
            pool: collect_pool(items),
            rotation: defaults,
        },
        Some(Value::Object(map)) => normalize_object(map, defaults),
        _ => DisplayConfig::empty(defaults),
    }
}

fn normalize_object(map: &Map<String, Value>, defaults: RotationConfig) -> DisplayConfig {
    let pool = match map.get("images") {
        Some(Value::Array(items)) => collect_pool(items),
        _ => Vec::new(),
    };
    let interval_ms = coerce_ms(lookup(map, &INTERVAL_KEYS)).unwrap_or(defaults.interval_ms);
    let fade_ms = coerce_ms(lookup(map, &FADE_KEYS)).unwrap_or(defaults.fade_ms);

    DisplayConfig {
        pool,
        rotation: RotationConfig {
            interval_ms,
            fade_ms,
        },
    }
}

/// First key that is present with a non-null value wins, even if that value
/// later turns out to be invalid.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}

fn coerce_ms(value: Option<&Value>) -> Option<f64> {
    let ms = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    is_valid_ms(ms).then_some(ms)
}

fn collect_pool(items: &[Value]) -> Vec<ImageId> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_valid_ms(ms: f64) -> bool {
    ms.is_finite() && ms > 0.0
}

fn millis_to_duration(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms / 1000.0)
        .unwrap_or(MAX_PERIOD)
        .clamp(MIN_PERIOD, MAX_PERIOD)
}

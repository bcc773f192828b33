//! Contains the building blocks the engine is assembled from.
//!
//! [`slot`] holds the double-buffered per-position state the engine mutates
//! on every tick. [`scheduler`] is the periodic timer that drives those ticks
//! and can be stopped or restarted at any time.

pub mod scheduler;
pub mod slot;

//! Contains common, primitive types shared by every part of the engine.
//!
//! Image identifiers are opaque strings (file names, URIs); the engine never
//! looks inside them. Slots are addressed by plain indices since their count
//! is fixed for the lifetime of an engine.

use serde::Serialize;

/// The default number of display slots.
pub const SLOT_COUNT: usize = 3;

/// An opaque image identifier, as it appears in the image pool.
pub type ImageId = String;

/// One of the two image holders in a slot.
///
/// Only one layer is visible at a time. The other one is the back buffer that
/// the next image is written into before the slot flips over to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Layer {
    #[default]
    A,
    B,
}

impl Layer {
    /// Returns the opposite layer.
    pub fn other(self) -> Self {
        match self {
            Layer::A => Layer::B,
            Layer::B => Layer::A,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_other_flips() {
        assert_eq!(Layer::A.other(), Layer::B);
        assert_eq!(Layer::B.other(), Layer::A);
        assert_eq!(Layer::default(), Layer::A);
    }
}

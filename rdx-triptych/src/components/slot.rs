//! Defines the double-buffered display slot.

use crate::common::{ImageId, Layer};
use serde::Serialize;

/// One display position with two image layers.
///
/// The active layer is the one meant to be visible. A rotation always writes
/// into the inactive layer and then flips `active`, so the image that is still
/// on screen (and possibly still fading) is never overwritten. A renderer
/// shows both layers on top of each other and crossfades whenever `active`
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slot {
    layer_a: Option<ImageId>,
    layer_b: Option<ImageId>,
    active: Layer,
}

impl Slot {
    /// A slot showing `image` on both layers, with layer A active.
    pub(crate) fn showing(image: ImageId) -> Self {
        Self {
            layer_a: Some(image.clone()),
            layer_b: Some(image),
            active: Layer::A,
        }
    }

    pub fn layer(&self, layer: Layer) -> Option<&str> {
        match layer {
            Layer::A => self.layer_a.as_deref(),
            Layer::B => self.layer_b.as_deref(),
        }
    }

    pub fn active(&self) -> Layer {
        self.active
    }

    /// The image on the active layer, if one has been assigned.
    pub fn visible_image(&self) -> Option<&str> {
        self.layer(self.active)
    }

    /// Writes `image` into the inactive layer and makes it the active one.
    /// Returns the layer that was written.
    pub(crate) fn present(&mut self, image: ImageId) -> Layer {
        let target = self.active.other();
        match target {
            Layer::A => self.layer_a = Some(image),
            Layer::B => self.layer_b = Some(image),
        }
        self.active = target;
        target
    }
}

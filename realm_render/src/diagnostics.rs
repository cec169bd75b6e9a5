//! Non-fatal rendering problems, reported once each.
//!
//! The renderer never fails a frame for missing data. Instead each distinct
//! problem is logged the first time it is seen and queued for the host.

use crate::assets::SpriteKey;
use crate::compositor::Layer;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The atlas has no strip for this key; the item was not drawn.
    MissingSprite(SpriteKey),
    /// The backend could not draw a layer this frame.
    LayerSkipped { layer: Layer, reason: String },
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    missing_sprites: HashSet<SpriteKey>,
    skipped_layers: HashSet<(Layer, String)>,
    pending: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a missing sprite. Returns `true` the first time the key is seen.
    pub fn missing_sprite(&mut self, key: SpriteKey) -> bool {
        if !self.missing_sprites.insert(key) {
            return false;
        }
        log::warn!("No sprite in atlas for {:?}, skipping", key);
        self.pending.push(Diagnostic::MissingSprite(key));
        true
    }

    /// Records a skipped layer. Returns `true` the first time this layer fails
    /// for this reason.
    pub fn layer_skipped(&mut self, layer: Layer, reason: &str) -> bool {
        if !self.skipped_layers.insert((layer, reason.to_string())) {
            return false;
        }
        log::warn!("Skipping {:?} layer: {}", layer, reason);
        self.pending.push(Diagnostic::LayerSkipped {
            layer,
            reason: reason.to_string(),
        });
        true
    }

    /// Takes everything reported since the last drain.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Diagnostic] {
        &self.pending
    }
}

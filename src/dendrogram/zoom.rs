//! Mapping between map zoom levels and dissimilarity thresholds.
//!
//! The threshold halves with every zoom level: `threshold = base / 2^zoom`.
//! Zooming in lowers the threshold, so more nodes split apart.

use super::DendrogramNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoomScale {
    /// Threshold at zoom 0.
    #[serde(default = "ZoomScale::default_base")]
    pub base: f64,
    /// Highest zoom level considered by [`ZoomScale::min_zoom_active`].
    #[serde(default = "ZoomScale::default_max_zoom")]
    pub max_zoom: u8,
}

impl ZoomScale {
    const fn default_base() -> f64 {
        2500.0
    }

    const fn default_max_zoom() -> u8 {
        25
    }

    pub fn new(base: f64, max_zoom: u8) -> Self {
        Self { base, max_zoom }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.base.is_finite() || self.base <= 0.0 {
            return Err(format!("Zoom base must be positive and finite, got: {}", self.base));
        }
        if self.max_zoom > 60 {
            return Err(format!("Maximum zoom must be at most 60, got: {}", self.max_zoom));
        }
        Ok(())
    }

    pub fn threshold(&self, zoom: f64) -> f64 {
        self.base / 2f64.powf(zoom)
    }

    /// Inverse of [`threshold`](Self::threshold). Threshold 0 maps to `+inf`
    /// and an infinite threshold to `-inf`.
    pub fn zoom(&self, threshold: f64) -> f64 {
        (self.base / threshold).log2()
    }

    /// Zoom range `[min_zoom, max_zoom)` in which `node` is active. Higher
    /// thresholds mean lower zoom, so the bounds swap. The root starts at
    /// zoom 0 and observations stay active up to infinite zoom.
    pub fn zoom_range(&self, node: &DendrogramNode) -> (f64, f64) {
        let min_zoom = if node.max_threshold() == f64::INFINITY {
            0.0
        } else {
            self.zoom(node.max_threshold())
        };
        (min_zoom, self.zoom(node.min_threshold().max(0.0)))
    }

    /// Lowest integer zoom in `0..=max_zoom` at which `node` is active.
    pub fn min_zoom_active(&self, node: &DendrogramNode) -> Option<u8> {
        (0..=self.max_zoom).find(|&z| node.is_active_at(self.threshold(z as f64)))
    }
}

impl Default for ZoomScale {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            max_zoom: Self::default_max_zoom(),
        }
    }
}

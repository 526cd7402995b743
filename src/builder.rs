//! Fluent construction of a [`ClusterEngine`].

use crate::config::Config;
use crate::dendrogram::ZoomScale;
use crate::engine::ClusterEngine;
use crate::error::Result;
use crate::spatial::DistanceMetric;
use std::path::Path;

/// Builder for engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: Config,
}

impl EngineBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Start from a JSON (or, with the `toml` feature, TOML) file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        self.config = Config::from_file(path)?;
        Ok(self)
    }

    pub fn bucket_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_bucket_capacity(capacity);
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config = self.config.with_metric(metric);
        self
    }

    pub fn zoom_scale(mut self, zoom: ZoomScale) -> Self {
        self.config = self.config.with_zoom_scale(zoom);
        self
    }

    pub fn initial_zoom(mut self, zoom: f64) -> Self {
        self.config = self.config.with_initial_zoom(zoom);
        self
    }

    pub fn geographic_validation(mut self, enabled: bool) -> Self {
        self.config = self.config.with_geographic_validation(enabled);
        self
    }

    /// Build the engine; fails if the configuration does not validate.
    pub fn build<T>(self) -> Result<ClusterEngine<T>> {
        ClusterEngine::new(self.config)
    }

    /// Build a thread-safe engine.
    #[cfg(feature = "sync")]
    pub fn build_sync<T>(self) -> Result<crate::sync::SyncClusterEngine<T>> {
        crate::sync::SyncClusterEngine::new(self.config)
    }
}

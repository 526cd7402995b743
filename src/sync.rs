//! Thread-safe wrapper for sharing an engine between threads.
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! spatio-cluster = { version = "0.1", features = ["sync"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use spatio_cluster::{Config, DistanceMetric, EventLog, Point, SyncClusterEngine};
//! use std::thread;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SyncClusterEngine::new(Config::default().with_metric(DistanceMetric::Euclidean))?;
//!
//! let writer = engine.clone();
//! let handle = thread::spawn(move || {
//!     let mut log = EventLog::new();
//!     writer.add(Point::new(1.0, 1.0), "far", &mut log).unwrap();
//! });
//!
//! engine.add(Point::new(0.0, 0.0), "near", &mut EventLog::new())?;
//! handle.join().unwrap();
//!
//! assert_eq!(engine.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::dendrogram::{EvaluationSummary, NodeId, Renderer};
use crate::engine::{ClusterEngine, EngineStats};
use crate::error::Result;
use geo::{Point, Rect};
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;

/// Thread-safe handle to a [`ClusterEngine`] using `Arc<RwLock<_>>`.
///
/// Queries take the read lock and may run concurrently. Mutations and zoom
/// changes take the write lock for the whole rebuild or evaluation, including
/// every renderer callback, so a renderer must not call back into the same
/// handle.
pub struct SyncClusterEngine<T> {
    inner: Arc<RwLock<ClusterEngine<T>>>,
}

impl<T> Clone for SyncClusterEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SyncClusterEngine<T> {
    /// Creates an empty engine with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::from_engine(ClusterEngine::new(config)?))
    }

    pub fn from_engine(engine: ClusterEngine<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn zoom(&self) -> f64 {
        self.inner.read().zoom()
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.read().stats()
    }

    pub fn add<R>(&self, point: Point, item: T, renderer: &mut R) -> Result<usize>
    where
        R: Renderer + ?Sized,
    {
        self.inner.write().add(point, item, renderer)
    }

    pub fn extend<I, R>(&self, items: I, renderer: &mut R) -> Result<Range<usize>>
    where
        I: IntoIterator<Item = (Point, T)>,
        R: Renderer + ?Sized,
    {
        self.inner.write().extend(items, renderer)
    }

    pub fn remove<R>(&self, index: usize, renderer: &mut R) -> Result<(Point, T)>
    where
        R: Renderer + ?Sized,
    {
        self.inner.write().remove(index, renderer)
    }

    pub fn clear<R>(&self, renderer: &mut R)
    where
        R: Renderer + ?Sized,
    {
        self.inner.write().clear(renderer)
    }

    pub fn set_zoom<R>(&self, zoom: f64, renderer: &mut R) -> Result<EvaluationSummary>
    where
        R: Renderer + ?Sized,
    {
        self.inner.write().set_zoom(zoom, renderer)
    }

    pub fn set_threshold<R>(&self, threshold: f64, renderer: &mut R) -> Result<EvaluationSummary>
    where
        R: Renderer + ?Sized,
    {
        self.inner.write().set_threshold(threshold, renderer)
    }

    pub fn active_in_viewport(&self, viewport: &Rect) -> Result<Vec<NodeId>> {
        self.inner.read().active_in_viewport(viewport)
    }

    pub fn nearest_active(&self, point: &Point, k: usize) -> Result<Vec<NodeId>> {
        self.inner.read().nearest_active(point, k)
    }

    pub fn nearest_observations(&self, point: &Point, k: usize) -> Result<Vec<usize>> {
        self.inner.read().nearest_observations(point, k)
    }

    pub fn cluster_of(&self, index: usize) -> Result<NodeId> {
        self.inner.read().cluster_of(index)
    }

    pub fn min_zoom_unclustered(&self, index: usize) -> Result<Option<u8>> {
        self.inner.read().min_zoom_unclustered(index)
    }

    /// Copy of observation `index`.
    pub fn observation(&self, index: usize) -> Option<(Point, T)>
    where
        T: Clone,
    {
        self.inner
            .read()
            .observation(index)
            .map(|(point, item)| (*point, item.clone()))
    }

    /// Runs `f` with shared access to the engine.
    pub fn read<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&ClusterEngine<T>) -> U,
    {
        f(&self.inner.read())
    }
}

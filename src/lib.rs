//! Zoom-dependent point clustering backed by a bucketed k-d tree.
//!
//! Observations are clustered once into a dendrogram. A zoom level maps to a
//! dissimilarity threshold, and the set of dendrogram nodes drawn at that
//! threshold is maintained incrementally as the zoom changes, with every
//! change reported to a [`Renderer`].
//!
//! ```rust
//! use spatio_cluster::{DistanceMetric, EngineBuilder, EventLog, Point};
//!
//! let mut engine = EngineBuilder::new()
//!     .metric(DistanceMetric::Euclidean)
//!     .build()?;
//!
//! let mut log = EventLog::new();
//! engine.extend(
//!     vec![
//!         (Point::new(0.0, 0.0), "cafe"),
//!         (Point::new(0.0, 1.0), "bakery"),
//!         (Point::new(800.0, 0.0), "harbour"),
//!     ],
//!     &mut log,
//! )?;
//! assert_eq!(engine.active_set().len(), 1);
//!
//! engine.set_zoom(5.0, &mut log)?;
//! assert_eq!(engine.active_set().len(), 2);
//! # Ok::<(), spatio_cluster::ClusterError>(())
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod dendrogram;
pub mod engine;
pub mod error;
pub mod spatial;

#[cfg(feature = "sync")]
pub mod sync;

pub use builder::EngineBuilder;
pub use config::Config;
pub use engine::{ClusterEngine, EngineStats};
pub use error::{ClusterError, Result};

pub use geo::{Point, Rect};

pub use compute::spatial::{BoundedHeap, IndexStats, SpatialIndex};
pub use spatial::{DistanceMetric, Dissimilarity};

pub use dendrogram::{
    ActivationState, ActiveSet, ClusterEvent, Dendrogram, DendrogramBuilder, DendrogramNode,
    EvaluationSummary, EventLog, NodeId, NodeKind, Renderer, ZoomEvaluator, ZoomScale,
};

#[cfg(feature = "sync")]
pub use sync::SyncClusterEngine;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ClusterEngine, ClusterError, Config, EngineBuilder, Result};

    pub use geo::{Point, Rect};

    pub use crate::{DistanceMetric, Dissimilarity};

    pub use crate::{ClusterEvent, EventLog, NodeId, Renderer, ZoomScale};

    pub use crate::{ActiveSet, Dendrogram, DendrogramBuilder, ZoomEvaluator};

    pub use crate::SpatialIndex;

    #[cfg(feature = "sync")]
    pub use crate::SyncClusterEngine;
}

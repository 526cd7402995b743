//! Observation store with a zoom-driven cluster view.
//!
//! [`ClusterEngine`] owns the observations and everything derived from them:
//! the dendrogram, a spatial index over every dendrogram node, and the active
//! set for the current zoom. Any change to the observations rebuilds the
//! dendrogram from scratch and re-renders at the current zoom.

use crate::compute::spatial::{IndexStats, SpatialIndex};
use crate::compute::validation::{validate_geographic_point, validate_point, validate_points, validate_rect};
use crate::config::Config;
use crate::dendrogram::{
    ActiveSet, Dendrogram, DendrogramBuilder, EvaluationSummary, NodeId, Renderer, ZoomEvaluator,
};
use crate::error::{ClusterError, Result};
use geo::{Point, Rect};
use std::ops::Range;

/// Snapshot of engine counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub observations: usize,
    pub merges: usize,
    pub active: usize,
    pub rebuilds: u64,
    pub zoom: f64,
    pub threshold: f64,
    pub index: IndexStats,
}

pub struct ClusterEngine<T> {
    config: Config,
    observations: Vec<(Point, T)>,
    dendrogram: Dendrogram,
    node_index: SpatialIndex<NodeId>,
    active: ActiveSet,
    zoom: f64,
    threshold: f64,
    rebuilds: u64,
}

impl<T> ClusterEngine<T> {
    pub fn new(config: Config) -> Result<Self> {
        config.validate().map_err(ClusterError::InvalidConfig)?;

        let zoom = config.initial_zoom;
        let threshold = config.zoom.threshold(zoom);
        let node_index = SpatialIndex::with_bucket_capacity(config.bucket_capacity);
        Ok(Self {
            config,
            observations: Vec::new(),
            dendrogram: Dendrogram::default(),
            node_index,
            active: ActiveSet::new(),
            zoom,
            threshold,
            rebuilds: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observation(&self, index: usize) -> Option<(&Point, &T)> {
        self.observations.get(index).map(|(p, item)| (p, item))
    }

    pub fn observations(&self) -> impl Iterator<Item = (&Point, &T)> {
        self.observations.iter().map(|(p, item)| (p, item))
    }

    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    pub fn active_set(&self) -> &ActiveSet {
        &self.active
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Adds one observation and rebuilds. Returns its index.
    pub fn add<R>(&mut self, point: Point, item: T, renderer: &mut R) -> Result<usize>
    where
        R: Renderer + ?Sized,
    {
        self.check_point(&point)?;
        self.observations.push((point, item));
        self.rebuild(renderer);
        Ok(self.observations.len() - 1)
    }

    /// Adds a batch of observations with a single rebuild.
    ///
    /// Nothing is added if any point is rejected.
    pub fn extend<I, R>(&mut self, items: I, renderer: &mut R) -> Result<Range<usize>>
    where
        I: IntoIterator<Item = (Point, T)>,
        R: Renderer + ?Sized,
    {
        let items: Vec<(Point, T)> = items.into_iter().collect();
        let points: Vec<Point> = items.iter().map(|(point, _)| *point).collect();
        validate_points(&points, self.config.checks_geographic_ranges())?;

        let start = self.observations.len();
        self.observations.extend(items);
        if self.observations.len() > start {
            self.rebuild(renderer);
        }
        Ok(start..self.observations.len())
    }

    /// Removes observation `index` and rebuilds. Later indices shift down by
    /// one.
    pub fn remove<R>(&mut self, index: usize, renderer: &mut R) -> Result<(Point, T)>
    where
        R: Renderer + ?Sized,
    {
        if index >= self.observations.len() {
            return Err(ClusterError::ObservationNotFound {
                index,
                len: self.observations.len(),
            });
        }
        let removed = self.observations.remove(index);
        self.rebuild(renderer);
        Ok(removed)
    }

    /// Drops every observation. All active nodes are deactivated.
    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: Renderer + ?Sized,
    {
        self.observations.clear();
        self.rebuild(renderer);
    }

    /// Re-clusters the current observations and renders them at the current
    /// zoom.
    pub fn rebuild<R>(&mut self, renderer: &mut R) -> EvaluationSummary
    where
        R: Renderer + ?Sized,
    {
        let cleared = ZoomEvaluator::new(&self.dendrogram).deactivate_all(&mut self.active, renderer);

        let points: Vec<Point> = self.observations.iter().map(|(p, _)| *p).collect();
        self.dendrogram = DendrogramBuilder::new(self.config.metric)
            .with_bucket_capacity(self.config.bucket_capacity)
            .cluster(&points);

        self.node_index.clear();
        for (id, node) in self.dendrogram.iter() {
            self.node_index.insert(node.position(), id);
        }

        self.active = ActiveSet::for_dendrogram(&self.dendrogram);
        self.rebuilds += 1;

        let mut summary = self.apply(renderer);
        summary.deactivated += cleared;
        log::debug!(
            "rebuilt dendrogram over {} observations ({} nodes, {} active)",
            self.observations.len(),
            self.dendrogram.len(),
            self.active.len()
        );
        summary
    }

    /// Moves to `zoom` and renders the difference.
    pub fn set_zoom<R>(&mut self, zoom: f64, renderer: &mut R) -> Result<EvaluationSummary>
    where
        R: Renderer + ?Sized,
    {
        if !zoom.is_finite() {
            return Err(ClusterError::InvalidInput(format!("Zoom must be finite, got: {}", zoom)));
        }
        let threshold = self.config.zoom.threshold(zoom);
        if !threshold.is_finite() {
            return Err(ClusterError::InvalidInput(format!(
                "Zoom {} is out of range for base {}",
                zoom, self.config.zoom.base
            )));
        }
        self.zoom = zoom;
        self.threshold = threshold;
        Ok(self.apply(renderer))
    }

    /// Moves to a dissimilarity threshold directly.
    pub fn set_threshold<R>(&mut self, threshold: f64, renderer: &mut R) -> Result<EvaluationSummary>
    where
        R: Renderer + ?Sized,
    {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ClusterError::InvalidInput(format!(
                "Threshold must be finite and non-negative, got: {}",
                threshold
            )));
        }
        self.threshold = threshold;
        self.zoom = self.config.zoom.zoom(threshold);
        Ok(self.apply(renderer))
    }

    fn apply<R>(&mut self, renderer: &mut R) -> EvaluationSummary
    where
        R: Renderer + ?Sized,
    {
        if self.dendrogram.is_empty() {
            return EvaluationSummary::default();
        }
        ZoomEvaluator::new(&self.dendrogram).evaluate(&mut self.active, self.threshold, renderer)
    }

    /// Active nodes whose position lies inside `viewport`, sorted by id.
    pub fn active_in_viewport(&self, viewport: &Rect) -> Result<Vec<NodeId>> {
        validate_rect(viewport)?;
        let mut hits: Vec<NodeId> = self
            .node_index
            .range_query(viewport)
            .into_iter()
            .filter(|id| self.active.is_active(*id))
            .collect();
        hits.sort_unstable();
        Ok(hits)
    }

    /// Up to `k` active nodes nearest to `point`, nearest first.
    pub fn nearest_active(&self, point: &Point, k: usize) -> Result<Vec<NodeId>> {
        validate_point(point)?;
        Ok(self.nearest_matching(point, k, |id| self.active.is_active(id)))
    }

    /// Up to `k` observation indices nearest to `point`, nearest first.
    pub fn nearest_observations(&self, point: &Point, k: usize) -> Result<Vec<usize>> {
        validate_point(point)?;
        let observations = self.dendrogram.observation_count();
        Ok(self
            .nearest_matching(point, k, |id| id.index() < observations)
            .into_iter()
            .map(NodeId::index)
            .collect())
    }

    // Widens the probe until `k` matches are found or the index is exhausted.
    fn nearest_matching<F>(&self, point: &Point, k: usize, accept: F) -> Vec<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        let total = self.node_index.len();
        if k == 0 || total == 0 {
            return Vec::new();
        }

        let mut probe = k.min(total);
        loop {
            let hits: Vec<NodeId> = self
                .node_index
                .nearest_neighbors(point, probe)
                .into_values()
                .into_iter()
                .filter(|id| accept(*id))
                .take(k)
                .collect();
            if hits.len() == k || probe == total {
                return hits;
            }
            probe = (probe * 2).min(total);
        }
    }

    /// The active node currently representing observation `index`.
    pub fn cluster_of(&self, index: usize) -> Result<NodeId> {
        let leaf = self.observation_node(index)?;
        std::iter::once(leaf)
            .chain(self.dendrogram.ancestors(leaf))
            .find(|id| self.active.is_active(*id))
            .ok_or_else(|| ClusterError::Other(format!("Observation {} has no active cluster", index)))
    }

    /// Items of the observations under `node`.
    pub fn members(&self, node: NodeId) -> Vec<&T> {
        if self.dendrogram.get(node).is_none() {
            return Vec::new();
        }
        self.dendrogram
            .observations(node)
            .into_iter()
            .filter_map(|i| self.observations.get(i).map(|(_, item)| item))
            .collect()
    }

    /// Lowest integer zoom at which observation `index` is drawn on its own,
    /// or `None` if it stays clustered up to the configured maximum zoom.
    pub fn min_zoom_unclustered(&self, index: usize) -> Result<Option<u8>> {
        let leaf = self.observation_node(index)?;
        Ok(self.config.zoom.min_zoom_active(self.dendrogram.node(leaf)))
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            observations: self.observations.len(),
            merges: self.dendrogram.merge_count(),
            active: self.active.len(),
            rebuilds: self.rebuilds,
            zoom: self.zoom,
            threshold: self.threshold,
            index: self.node_index.stats(),
        }
    }

    fn observation_node(&self, index: usize) -> Result<NodeId> {
        self.dendrogram
            .observation_node(index)
            .ok_or(ClusterError::ObservationNotFound {
                index,
                len: self.observations.len(),
            })
    }

    fn check_point(&self, point: &Point) -> Result<()> {
        if self.config.checks_geographic_ranges() {
            validate_geographic_point(point)
        } else {
            validate_point(point)
        }
    }
}

impl<T> Default for ClusterEngine<T> {
    fn default() -> Self {
        Self {
            config: Config::default(),
            observations: Vec::new(),
            dendrogram: Dendrogram::default(),
            node_index: SpatialIndex::with_bucket_capacity(Config::default().bucket_capacity),
            active: ActiveSet::new(),
            zoom: 0.0,
            threshold: Config::default().zoom.threshold(0.0),
            rebuilds: 0,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ClusterEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("observations", &self.observations.len())
            .field("nodes", &self.dendrogram.len())
            .field("active", &self.active.len())
            .field("zoom", &self.zoom)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dendrogram::{ClusterEvent, EventLog};
    use crate::spatial::DistanceMetric;

    fn planar() -> ClusterEngine<&'static str> {
        ClusterEngine::new(Config::default().with_metric(DistanceMetric::Euclidean)).unwrap()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(geo::coord! { x: x0, y: y0 }, geo::coord! { x: x1, y: y1 })
    }

    #[test]
    fn test_new_engine_is_empty() {
        let engine = planar();
        assert!(engine.is_empty());
        assert_eq!(engine.threshold(), 2500.0);
        assert!(engine.active_set().is_empty());
        assert!(engine.active_in_viewport(&rect(-1e6, -1e6, 1e6, 1e6)).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.bucket_capacity = 0;
        assert!(matches!(
            ClusterEngine::<()>::new(config),
            Err(ClusterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_add_renders_at_current_zoom() {
        let mut engine = planar();
        let mut log = EventLog::new();

        engine.add(Point::new(0.0, 0.0), "a", &mut log).unwrap();
        assert_eq!(log.activated(), vec![NodeId(0)]);

        log.drain();
        engine.add(Point::new(1.0, 0.0), "b", &mut log).unwrap();
        // Old node torn down, both observations collapse into the root at zoom 0.
        assert_eq!(log.deactivated(), vec![NodeId(0)]);
        assert_eq!(log.activated(), vec![NodeId(2)]);
        assert_eq!(engine.stats().rebuilds, 2);
    }

    #[test]
    fn test_zoom_splits_and_merges() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend(
                vec![
                    (Point::new(0.0, 0.0), "a"),
                    (Point::new(0.0, 1.0), "b"),
                    (Point::new(500.0, 0.0), "c"),
                ],
                &mut log,
            )
            .unwrap();
        assert_eq!(engine.active_set().len(), 1);

        // 2500 / 2^4 = 156.25: the far point separates, the close pair stays together.
        engine.set_zoom(4.0, &mut log).unwrap();
        assert_eq!(engine.active_set().len(), 2);
        assert_eq!(engine.cluster_of(0).unwrap(), engine.cluster_of(1).unwrap());
        assert_eq!(engine.cluster_of(2).unwrap(), NodeId(2));

        // 2500 / 2^12 ~ 0.61: everything apart.
        engine.set_zoom(12.0, &mut log).unwrap();
        assert_eq!(engine.active_set().len(), 3);

        log.drain();
        engine.set_zoom(0.0, &mut log).unwrap();
        assert_eq!(engine.active_set().len(), 1);
        assert!(log.events().iter().any(|e| matches!(e, ClusterEvent::MergeUp { .. })));
    }

    #[test]
    fn test_viewport_filters_active_nodes() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend((0..10).map(|i| (Point::new(i as f64 * 10.0, 0.0), "p")), &mut log)
            .unwrap();
        engine.set_threshold(0.0, &mut log).unwrap();

        let hits = engine.active_in_viewport(&rect(15.0, -1.0, 45.0, 1.0)).unwrap();
        assert_eq!(hits, vec![NodeId(2), NodeId(3), NodeId(4)]);
    }

    #[test]
    fn test_nearest_queries() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend((0..20).map(|i| (Point::new(i as f64, 0.0), "p")), &mut log)
            .unwrap();

        assert_eq!(engine.nearest_observations(&Point::new(7.2, 0.0), 3).unwrap(), vec![7, 8, 6]);

        engine.set_threshold(1e9, &mut log).unwrap();
        let root = engine.dendrogram().root().unwrap();
        assert_eq!(engine.nearest_active(&Point::new(-50.0, 3.0), 5).unwrap(), vec![root]);
        assert!(engine.nearest_observations(&Point::new(0.0, 0.0), 0).unwrap().is_empty());
    }

    #[test]
    fn test_remove_shifts_indices() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend(vec![(Point::new(0.0, 0.0), "a"), (Point::new(5.0, 0.0), "b"), (Point::new(9.0, 0.0), "c")], &mut log)
            .unwrap();

        let (point, item) = engine.remove(1, &mut log).unwrap();
        assert_eq!(point, Point::new(5.0, 0.0));
        assert_eq!(item, "b");
        assert_eq!(engine.observation(1).map(|(_, item)| *item), Some("c"));
        assert!(matches!(
            engine.remove(5, &mut log),
            Err(ClusterError::ObservationNotFound { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_clear_deactivates_everything() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend(vec![(Point::new(0.0, 0.0), "a"), (Point::new(9.0, 0.0), "b")], &mut log)
            .unwrap();
        engine.set_threshold(0.0, &mut log).unwrap();
        log.drain();

        engine.clear(&mut log);
        assert_eq!(log.deactivated().len(), 2);
        assert!(log.activated().is_empty());
        assert!(engine.is_empty());
        assert_eq!(engine.dendrogram().root(), None);
    }

    #[test]
    fn test_geographic_validation() {
        let mut engine: ClusterEngine<u32> = ClusterEngine::new(Config::default()).unwrap();
        let mut log = EventLog::new();
        assert!(engine.add(Point::new(-74.0, 40.7), 1, &mut log).is_ok());
        assert!(engine.add(Point::new(-74.0, 95.0), 2, &mut log).is_err());
        assert!(engine.add(Point::new(f64::NAN, 0.0), 3, &mut log).is_err());
        assert_eq!(engine.len(), 1);

        let batch = vec![(Point::new(1.0, 1.0), 4), (Point::new(200.0, 1.0), 5)];
        let err = engine.extend(batch, &mut log).unwrap_err();
        assert!(err.to_string().contains("index 1"));
        assert_eq!(engine.len(), 1);

        let mut lax = ClusterEngine::new(Config::default().with_geographic_validation(false)).unwrap();
        assert!(lax.add(Point::new(500.0, 500.0), 6, &mut log).is_ok());
        let batch = vec![(Point::new(300.0, 0.0), 7), (Point::new(f64::INFINITY, 0.0), 8)];
        let err = lax.extend(batch, &mut log).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidInput(_)));
        assert!(err.to_string().contains("index 1"));
        assert_eq!(lax.len(), 1);
    }

    #[test]
    fn test_invalid_zoom_and_threshold() {
        let mut engine = planar();
        let mut log = EventLog::new();
        assert!(engine.set_zoom(f64::NAN, &mut log).is_err());
        assert!(engine.set_threshold(-1.0, &mut log).is_err());
        assert!(engine.set_threshold(f64::INFINITY, &mut log).is_err());
        assert!(engine.active_in_viewport(&rect(0.0, 0.0, f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn test_min_zoom_unclustered() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend(vec![(Point::new(0.0, 0.0), "a"), (Point::new(10.0, 0.0), "b")], &mut log)
            .unwrap();

        // Split once the threshold drops below 10: 2500 / 2^8 ~ 9.77.
        assert_eq!(engine.min_zoom_unclustered(0).unwrap(), Some(8));
        assert!(engine.min_zoom_unclustered(2).is_err());
    }

    #[test]
    fn test_members() {
        let mut engine = planar();
        let mut log = EventLog::new();
        engine
            .extend(vec![(Point::new(0.0, 0.0), "a"), (Point::new(1.0, 0.0), "b")], &mut log)
            .unwrap();
        let root = engine.dendrogram().root().unwrap();
        let mut members = engine.members(root);
        members.sort();
        assert_eq!(members, vec![&"a", &"b"]);
        assert!(engine.members(NodeId(99)).is_empty());
    }
}

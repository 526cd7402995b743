//! Incremental maintenance of the set of nodes visible at a threshold.
//!
//! The active set is owned by the caller and only borrowed for the duration
//! of an evaluation. Re-evaluating touches only the nodes that were active
//! before: each one either stays, splits down into its active descendants,
//! or is absorbed by the nearest ancestor whose interval holds the new
//! threshold.

use super::events::{ClusterEvent, NodeList, Renderer};
use super::{Dendrogram, NodeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    #[default]
    Inactive,
    Active,
    /// Chosen as a merge target during the current evaluation.
    PendingMerge,
}

/// Per-node activation state for one [`Dendrogram`].
#[derive(Debug, Clone, Default)]
pub struct ActiveSet {
    states: Vec<ActivationState>,
    active: Vec<NodeId>,
    threshold: Option<f64>,
}

impl ActiveSet {
    /// An unbound set; it is sized on its first evaluation.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_dendrogram(dendrogram: &Dendrogram) -> Self {
        Self {
            states: vec![ActivationState::Inactive; dendrogram.len()],
            active: Vec::new(),
            threshold: None,
        }
    }

    pub fn state(&self, id: NodeId) -> ActivationState {
        self.states.get(id.index()).copied().unwrap_or_default()
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.state(id) == ActivationState::Active
    }

    /// Active nodes, in no particular order.
    pub fn active(&self) -> &[NodeId] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Threshold of the last evaluation.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn bind(&mut self, dendrogram: &Dendrogram) {
        if self.states.is_empty() && self.active.is_empty() {
            self.states = vec![ActivationState::Inactive; dendrogram.len()];
        }
        assert_eq!(
            self.states.len(),
            dendrogram.len(),
            "active set was built for a different dendrogram"
        );
    }

    fn set(&mut self, id: NodeId, state: ActivationState) {
        self.states[id.index()] = state;
    }
}

/// Counts of what one evaluation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationSummary {
    pub activated: usize,
    pub deactivated: usize,
    pub splits: usize,
    pub merges: usize,
}

impl EvaluationSummary {
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// Drives an [`ActiveSet`] to a threshold and reports the changes.
///
/// # Examples
///
/// ```
/// use spatio_cluster::{ActiveSet, DendrogramBuilder, DistanceMetric, EventLog, Point, ZoomEvaluator};
///
/// let points = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(10.0, 0.0)];
/// let dendrogram = DendrogramBuilder::new(DistanceMetric::Euclidean).cluster(&points);
/// let evaluator = ZoomEvaluator::new(&dendrogram);
///
/// let mut active = ActiveSet::for_dendrogram(&dendrogram);
/// let mut log = EventLog::new();
/// evaluator.evaluate(&mut active, 0.0, &mut log);
/// assert_eq!(active.len(), 3);
///
/// evaluator.evaluate(&mut active, 5.0, &mut log);
/// assert_eq!(active.len(), 2);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ZoomEvaluator<'d> {
    dendrogram: &'d Dendrogram,
}

impl<'d> ZoomEvaluator<'d> {
    pub fn new(dendrogram: &'d Dendrogram) -> Self {
        Self { dendrogram }
    }

    /// Moves `active` to `threshold`, emitting the corresponding events.
    ///
    /// # Panics
    ///
    /// Panics if the dendrogram is empty, if `threshold` is negative or NaN,
    /// or if `active` belongs to a dendrogram of a different size.
    pub fn evaluate<R>(&self, active: &mut ActiveSet, threshold: f64, renderer: &mut R) -> EvaluationSummary
    where
        R: Renderer + ?Sized,
    {
        let Some(root) = self.dendrogram.root() else {
            panic!("cannot evaluate an empty dendrogram");
        };
        assert!(threshold >= 0.0, "threshold must be non-negative, got {threshold}");
        active.bind(self.dendrogram);

        let mut summary = EvaluationSummary::default();
        if active.active.is_empty() {
            for id in self.dendrogram.active_below(root, threshold) {
                self.activate(active, id, renderer, &mut summary);
            }
        } else {
            self.update(active, threshold, renderer, &mut summary);
        }
        active.threshold = Some(threshold);

        log::trace!("evaluated threshold {}: {:?}", threshold, summary);
        summary
    }

    /// Deactivates every active node, leaving `active` empty.
    pub fn deactivate_all<R>(&self, active: &mut ActiveSet, renderer: &mut R) -> usize
    where
        R: Renderer + ?Sized,
    {
        let previous = std::mem::take(&mut active.active);
        for &id in &previous {
            if let Some(state) = active.states.get_mut(id.index()) {
                *state = ActivationState::Inactive;
            }
            if let Some(node) = self.dendrogram.get(id) {
                renderer.on_event(ClusterEvent::Deactivate {
                    node: id,
                    position: node.position(),
                });
            }
        }
        active.threshold = None;
        previous.len()
    }

    fn update<R>(&self, active: &mut ActiveSet, threshold: f64, renderer: &mut R, summary: &mut EvaluationSummary)
    where
        R: Renderer + ?Sized,
    {
        let previous = std::mem::take(&mut active.active);
        let mut groups: FxHashMap<NodeId, NodeList> = FxHashMap::default();
        let mut targets = Vec::new();

        for id in previous {
            let node = self.dendrogram.node(id);
            if node.is_active_at(threshold) {
                active.active.push(id);
                continue;
            }

            if threshold <= node.min_threshold() {
                let into = self.dendrogram.active_below(id, threshold);
                active.set(id, ActivationState::Inactive);
                renderer.on_event(ClusterEvent::Deactivate {
                    node: id,
                    position: node.position(),
                });
                renderer.on_event(ClusterEvent::Split {
                    node: id,
                    position: node.position(),
                    into: into.iter().copied().collect(),
                });
                summary.deactivated += 1;
                summary.splits += 1;
                for child in into {
                    self.activate(active, child, renderer, summary);
                }
            } else {
                let target = self.absorbing_ancestor(id, threshold);
                active.set(id, ActivationState::Inactive);
                if active.state(target) != ActivationState::PendingMerge {
                    active.set(target, ActivationState::PendingMerge);
                    targets.push(target);
                }
                groups.entry(target).or_default().push(id);
            }
        }

        for target in targets {
            let from = groups.remove(&target).unwrap_or_default();
            for &id in &from {
                renderer.on_event(ClusterEvent::Deactivate {
                    node: id,
                    position: self.dendrogram.node(id).position(),
                });
            }
            summary.deactivated += from.len();
            summary.merges += 1;
            renderer.on_event(ClusterEvent::MergeUp {
                from,
                to: target,
                position: self.dendrogram.node(target).position(),
            });
            self.activate(active, target, renderer, summary);
        }
    }

    /// First ancestor of `id` whose interval reaches up to `threshold`.
    fn absorbing_ancestor(&self, id: NodeId, threshold: f64) -> NodeId {
        let mut current = id;
        for ancestor in self.dendrogram.ancestors(id) {
            current = ancestor;
            if threshold <= self.dendrogram.node(ancestor).max_threshold() {
                break;
            }
        }
        current
    }

    fn activate<R>(&self, active: &mut ActiveSet, id: NodeId, renderer: &mut R, summary: &mut EvaluationSummary)
    where
        R: Renderer + ?Sized,
    {
        let node = self.dendrogram.node(id);
        active.set(id, ActivationState::Active);
        active.active.push(id);
        summary.activated += 1;
        renderer.on_event(ClusterEvent::Activate {
            node: id,
            position: node.position(),
            observations: self.dendrogram.observations(id),
        });
    }
}

use geo::Point;
use serde::{Deserialize, Serialize};

/// Handle to a node inside a [`Dendrogram`](super::Dendrogram).
///
/// Observation nodes come first, so the node of observation `i` has index `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two node variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Leaf wrapping one input point.
    Observation { observation: usize },
    /// Interior node joining two subclusters at `dissimilarity`.
    Merge {
        left: NodeId,
        right: NodeId,
        dissimilarity: f64,
    },
}

/// A node of the merge tree.
///
/// The parent link is a plain id set once when the parent merge is created; it
/// is only used for walking upward, never for ownership.
#[derive(Debug, Clone)]
pub struct DendrogramNode {
    pub(crate) kind: NodeKind,
    pub(crate) position: Point,
    pub(crate) member_count: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) min_threshold: f64,
    pub(crate) max_threshold: f64,
}

impl DendrogramNode {
    pub(crate) fn observation(observation: usize, position: Point) -> Self {
        Self {
            kind: NodeKind::Observation { observation },
            position,
            member_count: 1,
            parent: None,
            min_threshold: f64::NEG_INFINITY,
            max_threshold: f64::INFINITY,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Member-count-weighted centroid of the subtree.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Number of observations below (and including) this node.
    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Merge dissimilarity; zero for observations.
    pub fn dissimilarity(&self) -> f64 {
        match self.kind {
            NodeKind::Observation { .. } => 0.0,
            NodeKind::Merge { dissimilarity, .. } => dissimilarity,
        }
    }

    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Observation { .. } => None,
            NodeKind::Merge { left, right, .. } => Some((left, right)),
        }
    }

    /// Input index of an observation node.
    pub fn observation_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Observation { observation } => Some(observation),
            NodeKind::Merge { .. } => None,
        }
    }

    pub fn is_observation(&self) -> bool {
        matches!(self.kind, NodeKind::Observation { .. })
    }

    /// Exclusive lower bound of the thresholds at which this node is the
    /// active representative of its subtree. At or below it the node splits.
    /// Observations never split, so theirs is `-inf`.
    pub fn min_threshold(&self) -> f64 {
        self.min_threshold
    }

    /// Inclusive upper bound; above it an ancestor absorbs the node.
    pub fn max_threshold(&self) -> f64 {
        self.max_threshold
    }

    /// `min_threshold < threshold <= max_threshold`
    #[inline]
    pub fn is_active_at(&self, threshold: f64) -> bool {
        self.min_threshold < threshold && threshold <= self.max_threshold
    }
}

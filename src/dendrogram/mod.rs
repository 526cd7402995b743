//! Merge trees produced by agglomerative clustering.
//!
//! A [`Dendrogram`] is an arena of [`DendrogramNode`]s addressed by
//! [`NodeId`]. The first `n` nodes are the observations in input order, merge
//! nodes follow in the order they were created, and the last merge is the
//! root.
//!
//! Every node carries a half-open threshold interval
//! `(min_threshold, max_threshold]`. With `e(n) = min(dissimilarity(n),
//! e(parent))`, `e(parent of root) = inf` and `e(observation) = -inf`, a
//! node's interval is `(e(n), e(parent)]`. Along any path from an observation
//! to the root the intervals tile the whole line, so for every threshold
//! exactly one node per path is active. A merge is drawn only once the
//! threshold exceeds its dissimilarity; at threshold 0 every observation is
//! drawn, coincident ones included.
//!
//! In zoom space the bounds swap and the interval becomes `[min_zoom,
//! max_zoom)`; see [`ZoomScale::zoom_range`].

pub mod builder;
pub mod evaluator;
pub mod events;
mod node;
pub mod zoom;

pub use builder::DendrogramBuilder;
pub use evaluator::{ActivationState, ActiveSet, EvaluationSummary, ZoomEvaluator};
pub use events::{ClusterEvent, EventLog, Renderer};
pub use node::{DendrogramNode, NodeId, NodeKind};
pub use zoom::ZoomScale;

use geo::Point;

#[derive(Debug, Clone, Default)]
pub struct Dendrogram {
    nodes: Vec<DendrogramNode>,
    root: Option<NodeId>,
    observations: usize,
}

impl Dendrogram {
    pub(crate) fn with_capacity(observations: usize) -> Self {
        Self {
            nodes: Vec::with_capacity((2 * observations).saturating_sub(1)),
            root: None,
            observations: 0,
        }
    }

    /// Appends an observation node. All observations must be pushed before
    /// the first merge so that observation `i` keeps node id `i`.
    pub(crate) fn push_observation(&mut self, observation: usize, position: Point) -> NodeId {
        debug_assert_eq!(self.nodes.len(), self.observations);
        let id = NodeId(self.nodes.len());
        self.nodes.push(DendrogramNode::observation(observation, position));
        self.observations += 1;
        id
    }

    pub(crate) fn push_merge(&mut self, left: NodeId, right: NodeId, dissimilarity: f64) -> NodeId {
        let id = NodeId(self.nodes.len());
        let (l, r) = (&self.nodes[left.0], &self.nodes[right.0]);

        let member_count = l.member_count + r.member_count;
        // Interpolate from the left position so coincident children stay exact.
        let share = r.member_count as f64 / member_count as f64;
        let position = Point::new(
            l.position.x() + (r.position.x() - l.position.x()) * share,
            l.position.y() + (r.position.y() - l.position.y()) * share,
        );

        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);
        self.nodes.push(DendrogramNode {
            kind: NodeKind::Merge {
                left,
                right,
                dissimilarity,
            },
            position,
            member_count,
            parent: None,
            min_threshold: 0.0,
            max_threshold: f64::INFINITY,
        });
        id
    }

    /// Sets the root and assigns threshold intervals top-down.
    pub(crate) fn finish(&mut self, root: Option<NodeId>) {
        self.root = root;
        let Some(root) = root else {
            return;
        };

        let mut stack = vec![(root, f64::INFINITY)];
        while let Some((id, upper)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            let lower = if node.is_observation() {
                f64::NEG_INFINITY
            } else {
                node.dissimilarity().min(upper)
            };
            node.min_threshold = lower;
            node.max_threshold = upper;
            if let Some((left, right)) = node.children() {
                stack.push((right, lower));
                stack.push((left, lower));
            }
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Node lookup; panics on an id from another dendrogram that is out of
    /// range for this one.
    pub fn node(&self, id: NodeId) -> &DendrogramNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&DendrogramNode> {
        self.nodes.get(id.0)
    }

    /// Total number of nodes, observations and merges.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn observation_count(&self) -> usize {
        self.observations
    }

    pub fn merge_count(&self) -> usize {
        self.nodes.len() - self.observations
    }

    /// Node id of observation `index`.
    pub fn observation_node(&self, index: usize) -> Option<NodeId> {
        (index < self.observations).then_some(NodeId(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DendrogramNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Merge nodes in creation order.
    pub fn merges(&self) -> impl Iterator<Item = (NodeId, &DendrogramNode)> {
        self.iter().skip(self.observations)
    }

    /// Walks parent links from `id` (exclusive) up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |p| self.nodes[p.0].parent)
    }

    /// Observation indices under `id`, left to right.
    pub fn observations(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes[id.0].member_count);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.nodes[current.0].kind {
                NodeKind::Observation { observation } => out.push(observation),
                NodeKind::Merge { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }

    /// Nodes under `from` (inclusive) that are active at `threshold`, found by
    /// descending until the first node whose interval holds the threshold.
    /// Assumes no ancestor of `from` is active.
    pub fn active_below(&self, from: NodeId, threshold: f64) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if node.is_active_at(threshold) {
                out.push(current);
            } else if let Some((left, right)) = node.children() {
                stack.push(right);
                stack.push(left);
            }
        }
        out
    }

    /// All nodes active at `threshold`; empty for an empty dendrogram.
    pub fn active_at(&self, threshold: f64) -> Vec<NodeId> {
        match self.root {
            Some(root) => self.active_below(root, threshold),
            None => Vec::new(),
        }
    }

    /// Longest observation-to-root path, counted in edges.
    pub fn height(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut height = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            if let Some((left, right)) = self.nodes[id.0].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        height
    }
}

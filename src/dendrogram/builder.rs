//! Agglomerative clustering driven by nearest-neighbour queries.
//!
//! Every live cluster keeps exactly one pending candidate: the pair formed
//! with its current nearest live neighbour. Candidates are popped cheapest
//! first. A candidate whose owner was already merged is dropped; one whose
//! partner was merged is re-staged against the owner's new nearest neighbour.
//! Merged clusters enter the index at their centroid and stage their own
//! candidate, so the loop ends after exactly `n - 1` merges.

use super::{Dendrogram, NodeId};
use crate::compute::spatial::{DEFAULT_BUCKET_CAPACITY, SpatialIndex};
use crate::spatial::{DistanceMetric, Dissimilarity};
use geo::Point;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A queued merge of `owner` with `partner`.
#[derive(Debug, Clone, Copy)]
struct PendingMerge {
    dissimilarity: f64,
    seq: u64,
    owner: NodeId,
    partner: NodeId,
}

// Reversed so that `BinaryHeap` pops the smallest dissimilarity first, with
// the earliest-queued candidate winning ties.
impl Ord for PendingMerge {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dissimilarity
            .total_cmp(&self.dissimilarity)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingMerge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingMerge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingMerge {}

/// Builds a [`Dendrogram`] from a set of points.
///
/// # Examples
///
/// ```
/// use spatio_cluster::{DendrogramBuilder, DistanceMetric, Point};
///
/// let points = [Point::new(1.0, 2.0), Point::new(2.0, 1.0), Point::new(2.0, 2.0)];
/// let dendrogram = DendrogramBuilder::new(DistanceMetric::SquaredEuclidean).cluster(&points);
///
/// assert_eq!(dendrogram.merge_count(), 2);
/// let root = dendrogram.root().unwrap();
/// assert_eq!(dendrogram.node(root).member_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct DendrogramBuilder<M = DistanceMetric> {
    metric: M,
    bucket_capacity: usize,
}

impl<M: Dissimilarity> DendrogramBuilder<M> {
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }

    /// Bucket capacity of the working spatial index.
    pub fn with_bucket_capacity(mut self, bucket_capacity: usize) -> Self {
        self.bucket_capacity = bucket_capacity;
        self
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn cluster(&self, points: &[Point]) -> Dendrogram {
        let n = points.len();
        let mut dendrogram = Dendrogram::with_capacity(n);
        if n == 0 {
            return dendrogram;
        }

        let mut index = SpatialIndex::with_bucket_capacity(self.bucket_capacity);
        for (i, point) in points.iter().enumerate() {
            let id = dendrogram.push_observation(i, *point);
            index.insert(*point, id);
        }
        if n == 1 {
            dendrogram.finish(Some(NodeId(0)));
            return dendrogram;
        }

        let mut run = Run {
            metric: &self.metric,
            index,
            pending: BinaryHeap::with_capacity(n),
            merged: vec![false; 2 * n - 1],
            seq: 0,
        };
        for i in 0..n {
            run.stage(&dendrogram, NodeId(i));
        }

        let target = n - 1;
        let mut merges = 0;
        let mut root = NodeId(0);
        let (mut stale, mut restaged) = (0usize, 0usize);

        while merges < target {
            let Some(candidate) = run.pending.pop() else {
                unreachable!("live clusters always keep a pending candidate");
            };
            let (owner, partner) = (candidate.owner, candidate.partner);
            if run.merged[owner.0] {
                stale += 1;
                continue;
            }
            if run.merged[partner.0] {
                restaged += 1;
                run.stage(&dendrogram, owner);
                continue;
            }

            let merge = dendrogram.push_merge(owner, partner, candidate.dissimilarity);
            run.merged[owner.0] = true;
            run.merged[partner.0] = true;
            run.index.delete(&dendrogram.node(owner).position(), &owner);
            run.index.delete(&dendrogram.node(partner).position(), &partner);
            run.index.insert(dendrogram.node(merge).position(), merge);

            log::trace!(
                "merged {} and {} into {} at {}",
                owner,
                partner,
                merge,
                candidate.dissimilarity
            );

            merges += 1;
            root = merge;
            if merges < target {
                run.stage(&dendrogram, merge);
            }
        }

        dendrogram.finish(Some(root));
        log::debug!(
            "clustered {} observations with {} merges ({} stale candidates, {} re-staged)",
            n,
            merges,
            stale,
            restaged
        );
        dendrogram
    }
}

impl Default for DendrogramBuilder<DistanceMetric> {
    fn default() -> Self {
        Self::new(DistanceMetric::default())
    }
}

/// Working state of one clustering run.
struct Run<'m, M> {
    metric: &'m M,
    index: SpatialIndex<NodeId>,
    pending: BinaryHeap<PendingMerge>,
    merged: Vec<bool>,
    seq: u64,
}

impl<M: Dissimilarity> Run<'_, M> {
    /// Queues `owner` with its nearest live neighbour other than itself.
    fn stage(&mut self, dendrogram: &Dendrogram, owner: NodeId) {
        let position = dendrogram.node(owner).position();
        let neighbours = self.index.nearest_neighbors(&position, 2);
        let Some(partner) = neighbours.iter().map(|(_, id)| *id).find(|id| *id != owner) else {
            return;
        };

        let dissimilarity = self
            .metric
            .dissimilarity(&position, &dendrogram.node(partner).position());
        self.pending.push(PendingMerge {
            dissimilarity,
            seq: self.seq,
            owner,
            partner,
        });
        self.seq += 1;
    }
}

//! Bucketed k-d tree with logical deletion.
//!
//! Leaves hold up to `bucket_capacity` entries. When a leaf overflows it is
//! split at the midpoint of its widest axis and becomes a branch; splitting is
//! the only time deleted entries are physically dropped. Bounding boxes only
//! ever grow, so stale boxes after many deletions cost query time but never
//! hide a live entry from a search.
//!
//! ## Routing
//!
//! A branch sends `key[axis] <= split` left and everything else right. The same
//! rule drives insert, delete and the near-side choice of nearest-neighbor
//! search.
//!
//! ## Example
//!
//! ```rust
//! use spatio_cluster::{Point, SpatialIndex};
//!
//! let mut index = SpatialIndex::with_bucket_capacity(2);
//! for (i, x) in [0.0, 1.0, 2.0, 3.0].into_iter().enumerate() {
//!     index.insert(Point::new(x, 0.0), i);
//! }
//!
//! let nearest = index.nearest_neighbors(&Point::new(1.5, 0.0), 2).into_values();
//! assert_eq!(nearest.len(), 2);
//! assert!(nearest.contains(&1) && nearest.contains(&2));
//! ```

use super::{BoundedHeap, Bounds, axis_value, distance_sq};
use geo::{Point, Rect};

/// Bucket size used when none is configured.
pub const DEFAULT_BUCKET_CAPACITY: usize = 48;

#[derive(Debug, Clone)]
struct Entry<T> {
    key: Point,
    payload: T,
    deleted: bool,
}

#[derive(Debug, Clone)]
enum Node<T> {
    Leaf {
        bounds: Option<Bounds>,
        entries: Vec<Entry<T>>,
    },
    Branch {
        bounds: Bounds,
        axis: usize,
        split: f64,
        left: Box<Node<T>>,
        right: Box<Node<T>>,
    },
}

impl<T> Node<T> {
    fn empty_leaf(capacity: usize) -> Self {
        Node::Leaf {
            bounds: None,
            entries: Vec::with_capacity(capacity),
        }
    }

    fn bounds(&self) -> Option<&Bounds> {
        match self {
            Node::Leaf { bounds, .. } => bounds.as_ref(),
            Node::Branch { bounds, .. } => Some(bounds),
        }
    }

    fn push_entry(&mut self, entry: Entry<T>) {
        if let Node::Leaf { bounds, entries } = self {
            match bounds {
                Some(b) => b.extend(&entry.key),
                None => *bounds = Some(Bounds::from_point(&entry.key)),
            }
            entries.push(entry);
        }
    }

    fn insert(&mut self, key: Point, payload: T, capacity: usize) {
        match self {
            Node::Branch {
                bounds,
                axis,
                split,
                left,
                right,
            } => {
                bounds.extend(&key);
                if axis_value(&key, *axis) <= *split {
                    left.insert(key, payload, capacity);
                } else {
                    right.insert(key, payload, capacity);
                }
            }
            Node::Leaf { bounds, entries } => {
                let leaf_bounds = bounds.get_or_insert_with(|| Bounds::from_point(&key));
                leaf_bounds.extend(&key);

                if entries.len() < capacity {
                    entries.push(Entry {
                        key,
                        payload,
                        deleted: false,
                    });
                    return;
                }

                let Some(axis) = leaf_bounds.widest_axis() else {
                    // All keys coincide; the bucket runs over capacity.
                    log::debug!(
                        "bucket at ({}, {}) holds {} coincident entries, exceeding capacity {}",
                        key.x(),
                        key.y(),
                        entries.len() + 1,
                        capacity
                    );
                    entries.push(Entry {
                        key,
                        payload,
                        deleted: false,
                    });
                    return;
                };

                let split_bounds = *leaf_bounds;
                let drained = std::mem::take(entries);
                *self = Self::split_leaf(split_bounds, drained, axis, capacity);
                self.insert(key, payload, capacity);
            }
        }
    }

    fn split_leaf(bounds: Bounds, entries: Vec<Entry<T>>, axis: usize, capacity: usize) -> Self {
        let mid = (bounds.min[axis] + bounds.max[axis]) * 0.5;
        // Adjacent floats can round the midpoint up to max.
        let split = if mid < bounds.max[axis] { mid } else { bounds.min[axis] };
        let mut left = Self::empty_leaf(capacity);
        let mut right = Self::empty_leaf(capacity);

        for entry in entries.into_iter().filter(|e| !e.deleted) {
            if axis_value(&entry.key, axis) <= split {
                left.push_entry(entry);
            } else {
                right.push_entry(entry);
            }
        }

        Node::Branch {
            bounds,
            axis,
            split,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn delete(&mut self, key: &Point, payload: &T) -> bool
    where
        T: PartialEq,
    {
        match self {
            Node::Leaf { entries, .. } => entries
                .iter_mut()
                .find(|e| !e.deleted && e.key == *key && e.payload == *payload)
                .map(|e| e.deleted = true)
                .is_some(),
            Node::Branch {
                axis,
                split,
                left,
                right,
                ..
            } => {
                if axis_value(key, *axis) <= *split {
                    left.delete(key, payload)
                } else {
                    right.delete(key, payload)
                }
            }
        }
    }

    fn range(&self, query: &Bounds, out: &mut Vec<T>)
    where
        T: Clone,
    {
        match self {
            Node::Leaf { entries, .. } => {
                out.extend(
                    entries
                        .iter()
                        .filter(|e| !e.deleted && query.contains(&e.key))
                        .map(|e| e.payload.clone()),
                );
            }
            Node::Branch { left, right, .. } => {
                for child in [left, right] {
                    if child.bounds().is_some_and(|b| b.intersects(query)) {
                        child.range(query, out);
                    }
                }
            }
        }
    }

    fn nearest(&self, point: &Point, heap: &mut BoundedHeap<T>)
    where
        T: Clone,
    {
        match self {
            Node::Leaf { entries, .. } => {
                for entry in entries.iter().filter(|e| !e.deleted) {
                    heap.offer(distance_sq(&entry.key, point), entry.payload.clone());
                }
            }
            Node::Branch {
                axis,
                split,
                left,
                right,
                ..
            } => {
                let (near, far) = if axis_value(point, *axis) <= *split {
                    (left, right)
                } else {
                    (right, left)
                };

                near.nearest(point, heap);

                let Some(far_bounds) = far.bounds() else {
                    return;
                };
                // A heap that is not yet full must keep searching regardless of
                // distance, otherwise fewer than k live points can go missing.
                let visit = match heap.max_key() {
                    Some(max) if heap.is_full() => far_bounds.distance_sq(point) < max,
                    _ => true,
                };
                if visit {
                    far.nearest(point, heap);
                }
            }
        }
    }

    fn collect_stats(&self, depth: usize, stats: &mut IndexStats) {
        stats.depth = stats.depth.max(depth);
        match self {
            Node::Leaf { entries, .. } => {
                stats.leaves += 1;
                stats.physical_entries += entries.len();
                stats.deleted_entries += entries.iter().filter(|e| e.deleted).count();
            }
            Node::Branch { left, right, .. } => {
                stats.branches += 1;
                left.collect_stats(depth + 1, stats);
                right.collect_stats(depth + 1, stats);
            }
        }
    }
}

/// Mutable 2D spatial index storing `(point, payload)` pairs.
///
/// The same point may carry several payloads. Not safe for concurrent
/// mutation; callers serialise access.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    root: Node<T>,
    bucket_capacity: usize,
    live: usize,
}

impl<T> SpatialIndex<T> {
    /// Create an index with the default bucket capacity.
    pub fn new() -> Self {
        Self::with_bucket_capacity(DEFAULT_BUCKET_CAPACITY)
    }

    /// Create an index whose leaves hold up to `bucket_capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_capacity` is zero.
    pub fn with_bucket_capacity(bucket_capacity: usize) -> Self {
        assert!(bucket_capacity > 0, "Bucket capacity must be greater than zero");
        Self {
            root: Node::empty_leaf(bucket_capacity),
            bucket_capacity,
            live: 0,
        }
    }

    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// Number of live (non-deleted) entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Box covering every entry ever inserted, including deleted ones.
    pub fn bounds(&self) -> Option<Rect> {
        self.root.bounds().map(Bounds::to_rect)
    }

    /// Insert a payload at `point`. Duplicate points are allowed.
    pub fn insert(&mut self, point: Point, payload: T) {
        self.root.insert(point, payload, self.bucket_capacity);
        self.live += 1;
    }

    /// Mark the first live entry equal to `(point, payload)` as deleted.
    ///
    /// Returns `false` when no such entry exists. Bounds are not shrunk and
    /// buckets are not merged.
    pub fn delete(&mut self, point: &Point, payload: &T) -> bool
    where
        T: PartialEq,
    {
        let removed = self.root.delete(point, payload);
        if removed {
            self.live -= 1;
        }
        removed
    }

    /// Payloads of all live entries inside `rect`, edges inclusive, in no
    /// particular order.
    pub fn range_query(&self, rect: &Rect) -> Vec<T>
    where
        T: Clone,
    {
        let query = Bounds::from_rect(rect);
        let mut out = Vec::new();
        if self.root.bounds().is_some_and(|b| b.intersects(&query)) {
            self.root.range(&query, &mut out);
        }
        out
    }

    /// The up-to-`k` live entries nearest to `point`, keyed by squared
    /// Euclidean distance.
    pub fn nearest_neighbors(&self, point: &Point, k: usize) -> BoundedHeap<T>
    where
        T: Clone,
    {
        let mut heap = BoundedHeap::new(k);
        if k > 0 && self.live > 0 {
            self.root.nearest(point, &mut heap);
        }
        heap
    }

    /// Every live payload.
    pub fn payloads(&self) -> Vec<T>
    where
        T: Clone,
    {
        match self.root.bounds() {
            Some(bounds) => {
                let mut out = Vec::with_capacity(self.live);
                self.root.range(bounds, &mut out);
                out
            }
            None => Vec::new(),
        }
    }

    /// Drop every entry and start over with an empty root bucket.
    pub fn clear(&mut self) {
        self.root = Node::empty_leaf(self.bucket_capacity);
        self.live = 0;
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            live_entries: self.live,
            ..IndexStats::default()
        };
        self.root.collect_stats(0, &mut stats);
        stats
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of a [`SpatialIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub live_entries: usize,
    /// Occupied slots, including entries deleted since the last split.
    pub physical_entries: usize,
    pub deleted_entries: usize,
    pub leaves: usize,
    pub branches: usize,
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_knn(points: &[(Point, usize)], query: &Point, k: usize) -> Vec<f64> {
        let mut distances: Vec<f64> = points.iter().map(|(p, _)| distance_sq(p, query)).collect();
        distances.sort_by(|a, b| a.total_cmp(b));
        distances.truncate(k);
        distances
    }

    fn grid_points(n: usize) -> Vec<(Point, usize)> {
        (0..n)
            .map(|i| {
                let x = ((i * 37) % 101) as f64 * 0.5;
                let y = ((i * 53) % 97) as f64 * 0.25;
                (Point::new(x, y), i)
            })
            .collect()
    }

    #[test]
    fn test_insert_splits_buckets() {
        let mut index = SpatialIndex::with_bucket_capacity(4);
        for (p, i) in grid_points(100) {
            index.insert(p, i);
        }

        let stats = index.stats();
        assert_eq!(index.len(), 100);
        assert_eq!(stats.live_entries, 100);
        assert_eq!(stats.physical_entries, 100);
        assert!(stats.branches > 0);
        assert!(stats.depth > 1);
    }

    #[test]
    fn test_range_query_inclusive_edges() {
        let mut index = SpatialIndex::with_bucket_capacity(2);
        index.insert(Point::new(0.0, 0.0), "origin");
        index.insert(Point::new(1.0, 1.0), "corner");
        index.insert(Point::new(2.0, 2.0), "outside");
        index.insert(Point::new(0.5, 0.5), "inside");

        let rect = Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 1.0, y: 1.0 });
        let mut found = index.range_query(&rect);
        found.sort();
        assert_eq!(found, vec!["corner", "inside", "origin"]);
    }

    #[test]
    fn test_range_query_empty_region() {
        let mut index = SpatialIndex::new();
        index.insert(Point::new(10.0, 10.0), 1);

        let rect = Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 1.0, y: 1.0 });
        assert!(index.range_query(&rect).is_empty());
        assert!(SpatialIndex::<u8>::new().range_query(&rect).is_empty());
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let points = grid_points(250);
        for capacity in [1, 3, 48] {
            let mut index = SpatialIndex::with_bucket_capacity(capacity);
            for (p, i) in &points {
                index.insert(*p, *i);
            }

            for query in [Point::new(0.0, 0.0), Point::new(25.0, 12.0), Point::new(60.0, -5.0)] {
                for k in [1, 2, 7, 300] {
                    let heap = index.nearest_neighbors(&query, k);
                    let keys: Vec<f64> = heap.iter().map(|(d, _)| d).collect();
                    assert_eq!(keys, brute_force_knn(&points, &query, k), "k={k} cap={capacity}");
                }
            }
        }
    }

    #[test]
    fn test_knn_k_larger_than_population() {
        let mut index = SpatialIndex::with_bucket_capacity(1);
        index.insert(Point::new(0.0, 0.0), 'a');
        index.insert(Point::new(5.0, 5.0), 'b');
        index.insert(Point::new(-5.0, 5.0), 'c');

        let mut found = index.nearest_neighbors(&Point::new(100.0, 100.0), 10).into_values();
        found.sort();
        assert_eq!(found, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_knn_zero_and_empty() {
        let mut index = SpatialIndex::new();
        assert!(index.nearest_neighbors(&Point::new(0.0, 0.0), 3).is_empty());
        index.insert(Point::new(0.0, 0.0), 1);
        assert!(index.nearest_neighbors(&Point::new(0.0, 0.0), 0).is_empty());
    }

    #[test]
    fn test_delete_hides_entry() {
        let mut index = SpatialIndex::with_bucket_capacity(2);
        for (p, i) in grid_points(20) {
            index.insert(p, i);
        }
        let (victim, id) = grid_points(20)[7];

        assert!(index.delete(&victim, &id));
        assert!(!index.delete(&victim, &id));
        assert_eq!(index.len(), 19);

        assert!(!index.payloads().contains(&id));
        let nearest = index.nearest_neighbors(&victim, 1).into_values();
        assert_ne!(nearest, vec![id]);
    }

    #[test]
    fn test_delete_requires_matching_payload() {
        let mut index = SpatialIndex::new();
        let p = Point::new(1.0, 2.0);
        index.insert(p, 1);
        assert!(!index.delete(&p, &2));
        assert!(!index.delete(&Point::new(1.0, 2.000001), &1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_reinsert_after_delete_returns_new_payload() {
        let mut index = SpatialIndex::with_bucket_capacity(1);
        let p = Point::new(3.0, 3.0);
        index.insert(Point::new(0.0, 0.0), "other");
        index.insert(p, "old");
        index.delete(&p, &"old");
        index.insert(p, "new");

        let rect = Rect::new(geo::coord! { x: 2.0, y: 2.0 }, geo::coord! { x: 4.0, y: 4.0 });
        assert_eq!(index.range_query(&rect), vec!["new"]);
        assert_eq!(index.nearest_neighbors(&p, 1).into_values(), vec!["new"]);
    }

    #[test]
    fn test_split_compacts_deleted_entries() {
        let mut index = SpatialIndex::with_bucket_capacity(4);
        for i in 0..4 {
            index.insert(Point::new(i as f64, 0.0), i);
        }
        index.delete(&Point::new(1.0, 0.0), &1);
        index.delete(&Point::new(2.0, 0.0), &2);
        assert_eq!(index.stats().deleted_entries, 2);

        index.insert(Point::new(4.0, 0.0), 4);
        let stats = index.stats();
        assert_eq!(stats.deleted_entries, 0);
        assert_eq!(stats.physical_entries, 3);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_coincident_points_do_not_split_forever() {
        let mut index = SpatialIndex::with_bucket_capacity(2);
        for i in 0..50 {
            index.insert(Point::new(7.0, 7.0), i);
        }

        assert_eq!(index.len(), 50);
        assert_eq!(index.nearest_neighbors(&Point::new(7.0, 7.0), 50).len(), 50);

        index.insert(Point::new(8.0, 7.0), 99);
        let nearest = index.nearest_neighbors(&Point::new(8.0, 7.0), 1).into_values();
        assert_eq!(nearest, vec![99]);
    }

    #[test]
    fn test_clear() {
        let mut index = SpatialIndex::with_bucket_capacity(2);
        for (p, i) in grid_points(10) {
            index.insert(p, i);
        }
        index.clear();
        assert!(index.is_empty());
        assert!(index.bounds().is_none());
        assert!(index.payloads().is_empty());
    }

    #[test]
    #[should_panic(expected = "Bucket capacity must be greater than zero")]
    fn test_zero_capacity_panics() {
        let _ = SpatialIndex::<u8>::with_bucket_capacity(0);
    }
}

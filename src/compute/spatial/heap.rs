//! Fixed-capacity collector that keeps the smallest keys it has been offered.
//!
//! Entries are stored in ascending key order, so the largest retained key is
//! always at the back and `max_key`, `is_full` and `len` are O(1). Offers cost
//! O(capacity).

/// Bounded max-key heap retaining the `capacity` smallest keys seen.
///
/// Ties keep the earlier offer: a new entry whose key equals a retained key is
/// placed after it, so it is the first to be evicted.
#[derive(Debug, Clone)]
pub struct BoundedHeap<T> {
    entries: Vec<(f64, T)>,
    capacity: usize,
}

impl<T> BoundedHeap<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Offer a candidate. No-op when the heap is full and `key` is not smaller
    /// than the current maximum.
    pub fn offer(&mut self, key: f64, value: T) {
        let slot = self.entries.partition_point(|(k, _)| *k <= key);
        if slot >= self.capacity {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop();
        }
        self.entries.insert(slot, (key, value));
    }

    /// Largest retained key, or `None` when empty.
    #[inline]
    pub fn max_key(&self) -> Option<f64> {
        self.entries.last().map(|(k, _)| *k)
    }

    /// Largest retained entry without removing it.
    pub fn peek_max(&self) -> Option<(f64, &T)> {
        self.entries.last().map(|(k, v)| (*k, v))
    }

    /// Smallest retained entry.
    pub fn peek_min(&self) -> Option<(f64, &T)> {
        self.entries.first().map(|(k, v)| (*k, v))
    }

    /// Remove and return the entry with the largest key. `None` signals an
    /// empty heap.
    pub fn pop_max(&mut self) -> Option<(f64, T)> {
        self.entries.pop()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &T)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Consume the heap, returning entries nearest first.
    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        self.entries
    }

    /// Consume the heap, returning only the values nearest first.
    pub fn into_values(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

//! Spatial primitives: axis-aligned bounds, the bounded k-NN heap and the
//! bucketed k-d tree.

pub mod heap;
pub mod kdtree;

pub use heap::BoundedHeap;
pub use kdtree::{DEFAULT_BUCKET_CAPACITY, IndexStats, SpatialIndex};

use geo::{Point, Rect};

/// Number of axes every indexed point carries.
pub const DIMENSIONS: usize = 2;

/// Coordinate of `point` along `axis` (0 = x, 1 = y).
///
/// # Panics
///
/// Panics if `axis` is not a valid dimension.
#[inline]
pub fn axis_value(point: &Point, axis: usize) -> f64 {
    match axis {
        0 => point.x(),
        1 => point.y(),
        _ => panic!("axis {axis} out of range for {DIMENSIONS}-dimensional points"),
    }
}

/// Squared Euclidean distance in coordinate space.
#[inline]
pub fn distance_sq(a: &Point, b: &Point) -> f64 {
    let dx = a.x() - b.x();
    let dy = a.y() - b.y();
    dx * dx + dy * dy
}

/// Axis-aligned bounding box, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; DIMENSIONS],
    pub max: [f64; DIMENSIONS],
}

impl Bounds {
    pub fn from_point(point: &Point) -> Self {
        Self {
            min: [point.x(), point.y()],
            max: [point.x(), point.y()],
        }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            min: [rect.min().x, rect.min().y],
            max: [rect.max().x, rect.max().y],
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            geo::coord! { x: self.min[0], y: self.min[1] },
            geo::coord! { x: self.max[0], y: self.max[1] },
        )
    }

    /// Grow the box to cover `point`.
    pub fn extend(&mut self, point: &Point) {
        for axis in 0..DIMENSIONS {
            let v = axis_value(point, axis);
            if v < self.min[axis] {
                self.min[axis] = v;
            }
            if v > self.max[axis] {
                self.max[axis] = v;
            }
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        (0..DIMENSIONS).all(|axis| {
            let v = axis_value(point, axis);
            v >= self.min[axis] && v <= self.max[axis]
        })
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        (0..DIMENSIONS).all(|axis| other.max[axis] >= self.min[axis] && other.min[axis] <= self.max[axis])
    }

    /// Squared distance from `point` to the nearest point of the box; zero
    /// when the point lies inside.
    pub fn distance_sq(&self, point: &Point) -> f64 {
        let mut d = 0.0;
        for axis in 0..DIMENSIONS {
            let v = axis_value(point, axis);
            let q = if v > self.max[axis] {
                v - self.max[axis]
            } else if v < self.min[axis] {
                v - self.min[axis]
            } else {
                0.0
            };
            d += q * q;
        }
        d
    }

    /// Axis with the largest extent, or `None` when the box is a single point.
    pub fn widest_axis(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for axis in 0..DIMENSIONS {
            let range = self.max[axis] - self.min[axis];
            if range > best.map_or(0.0, |(_, r)| r) {
                best = Some((axis, range));
            }
        }
        best.map(|(axis, _)| axis)
    }
}

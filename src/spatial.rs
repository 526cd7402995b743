//! Dissimilarity measures between points.
//!
//! Clustering only relies on the contract of a measure: symmetric,
//! non-negative, and zero for coincident points. Any closure of the form
//! `Fn(&Point, &Point) -> f64` can be plugged in, and [`DistanceMetric`]
//! covers the common cases.

use geo::{Distance, Euclidean, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Mean earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.76;

/// A pluggable dissimilarity function.
pub trait Dissimilarity {
    fn dissimilarity(&self, a: &Point, b: &Point) -> f64;
}

impl<F> Dissimilarity for F
where
    F: Fn(&Point, &Point) -> f64,
{
    #[inline]
    fn dissimilarity(&self, a: &Point, b: &Point) -> f64 {
        self(a, b)
    }
}

/// Built-in dissimilarity measures.
///
/// Points follow the `geo` convention: `x` is longitude and `y` is latitude
/// for the geographic variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Flat-earth approximation in miles. Accurate while point separations stay
    /// small compared to the earth radius, and much cheaper than Haversine.
    #[default]
    FlatEarthMiles,
    /// Great-circle distance in meters
    Haversine,
    /// Planar distance, for projected coordinates
    Euclidean,
    /// Planar squared distance; preserves ordering without the square root
    SquaredEuclidean,
}

impl DistanceMetric {
    /// Whether points fed to this metric must be valid longitude/latitude pairs.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::FlatEarthMiles | Self::Haversine)
    }
}

impl Dissimilarity for DistanceMetric {
    fn dissimilarity(&self, a: &Point, b: &Point) -> f64 {
        match self {
            Self::FlatEarthMiles => flat_earth_miles(a, b),
            Self::Haversine => Haversine.distance(*a, *b),
            Self::Euclidean => Euclidean.distance(*a, *b),
            Self::SquaredEuclidean => crate::compute::spatial::distance_sq(a, b),
        }
    }
}

/// Small-angle distance in miles: longitude differences are scaled by the
/// cosine of the mean latitude, then treated as planar.
pub fn flat_earth_miles(a: &Point, b: &Point) -> f64 {
    let mean_lat = ((a.y() + b.y()) / 2.0).to_radians();
    let dx = (b.x() - a.x()).to_radians() * mean_lat.cos();
    let dy = (b.y() - a.y()).to_radians();
    EARTH_RADIUS_MILES * (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_earth_close_to_haversine_for_short_hops() {
        let a = Point::new(-74.0060, 40.7128);
        let b = Point::new(-73.9442, 40.6782);

        let miles = flat_earth_miles(&a, &b);
        let meters = DistanceMetric::Haversine.dissimilarity(&a, &b);
        let haversine_miles = meters / 1609.344;

        assert!((miles - haversine_miles).abs() / haversine_miles < 0.01);
    }

    #[test]
    fn test_metrics_are_symmetric_and_zero_on_identity() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(2.0, 1.0);
        for metric in [
            DistanceMetric::FlatEarthMiles,
            DistanceMetric::Haversine,
            DistanceMetric::Euclidean,
            DistanceMetric::SquaredEuclidean,
        ] {
            assert_eq!(metric.dissimilarity(&a, &a), 0.0);
            let ab = metric.dissimilarity(&a, &b);
            let ba = metric.dissimilarity(&b, &a);
            assert!(ab > 0.0);
            assert!((ab - ba).abs() < 1e-9, "{metric:?} not symmetric");
        }
    }

    #[test]
    fn test_squared_euclidean() {
        let d = DistanceMetric::SquaredEuclidean.dissimilarity(&Point::new(1.0, 2.0), &Point::new(2.0, 1.0));
        assert_eq!(d, 2.0);
    }

    #[test]
    fn test_closure_as_dissimilarity() {
        let manhattan = |a: &Point, b: &Point| (a.x() - b.x()).abs() + (a.y() - b.y()).abs();
        assert_eq!(manhattan.dissimilarity(&Point::new(0.0, 0.0), &Point::new(3.0, -4.0)), 7.0);
    }

    #[test]
    fn test_metric_serde_names() {
        let json = serde_json::to_string(&DistanceMetric::FlatEarthMiles).unwrap();
        assert_eq!(json, "\"flat_earth_miles\"");
        let parsed: DistanceMetric = serde_json::from_str("\"squared_euclidean\"").unwrap();
        assert_eq!(parsed, DistanceMetric::SquaredEuclidean);
    }
}

//! Validation for incoming observation coordinates and query rectangles.

use crate::error::{ClusterError, Result};
use geo::{Point, Rect};

/// Validates that both coordinates are finite.
///
/// # Examples
///
/// ```
/// use spatio_cluster::compute::validation::validate_point;
/// use spatio_cluster::Point;
///
/// assert!(validate_point(&Point::new(1.5, -2.0)).is_ok());
/// assert!(validate_point(&Point::new(f64::NAN, 0.0)).is_err());
/// ```
pub fn validate_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "X coordinate must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "Y coordinate must be finite, got: {}",
            y
        )));
    }

    Ok(())
}

/// Validates a point as a longitude/latitude pair.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use spatio_cluster::compute::validation::validate_geographic_point;
/// use spatio_cluster::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert!(validate_geographic_point(&nyc).is_ok());
///
/// let invalid = Point::new(-74.0, 95.0);
/// assert!(validate_geographic_point(&invalid).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    validate_point(point)?;

    let (x, y) = (point.x(), point.y());

    if !(-180.0..=180.0).contains(&x) {
        return Err(ClusterError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(ClusterError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates a batch of points, reporting the first offending index.
pub fn validate_points(points: &[Point], geographic: bool) -> Result<()> {
    for (idx, point) in points.iter().enumerate() {
        let checked = if geographic {
            validate_geographic_point(point)
        } else {
            validate_point(point)
        };
        checked.map_err(|e| ClusterError::InvalidInput(format!("Point at index {}: {}", idx, e)))?;
    }
    Ok(())
}

/// Validates that a query rectangle has finite corners.
pub fn validate_rect(rect: &Rect) -> Result<()> {
    validate_point(&Point::from(rect.min()))
        .and_then(|_| validate_point(&Point::from(rect.max())))
        .map_err(|e| ClusterError::InvalidInput(format!("Query rectangle: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_points() {
        assert!(validate_point(&Point::new(0.0, 0.0)).is_ok());
        assert!(validate_point(&Point::new(1e9, -1e9)).is_ok());
        assert!(validate_geographic_point(&Point::new(180.0, -90.0)).is_ok());
        assert!(validate_geographic_point(&Point::new(-180.0, 90.0)).is_ok());
    }

    #[test]
    fn test_non_finite_coordinates() {
        assert!(validate_point(&Point::new(f64::NAN, 0.0)).is_err());
        assert!(validate_point(&Point::new(0.0, f64::INFINITY)).is_err());
        assert!(validate_geographic_point(&Point::new(f64::NEG_INFINITY, 0.0)).is_err());
    }

    #[test]
    fn test_geographic_ranges() {
        assert!(validate_geographic_point(&Point::new(180.1, 0.0)).is_err());
        assert!(validate_geographic_point(&Point::new(0.0, -90.1)).is_err());
        assert!(validate_point(&Point::new(180.1, -90.1)).is_ok());
    }

    #[test]
    fn test_validate_points_reports_index() {
        let points = vec![Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(500.0, 0.0)];
        assert!(validate_points(&points, false).is_ok());

        let err = validate_points(&points, true).unwrap_err();
        assert!(err.to_string().contains("index 2"));
    }

    #[test]
    fn test_validate_rect() {
        let ok = Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: 1.0, y: 1.0 });
        assert!(validate_rect(&ok).is_ok());

        let bad = Rect::new(geo::coord! { x: 0.0, y: 0.0 }, geo::coord! { x: f64::NAN, y: 1.0 });
        assert!(validate_rect(&bad).is_err());
    }
}

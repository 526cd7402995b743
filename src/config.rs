//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or TOML document) is a
//! valid configuration.

use crate::dendrogram::ZoomScale;
use crate::error::{ClusterError, Result};
use crate::spatial::DistanceMetric;
use serde::de::Error;
use std::path::Path;

/// Clustering engine configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum entries per k-d tree leaf before it splits
    #[serde(default = "Config::default_bucket_capacity")]
    pub bucket_capacity: usize,

    #[serde(default)]
    pub metric: DistanceMetric,

    #[serde(default)]
    pub zoom: ZoomScale,

    /// Zoom level evaluated after the first build
    #[serde(default)]
    pub initial_zoom: f64,

    /// Reject out-of-range longitude/latitude when the metric is geographic
    #[serde(default = "Config::default_validate_geographic")]
    pub validate_geographic: bool,
}

impl Config {
    const fn default_bucket_capacity() -> usize {
        48
    }

    const fn default_validate_geographic() -> bool {
        true
    }

    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Bucket capacity must be greater than zero");

        if capacity > 4096 {
            log::warn!(
                "Bucket capacity of {} is very large; leaf scans during nearest-neighbour \
                queries will dominate clustering time.",
                capacity
            );
        }

        self.bucket_capacity = capacity;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_zoom_scale(mut self, zoom: ZoomScale) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_initial_zoom(mut self, zoom: f64) -> Self {
        self.initial_zoom = zoom;
        self
    }

    pub fn with_geographic_validation(mut self, enabled: bool) -> Self {
        self.validate_geographic = enabled;
        self
    }

    /// Whether incoming points are checked against longitude/latitude ranges.
    pub fn checks_geographic_ranges(&self) -> bool {
        self.validate_geographic && self.metric.is_geographic()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.bucket_capacity == 0 {
            return Err("Bucket capacity must be greater than zero".to_string());
        }

        self.zoom.validate()?;

        if !self.initial_zoom.is_finite() {
            return Err(format!("Initial zoom must be finite, got: {}", self.initial_zoom));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Loads a configuration file, choosing the format by extension.
    ///
    /// `.json` is always supported; `.toml` needs the `toml` feature.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::from_json(&contents)?),
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml(&contents).map_err(|e| ClusterError::InvalidConfig(e.to_string())),
            other => Err(ClusterError::InvalidConfig(format!(
                "Unsupported configuration format {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_capacity: Self::default_bucket_capacity(),
            metric: DistanceMetric::default(),
            zoom: ZoomScale::default(),
            initial_zoom: 0.0,
            validate_geographic: Self::default_validate_geographic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bucket_capacity, 48);
        assert_eq!(config.metric, DistanceMetric::FlatEarthMiles);
        assert_eq!(config.zoom.base, 2500.0);
        assert_eq!(config.zoom.max_zoom, 25);
        assert!(config.checks_geographic_ranges());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_json_roundtrip_preserves_settings() {
        let config = Config::default()
            .with_bucket_capacity(16)
            .with_metric(DistanceMetric::Euclidean)
            .with_initial_zoom(3.5);
        let parsed = Config::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert!(!parsed.checks_geographic_ranges());
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(Config::from_json(r#"{"bucket_capacity": 0}"#).is_err());
        assert!(Config::from_json(r#"{"zoom": {"base": -1.0}}"#).is_err());
        assert!(Config::from_json(r#"{"unknown_field": 1}"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Bucket capacity must be greater than zero")]
    fn test_zero_bucket_capacity_panics() {
        let _ = Config::default().with_bucket_capacity(0);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"metric": "haversine", "bucket_capacity": 8}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.metric, DistanceMetric::Haversine);
        assert_eq!(config.bucket_capacity, 8);
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ClusterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_file(dir.path().join("absent.json")),
            Err(ClusterError::Io(_))
        ));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml() {
        let config = Config::from_toml(
            r#"
            bucket_capacity = 32
            metric = "squared_euclidean"

            [zoom]
            base = 1000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.bucket_capacity, 32);
        assert_eq!(config.metric, DistanceMetric::SquaredEuclidean);
        assert_eq!(config.zoom.base, 1000.0);
        assert_eq!(config.zoom.max_zoom, 25);

        let again = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(again, config);
    }
}

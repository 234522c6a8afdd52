// crates/geobucket-core/src/config.rs
use crate::error::{GeoBucketError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// ~500 m at the equator.
pub const DEFAULT_GRID_SIZE: f64 = 0.005;
/// Minimum trigram similarity (0..1) for a fuzzy hit.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.3;
pub const DEFAULT_PROXIMITY_RADIUS_M: f64 = 500.0;
pub const DEFAULT_MAX_CREATE_ATTEMPTS: u32 = 8;
pub const DEFAULT_STOP_WORDS: &[&str] = &["lagos", "nigeria", "state", "lga", "area", "estate"];

/// Smallest grid step the 3-decimal bucket key can tell apart.
pub const MIN_GRID_SIZE: f64 = 0.001;

/// Engine configuration. Passed explicitly to every component that needs it.
///
/// Missing JSON fields fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoBucketConfig {
    pub grid_size: f64,
    pub fuzzy_threshold: f64,
    pub proximity_radius_m: f64,
    pub stop_words: BTreeSet<String>,
    pub fold_diacritics: bool,
    pub max_create_attempts: u32,
    /// Delete a bucket once its last listing is released.
    pub reap_empty_buckets: bool,
}

impl Default for GeoBucketConfig {
    fn default() -> Self {
        GeoBucketConfig {
            grid_size: DEFAULT_GRID_SIZE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            proximity_radius_m: DEFAULT_PROXIMITY_RADIUS_M,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            fold_diacritics: true,
            max_create_attempts: DEFAULT_MAX_CREATE_ATTEMPTS,
            reap_empty_buckets: true,
        }
    }
}

impl GeoBucketConfig {
    /// Read a JSON config file and validate it.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            GeoBucketError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: GeoBucketConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// Recognized: `GEO_BUCKET_GRID_SIZE`, `FUZZY_MATCH_THRESHOLD`,
    /// `GEO_BUCKET_PROXIMITY_RADIUS_M` and `LOCATION_STOP_WORDS`
    /// (comma-separated).
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Same as [`GeoBucketConfig::with_env_overrides`] with a custom lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup("GEO_BUCKET_GRID_SIZE") {
            self.grid_size = parse_f64("GEO_BUCKET_GRID_SIZE", &v)?;
        }
        if let Some(v) = lookup("FUZZY_MATCH_THRESHOLD") {
            self.fuzzy_threshold = parse_f64("FUZZY_MATCH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("GEO_BUCKET_PROXIMITY_RADIUS_M") {
            self.proximity_radius_m = parse_f64("GEO_BUCKET_PROXIMITY_RADIUS_M", &v)?;
        }
        if let Some(v) = lookup("LOCATION_STOP_WORDS") {
            self.stop_words = v
                .split(',')
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.grid_size.is_finite() || !(MIN_GRID_SIZE..=1.0).contains(&self.grid_size) {
            return Err(GeoBucketError::InvalidConfig(format!(
                "grid_size must be within [{MIN_GRID_SIZE}, 1.0], got {}",
                self.grid_size
            )));
        }
        if !(0.0..1.0).contains(&self.fuzzy_threshold) {
            return Err(GeoBucketError::InvalidConfig(format!(
                "fuzzy_threshold must be within [0, 1), got {}",
                self.fuzzy_threshold
            )));
        }
        if !self.proximity_radius_m.is_finite() || self.proximity_radius_m <= 0.0 {
            return Err(GeoBucketError::InvalidConfig(format!(
                "proximity_radius_m must be positive, got {}",
                self.proximity_radius_m
            )));
        }
        if self.max_create_attempts == 0 {
            return Err(GeoBucketError::InvalidConfig(
                "max_create_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_f64(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GeoBucketError::InvalidConfig(format!("{name}={raw:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let c = GeoBucketConfig::default();
        c.validate().unwrap();
        assert_eq!(c.grid_size, 0.005);
        assert_eq!(c.fuzzy_threshold, 0.3);
        assert!(c.stop_words.contains("lagos"));
    }

    #[test]
    fn overrides_apply_and_validate() {
        let env: HashMap<&str, &str> = [
            ("GEO_BUCKET_GRID_SIZE", "0.01"),
            ("LOCATION_STOP_WORDS", "Abuja, FCT ,"),
        ]
        .into_iter()
        .collect();
        let c = GeoBucketConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.grid_size, 0.01);
        assert_eq!(
            c.stop_words.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["abuja", "fct"]
        );
    }

    #[test]
    fn rejects_bad_values() {
        let err = GeoBucketConfig::default()
            .with_overrides(|k| (k == "FUZZY_MATCH_THRESHOLD").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, GeoBucketError::InvalidConfig(_)));

        let too_fine = GeoBucketConfig {
            grid_size: 0.0001,
            ..GeoBucketConfig::default()
        };
        assert!(too_fine.validate().is_err());

        let no_radius = GeoBucketConfig {
            proximity_radius_m: 0.0,
            ..GeoBucketConfig::default()
        };
        assert!(no_radius.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let c: GeoBucketConfig = serde_json::from_str(r#"{"fuzzy_threshold": 0.5}"#).unwrap();
        assert_eq!(c.fuzzy_threshold, 0.5);
        assert_eq!(c.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(c.max_create_attempts, DEFAULT_MAX_CREATE_ATTEMPTS);
    }
}

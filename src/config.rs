//! Configuration management for Ratewatch.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{RatewatchError, Result};
use crate::estimator::{EstimationMethod, DEFAULT_PRUNE_INTERVAL};

/// Main configuration for Ratewatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatewatchConfig {
    /// Estimator configuration
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Demonstration driver configuration
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Weight of the previous rolling estimate, in `[0, 1)`
    #[serde(default)]
    pub decay_factor: f64,

    /// Number of answered queries between two prunes of the sample log
    #[serde(default = "default_prune_interval")]
    pub prune_interval: u32,

    /// Guard the sample log with a lock so the estimator can be shared across threads
    #[serde(default = "default_synchronized")]
    pub synchronized: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.0,
            prune_interval: default_prune_interval(),
            synchronized: default_synchronized(),
        }
    }
}

fn default_prune_interval() -> u32 {
    DEFAULT_PRUNE_INTERVAL
}

fn default_synchronized() -> bool {
    true
}

/// Demonstration driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Trailing window in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Report the rolling estimate instead of the instantaneous one
    #[serde(default)]
    pub smoothing: bool,

    /// Estimation method
    #[serde(default)]
    pub method: EstimationMethod,

    /// Number of simulated events
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    /// Shortest pause between two events in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Longest pause between two events in milliseconds
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            smoothing: false,
            method: EstimationMethod::default(),
            iterations: default_iterations(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

fn default_window_ms() -> u64 {
    3000
}

fn default_iterations() -> u64 {
    1000
}

fn default_min_interval_ms() -> u64 {
    33
}

fn default_max_interval_ms() -> u64 {
    43
}

impl RatewatchConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RatewatchError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Check that the configuration describes a usable setup.
    ///
    /// The estimator itself accepts any decay factor; rejecting values outside
    /// `[0, 1)` here keeps configured deployments from diverging.
    pub fn validate(&self) -> Result<()> {
        let decay = self.estimator.decay_factor;
        if !(0.0..1.0).contains(&decay) {
            return Err(RatewatchError::Config(format!(
                "decay_factor must be in [0, 1), got {}",
                decay
            )));
        }
        if self.estimator.prune_interval == 0 {
            return Err(RatewatchError::Config(
                "prune_interval must be at least 1".to_string(),
            ));
        }
        if self.demo.window_ms == 0 {
            return Err(RatewatchError::Config(
                "window_ms must be positive".to_string(),
            ));
        }
        if self.demo.min_interval_ms > self.demo.max_interval_ms {
            return Err(RatewatchError::Config(format!(
                "min_interval_ms ({}) exceeds max_interval_ms ({})",
                self.demo.min_interval_ms, self.demo.max_interval_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RatewatchConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.estimator.decay_factor, 0.0);
        assert_eq!(config.estimator.prune_interval, 1000);
        assert!(config.estimator.synchronized);
        assert_eq!(config.demo.window_ms, 3000);
        assert_eq!(config.demo.method, EstimationMethod::CountSamples);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
estimator:
  decay_factor: 0.9
demo:
  method: average_intervals
  smoothing: true
"#;

        let config = RatewatchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.estimator.decay_factor, 0.9);
        assert_eq!(config.estimator.prune_interval, 1000);
        assert_eq!(config.demo.method, EstimationMethod::AverageIntervals);
        assert!(config.demo.smoothing);
        assert_eq!(config.demo.iterations, 1000);
    }

    #[test]
    fn test_parse_empty_yaml_uses_defaults() {
        let config = RatewatchConfig::from_yaml("{}").unwrap();
        assert_eq!(config.demo.min_interval_ms, 33);
        assert_eq!(config.demo.max_interval_ms, 43);
    }

    #[test]
    fn test_parse_unknown_method_fails() {
        let yaml = "demo:\n  method: guess\n";
        let err = RatewatchConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RatewatchError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_decay() {
        let mut config = RatewatchConfig::default();
        config.estimator.decay_factor = 1.0;
        assert!(config.validate().is_err());

        config.estimator.decay_factor = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_interval_range() {
        let mut config = RatewatchConfig::default();
        config.demo.min_interval_ms = 50;
        config.demo.max_interval_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window_and_prune_interval() {
        let mut config = RatewatchConfig::default();
        config.demo.window_ms = 0;
        assert!(config.validate().is_err());

        let mut config = RatewatchConfig::default();
        config.estimator.prune_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = RatewatchConfig::from_file("/nonexistent/ratewatch.yaml").unwrap_err();
        assert!(matches!(err, RatewatchError::Io(_)));
    }
}

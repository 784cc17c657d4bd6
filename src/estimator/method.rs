//! Rate estimation strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RatewatchError;

/// How a rate is derived from the samples inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    /// Number of samples inside the window divided by the window length.
    #[default]
    CountSamples,
    /// Reciprocal of the mean spacing between the newest samples.
    AverageIntervals,
}

impl EstimationMethod {
    /// Convert from a raw method value.
    ///
    /// Panics on a value that names no method: callers handing raw values
    /// to the estimator are expected to only ever pass valid ones.
    pub fn from_raw(raw: u8) -> Self {
        match Self::try_from(raw) {
            Ok(method) => method,
            Err(e) => panic!("{}", e),
        }
    }

    /// Canonical name, as used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationMethod::CountSamples => "count_samples",
            EstimationMethod::AverageIntervals => "average_intervals",
        }
    }
}

impl TryFrom<u8> for EstimationMethod {
    type Error = RatewatchError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(EstimationMethod::CountSamples),
            1 => Ok(EstimationMethod::AverageIntervals),
            other => Err(RatewatchError::UnknownMethod(other.to_string())),
        }
    }
}

impl FromStr for EstimationMethod {
    type Err = RatewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "count_samples" | "count" => Ok(EstimationMethod::CountSamples),
            "average_intervals" | "average" => Ok(EstimationMethod::AverageIntervals),
            _ => Err(RatewatchError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_method() {
        assert_eq!(EstimationMethod::default(), EstimationMethod::CountSamples);
    }

    #[test]
    fn test_parse_method_names() {
        assert_eq!(
            "count_samples".parse::<EstimationMethod>().unwrap(),
            EstimationMethod::CountSamples
        );
        assert_eq!(
            "Average-Intervals".parse::<EstimationMethod>().unwrap(),
            EstimationMethod::AverageIntervals
        );
        assert_eq!(
            "average".parse::<EstimationMethod>().unwrap(),
            EstimationMethod::AverageIntervals
        );
    }

    #[test]
    fn test_parse_unknown_name() {
        let err = "median".parse::<EstimationMethod>().unwrap_err();
        assert!(matches!(err, RatewatchError::UnknownMethod(ref name) if name == "median"));
    }

    #[test]
    fn test_raw_values() {
        assert_eq!(EstimationMethod::from_raw(0), EstimationMethod::CountSamples);
        assert_eq!(EstimationMethod::from_raw(1), EstimationMethod::AverageIntervals);
        assert!(EstimationMethod::try_from(2).is_err());
    }

    #[test]
    #[should_panic(expected = "Unknown estimation method: 7")]
    fn test_from_raw_unknown_panics() {
        EstimationMethod::from_raw(7);
    }

    #[test]
    fn test_display_matches_config_name() {
        assert_eq!(EstimationMethod::CountSamples.to_string(), "count_samples");
        assert_eq!(EstimationMethod::AverageIntervals.to_string(), "average_intervals");
    }
}

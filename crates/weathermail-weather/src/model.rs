use serde::Serialize;
use weathermail_types::City;

use crate::error::FetchError;

/// Normalized current conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Degrees Celsius, one decimal place.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: u8,
    pub conditions: String,
    /// Degrees Celsius, one decimal place.
    pub feels_like: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Live,
}

/// Per-city outcome of one orchestrator run. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherResult {
    Success {
        city: City,
        observation: Observation,
        source: DataSource,
    },
    Failure {
        city: City,
        error: FetchError,
    },
}

impl WeatherResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WeatherResult::Success { .. })
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_one_decimal(18.34), 18.3);
        assert_eq!(round_one_decimal(18.36), 18.4);
        assert_eq!(round_one_decimal(-2.06), -2.1);
        assert_eq!(round_one_decimal(7.0), 7.0);
    }

    #[test]
    fn success_flag() {
        let ok = WeatherResult::Success {
            city: City::Tokyo,
            observation: Observation {
                temperature: 20.0,
                humidity: 50,
                conditions: "clear sky".into(),
                feels_like: 20.0,
            },
            source: DataSource::Live,
        };
        let failed = WeatherResult::Failure {
            city: City::Lahore,
            error: FetchError::Timeout,
        };

        assert!(ok.is_success());
        assert!(!failed.is_success());
    }
}

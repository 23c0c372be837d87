//! Centralized oracle configuration
//!
//! Single source of truth for all tunables of the publication pipeline,
//! loadable from a TOML file with sensible defaults and validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default values for configuration
mod defaults {
    // Capacity defaults
    pub fn witnessing_cost() -> u64 { 600 }
    pub fn min_available_witnessings() -> u64 { 100 }

    // Quota defaults
    pub fn max_requests_per_day() -> u64 { 100 }
    pub fn max_requests_per_device_per_day() -> u64 { 10 }

    // Retry defaults
    pub fn retry_delay_secs() -> u64 { 5 * 60 }
    pub fn retry_jitter_max_millis() -> u64 { 3000 }

    // Delay computation defaults
    pub fn taxi_in_minutes() -> i64 { 15 }
    pub fn disruption_sentinel() -> i64 { 10_000 }

    // Request validation defaults
    pub fn max_flight_age_days() -> i64 { 7 }

    // Provider defaults
    pub fn flightstats_base_url() -> String {
        "https://api.flightstats.com/flex/flightstatus/rest/v2/json/flight/status".to_string()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required config value: {key}")]
    MissingValue { key: String },

    #[error("invalid config value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// FlightStats provider credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightstatsConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default = "defaults::flightstats_base_url")]
    pub base_url: String,
}

impl Default for FlightstatsConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_key: String::new(),
            base_url: defaults::flightstats_base_url(),
        }
    }
}

/// Complete oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Cost of one publication, in ledger base units.
    #[serde(default = "defaults::witnessing_cost")]
    pub witnessing_cost: u64,

    /// Keep at least this many affordable publications available by
    /// splitting large outputs.
    #[serde(default = "defaults::min_available_witnessings")]
    pub min_available_witnessings: u64,

    /// Global request ceiling over a trailing 24 hours.
    #[serde(default = "defaults::max_requests_per_day")]
    pub max_requests_per_day: u64,

    /// Per-requester ceiling over a trailing 24 hours.
    #[serde(default = "defaults::max_requests_per_device_per_day")]
    pub max_requests_per_device_per_day: u64,

    /// Fixed delay between publication retries, in seconds.
    #[serde(default = "defaults::retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Upper bound of the random jitter added to each retry delay.
    #[serde(default = "defaults::retry_jitter_max_millis")]
    pub retry_jitter_max_millis: u64,

    /// Taxi-in adjustment added to runway arrival times, in minutes.
    #[serde(default = "defaults::taxi_in_minutes")]
    pub taxi_in_minutes: i64,

    /// Value published for canceled/diverted/redirected flights.
    #[serde(default = "defaults::disruption_sentinel")]
    pub disruption_sentinel: i64,

    /// Oldest queryable flight, in days before today.
    #[serde(default = "defaults::max_flight_age_days")]
    pub max_flight_age_days: i64,

    /// Stamp a `timestamp` entry (ms since epoch) into each posted payload.
    #[serde(default)]
    pub post_timestamp: bool,

    #[serde(default)]
    pub flightstats: FlightstatsConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            witnessing_cost: defaults::witnessing_cost(),
            min_available_witnessings: defaults::min_available_witnessings(),
            max_requests_per_day: defaults::max_requests_per_day(),
            max_requests_per_device_per_day: defaults::max_requests_per_device_per_day(),
            retry_delay_secs: defaults::retry_delay_secs(),
            retry_jitter_max_millis: defaults::retry_jitter_max_millis(),
            taxi_in_minutes: defaults::taxi_in_minutes(),
            disruption_sentinel: defaults::disruption_sentinel(),
            max_flight_age_days: defaults::max_flight_age_days(),
            post_timestamp: false,
            flightstats: FlightstatsConfig::default(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values that have no safe default.
    ///
    /// Provider credentials are only required when the real FlightStats
    /// client is used; `validate_provider_credentials` checks them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.witnessing_cost == 0 {
            return Err(ConfigError::InvalidValue {
                key: "witnessing_cost".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_flight_age_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_flight_age_days".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Fail if the FlightStats credentials are absent.
    pub fn validate_provider_credentials(&self) -> Result<(), ConfigError> {
        if self.flightstats.app_id.is_empty() {
            return Err(ConfigError::MissingValue {
                key: "flightstats.app_id".to_string(),
            });
        }
        if self.flightstats.app_key.is_empty() {
            return Err(ConfigError::MissingValue {
                key: "flightstats.app_key".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn retry_jitter_max(&self) -> Duration {
        Duration::from_millis(self.retry_jitter_max_millis)
    }

    pub fn taxi_in_time(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.taxi_in_minutes)
    }
}

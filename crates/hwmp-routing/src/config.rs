//! Protocol configuration.
//!
//! [`HwmpConfig`] is built once (usually from the `[hwmp]` section of a node
//! config file) and handed to the protocol at construction. It is never
//! mutated afterwards. Durations appear in TOML as fractional milliseconds
//! under `*_ms` keys.

use std::time::Duration;

use hwmp_core::constants::TU_MICROS;
use serde::Deserialize;

use crate::error::RoutingError;

/// Immutable HWMP parameters. Defaults follow the 802.11s recommendations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HwmpConfig {
    /// Maximum number of packets waiting for route resolution, all destinations together.
    pub max_queue_size: usize,
    pub max_preq_retries: u8,
    #[serde(rename = "net_diameter_traversal_time_ms", with = "duration_ms")]
    pub net_diameter_traversal_time: Duration,
    /// Upper bound for the doubling PREQ retry interval.
    #[serde(rename = "max_retry_interval_ms", with = "duration_ms")]
    pub max_retry_interval: Duration,
    #[serde(rename = "preq_min_interval_ms", with = "duration_ms")]
    pub preq_min_interval: Duration,
    #[serde(rename = "perr_min_interval_ms", with = "duration_ms")]
    pub perr_min_interval: Duration,
    #[serde(rename = "active_root_timeout_ms", with = "duration_ms")]
    pub active_root_timeout: Duration,
    #[serde(rename = "active_path_timeout_ms", with = "duration_ms")]
    pub active_path_timeout: Duration,
    #[serde(rename = "path_to_root_interval_ms", with = "duration_ms")]
    pub path_to_root_interval: Duration,
    /// Upper bound of the random offset before the first proactive PREQ.
    #[serde(rename = "random_start_ms", with = "duration_ms")]
    pub random_start: Duration,
    pub max_ttl: u8,
    pub unicast_perr_threshold: usize,
    pub unicast_preq_threshold: usize,
    pub unicast_data_threshold: usize,
    /// Destination-only flag on originated PREQs.
    pub do_flag: bool,
    /// Reply-and-forward flag on originated PREQs.
    pub rf_flag: bool,
    pub group_seqno_cache_size: usize,
    #[serde(rename = "prune_lifetime_ms", with = "duration_ms")]
    pub prune_lifetime: Duration,
    #[serde(rename = "maintenance_interval_ms", with = "duration_ms")]
    pub maintenance_interval: Duration,
    /// Whether proactive PREQs from this node ask for PREPs.
    pub root_requests_prep: bool,
}

impl Default for HwmpConfig {
    fn default() -> Self {
        let traversal = Duration::from_micros(102_400);
        Self {
            max_queue_size: 255,
            max_preq_retries: 3,
            net_diameter_traversal_time: traversal,
            max_retry_interval: traversal * 32,
            preq_min_interval: Duration::from_micros(102_400),
            perr_min_interval: Duration::from_micros(102_400),
            active_root_timeout: Duration::from_millis(5120),
            active_path_timeout: Duration::from_millis(5120),
            path_to_root_interval: Duration::from_millis(2048),
            random_start: Duration::from_millis(100),
            max_ttl: 32,
            unicast_perr_threshold: 32,
            unicast_preq_threshold: 1,
            unicast_data_threshold: 1,
            do_flag: false,
            rf_flag: true,
            group_seqno_cache_size: 100,
            prune_lifetime: Duration::from_secs(5),
            maintenance_interval: Duration::from_secs(1),
            root_requests_prep: true,
        }
    }
}

impl HwmpConfig {
    /// Reject parameter combinations the protocol cannot run with.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.max_queue_size == 0 {
            return Err(RoutingError::InvalidConfig("max_queue_size must be non-zero"));
        }
        if self.max_ttl == 0 {
            return Err(RoutingError::InvalidConfig("max_ttl must be non-zero"));
        }
        if self.group_seqno_cache_size == 0 {
            return Err(RoutingError::InvalidConfig(
                "group_seqno_cache_size must be non-zero",
            ));
        }
        if self.net_diameter_traversal_time.is_zero() {
            return Err(RoutingError::InvalidConfig(
                "net_diameter_traversal_time must be non-zero",
            ));
        }
        if self.maintenance_interval.is_zero() {
            return Err(RoutingError::InvalidConfig(
                "maintenance_interval must be non-zero",
            ));
        }
        if self.path_to_root_interval.is_zero() {
            return Err(RoutingError::InvalidConfig(
                "path_to_root_interval must be non-zero",
            ));
        }
        Ok(())
    }

    /// Lifetime carried in originated PREQs and PREPs, in time units.
    #[must_use]
    pub fn active_path_lifetime_tu(&self) -> u32 {
        duration_to_tu(self.active_path_timeout)
    }

    #[must_use]
    pub fn active_root_lifetime_tu(&self) -> u32 {
        duration_to_tu(self.active_root_timeout)
    }
}

/// Convert a duration to time units, saturating at `u32::MAX`.
#[must_use]
pub fn duration_to_tu(d: Duration) -> u32 {
    u32::try_from(d.as_micros() / u128::from(TU_MICROS)).unwrap_or(u32::MAX)
}

#[must_use]
pub fn tu_to_duration(tu: u32) -> Duration {
    Duration::from_micros(u64::from(tu) * TU_MICROS)
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, de};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = f64::deserialize(deserializer)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(de::Error::custom(format!(
                "duration must be a non-negative number of milliseconds, got {ms}"
            )));
        }
        Ok(Duration::from_micros((ms * 1000.0).round() as u64))
    }
}

//! Monitor configuration and defaults

use crate::error::{Error, Result};
use crate::sources::backoff::ReconnectPolicy;
use std::time::Duration;

/// Readings kept per zone. Sized for a 1000 point chart with headroom.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1500;

/// Most recent anomalies kept in the log.
pub const DEFAULT_ANOMALY_LOG_CAPACITY: usize = 50;

pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Configuration for a monitoring pipeline
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub feed_url: String,
    pub history_capacity: usize,
    pub anomaly_log_capacity: usize,
    pub reconnect: ReconnectPolicy,
    /// Drop readings for zones without a registered range instead of keeping a window for
    /// them. Each window is bounded, but the number of windows grows with every new zone id
    /// the feed sends unless this is set.
    pub registered_zones_only: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed_url: "ws://127.0.0.1:9001".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            anomaly_log_capacity: DEFAULT_ANOMALY_LOG_CAPACITY,
            reconnect: ReconnectPolicy::new(
                Duration::from_millis(DEFAULT_BASE_DELAY_MS),
                Duration::from_millis(DEFAULT_MAX_DELAY_MS),
                None,
            ),
            registered_zones_only: false,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(Error::Config("history capacity must be at least 1".to_string()));
        }
        if self.anomaly_log_capacity == 0 {
            return Err(Error::Config("anomaly log capacity must be at least 1".to_string()));
        }
        if !(self.feed_url.starts_with("ws://") || self.feed_url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "feed url must use ws:// or wss://, got '{}'",
                self.feed_url
            )));
        }
        if self.reconnect.base_delay > self.reconnect.max_delay {
            return Err(Error::Config("reconnect base delay exceeds the cap".to_string()));
        }
        Ok(())
    }
}

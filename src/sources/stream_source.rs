use crate::core::Reading;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Callback invoked once per decoded reading.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Start delivering readings to `callback`. Transport failures after this point are
    /// recovered internally and only surface through `connection_state`.
    fn subscribe(&mut self, callback: ReadingCallback) -> Result<(), StreamError>;

    /// Stop the source. When this returns, the callback no longer fires and the
    /// connection state no longer changes.
    async fn stop(&mut self) -> Result<(), StreamError>;

    /// Receiver notified on every connection state change. The source is the only writer.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;

    /// Shared message counters.
    fn metrics_handle(&self) -> Arc<SourceMetrics>;

    fn connection_state(&self) -> ConnectionState {
        *self.watch_state().borrow()
    }

    fn metrics(&self) -> SourceMetricsSnapshot {
        self.metrics_handle().snapshot()
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Subscription error: {0}")]
    SubscriptionError(String),
    #[error("Other error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Connection status plus the number of consecutive failed connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
}

impl ConnectionState {
    pub fn new(status: ConnectionStatus, reconnect_attempts: u32) -> Self {
        Self { status, reconnect_attempts }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(ConnectionStatus::Disconnected, 0)
    }
}

/// Counters kept by a source while it runs.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    messages_received: AtomicU64,
    malformed_dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetricsSnapshot {
    pub messages_received: u64,
    pub malformed_dropped: u64,
}

impl SourceMetrics {
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        SourceMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
        }
    }
}

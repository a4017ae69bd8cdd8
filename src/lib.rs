//! # Zonewatch
//!
//! Zonewatch ingests a continuous stream of per-zone energy readings, keeps a bounded
//! rolling history for every zone, flags anomalous readings as they arrive and puts the
//! current usage of a zone in context against a historical baseline.
//!
//! ## Features
//!
//! - Resilient WebSocket feed adapter with exponential backoff reconnects
//! - Bounded per-zone history windows and a bounded anomaly log
//! - Hybrid threshold + percent-change anomaly detection
//! - Baselines computed from a historical corpus, with a ±10% comparison deadband
//! - Read-only HTTP surface for dashboards
//!
//! ## Example
//!
//! ```rust
//! use zonewatch::stream::comparator::{compare, ComparisonStatus};
//!
//! let result = compare(120.0, 100.0);
//! assert_eq!(result.status, ComparisonStatus::Above);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

/// Core data structures and the feed wire codec
pub mod core;

/// Monitor configuration and defaults
pub mod config;

/// Reading sources, reconnect policy and the ingestion pipeline
pub mod sources;

/// Bounded in-memory stores
pub mod storage;

/// Detection, baselines and comparison
pub mod stream;

/// Static zone reference data
pub mod registry;

/// Read-only HTTP API
pub mod http;

/// Replay feed that publishes readings over WebSocket
pub mod stream_bus;

pub mod error {
    //! Error types and result definitions

    use crate::core::encoding::DecodeError;
    use crate::registry::zone_registry::RegistryError;
    use crate::sources::stream_source::StreamError;
    use crate::stream::baseline::BaselineError;
    use crate::stream_bus::StreamBusError;
    use thiserror::Error;

    /// Result type alias for Zonewatch operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Main error type for Zonewatch
    #[derive(Debug, Error)]
    pub enum Error {
        /// Configuration error
        #[error("Configuration error: {0}")]
        Config(String),
        /// IO error
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        /// JSON error
        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
        /// Feed message could not be decoded
        #[error("Decode error: {0}")]
        Decode(#[from] DecodeError),
        /// Reading source error
        #[error("Source error: {0}")]
        Source(#[from] StreamError),
        /// Baseline corpus error
        #[error("Baseline error: {0}")]
        Baseline(#[from] BaselineError),
        /// Zone registry error
        #[error("Registry error: {0}")]
        Registry(#[from] RegistryError),
        /// Replay feed error
        #[error("Stream bus error: {0}")]
        StreamBus(#[from] StreamBusError),
    }
}

// Re-export commonly used types
pub use error::{Error, Result};

//! HTTP API module for Zonewatch
//!
//! Provides read-only REST endpoints for:
//! - Connection status and feed counters
//! - Latest readings and history windows per zone
//! - The anomaly log
//! - Baselines and baseline comparisons

pub mod server;

pub use server::{
    create_server, start_server, AnomaliesResponse, AppState, BaselinesResponse,
    ComparisonResponse, ErrorResponse, ListZonesResponse, StatusResponse, SuccessResponse,
    WindowResponse, ZoneSummary,
};

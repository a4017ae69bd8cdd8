//! Core data structures for the Zonewatch monitoring engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single sensor reading for one zone, as it arrives from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub zone_id: String,
    pub zone_name: String,
    pub energy_kw: f64,
    pub temperature: f64,
    pub equipment_count: u32,
}

impl Reading {
    pub fn new(
        timestamp: DateTime<Utc>,
        zone_id: &str,
        zone_name: &str,
        energy_kw: f64,
        temperature: f64,
        equipment_count: u32,
    ) -> Self {
        Self {
            timestamp,
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            energy_kw,
            temperature,
            equipment_count,
        }
    }
}

/// Expected operating bounds of a zone, in kW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRange {
    pub min: f64,
    pub max: f64,
}

impl ZoneRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyType {
    Spike,
    Drop,
    /// Reserved on the wire; the detection cascade does not emit it.
    Flatline,
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyType::Spike => write!(f, "spike"),
            AnomalyType::Drop => write!(f, "drop"),
            AnomalyType::Flatline => write!(f, "flatline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// An anomalous reading. Created once per triggering reading and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: String,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub zone_id: String,
    pub zone_name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
}

impl Anomaly {
    /// Build the anomaly raised by `reading`. The id is derived from the zone and the
    /// reading timestamp in epoch milliseconds.
    pub fn from_reading(
        reading: &Reading,
        anomaly_type: AnomalyType,
        threshold: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: anomaly_id(&reading.zone_id, &reading.timestamp),
            anomaly_type,
            zone_id: reading.zone_id.clone(),
            zone_name: reading.zone_name.clone(),
            timestamp: reading.timestamp,
            value: reading.energy_kw,
            threshold,
            severity,
        }
    }
}

pub fn anomaly_id(zone_id: &str, timestamp: &DateTime<Utc>) -> String {
    format!("{}-{}", zone_id, timestamp.timestamp_millis())
}

pub mod encoding;
pub use encoding::*;

use crate::core::ZoneRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub type ZoneId = String;

/// Static reference data for a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub name: String,
    pub range: ZoneRange,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Zone already registered: {0}")]
    ZoneAlreadyExists(ZoneId),
    #[error("Invalid range for zone {zone_id}: {reason}")]
    InvalidRange { zone_id: ZoneId, reason: String },
    #[error("Failed to read zone file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse zone file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Zone reference ranges, loaded once at startup and read-only afterwards.
///
/// The zone file is a JSON object keyed by zone id:
///
/// ```json
/// { "hvac-1": { "name": "HVAC North", "range": { "min": 20.0, "max": 80.0 } } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: HashMap<ZoneId, ZoneInfo>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, RegistryError> {
        let zones: HashMap<ZoneId, ZoneInfo> = serde_json::from_str(contents)?;
        let mut registry = Self::new();
        for (zone_id, info) in zones {
            registry.register(zone_id, info)?;
        }
        Ok(registry)
    }

    /// Build a registry from bare ranges, using the zone id as display name.
    pub fn from_ranges<I>(ranges: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (ZoneId, ZoneRange)>,
    {
        let mut registry = Self::new();
        for (zone_id, range) in ranges {
            let name = zone_id.clone();
            registry.register(zone_id, ZoneInfo { name, range })?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, zone_id: ZoneId, info: ZoneInfo) -> Result<(), RegistryError> {
        validate_range(&zone_id, &info.range)?;
        if self.zones.contains_key(&zone_id) {
            return Err(RegistryError::ZoneAlreadyExists(zone_id));
        }
        self.zones.insert(zone_id, info);
        Ok(())
    }

    pub fn range(&self, zone_id: &str) -> Option<ZoneRange> {
        self.zones.get(zone_id).map(|info| info.range)
    }

    pub fn get(&self, zone_id: &str) -> Option<&ZoneInfo> {
        self.zones.get(zone_id)
    }

    pub fn list_all(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self.zones.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

fn validate_range(zone_id: &str, range: &ZoneRange) -> Result<(), RegistryError> {
    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(RegistryError::InvalidRange {
            zone_id: zone_id.to_string(),
            reason: "bounds must be finite".to_string(),
        });
    }
    if range.min > range.max {
        return Err(RegistryError::InvalidRange {
            zone_id: zone_id.to_string(),
            reason: format!("min {} is greater than max {}", range.min, range.max),
        });
    }
    Ok(())
}

use crate::core::Anomaly;
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Append-only log of the most recent anomalies.
#[derive(Debug, Clone)]
pub struct AnomalyLog {
    capacity: usize,
    entries: VecDeque<Anomaly>,
}

impl AnomalyLog {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("anomaly log capacity must be at least 1".to_string()));
        }
        Ok(Self { capacity, entries: VecDeque::with_capacity(capacity) })
    }

    pub fn push(&mut self, anomaly: Anomaly) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(anomaly);
    }

    /// Entries oldest first.
    pub fn recent(&self) -> Vec<Anomaly> {
        self.entries.iter().cloned().collect()
    }

    /// Entries newest first, as dashboards list them.
    pub fn latest_first(&self) -> Vec<Anomaly> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn for_zone(&self, zone_id: &str) -> Vec<Anomaly> {
        self.entries.iter().filter(|a| a.zone_id == zone_id).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

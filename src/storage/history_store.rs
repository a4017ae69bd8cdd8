use crate::core::Reading;
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};

/// Bounded per-zone reading history.
///
/// Each zone owns a FIFO window of at most `capacity` readings. The newest element of a
/// window is always the last reading appended for that zone, so `latest` is a `back()`.
/// Windows are never removed, so total size grows with the number of distinct zones.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    windows: HashMap<String, VecDeque<Reading>>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("history capacity must be at least 1".to_string()));
        }
        Ok(Self { capacity, windows: HashMap::new() })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a reading to its zone window, evicting the oldest reading when full.
    /// Returns the evicted reading, if any.
    pub fn append(&mut self, reading: Reading) -> Option<Reading> {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(reading.zone_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity.min(64)));

        let evicted = if window.len() >= capacity { window.pop_front() } else { None };
        window.push_back(reading);
        evicted
    }

    pub fn latest(&self, zone_id: &str) -> Option<&Reading> {
        self.windows.get(zone_id).and_then(VecDeque::back)
    }

    /// Ordered readings for a zone, oldest first.
    pub fn window(&self, zone_id: &str) -> Option<&VecDeque<Reading>> {
        self.windows.get(zone_id)
    }

    /// Owned copy of a zone window, oldest first. Empty when the zone is unknown.
    pub fn window_snapshot(&self, zone_id: &str) -> Vec<Reading> {
        self.windows.get(zone_id).map(|w| w.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn len(&self, zone_id: &str) -> usize {
        self.windows.get(zone_id).map_or(0, VecDeque::len)
    }

    pub fn zone_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.windows.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn total_readings(&self) -> usize {
        self.windows.values().map(VecDeque::len).sum()
    }
}

//! Per-zone baselines computed from a static historical corpus.

use crate::core::Reading;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Statistical summary of a zone's historical energy usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub zone_id: String,
    pub zone_name: String,
    pub avg_energy_kw: f64,
    pub min_energy_kw: f64,
    pub max_energy_kw: f64,
    pub data_points: usize,
}

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Default)]
struct Accumulator {
    zone_name: String,
    sum: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, reading: &Reading) {
        if self.count == 0 {
            self.zone_name.clone_from(&reading.zone_name);
            self.min = reading.energy_kw;
            self.max = reading.energy_kw;
        } else {
            self.min = self.min.min(reading.energy_kw);
            self.max = self.max.max(reading.energy_kw);
        }
        self.sum += reading.energy_kw;
        self.count += 1;
    }

    fn finish(self, zone_id: String) -> Baseline {
        Baseline {
            zone_id,
            zone_name: self.zone_name,
            avg_energy_kw: self.sum / self.count as f64,
            min_energy_kw: self.min,
            max_energy_kw: self.max,
            data_points: self.count,
        }
    }
}

/// Group a corpus by zone and compute mean, min, max and count of `energy_kw` in one pass.
pub fn compute_baselines(corpus: &[Reading]) -> HashMap<String, Baseline> {
    let mut groups: HashMap<String, Accumulator> = HashMap::new();
    for reading in corpus {
        groups.entry(reading.zone_id.clone()).or_default().add(reading);
    }

    groups.into_iter().map(|(zone_id, acc)| (zone_id.clone(), acc.finish(zone_id))).collect()
}

/// Load a corpus file holding a JSON array of readings.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<Reading>, BaselineError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Baselines, or the reason they could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineState {
    Ready(HashMap<String, Baseline>),
    Unavailable { reason: String },
}

impl BaselineState {
    pub fn from_corpus(corpus: &[Reading]) -> Self {
        BaselineState::Ready(compute_baselines(corpus))
    }

    /// Load and summarise a corpus file. Failures become `Unavailable`.
    pub fn from_corpus_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match load_corpus(path) {
            Ok(corpus) => {
                let baselines = compute_baselines(&corpus);
                info!(
                    path = %path.display(),
                    readings = corpus.len(),
                    zones = baselines.len(),
                    "baselines computed"
                );
                BaselineState::Ready(baselines)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "baseline unavailable");
                BaselineState::Unavailable { reason: e.to_string() }
            }
        }
    }

    pub fn get(&self, zone_id: &str) -> Option<&Baseline> {
        match self {
            BaselineState::Ready(baselines) => baselines.get(zone_id),
            BaselineState::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, BaselineState::Ready(_))
    }
}

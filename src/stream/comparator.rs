use crate::core::Reading;
use crate::stream::baseline::BaselineState;
use serde::Serialize;
use std::fmt;

/// Readings within this percentage of the baseline are `Normal`.
pub const NORMAL_DEADBAND_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Normal,
    Above,
    Below,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonStatus::Normal => write!(f, "normal"),
            ComparisonStatus::Above => write!(f, "above"),
            ComparisonStatus::Below => write!(f, "below"),
        }
    }
}

/// Deviation of a live value from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub percentage: f64,
    pub status: ComparisonStatus,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.1}% ({})", self.percentage, self.status)
    }
}

/// Compare a current value with a baseline value.
///
/// `percentage = (current - baseline) / baseline * 100`, or 0 when the baseline is 0.
/// `|percentage| < 10` is `Normal`; exactly 10 already counts as `Above`/`Below`.
pub fn compare(current: f64, baseline: f64) -> Comparison {
    let percentage =
        if baseline == 0.0 { 0.0 } else { (current - baseline) / baseline * 100.0 };

    let status = if percentage.abs() < NORMAL_DEADBAND_PCT {
        ComparisonStatus::Normal
    } else if percentage > 0.0 {
        ComparisonStatus::Above
    } else {
        ComparisonStatus::Below
    };

    Comparison { percentage, status }
}

/// Statistics over a zone window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    /// kW per second, least squares over the window.
    pub slope: f64,
    pub count: usize,
}

impl WindowStats {
    /// Calculates statistics from a window of readings.
    /// Returns None if the window is empty.
    pub fn from_window<'a, I>(window: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Reading>,
        I::IntoIter: Clone,
    {
        let iter = window.into_iter();
        let count = iter.clone().count();
        if count == 0 {
            return None;
        }
        let n = count as f64;

        let values = iter.clone().map(|r| r.energy_kw);
        let sum_val: f64 = values.clone().sum();
        let mean = sum_val / n;
        let min = values.clone().fold(f64::INFINITY, f64::min);
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);

        // Population standard deviation
        let variance_sum: f64 = values.map(|v| (v - mean).powi(2)).sum();
        let std_dev = (variance_sum / n).sqrt();

        // Least squares slope, x in seconds relative to the first reading so large epoch
        // values do not swamp the sums
        let origin = iter.clone().next().map_or(0, |r| r.timestamp.timestamp_millis());
        let xs = iter.clone().map(|r| (r.timestamp.timestamp_millis() - origin) as f64 / 1000.0);
        let sum_x: f64 = xs.clone().sum();
        let sum_x2: f64 = xs.clone().map(|x| x * x).sum();
        let sum_xy: f64 = xs.zip(iter.map(|r| r.energy_kw)).map(|(x, y)| x * y).sum();

        let denominator = n * sum_x2 - sum_x.powi(2);
        let slope = if denominator.abs() < f64::EPSILON {
            0.0 // all timestamps identical or a single point
        } else {
            (n * sum_xy - sum_x * sum_val) / denominator
        };

        Some(WindowStats { mean, min, max, std_dev, slope, count })
    }
}

/// Outcome of comparing a zone against its baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZoneComparison {
    /// No baseline for this zone, or baselines could not be loaded.
    NoData { reason: String },
    Compared {
        #[serde(rename = "baselineKw")]
        baseline_kw: f64,
        #[serde(rename = "currentKw")]
        current_kw: f64,
        comparison: Comparison,
    },
}

/// Compare `current` for `zone_id` against the zone's average baseline.
pub fn compare_zone(state: &BaselineState, zone_id: &str, current: f64) -> ZoneComparison {
    match state {
        BaselineState::Unavailable { reason } => {
            ZoneComparison::NoData { reason: format!("baseline unavailable: {}", reason) }
        }
        BaselineState::Ready(_) => match state.get(zone_id) {
            Some(baseline) => ZoneComparison::Compared {
                baseline_kw: baseline.avg_energy_kw,
                current_kw: current,
                comparison: compare(current, baseline.avg_energy_kw),
            },
            None => ZoneComparison::NoData { reason: format!("no baseline for zone {}", zone_id) },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::baseline::compute_baselines;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_compare_deadband_boundaries() {
        assert_eq!(compare(109.0, 100.0).status, ComparisonStatus::Normal);
        assert_eq!(compare(110.0, 100.0).status, ComparisonStatus::Above);
        assert_eq!(compare(111.0, 100.0).status, ComparisonStatus::Above);
        assert_eq!(compare(91.0, 100.0).status, ComparisonStatus::Normal);
        assert_eq!(compare(90.0, 100.0).status, ComparisonStatus::Below);
        assert!((compare(110.0, 100.0).percentage - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_baseline() {
        let result = compare(50.0, 0.0);
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.status, ComparisonStatus::Normal);

        // only an exact zero is treated as missing
        let tiny = compare(1.0, 1e-17);
        assert_eq!(tiny.status, ComparisonStatus::Above);
        assert!(tiny.percentage > 1e6);
    }

    #[test]
    fn test_window_stats_identical_timestamps() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window =
            vec![Reading::new(ts, "a", "A", 2.0, 20.0, 1), Reading::new(ts, "a", "A", 4.0, 20.0, 1)];

        let stats = WindowStats::from_window(&window).unwrap();
        assert_eq!(stats.slope, 0.0);
        assert_eq!(stats.mean, 3.0);

        let empty: Vec<Reading> = Vec::new();
        assert!(WindowStats::from_window(&empty).is_none());
    }

    #[test]
    fn test_compare_zone_no_data() {
        let unavailable = BaselineState::Unavailable { reason: "missing file".to_string() };
        assert!(matches!(compare_zone(&unavailable, "a", 10.0), ZoneComparison::NoData { .. }));

        let ready = BaselineState::Ready(compute_baselines(&[]));
        assert!(matches!(compare_zone(&ready, "a", 10.0), ZoneComparison::NoData { .. }));
    }
}

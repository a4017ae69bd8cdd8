//! Hybrid threshold + percent-change anomaly detection.
//!
//! Rules run in a fixed order and the first one that fires wins:
//!
//! 1. Spike threshold: `energy > max * 1.5` (critical above `max * 2`)
//! 2. Drop threshold: `energy < min * 0.5` (critical below `min * 0.3`)
//! 3. Pattern change against the previous reading of the same zone: `|Δ| / prev > 30%`
//!    (critical above 50%)
//!
//! The previous reading is the previous one *received* for the zone, not the previous one
//! by timestamp.

use crate::core::{Anomaly, AnomalyType, Reading, Severity, ZoneRange};
use crate::registry::ZoneRegistry;

pub const SPIKE_THRESHOLD_FACTOR: f64 = 1.5;
pub const SPIKE_CRITICAL_FACTOR: f64 = 2.0;
pub const DROP_THRESHOLD_FACTOR: f64 = 0.5;
pub const DROP_CRITICAL_FACTOR: f64 = 0.3;
pub const PATTERN_CHANGE_THRESHOLD: f64 = 0.3;
pub const PATTERN_CHANGE_CRITICAL: f64 = 0.5;

type Rule = fn(&Reading, Option<&Reading>, &ZoneRange) -> Option<Anomaly>;

const RULES: [Rule; 3] = [spike_threshold, drop_threshold, pattern_change];

/// Evaluate a reading. Returns `None` when no range is known for the zone.
pub fn detect(
    reading: &Reading,
    previous: Option<&Reading>,
    range: Option<&ZoneRange>,
) -> Option<Anomaly> {
    let range = range?;
    RULES.iter().find_map(|rule| rule(reading, previous, range))
}

/// Evaluate a reading against the range registered for its zone.
pub fn detect_for_zone(
    reading: &Reading,
    previous: Option<&Reading>,
    registry: &ZoneRegistry,
) -> Option<Anomaly> {
    let range = registry.range(&reading.zone_id);
    detect(reading, previous, range.as_ref())
}

pub fn spike_threshold(
    reading: &Reading,
    _previous: Option<&Reading>,
    range: &ZoneRange,
) -> Option<Anomaly> {
    let threshold = range.max * SPIKE_THRESHOLD_FACTOR;
    if reading.energy_kw <= threshold {
        return None;
    }

    let severity = if reading.energy_kw > range.max * SPIKE_CRITICAL_FACTOR {
        Severity::Critical
    } else {
        Severity::Warning
    };
    Some(Anomaly::from_reading(reading, AnomalyType::Spike, threshold, severity))
}

pub fn drop_threshold(
    reading: &Reading,
    _previous: Option<&Reading>,
    range: &ZoneRange,
) -> Option<Anomaly> {
    let threshold = range.min * DROP_THRESHOLD_FACTOR;
    if reading.energy_kw >= threshold {
        return None;
    }

    let severity = if reading.energy_kw < range.min * DROP_CRITICAL_FACTOR {
        Severity::Critical
    } else {
        Severity::Warning
    };
    Some(Anomaly::from_reading(reading, AnomalyType::Drop, threshold, severity))
}

pub fn pattern_change(
    reading: &Reading,
    previous: Option<&Reading>,
    _range: &ZoneRange,
) -> Option<Anomaly> {
    let previous = previous.filter(|p| p.zone_id == reading.zone_id)?;

    // No relative change can be computed from a zero baseline
    if previous.energy_kw == 0.0 {
        return None;
    }

    let pct_change = (reading.energy_kw - previous.energy_kw).abs() / previous.energy_kw;
    if pct_change <= PATTERN_CHANGE_THRESHOLD {
        return None;
    }

    let anomaly_type =
        if reading.energy_kw > previous.energy_kw { AnomalyType::Spike } else { AnomalyType::Drop };
    let severity =
        if pct_change > PATTERN_CHANGE_CRITICAL { Severity::Critical } else { Severity::Warning };

    Some(Anomaly::from_reading(reading, anomaly_type, previous.energy_kw, severity))
}

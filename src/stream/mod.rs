pub mod anomaly_detector;
pub mod baseline;
pub mod comparator;

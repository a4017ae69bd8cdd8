pub mod anomaly_log;
pub mod history_store;

pub use anomaly_log::AnomalyLog;
pub use history_store::HistoryStore;

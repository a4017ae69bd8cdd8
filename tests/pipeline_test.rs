//! Ingestion Pipeline Integration Tests
//!
//! Drives `IngestionPipeline` with an in-process source so readings can be pushed
//! deterministically.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use zonewatch::config::MonitorConfig;
use zonewatch::core::{AnomalyType, Reading, Severity, ZoneRange};
use zonewatch::registry::ZoneRegistry;
use zonewatch::sources::stream_ingestion_pipeline::{IngestionPipeline, LiveMonitor};
use zonewatch::sources::stream_source::{
    ConnectionState, ConnectionStatus, ReadingCallback, ReadingSource, SourceMetrics, StreamError,
};
use zonewatch::stream::baseline::BaselineState;
use zonewatch::stream::comparator::{ComparisonStatus, ZoneComparison};

/// Test side of the in-process source.
#[derive(Clone)]
struct Feed {
    callback: Arc<Mutex<Option<ReadingCallback>>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    metrics: Arc<SourceMetrics>,
}

impl Feed {
    fn push(&self, reading: Reading) {
        self.metrics.record_received();
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(reading);
        }
    }
}

struct InProcessSource {
    feed: Feed,
    state_rx: watch::Receiver<ConnectionState>,
}

fn in_process_source() -> (InProcessSource, Feed) {
    let (state_tx, state_rx) = watch::channel(ConnectionState::default());
    let feed = Feed {
        callback: Arc::new(Mutex::new(None)),
        state_tx: Arc::new(state_tx),
        metrics: Arc::new(SourceMetrics::default()),
    };
    (InProcessSource { feed: feed.clone(), state_rx }, feed)
}

#[async_trait]
impl ReadingSource for InProcessSource {
    fn subscribe(&mut self, callback: ReadingCallback) -> Result<(), StreamError> {
        *self.feed.callback.lock().unwrap() = Some(callback);
        self.feed.state_tx.send_replace(ConnectionState::new(ConnectionStatus::Connected, 0));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), StreamError> {
        // the callback is left in place so late deliveries can be simulated
        self.feed.state_tx.send_replace(ConnectionState::new(ConnectionStatus::Disconnected, 0));
        Ok(())
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn metrics_handle(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.feed.metrics)
    }
}

fn reading(zone: &str, i: i64, kw: f64) -> Reading {
    let start = Utc.with_ymd_and_hms(2024, 8, 12, 6, 0, 0).unwrap();
    Reading::new(start + Duration::seconds(i), zone, &zone.to_uppercase(), kw, 23.0, 5)
}

fn pipeline(history_capacity: usize) -> (IngestionPipeline, Feed) {
    let config = MonitorConfig { history_capacity, ..Default::default() };
    let registry = ZoneRegistry::from_ranges(vec![
        ("office".to_string(), ZoneRange::new(20.0, 100.0)),
        ("server".to_string(), ZoneRange::new(50.0, 200.0)),
    ])
    .unwrap();

    let corpus: Vec<Reading> = (0..10).map(|i| reading("office", i, 60.0)).collect();
    let baselines = BaselineState::from_corpus(&corpus);

    let monitor =
        Arc::new(LiveMonitor::new(&config, Arc::new(registry), Arc::new(baselines)).unwrap());
    let (source, feed) = in_process_source();
    (IngestionPipeline::new(monitor, Box::new(source)), feed)
}

#[tokio::test]
async fn test_readings_flow_through_detection_and_storage() {
    let (pipeline, feed) = pipeline(100);
    pipeline.start().await.unwrap();
    assert_eq!(pipeline.connection_state().status, ConnectionStatus::Connected);

    feed.push(reading("office", 0, 60.0));
    feed.push(reading("server", 0, 120.0));
    feed.push(reading("office", 1, 320.0));

    let monitor = pipeline.monitor();
    assert_eq!(monitor.latest("office").unwrap().energy_kw, 320.0);
    assert_eq!(monitor.window("office").len(), 2);
    assert_eq!(monitor.zone_ids(), vec!["office".to_string(), "server".to_string()]);

    let anomalies = monitor.anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].anomaly_type, AnomalyType::Spike);
    assert_eq!(anomalies[0].severity, Severity::Critical);
    assert_eq!(anomalies[0].zone_name, "OFFICE");

    assert_eq!(pipeline.source_metrics().messages_received, 3);
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_anomalies_are_newest_first() {
    let (pipeline, feed) = pipeline(100);
    pipeline.start().await.unwrap();

    feed.push(reading("office", 0, 500.0));
    feed.push(reading("server", 1, 5.0));

    let anomalies = pipeline.monitor().anomalies();
    assert_eq!(anomalies.len(), 2);
    assert_eq!(anomalies[0].zone_id, "server");
    assert_eq!(anomalies[0].anomaly_type, AnomalyType::Drop);
    assert_eq!(anomalies[1].zone_id, "office");
}

#[tokio::test]
async fn test_comparison_against_baseline() {
    let (pipeline, feed) = pipeline(100);
    pipeline.start().await.unwrap();

    feed.push(reading("office", 0, 66.0));
    feed.push(reading("office", 1, 54.0));

    match pipeline.monitor().comparison("office") {
        ZoneComparison::Compared { baseline_kw, comparison, .. } => {
            assert_eq!(baseline_kw, 60.0);
            assert_eq!(comparison.status, ComparisonStatus::Below);
        }
        other => panic!("expected comparison, got {:?}", other),
    }

    // window mean is exactly the baseline
    match pipeline.monitor().window_comparison("office") {
        ZoneComparison::Compared { comparison, .. } => {
            assert_eq!(comparison.status, ComparisonStatus::Normal);
        }
        other => panic!("expected comparison, got {:?}", other),
    }

    // no corpus data for this zone
    feed.push(reading("server", 0, 100.0));
    assert!(matches!(pipeline.monitor().comparison("server"), ZoneComparison::NoData { .. }));
}

#[tokio::test]
async fn test_history_window_is_bounded_per_zone() {
    let (pipeline, feed) = pipeline(4);
    pipeline.start().await.unwrap();

    for i in 0..10 {
        feed.push(reading("office", i, 60.0));
    }
    feed.push(reading("server", 0, 100.0));

    let monitor = pipeline.monitor();
    let window = monitor.window("office");
    assert_eq!(window.len(), 4);
    assert_eq!(window[0].timestamp, reading("office", 6, 0.0).timestamp);
    assert_eq!(monitor.window("server").len(), 1);
    assert_eq!(monitor.window_stats("office").unwrap().count, 4);
}

#[tokio::test]
async fn test_no_state_change_after_shutdown() {
    let (pipeline, feed) = pipeline(100);
    pipeline.start().await.unwrap();
    feed.push(reading("office", 0, 60.0));

    pipeline.shutdown().await.unwrap();
    assert_eq!(pipeline.connection_state().status, ConnectionStatus::Disconnected);
    assert!(!pipeline.monitor().is_accepting());

    // a delivery racing the shutdown is ignored
    feed.push(reading("office", 1, 999.0));
    assert_eq!(pipeline.monitor().latest("office").unwrap().energy_kw, 60.0);
    assert!(pipeline.monitor().anomalies().is_empty());
}

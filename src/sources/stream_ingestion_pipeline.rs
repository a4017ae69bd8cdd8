use crate::config::MonitorConfig;
use crate::core::{Anomaly, Reading};
use crate::error::Result;
use crate::registry::ZoneRegistry;
use crate::sources::stream_source::{
    ConnectionState, ReadingCallback, ReadingSource, SourceMetrics, SourceMetricsSnapshot,
};
use crate::storage::{AnomalyLog, HistoryStore};
use crate::stream::anomaly_detector::detect_for_zone;
use crate::stream::baseline::BaselineState;
use crate::stream::comparator::{compare_zone, WindowStats, ZoneComparison};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Mutable per-stream state. Only `LiveMonitor::ingest` writes to it.
#[derive(Debug)]
pub struct LiveState {
    pub history: HistoryStore,
    pub anomalies: AnomalyLog,
}

/// Detection + storage half of the pipeline, shared with the source callback and readers.
pub struct LiveMonitor {
    registry: Arc<ZoneRegistry>,
    baselines: Arc<BaselineState>,
    state: RwLock<LiveState>,
    accepting: AtomicBool,
    registered_zones_only: bool,
}

impl LiveMonitor {
    pub fn new(
        config: &MonitorConfig,
        registry: Arc<ZoneRegistry>,
        baselines: Arc<BaselineState>,
    ) -> Result<Self> {
        Ok(Self {
            registry,
            baselines,
            state: RwLock::new(LiveState {
                history: HistoryStore::new(config.history_capacity)?,
                anomalies: AnomalyLog::new(config.anomaly_log_capacity)?,
            }),
            accepting: AtomicBool::new(true),
            registered_zones_only: config.registered_zones_only,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, LiveState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a reading through detection and store it, atomically with respect to other
    /// readings. Returns the anomaly it raised, if any.
    pub fn ingest(&self, reading: Reading) -> Option<Anomaly> {
        let mut state = self.write();
        if !self.accepting.load(Ordering::Acquire) {
            return None;
        }

        let anomaly = {
            let previous = state.history.latest(&reading.zone_id);
            detect_for_zone(&reading, previous, &self.registry)
        };

        if self.registry.range(&reading.zone_id).is_none() {
            if self.registered_zones_only {
                debug!(zone_id = %reading.zone_id, "unregistered zone, reading dropped");
                return None;
            }
            debug!(zone_id = %reading.zone_id, "no range registered, detection skipped");
        }

        state.history.append(reading);

        if let Some(anomaly) = &anomaly {
            warn!(
                zone_id = %anomaly.zone_id,
                kind = %anomaly.anomaly_type,
                severity = %anomaly.severity,
                value = anomaly.value,
                threshold = anomaly.threshold,
                "anomaly detected"
            );
            state.anomalies.push(anomaly.clone());
        }

        anomaly
    }

    /// Stop accepting readings. Later calls to `ingest` are ignored.
    pub fn close(&self) {
        let _state = self.write();
        self.accepting.store(false, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn latest(&self, zone_id: &str) -> Option<Reading> {
        self.read().history.latest(zone_id).cloned()
    }

    pub fn window(&self, zone_id: &str) -> Vec<Reading> {
        self.read().history.window_snapshot(zone_id)
    }

    pub fn window_stats(&self, zone_id: &str) -> Option<WindowStats> {
        let state = self.read();
        state.history.window(zone_id).and_then(WindowStats::from_window)
    }

    /// Anomalies, newest first.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.read().anomalies.latest_first()
    }

    /// Zones seen on the stream.
    pub fn zone_ids(&self) -> Vec<String> {
        self.read().history.zone_ids()
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn baselines(&self) -> &BaselineState {
        &self.baselines
    }

    /// Latest reading of a zone compared with its baseline average.
    pub fn comparison(&self, zone_id: &str) -> ZoneComparison {
        match self.latest(zone_id) {
            Some(reading) => compare_zone(&self.baselines, zone_id, reading.energy_kw),
            None => ZoneComparison::NoData { reason: format!("no readings for zone {}", zone_id) },
        }
    }

    /// Mean of a zone's window compared with its baseline average.
    pub fn window_comparison(&self, zone_id: &str) -> ZoneComparison {
        match self.window_stats(zone_id) {
            Some(stats) => compare_zone(&self.baselines, zone_id, stats.mean),
            None => ZoneComparison::NoData { reason: format!("no readings for zone {}", zone_id) },
        }
    }
}

/// Wires a reading source into a `LiveMonitor`.
pub struct IngestionPipeline {
    monitor: Arc<LiveMonitor>,
    source: Mutex<Box<dyn ReadingSource>>,
    state_rx: watch::Receiver<ConnectionState>,
    metrics: Arc<SourceMetrics>,
}

impl IngestionPipeline {
    pub fn new(monitor: Arc<LiveMonitor>, source: Box<dyn ReadingSource>) -> Self {
        let state_rx = source.watch_state();
        let metrics = source.metrics_handle();
        IngestionPipeline { monitor, source: Mutex::new(source), state_rx, metrics }
    }

    /// Subscribe the source. Every reading it delivers goes through `LiveMonitor::ingest`.
    pub async fn start(&self) -> Result<()> {
        let monitor = Arc::clone(&self.monitor);
        let callback: ReadingCallback = Arc::new(move |reading: Reading| {
            monitor.ingest(reading);
        });

        self.source.lock().await.subscribe(callback)?;
        info!("ingestion pipeline started");
        Ok(())
    }

    /// Stop the source, then close the monitor. Once this returns no further state change
    /// is observable.
    pub async fn shutdown(&self) -> Result<()> {
        let result = self.source.lock().await.stop().await;
        self.monitor.close();
        info!("ingestion pipeline stopped");
        result?;
        Ok(())
    }

    pub fn monitor(&self) -> &Arc<LiveMonitor> {
        &self.monitor
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn source_metrics(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

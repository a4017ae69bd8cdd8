//! HTTP API Integration Tests
//!
//! Serves the router on an ephemeral port and queries it with reqwest.

use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use zonewatch::config::MonitorConfig;
use zonewatch::core::{Reading, ZoneRange};
use zonewatch::http::create_server;
use zonewatch::registry::ZoneRegistry;
use zonewatch::sources::backoff::ReconnectPolicy;
use zonewatch::sources::stream_ingestion_pipeline::{IngestionPipeline, LiveMonitor};
use zonewatch::sources::websocket_adapter::{WebSocketSource, WebSocketSourceConfig};
use zonewatch::stream::baseline::BaselineState;

fn reading(zone: &str, i: i64, kw: f64) -> Reading {
    let start = Utc.with_ymd_and_hms(2024, 9, 3, 14, 0, 0).unwrap();
    Reading::new(start + Duration::seconds(i), zone, "Office", kw, 22.5, 8)
}

/// Pipeline whose source is never started, fed directly through the monitor.
fn pipeline(baselines: BaselineState) -> Arc<IngestionPipeline> {
    let registry =
        ZoneRegistry::from_ranges(vec![("office".to_string(), ZoneRange::new(20.0, 100.0))])
            .unwrap();
    let monitor = Arc::new(
        LiveMonitor::new(&MonitorConfig::default(), Arc::new(registry), Arc::new(baselines))
            .unwrap(),
    );
    let source = WebSocketSource::new(WebSocketSourceConfig::new(
        "ws://127.0.0.1:9",
        ReconnectPolicy::default(),
    ));
    Arc::new(IngestionPipeline::new(monitor, Box::new(source)))
}

async fn serve(pipeline: Arc<IngestionPipeline>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_server(pipeline);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn get(addr: SocketAddr, path: &str) -> (u16, Value) {
    let response = reqwest::get(format!("http://{}{}", addr, path)).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_health_and_status() {
    let pipeline = pipeline(BaselineState::from_corpus(&[]));
    pipeline.monitor().ingest(reading("office", 0, 50.0));
    let addr = serve(pipeline).await;

    let (status, body) = get(addr, "/health").await;
    assert_eq!(status, 200);
    assert!(body["message"].as_str().unwrap().contains("running"));

    let (status, body) = get(addr, "/api/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["connection"]["status"], "disconnected");
    assert_eq!(body["connection"]["reconnectAttempts"], 0);
    assert_eq!(body["metrics"]["messagesReceived"], 0);
    assert_eq!(body["zones_tracked"], 1);
    assert_eq!(body["anomalies_logged"], 0);
    assert_eq!(body["baselines_available"], true);
}

#[tokio::test]
async fn test_zone_endpoints() {
    let pipeline = pipeline(BaselineState::from_corpus(&[]));
    let monitor = pipeline.monitor();
    monitor.ingest(reading("office", 0, 50.0));
    monitor.ingest(reading("office", 1, 55.0));
    monitor.ingest(reading("lobby", 0, 12.0));
    let addr = serve(Arc::clone(&pipeline)).await;

    let (status, body) = get(addr, "/api/zones").await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 2);
    assert_eq!(body["zones"][0]["zone_id"], "lobby");
    assert!(body["zones"][0]["range"].is_null());
    assert_eq!(body["zones"][1]["zone_id"], "office");
    assert_eq!(body["zones"][1]["range"]["max"], 100.0);
    assert_eq!(body["zones"][1]["latest"]["energyKw"], 55.0);

    let (status, body) = get(addr, "/api/zones/office/latest").await;
    assert_eq!(status, 200);
    assert_eq!(body["zoneId"], "office");
    assert_eq!(body["energyKw"], 55.0);

    let (status, body) = get(addr, "/api/zones/office/window").await;
    assert_eq!(status, 200);
    assert_eq!(body["readings"].as_array().unwrap().len(), 2);
    assert_eq!(body["stats"]["count"], 2);
    assert_eq!(body["stats"]["mean"], 52.5);
}

#[tokio::test]
async fn test_unknown_zone_is_not_found() {
    let addr = serve(pipeline(BaselineState::from_corpus(&[]))).await;

    for path in ["/api/zones/nope/latest", "/api/zones/nope/window", "/api/zones/nope/comparison"]
    {
        let (status, body) = get(addr, path).await;
        assert_eq!(status, 404, "{}", path);
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    // registered but not yet seen: empty window rather than 404
    let (status, body) = get(addr, "/api/zones/office/window").await;
    assert_eq!(status, 200);
    assert!(body["readings"].as_array().unwrap().is_empty());
    assert!(body["stats"].is_null());
}

#[tokio::test]
async fn test_comparison_and_baselines() {
    let corpus: Vec<Reading> = (0..4).map(|i| reading("office", i, 40.0)).collect();
    let pipeline = pipeline(BaselineState::from_corpus(&corpus));
    pipeline.monitor().ingest(reading("office", 10, 50.0));
    let addr = serve(pipeline).await;

    let (status, body) = get(addr, "/api/zones/office/comparison").await;
    assert_eq!(status, 200);
    assert_eq!(body["latest"]["status"], "compared");
    assert_eq!(body["latest"]["baselineKw"], 40.0);
    assert_eq!(body["latest"]["currentKw"], 50.0);
    assert_eq!(body["latest"]["comparison"]["status"], "above");
    assert_eq!(body["window"]["status"], "compared");

    let (status, body) = get(addr, "/api/baselines").await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 1);
    assert_eq!(body["baselines"][0]["zoneId"], "office");
    assert_eq!(body["baselines"][0]["dataPoints"], 4);
}

#[tokio::test]
async fn test_unavailable_baselines() {
    let unavailable = BaselineState::Unavailable { reason: "corpus missing".to_string() };
    let pipeline = pipeline(unavailable);
    pipeline.monitor().ingest(reading("office", 0, 50.0));
    let addr = serve(pipeline).await;

    let (status, body) = get(addr, "/api/zones/office/comparison").await;
    assert_eq!(status, 200);
    assert_eq!(body["latest"]["status"], "no_data");
    assert!(body["latest"]["reason"].as_str().unwrap().contains("corpus missing"));

    let (status, body) = get(addr, "/api/baselines").await;
    assert_eq!(status, 503);
    assert!(body["error"].as_str().unwrap().contains("corpus missing"));
}

#[tokio::test]
async fn test_anomaly_log_endpoint() {
    let pipeline = pipeline(BaselineState::from_corpus(&[]));
    let monitor = pipeline.monitor();
    monitor.ingest(reading("office", 0, 50.0));
    monitor.ingest(reading("office", 1, 300.0));
    monitor.ingest(reading("office", 2, 5.0));
    let addr = serve(Arc::clone(&pipeline)).await;

    let (status, body) = get(addr, "/api/anomalies").await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 2);
    assert_eq!(body["anomalies"][0]["type"], "drop");
    assert_eq!(body["anomalies"][1]["type"], "spike");
    assert_eq!(body["anomalies"][1]["severity"], "critical");
}

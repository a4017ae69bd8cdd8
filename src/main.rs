//! Zonewatch monitor binary
//!
//! Connects to a WebSocket reading feed, runs anomaly detection and baseline comparison on
//! every reading and serves the live state over HTTP.
//!
//! Usage:
//!   cargo run --bin zonewatch -- --feed-url ws://127.0.0.1:9001 --zones-file zones.json \
//!     --corpus-file corpus.json --port 8080

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use zonewatch::{
    config::{
        MonitorConfig, DEFAULT_ANOMALY_LOG_CAPACITY, DEFAULT_BASE_DELAY_MS,
        DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_DELAY_MS,
    },
    http::start_server,
    registry::ZoneRegistry,
    sources::{
        backoff::ReconnectPolicy,
        stream_ingestion_pipeline::{IngestionPipeline, LiveMonitor},
        websocket_adapter::{WebSocketSource, WebSocketSourceConfig},
    },
    stream::baseline::BaselineState,
};

#[derive(Parser, Debug)]
#[command(name = "zonewatch")]
#[command(about = "Live per-zone energy monitoring with anomaly detection", long_about = None)]
struct Args {
    /// WebSocket feed delivering one JSON reading per message
    #[arg(long, env = "ZONEWATCH_FEED_URL", default_value = "ws://127.0.0.1:9001")]
    feed_url: String,

    /// JSON object of zone id to { name, range: { min, max } }
    #[arg(long, env = "ZONEWATCH_ZONES_FILE")]
    zones_file: Option<String>,

    /// JSON array of historical readings used for baselines
    #[arg(long, env = "ZONEWATCH_CORPUS_FILE")]
    corpus_file: Option<String>,

    #[arg(long, env = "ZONEWATCH_HISTORY_CAPACITY", default_value_t = DEFAULT_HISTORY_CAPACITY)]
    history_capacity: usize,

    #[arg(
        long,
        env = "ZONEWATCH_ANOMALY_LOG_CAPACITY",
        default_value_t = DEFAULT_ANOMALY_LOG_CAPACITY
    )]
    anomaly_log_capacity: usize,

    #[arg(long, env = "ZONEWATCH_BASE_DELAY_MS", default_value_t = DEFAULT_BASE_DELAY_MS)]
    base_delay_ms: u64,

    #[arg(long, env = "ZONEWATCH_MAX_DELAY_MS", default_value_t = DEFAULT_MAX_DELAY_MS)]
    max_delay_ms: u64,

    /// Give up after this many consecutive failed connections (unbounded when omitted)
    #[arg(long, env = "ZONEWATCH_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Drop readings for zones missing from the zones file
    #[arg(long, env = "ZONEWATCH_REGISTERED_ZONES_ONLY")]
    registered_zones_only: bool,

    #[arg(short = 'H', long, env = "ZONEWATCH_HTTP_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, env = "ZONEWATCH_HTTP_PORT", default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = MonitorConfig {
        feed_url: args.feed_url,
        history_capacity: args.history_capacity,
        anomaly_log_capacity: args.anomaly_log_capacity,
        reconnect: ReconnectPolicy::new(
            Duration::from_millis(args.base_delay_ms),
            Duration::from_millis(args.max_delay_ms),
            args.max_attempts,
        ),
        registered_zones_only: args.registered_zones_only,
    };
    config.validate()?;

    let registry = match &args.zones_file {
        Some(path) => {
            let registry = ZoneRegistry::load_from_file(path)?;
            info!(path = %path, zones = registry.len(), "zone registry loaded");
            registry
        }
        None => {
            warn!("no zones file given, anomaly detection is disabled for every zone");
            ZoneRegistry::new()
        }
    };

    let baselines = match &args.corpus_file {
        Some(path) => BaselineState::from_corpus_file(path),
        None => {
            warn!("no corpus file given, baseline comparison is unavailable");
            BaselineState::Unavailable { reason: "no corpus configured".to_string() }
        }
    };

    let monitor = Arc::new(LiveMonitor::new(&config, Arc::new(registry), Arc::new(baselines))?);
    let source_config = WebSocketSourceConfig::new(&config.feed_url, config.reconnect.clone());
    let source = WebSocketSource::new(source_config);
    let pipeline = Arc::new(IngestionPipeline::new(monitor, Box::new(source)));

    pipeline.start().await?;
    info!(feed_url = %config.feed_url, "monitoring feed");

    let addr = format!("{}:{}", args.host, args.port);

    tokio::select! {
        result = start_server(&addr, Arc::clone(&pipeline)) => {
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        }
    }

    pipeline.shutdown().await?;
    info!("zonewatch stopped");
    Ok(())
}

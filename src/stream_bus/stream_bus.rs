//! Stream Bus that replays recorded readings from a file to WebSocket clients.
//!
//! The bus does the following things:
//! 1. Reads the readings from a JSON-lines or JSON-array file.
//! 2. Accepts WebSocket clients on a TCP listener.
//! 3. Replays every reading to each client at the configured rate, optionally re-stamped
//!    with the current time and looped forever.
//! 4. Closes the client connection when a non-looping replay ends.

use crate::core::encoding::encode_reading;
use crate::core::Reading;
use chrono::Utc;
use futures_util::SinkExt;
use std::fs;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Time open clients get to finish after shutdown before their tasks are aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Upper bound on sending the close frame to a client.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for the Stream Bus
#[derive(Debug, Clone)]
pub struct StreamBusConfig {
    pub input_file: String,
    pub bind_addr: String,
    /// Readings per second for each client, 0 means unlimited.
    pub rate_of_publishing: u64,
    pub loop_file: bool,
    /// Replace each reading's timestamp with the time it is sent.
    pub add_timestamps: bool,
}

impl Default for StreamBusConfig {
    fn default() -> Self {
        Self {
            input_file: "data/readings.jsonl".to_string(),
            bind_addr: "127.0.0.1:9001".to_string(),
            rate_of_publishing: 1,
            loop_file: false,
            add_timestamps: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamBusMetrics {
    pub events_read: u64,
    pub events_published: u64,
    pub publish_errors: u64,
    pub clients_served: u64,
    pub elapsed_seconds: f64,
}

impl StreamBusMetrics {
    pub fn events_per_second(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.events_published as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    pub fn publish_success_rate(&self) -> f64 {
        let attempted = self.events_published + self.publish_errors;
        if attempted > 0 {
            (self.events_published as f64 / attempted as f64) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Error)]
pub enum StreamBusError {
    #[error("File Error: {0}")]
    FileError(String),
    #[error("Bind Error: {0}")]
    BindError(String),
    #[error("Config Error: {0}")]
    ConfigError(String),
}

#[derive(Debug, Default)]
struct Counters {
    events_read: AtomicU64,
    events_published: AtomicU64,
    publish_errors: AtomicU64,
    clients_served: AtomicU64,
}

pub struct StreamBus {
    config: StreamBusConfig,
    readings: Arc<Vec<Reading>>,
    listener: TcpListener,
    counters: Arc<Counters>,
}

impl StreamBus {
    /// Load the input file and bind the listener. Port 0 picks a free port.
    pub async fn bind(config: StreamBusConfig) -> Result<Self, StreamBusError> {
        let readings = load_readings(&config.input_file)?;
        Self::bind_with_readings(config, readings).await
    }

    /// Bind the listener and replay `readings` instead of reading `input_file`.
    pub async fn bind_with_readings(
        config: StreamBusConfig,
        readings: Vec<Reading>,
    ) -> Result<Self, StreamBusError> {
        if readings.is_empty() {
            return Err(StreamBusError::ConfigError("no readings to replay".to_string()));
        }

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| StreamBusError::BindError(format!("{}: {}", config.bind_addr, e)))?;

        let counters = Counters::default();
        counters.events_read.store(readings.len() as u64, Ordering::Relaxed);

        Ok(Self { config, readings: Arc::new(readings), listener, counters: Arc::new(counters) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StreamBusError> {
        self.listener.local_addr().map_err(|e| StreamBusError::BindError(e.to_string()))
    }

    /// `ws://` URL clients should connect to.
    pub fn url(&self) -> Result<String, StreamBusError> {
        Ok(format!("ws://{}", self.local_addr()?))
    }

    pub fn config(&self) -> &StreamBusConfig {
        &self.config
    }

    /// Accept and serve clients until `shutdown` resolves. Open client connections are closed
    /// before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> StreamBusMetrics
    where
        F: Future<Output = ()>,
    {
        info!(
            input = %self.config.input_file,
            addr = %self.config.bind_addr,
            readings = self.readings.len(),
            rate_hz = self.config.rate_of_publishing,
            loop_file = self.config.loop_file,
            "stream bus started"
        );

        let start_time = Instant::now();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut clients = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.counters.clients_served.fetch_add(1, Ordering::Relaxed);
                        clients.spawn(serve_client(
                            stream,
                            peer,
                            self.config.clone(),
                            Arc::clone(&self.readings),
                            Arc::clone(&self.counters),
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "failed to accept client"),
                },
                Some(_) = clients.join_next(), if !clients.is_empty() => {}
            }
        }

        stop_tx.send_replace(true);
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while clients.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = clients.len(), "aborting clients that did not stop in time");
            clients.shutdown().await;
        }

        let metrics = self.snapshot(start_time.elapsed().as_secs_f64());
        info!(
            published = metrics.events_published,
            errors = metrics.publish_errors,
            clients = metrics.clients_served,
            "stream bus stopped"
        );
        metrics
    }

    fn snapshot(&self, elapsed_seconds: f64) -> StreamBusMetrics {
        StreamBusMetrics {
            events_read: self.counters.events_read.load(Ordering::Relaxed),
            events_published: self.counters.events_published.load(Ordering::Relaxed),
            publish_errors: self.counters.publish_errors.load(Ordering::Relaxed),
            clients_served: self.counters.clients_served.load(Ordering::Relaxed),
            elapsed_seconds,
        }
    }
}

/// Read readings from a JSON array file or a JSON-lines file. Blank lines are skipped.
pub fn load_readings(path: impl AsRef<Path>) -> Result<Vec<Reading>, StreamBusError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| StreamBusError::FileError(format!("{}: {}", path.display(), e)))?;
    parse_readings(&contents)
        .map_err(|e| StreamBusError::FileError(format!("{}: {}", path.display(), e)))
}

pub fn parse_readings(contents: &str) -> Result<Vec<Reading>, serde_json::Error> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents);
    }

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str)
        .collect()
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    config: StreamBusConfig,
    readings: Arc<Vec<Reading>>,
    counters: Arc<Counters>,
    mut stop: watch::Receiver<bool>,
) {
    let handshake = tokio::select! {
        _ = stop.changed() => return,
        result = tokio_tungstenite::accept_async(stream) => result,
    };
    let mut ws = match handshake {
        Ok(ws) => ws,
        Err(e) => {
            warn!(peer = %peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    info!(peer = %peer, "client connected");

    let delay = (config.rate_of_publishing > 0)
        .then(|| Duration::from_secs_f64(1.0 / config.rate_of_publishing as f64));

    'replay: loop {
        for reading in readings.iter() {
            if *stop.borrow() {
                break 'replay;
            }

            let payload = if config.add_timestamps {
                let mut restamped = reading.clone();
                restamped.timestamp = Utc::now();
                encode_reading(&restamped)
            } else {
                encode_reading(reading)
            };

            let sent = match payload {
                Ok(text) => tokio::select! {
                    _ = stop.changed() => break 'replay,
                    result = ws.send(Message::Text(text)) => result.map_err(|e| e.to_string()),
                },
                Err(e) => Err(e.to_string()),
            };
            match sent {
                Ok(()) => {
                    counters.events_published.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.publish_errors.fetch_add(1, Ordering::Relaxed);
                    debug!(peer = %peer, error = %e, "client went away");
                    return;
                }
            }

            if let Some(delay) = delay {
                tokio::select! {
                    _ = stop.changed() => break 'replay,
                    () = sleep(delay) => {}
                }
            }
        }

        if !config.loop_file {
            break;
        }
    }

    // a client that stopped reading must not hold up shutdown
    let _ = tokio::time::timeout(CLOSE_TIMEOUT, ws.close(None)).await;
    info!(peer = %peer, "client disconnected");
}

//! WebSocket reading source with exponential backoff reconnects.
//!
//! One tokio task owns the socket, the retry timer and the connection state. Consumers
//! only observe the state through a `watch` channel. Status transitions:
//!
//! - `Connecting -> Connected` when the handshake completes
//! - `Connecting -> Error` when the handshake fails
//! - `Connected -> Disconnected` when an open connection closes or errors
//! - `Disconnected | Error -> Connecting` when the retry timer fires

use crate::core::encoding::decode_reading_bytes;
use crate::sources::backoff::ReconnectPolicy;
use crate::sources::stream_source::{
    ConnectionState, ConnectionStatus, ReadingCallback, ReadingSource, SourceMetrics, StreamError,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for a WebSocket feed
#[derive(Debug, Clone)]
pub struct WebSocketSourceConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
}

impl WebSocketSourceConfig {
    pub fn new(url: &str, reconnect: ReconnectPolicy) -> Self {
        Self { url: url.to_string(), reconnect }
    }
}

pub struct WebSocketSource {
    config: WebSocketSourceConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    metrics: Arc<SourceMetrics>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

enum SessionEnd {
    Shutdown,
    Closed(String),
}

impl WebSocketSource {
    pub fn new(config: WebSocketSourceConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        Self {
            config,
            state_tx: Arc::new(state_tx),
            state_rx,
            metrics: Arc::new(SourceMetrics::default()),
            shutdown_tx: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl ReadingSource for WebSocketSource {
    fn subscribe(&mut self, callback: ReadingCallback) -> Result<(), StreamError> {
        if self.task.is_some() {
            return Err(StreamError::SubscriptionError(format!(
                "source for '{}' is already subscribed",
                self.config.url
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StreamError::Other(format!("no tokio runtime: {}", e)))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = runtime.spawn(run_connection_loop(
            self.config.clone(),
            Arc::clone(&self.state_tx),
            Arc::clone(&self.metrics),
            callback,
            shutdown_rx,
        ));

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), StreamError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // The task may already have given up; a closed channel is fine.
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| StreamError::Other(format!("feed task failed: {}", e)))?;
        }
        Ok(())
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn metrics_handle(&self) -> Arc<SourceMetrics> {
        Arc::clone(&self.metrics)
    }
}

fn publish(state_tx: &watch::Sender<ConnectionState>, status: ConnectionStatus, attempts: u32) {
    state_tx.send_replace(ConnectionState::new(status, attempts));
}

async fn run_connection_loop(
    config: WebSocketSourceConfig,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    metrics: Arc<SourceMetrics>,
    callback: ReadingCallback,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut failures: u32 = 0;

    loop {
        publish(&state_tx, ConnectionStatus::Connecting, failures);
        debug!(url = %config.url, attempt = failures, "connecting to feed");

        let handshake = tokio::select! {
            _ = &mut shutdown => {
                publish(&state_tx, ConnectionStatus::Disconnected, failures);
                return;
            }
            result = connect_async(config.url.as_str()) => result,
        };

        match handshake {
            Ok((stream, _response)) => {
                failures = 0;
                publish(&state_tx, ConnectionStatus::Connected, failures);
                info!(url = %config.url, "feed connected");

                match run_session(stream, &callback, &metrics, &mut shutdown).await {
                    SessionEnd::Shutdown => {
                        publish(&state_tx, ConnectionStatus::Disconnected, failures);
                        info!(url = %config.url, "feed stopped");
                        return;
                    }
                    SessionEnd::Closed(reason) => {
                        failures = failures.saturating_add(1);
                        publish(&state_tx, ConnectionStatus::Disconnected, failures);
                        warn!(url = %config.url, reason = %reason, "feed connection lost");
                    }
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                publish(&state_tx, ConnectionStatus::Error, failures);
                warn!(url = %config.url, attempt = failures, error = %e, "feed handshake failed");
            }
        }

        let Some(delay) = config.reconnect.next_delay(failures) else {
            warn!(url = %config.url, attempts = failures, "reconnect attempts exhausted");
            return;
        };

        debug!(url = %config.url, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        tokio::select! {
            _ = &mut shutdown => {
                publish(&state_tx, ConnectionStatus::Disconnected, failures);
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

async fn run_session(
    stream: FeedStream,
    callback: &ReadingCallback,
    metrics: &SourceMetrics,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut sink, mut frames) = stream.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_payload(text.as_bytes(), callback, metrics),
                Some(Ok(Message::Binary(bytes))) => handle_payload(&bytes, callback, metrics),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "closed by peer".to_string(),
                        |f| format!("closed by peer: {} {}", f.code, f.reason),
                    );
                    return SessionEnd::Closed(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Closed(e.to_string()),
                None => return SessionEnd::Closed("stream ended".to_string()),
            }
        }
    }
}

fn handle_payload(payload: &[u8], callback: &ReadingCallback, metrics: &SourceMetrics) {
    metrics.record_received();
    match decode_reading_bytes(payload) {
        Ok(reading) => callback(reading),
        Err(e) => {
            metrics.record_malformed();
            warn!(error = %e, "dropping malformed feed message");
        }
    }
}

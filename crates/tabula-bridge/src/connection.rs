//! Tracker connection lifecycle.
//!
//! One supervise task owns the socket and walks the state machine
//! `Disconnected → Connecting → Connected → Disconnected`. On an abnormal
//! close the task sleeps for the configured delay and reconnects — at most
//! one retry is ever pending because the same task does both. A normal
//! close (code 1000) or a cancellation ends the task without retrying.
//!
//! Decoded messages flow into an mpsc channel; the bridge controller owns
//! the receiving end and serializes all observation handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use tabula_core::errors::TransportError;
use tabula_core::time::now_ms;
use tabula_protocol::close::CloseKind;
use tabula_protocol::messages::{Decoded, ReadyAnnounce, TrackerMessage, decode, encode};

use crate::config::BridgeConfig;
use crate::host::{NoticeLevel, TabletopHost};

/// Delay between an explicit `reconnect()` and the fresh connect attempt.
const RECONNECT_KICK_MS: u64 = 500;

/// Connection status of the primary tracker link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection and none in progress.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Handshake sent, receive loop running.
    Connected,
}

/// Snapshot of the connection state for diagnostics.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ConnectionState {
    /// Current status.
    pub status: ConnectionStatus,
    /// When the last connect attempt started (epoch milliseconds).
    pub last_attempt_at_ms: u64,
    /// Failed attempts since the last explicit `reconnect()`.
    pub reconnect_attempts: u32,
}

/// Shared connection state. Written only by the supervise task, read
/// concurrently by status queries; reads never block on a write in
/// progress beyond the short lock hold.
#[derive(Debug)]
pub struct ConnectionStateCell {
    status: RwLock<ConnectionStatus>,
    last_attempt_at_ms: AtomicU64,
    reconnect_attempts: AtomicU32,
}

impl Default for ConnectionStateCell {
    fn default() -> Self {
        Self {
            status: RwLock::new(ConnectionStatus::Disconnected),
            last_attempt_at_ms: AtomicU64::new(0),
            reconnect_attempts: AtomicU32::new(0),
        }
    }
}

impl ConnectionStateCell {
    /// Create a cell in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
    }

    fn mark_attempt(&self, at_ms: u64) {
        self.last_attempt_at_ms.store(at_ms, Ordering::Relaxed);
    }

    fn bump_attempts(&self) -> u32 {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn reset_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Point-in-time snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionState {
        ConnectionState {
            status: self.status(),
            last_attempt_at_ms: self.last_attempt_at_ms.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}

/// How one connected session ended.
enum SessionEnd {
    /// Shutdown or explicit reconnect; never retried here.
    Cancelled,
    /// The connection closed; the kind decides the retry.
    Closed(CloseKind),
}

struct Inner {
    config: BridgeConfig,
    host: Arc<dyn TabletopHost>,
    state: Arc<ConnectionStateCell>,
    tx: mpsc::Sender<TrackerMessage>,
}

/// Owns the tracker connection lifecycle.
pub struct ConnectionManager {
    inner: Arc<Inner>,
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager. Call [`connect`](Self::connect) to start it.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        host: Arc<dyn TabletopHost>,
        state: Arc<ConnectionStateCell>,
        tx: mpsc::Sender<TrackerMessage>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                host,
                state,
                tx,
            }),
            cancel: Mutex::new(CancellationToken::new()),
            task: Mutex::new(None),
        }
    }

    /// Start the supervise task. Idempotent while a task is running.
    pub fn connect(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(run_loop(inner, cancel)));
    }

    /// Force-close any live connection and connect afresh.
    ///
    /// Cancels a pending automatic retry (no double reconnection) and is
    /// the only path that resets the attempt counter.
    pub async fn reconnect(&self) {
        let handle = {
            self.cancel.lock().cancel();
            self.task.lock().take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.state.reset_attempts();
        tracing::info!("reconnect requested");
        sleep(Duration::from_millis(RECONNECT_KICK_MS)).await;
        self.connect();
    }

    /// Stop the supervise task and close the connection without retrying.
    pub async fn shutdown(&self) {
        let handle = {
            self.cancel.lock().cancel();
            self.task.lock().take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Diagnostics snapshot.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.snapshot()
    }

    /// Open an independent, short-lived probe connection.
    ///
    /// Never touches the primary connection's state; the probe is closed
    /// (or abandoned at its deadline) regardless of outcome.
    pub async fn test_connection(&self) -> bool {
        probe(
            &self.inner.config.tracker_url(),
            Duration::from_millis(self.inner.config.probe_timeout_ms),
        )
        .await
    }
}

/// Probe a tracker URL with a bounded timeout.
pub async fn probe(url: &str, deadline: Duration) -> bool {
    match timeout(deadline, connect_async(url)).await {
        Ok(Ok((mut stream, _))) => {
            let _ = stream.close(None).await;
            true
        }
        Ok(Err(e)) => {
            tracing::debug!(url, error = %e, "probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(url, "probe timed out");
            false
        }
    }
}

async fn run_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let url = inner.config.tracker_url();
    loop {
        inner.state.set_status(ConnectionStatus::Connecting);
        inner.state.mark_attempt(now_ms());

        let connect_deadline = Duration::from_millis(inner.config.connect_timeout_ms);
        let attempt = tokio::select! {
            () = cancel.cancelled() => {
                inner.state.set_status(ConnectionStatus::Disconnected);
                return;
            }
            result = timeout(connect_deadline, connect_async(&url)) => result,
        };

        let end = match attempt {
            Ok(Ok((stream, _response))) => session(&inner, stream, &cancel).await,
            Ok(Err(e)) => {
                let err = TransportError::Connect {
                    url: url.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(error = %err, "tracker connection failed");
                inner
                    .host
                    .notify(NoticeLevel::Warning, &format!("Marker tracker unreachable: {e}"));
                SessionEnd::Closed(CloseKind::Abnormal)
            }
            Err(_elapsed) => {
                let err = TransportError::ConnectTimeout {
                    url: url.clone(),
                    timeout_ms: inner.config.connect_timeout_ms,
                };
                tracing::warn!(error = %err, "tracker connection timed out");
                inner
                    .host
                    .notify(NoticeLevel::Warning, "Marker tracker connection timed out");
                SessionEnd::Closed(CloseKind::Abnormal)
            }
        };

        inner.state.set_status(ConnectionStatus::Disconnected);
        match end {
            SessionEnd::Cancelled => return,
            SessionEnd::Closed(CloseKind::Normal) => {
                tracing::info!("tracker closed the connection intentionally, not retrying");
                return;
            }
            SessionEnd::Closed(CloseKind::Abnormal) => {
                let attempts = inner.state.bump_attempts();
                tracing::info!(
                    attempts,
                    delay_ms = inner.config.reconnect_delay_ms,
                    "scheduling reconnect"
                );
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(Duration::from_millis(inner.config.reconnect_delay_ms)) => {}
                }
            }
        }
    }
}

/// Handshake, then pump inbound frames until the connection ends.
async fn session(
    inner: &Inner,
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let announce = ReadyAnnounce::new(
        inner.host.active_scene().map(tabula_core::ids::SceneId::into_inner),
        inner.config.advertise_host.clone(),
        inner.config.advertise_port,
        inner.host.user_id(),
        inner.config.marker_system.clone(),
        now_ms(),
    );
    let frame = match encode(&announce) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(error = %e, "handshake encode failed");
            return SessionEnd::Closed(CloseKind::Abnormal);
        }
    };
    if let Err(e) = stream.send(Message::text(frame)).await {
        tracing::warn!(error = %e, "handshake send failed");
        return SessionEnd::Closed(CloseKind::Abnormal);
    }

    inner.state.set_status(ConnectionStatus::Connected);
    tracing::info!(url = %inner.config.tracker_url(), "connected to tracker");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = stream.close(None).await;
                return SessionEnd::Cancelled;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                    Ok(Decoded::Message(message)) => {
                        if inner.tx.send(message).await.is_err() {
                            // Dispatch loop is gone; the bridge is shutting down.
                            return SessionEnd::Cancelled;
                        }
                    }
                    Ok(Decoded::Ignored(kind)) => {
                        tracing::debug!(message_type = %kind, "ignoring unrecognized message");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding malformed message");
                    }
                },
                Some(Ok(Message::Close(close_frame))) => {
                    let code = close_frame.as_ref().map(|f| u16::from(f.code));
                    tracing::info!(code = ?code, "tracker closed the connection");
                    return SessionEnd::Closed(CloseKind::classify(code));
                }
                // Pings and pongs are answered by the library; binary
                // frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "receive error");
                    return SessionEnd::Closed(CloseKind::Abnormal);
                }
                None => return SessionEnd::Closed(CloseKind::Abnormal),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_cell_starts_disconnected() {
        let cell = ConnectionStateCell::new();
        assert_eq!(cell.status(), ConnectionStatus::Disconnected);
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.reconnect_attempts, 0);
        assert_eq!(snapshot.last_attempt_at_ms, 0);
    }

    #[test]
    fn attempts_bump_and_reset() {
        let cell = ConnectionStateCell::new();
        assert_eq!(cell.bump_attempts(), 1);
        assert_eq!(cell.bump_attempts(), 2);
        cell.reset_attempts();
        assert_eq!(cell.snapshot().reconnect_attempts, 0);
    }

    #[test]
    fn status_transitions_are_visible_to_readers() {
        let cell = ConnectionStateCell::new();
        cell.set_status(ConnectionStatus::Connecting);
        assert_eq!(cell.status(), ConnectionStatus::Connecting);
        cell.set_status(ConnectionStatus::Connected);
        assert_eq!(cell.status(), ConnectionStatus::Connected);
        cell.set_status(ConnectionStatus::Disconnected);
        assert_eq!(cell.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
    }

    #[tokio::test]
    async fn probe_refused_port_fails_fast() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("ws://{addr}");
        assert!(!probe(&url, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn probe_non_websocket_listener_times_out() {
        // A TCP listener that never completes the websocket handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let _socket = listener.accept().await;
            sleep(Duration::from_secs(60)).await;
        });

        let url = format!("ws://{addr}");
        assert!(!probe(&url, Duration::from_millis(200)).await);
        hold.abort();
    }

    #[tokio::test]
    async fn probe_real_server_succeeds() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await {
                    while ws.next().await.is_some() {}
                }
            }
        });

        let url = format!("ws://{addr}");
        assert!(probe(&url, Duration::from_secs(5)).await);
        server.abort();
    }
}

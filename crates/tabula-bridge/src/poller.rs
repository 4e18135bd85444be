//! HTTP polling fallback.
//!
//! Some tracker deployments sit behind a plain HTTP endpoint that serves
//! the latest detections as a JSON array of token updates. When a poll URL
//! is configured, a background task fetches it on a fixed interval and
//! feeds the results into the same dispatch channel the websocket uses.
//! Polling pauses whenever the primary connection is live, so the two
//! paths never double-deliver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tabula_core::errors::TransportError;
use tabula_protocol::messages::{TokenUpdate, TrackerMessage};

use crate::connection::{ConnectionStateCell, ConnectionStatus};

/// Fetch one batch of token updates from the poll endpoint.
pub async fn fetch_observations(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<TokenUpdate>, TransportError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TransportError::Receive(e.to_string()))?
        .error_for_status()
        .map_err(|e| TransportError::Receive(e.to_string()))?;
    response
        .json::<Vec<TokenUpdate>>()
        .await
        .map_err(|e| TransportError::Receive(e.to_string()))
}

/// Spawn the poll loop. Returns its task handle for shutdown.
pub fn spawn_poller(
    client: reqwest::Client,
    url: String,
    interval_ms: u64,
    state: Arc<ConnectionStateCell>,
    tx: mpsc::Sender<TrackerMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if state.status() == ConnectionStatus::Connected {
                continue;
            }
            match fetch_observations(&client, &url).await {
                Ok(updates) => {
                    for update in updates {
                        if tx.send(TrackerMessage::TokenUpdate(update)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "poll failed");
                }
            }
        }
    })
}

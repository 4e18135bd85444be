//! Bridge composition and the dispatch loop.
//!
//! [`BridgeController::start`] wires the connection manager, the optional
//! polling fallback, and a single dispatch task together. All observation
//! handling runs on the dispatch task, so the governor, the resolver, and
//! the cache see a serialized stream regardless of transport.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tabula_core::errors::ConfigError;
use tabula_core::observation::{MarkerBinding, MarkerObservation};
use tabula_core::taxonomy::{MarkerCategory, MarkerTaxonomy};
use tabula_core::time::now_ms;
use tabula_protocol::messages::{TokenUpdate, TrackerMessage};

use crate::cache::BindingCache;
use crate::config::BridgeConfig;
use crate::connection::{ConnectionManager, ConnectionState, ConnectionStateCell, ConnectionStatus};
use crate::governor::UpdateGovernor;
use crate::host::{NoticeLevel, TabletopHost};
use crate::poller::spawn_poller;
use crate::resolver::{EntityResolver, Resolution};

/// Capacity of the transport-to-dispatch channel.
const DISPATCH_QUEUE: usize = 256;

/// Operational snapshot of the bridge.
#[derive(Clone, Debug, Serialize)]
pub struct BridgeStatus {
    /// Whether the primary tracker connection is live.
    pub connected: bool,
    /// Configured tracker host.
    pub tracker_host: String,
    /// Configured tracker port.
    pub tracker_port: u16,
    /// Active scene on the tabletop host.
    pub active_scene: Option<String>,
    /// Markers currently bound to an entity.
    pub bound_marker_count: usize,
    /// Connection lifecycle detail.
    pub connection: ConnectionState,
}

/// Owns the running bridge.
pub struct BridgeController {
    config: BridgeConfig,
    host: Arc<dyn TabletopHost>,
    cache: Arc<BindingCache>,
    state: Arc<ConnectionStateCell>,
    manager: ConnectionManager,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    poll_cancel: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BridgeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BridgeController {
    /// Validate the configuration, start the transports and the dispatch
    /// loop. Must run inside a Tokio runtime.
    pub fn start(
        config: BridgeConfig,
        host: Arc<dyn TabletopHost>,
    ) -> Result<Self, ConfigError> {
        let taxonomy = Arc::new(MarkerTaxonomy::new(config.taxonomy.clone())?);
        let cache = Arc::new(BindingCache::new());
        let state = Arc::new(ConnectionStateCell::new());
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE);

        let resolver = EntityResolver::new(
            Arc::clone(&host),
            Arc::clone(&cache),
            Arc::clone(&taxonomy),
            config.auto_create,
            config.images.clone(),
        );
        let ctx = DispatchCtx {
            resolver,
            taxonomy,
            host: Arc::clone(&host),
            governor: UpdateGovernor::new(config.throttle_interval_ms),
        };
        let dispatch = tokio::spawn(run_dispatch(rx, ctx));

        let manager =
            ConnectionManager::new(config.clone(), Arc::clone(&host), Arc::clone(&state), tx.clone());
        manager.connect();

        let poll_cancel = CancellationToken::new();
        let poll_task = config.poll_url.as_ref().map(|url| {
            spawn_poller(
                reqwest::Client::new(),
                url.clone(),
                config.poll_interval_ms,
                Arc::clone(&state),
                tx,
                poll_cancel.clone(),
            )
        });

        Ok(Self {
            config,
            host,
            cache,
            state,
            manager,
            dispatch: Mutex::new(Some(dispatch)),
            poll_cancel,
            poll_task: Mutex::new(poll_task),
        })
    }

    /// Operational snapshot for diagnostics.
    #[must_use]
    pub fn status(&self) -> BridgeStatus {
        let connection = self.state.snapshot();
        BridgeStatus {
            connected: connection.status == ConnectionStatus::Connected,
            tracker_host: self.config.tracker_host.clone(),
            tracker_port: self.config.tracker_port,
            active_scene: self.host.active_scene().map(|s| s.into_inner()),
            bound_marker_count: self.cache.bound_count(),
            connection,
        }
    }

    /// Current binding table, ordered by marker ID.
    #[must_use]
    pub fn bindings(&self) -> Vec<MarkerBinding> {
        self.cache.snapshot()
    }

    /// Force-close and re-establish the tracker connection.
    pub async fn reconnect(&self) {
        self.manager.reconnect().await;
    }

    /// Probe the tracker with an independent short-lived connection.
    pub async fn test_connection(&self) -> bool {
        self.manager.test_connection().await
    }

    /// Stop the transports and the dispatch loop.
    pub async fn shutdown(&self) {
        self.poll_cancel.cancel();
        if let Some(handle) = self.poll_task.lock().take() {
            let _ = handle.await;
        }
        self.manager.shutdown().await;
        if let Some(handle) = self.dispatch.lock().take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

struct DispatchCtx {
    resolver: EntityResolver,
    taxonomy: Arc<MarkerTaxonomy>,
    host: Arc<dyn TabletopHost>,
    governor: UpdateGovernor,
}

async fn run_dispatch(mut rx: mpsc::Receiver<TrackerMessage>, mut ctx: DispatchCtx) {
    while let Some(message) = rx.recv().await {
        match message {
            TrackerMessage::Handshake(ack) => {
                tracing::info!(
                    scene = ack.scene_id.as_deref(),
                    marker_system = ack.marker_system.as_deref(),
                    "tracker handshake"
                );
            }
            TrackerMessage::TokenUpdate(update) => handle_update(&mut ctx, update).await,
        }
    }
}

async fn handle_update(ctx: &mut DispatchCtx, update: TokenUpdate) {
    let obs = MarkerObservation::from(update);
    let category = ctx.taxonomy.classify(obs.marker_id);
    if category == MarkerCategory::Corner {
        tracing::trace!(marker_id = obs.marker_id, "calibration marker, skipping");
        return;
    }
    if let Some(declared) = &obs.declared_category {
        // The tracker's opinion is advisory; ranges decide the category.
        if !declared.eq_ignore_ascii_case(category.label()) {
            tracing::debug!(
                marker_id = obs.marker_id,
                declared,
                resolved = category.label(),
                "tracker category disagrees with configured ranges"
            );
        }
    }

    let now = now_ms();
    if !ctx.governor.admit(obs.marker_id, now) {
        return;
    }

    match ctx.resolver.resolve(&obs, now).await {
        Resolution::Bound(entity) => {
            tracing::debug!(marker_id = obs.marker_id, entity = %entity, x = obs.x, y = obs.y, "entity moved");
        }
        Resolution::Suppressed => {
            tracing::debug!(marker_id = obs.marker_id, "no entity for marker, auto-create disabled");
        }
        Resolution::SceneMismatch => {
            tracing::debug!(
                marker_id = obs.marker_id,
                scene = obs.scene_id.as_ref().map(tabula_core::ids::SceneId::as_str),
                "observation for inactive scene"
            );
        }
        Resolution::CreateFailed(e) => {
            tracing::warn!(marker_id = obs.marker_id, error = %e, "entity creation failed");
            ctx.host.notify(
                NoticeLevel::Warning,
                &format!("Could not create entity for marker {}: {e}", obs.marker_id),
            );
        }
        Resolution::MoveFailed(e) => {
            tracing::warn!(marker_id = obs.marker_id, error = %e, "entity move failed");
        }
    }
}

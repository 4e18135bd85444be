//! Standalone bridge CLI.
//!
//! Runs the bridge against the in-memory tabletop host, which makes it
//! useful for tracker bring-up: point it at a tracker and watch the log to
//! see what entities the observations would create and move.

use std::sync::Arc;

use clap::Parser;

use tabula_bridge::host::memory::MemoryHost;
use tabula_bridge::host::TabletopHost;
use tabula_bridge::{BridgeConfig, BridgeController};
use tabula_core::errors::BridgeError;
use tabula_core::logging::init_subscriber;

#[derive(Debug, Parser)]
#[command(name = "tabula", version, about = "Marker tracker to tabletop bridge")]
struct Args {
    /// Tracker host to connect to.
    #[arg(long, default_value = "127.0.0.1")]
    tracker_host: String,

    /// Tracker WebSocket port.
    #[arg(long, default_value_t = 30001)]
    tracker_port: u16,

    /// Scene ID the in-memory host runs.
    #[arg(long, default_value = "Stage")]
    scene: String,

    /// User announced to the tracker.
    #[arg(long)]
    user: Option<String>,

    /// Detection dictionary announced to the tracker (e.g. "aruco").
    #[arg(long)]
    marker_system: Option<String>,

    /// Disable entity auto-creation for unmatched markers.
    #[arg(long)]
    no_auto_create: bool,

    /// Minimum interval between processed observations per marker.
    #[arg(long, default_value_t = 100)]
    throttle_ms: u64,

    /// HTTP endpoint to poll for observations while the socket is down.
    #[arg(long)]
    poll_url: Option<String>,

    /// Default log level (RUST_LOG overrides).
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            tracker_host: self.tracker_host.clone(),
            tracker_port: self.tracker_port,
            auto_create: !self.no_auto_create,
            throttle_interval_ms: self.throttle_ms,
            marker_system: self.marker_system.clone(),
            poll_url: self.poll_url.clone(),
            ..BridgeConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let args = Args::parse();
    init_subscriber(&args.log_level);

    let mut host = MemoryHost::new(args.scene.as_str());
    if let Some(user) = &args.user {
        host = host.with_user(user.clone());
    }
    let host = Arc::new(host);

    let config = args.bridge_config();
    tracing::info!(
        tracker = %config.tracker_url(),
        scene = %args.scene,
        auto_create = config.auto_create,
        "starting bridge"
    );
    let controller = BridgeController::start(config, Arc::clone(&host) as Arc<dyn TabletopHost>)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "signal handler failed");
    }

    let status = controller.status();
    tracing::info!(
        bound_markers = status.bound_marker_count,
        entities = host.entity_count(),
        "shutting down"
    );
    controller.shutdown().await;
    Ok(())
}

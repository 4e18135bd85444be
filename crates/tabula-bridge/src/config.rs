//! Bridge configuration.
//!
//! Read from the host's settings store as a JSON document; every field has a
//! default so a partial document parses. The taxonomy ranges live here too —
//! the QR and ArUco tracker variants differ only in configuration.

use serde::{Deserialize, Serialize};

use tabula_core::errors::ConfigError;
use tabula_core::taxonomy::{MarkerCategory, TaxonomyConfig};

/// Default token image used when a category has no override.
pub const DEFAULT_TOKEN_IMAGE: &str = "icons/svg/mystery-man.svg";

/// Per-category token images for auto-created entities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryImages {
    /// Image for player tokens.
    #[serde(default = "default_image")]
    pub player: String,
    /// Image for item tokens.
    #[serde(default = "default_image")]
    pub item: String,
    /// Image for custom tokens.
    #[serde(default = "default_image")]
    pub custom: String,
}

fn default_image() -> String {
    DEFAULT_TOKEN_IMAGE.to_owned()
}

impl Default for CategoryImages {
    fn default() -> Self {
        Self {
            player: default_image(),
            item: default_image(),
            custom: default_image(),
        }
    }
}

impl CategoryImages {
    /// Image for a category. Corner markers never become entities, so they
    /// fall back to the custom image if ever asked.
    #[must_use]
    pub fn for_category(&self, category: MarkerCategory) -> &str {
        match category {
            MarkerCategory::Player => &self.player,
            MarkerCategory::Item => &self.item,
            MarkerCategory::Custom | MarkerCategory::Corner => &self.custom,
        }
    }
}

/// Configuration for one bridge instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Tracker host to connect to.
    #[serde(default = "default_tracker_host")]
    pub tracker_host: String,
    /// Tracker WebSocket port.
    #[serde(default = "default_tracker_port")]
    pub tracker_port: u16,
    /// Whether unmatched markers create new entities.
    #[serde(default = "default_true")]
    pub auto_create: bool,
    /// Minimum interval between processed observations per marker.
    #[serde(default = "default_throttle_ms")]
    pub throttle_interval_ms: u64,
    /// Delay before retrying after an abnormal close.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Deadline for one connect attempt.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Deadline for the diagnostic probe connection.
    #[serde(default = "default_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Detection dictionary announced in the handshake (e.g. `"aruco"`).
    #[serde(default)]
    pub marker_system: Option<String>,
    /// Address the host application is reachable at, announced in the
    /// handshake.
    #[serde(default = "default_tracker_host")]
    pub advertise_host: String,
    /// Port the host application is reachable at.
    #[serde(default = "default_advertise_port")]
    pub advertise_port: u16,
    /// Token images for auto-created entities.
    #[serde(default)]
    pub images: CategoryImages,
    /// Marker range configuration.
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    /// Observation document to poll while the socket is down.
    #[serde(default)]
    pub poll_url: Option<String>,
    /// Polling interval for the fallback document.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_tracker_host() -> String {
    "127.0.0.1".to_owned()
}
fn default_tracker_port() -> u16 {
    30001
}
fn default_advertise_port() -> u16 {
    30000
}
fn default_true() -> bool {
    true
}
fn default_throttle_ms() -> u64 {
    100
}
fn default_reconnect_delay_ms() -> u64 {
    3000
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tracker_host: default_tracker_host(),
            tracker_port: default_tracker_port(),
            auto_create: true,
            throttle_interval_ms: default_throttle_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_timeout_ms(),
            marker_system: None,
            advertise_host: default_tracker_host(),
            advertise_port: default_advertise_port(),
            images: CategoryImages::default(),
            taxonomy: TaxonomyConfig::default(),
            poll_url: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BridgeConfig {
    /// Parse a settings document from the host's settings store.
    pub fn from_settings(value: &serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// WebSocket URL of the tracker.
    #[must_use]
    pub fn tracker_url(&self) -> String {
        format!("ws://{}:{}", self.tracker_host, self.tracker_port)
    }
}

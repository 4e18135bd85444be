//! # tabula-bridge
//!
//! The synchronization bridge between a fiducial-marker camera tracker and a
//! virtual tabletop host.
//!
//! The bridge consumes a stream of marker observations over a WebSocket
//! connection (with an HTTP polling fallback), rate-limits them per marker,
//! resolves each marker to a host entity (finding an existing one or
//! auto-creating it), and keeps entity positions synchronized. The
//! connection lifecycle is supervised: abnormal closes reconnect after a
//! fixed delay, intentional closes stay down.
//!
//! Composition happens in [`controller::BridgeController`]; the host
//! application integrates through the [`host::TabletopHost`] trait and the
//! controller's operational API (reconnect, test-connection, status,
//! bindings).

pub mod cache;
pub mod config;
pub mod connection;
pub mod controller;
pub mod governor;
pub mod host;
pub mod poller;
pub mod resolver;

pub use cache::BindingCache;
pub use config::BridgeConfig;
pub use connection::{ConnectionManager, ConnectionState, ConnectionStatus};
pub use controller::{BridgeController, BridgeStatus};
pub use host::memory::MemoryHost;
pub use host::{EntitySpec, NoticeLevel, TabletopHost};
pub use resolver::{EntityResolver, Resolution};

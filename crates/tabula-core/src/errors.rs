//! Error hierarchy for the Tabula bridge.
//!
//! Built on [`thiserror`], one enum per failure domain:
//!
//! - [`TransportError`]: socket connect/send/receive failures, recovered by
//!   the reconnection state machine
//! - [`ProtocolError`]: malformed wire messages, recovered by discarding the
//!   single message
//! - [`HostError`]: host-side entity operations rejected, surfaced as a
//!   warning and retried on the next observation
//! - [`ConfigError`]: invalid startup configuration, fatal at construction
//! - [`BridgeError`]: top-level roll-up
//!
//! None of these are permitted to terminate the host process; every failure
//! path degrades to "stay disconnected / stay unbound".

use thiserror::Error;

/// Top-level error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Transport-level failure.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Wire-protocol failure.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Host entity operation failure.
    #[error("{0}")]
    Host(#[from] HostError),

    /// Invalid configuration.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Socket-level failures around the tracker connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("failed to connect to tracker at {url}: {message}")]
    Connect {
        /// Target URL.
        url: String,
        /// Underlying error text.
        message: String,
    },

    /// Connect attempt exceeded its deadline.
    #[error("connection to {url} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// Target URL.
        url: String,
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// Sending a frame failed.
    #[error("failed to send on tracker connection: {0}")]
    Send(String),

    /// The stream produced an error while receiving.
    #[error("tracker connection errored: {0}")]
    Receive(String),
}

/// Wire-protocol failures. Always contained at the message boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload was not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    /// Envelope has no `type` field.
    #[error("message envelope is missing the `type` field")]
    MissingType,

    /// Payload is valid JSON but missing required fields for its type.
    #[error("malformed `{message_type}` payload: {message}")]
    MalformedPayload {
        /// Declared message type.
        message_type: String,
        /// What was wrong with it.
        message: String,
    },

    /// Encoding an outbound message failed.
    #[error("failed to encode outbound message: {0}")]
    Encode(String),
}

/// Failures reported by the tabletop host when mutating entities.
#[derive(Debug, Error)]
pub enum HostError {
    /// The addressed scene does not exist.
    #[error("scene `{0}` not found")]
    SceneNotFound(String),

    /// The addressed entity does not exist.
    #[error("entity `{0}` not found")]
    EntityNotFound(String),

    /// The host rejected entity creation.
    #[error("entity creation rejected: {0}")]
    CreationRejected(String),

    /// Any other host-side storage failure.
    #[error("host storage error: {0}")]
    Storage(String),
}

/// Invalid configuration detected at construction. Fatal for the bridge
/// instance, never for the host process.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two taxonomy ranges overlap.
    #[error("marker ranges `{a}` and `{b}` overlap")]
    OverlappingRanges {
        /// First range label.
        a: String,
        /// Second range label.
        b: String,
    },

    /// A range has end < start.
    #[error("marker range `{label}` is empty ({start}..={end})")]
    EmptyRange {
        /// Range label.
        label: String,
        /// Range start.
        start: u32,
        /// Range end.
        end: u32,
    },

    /// The settings document could not be parsed.
    #[error("invalid bridge settings: {0}")]
    InvalidSettings(String),
}

//! # tabula-protocol
//!
//! JSON message envelope exchanged with the marker tracker.
//!
//! Every frame is a JSON object with a required `type` field. Decoding is
//! deliberately tolerant: unrecognized types are reported as
//! [`messages::Decoded::Ignored`] rather than errors, and malformed payloads
//! yield a [`tabula_core::errors::ProtocolError`] that the receive loop
//! discards without breaking the stream.

pub mod close;
pub mod messages;

pub use close::CloseKind;
pub use messages::{Decoded, HandshakeAck, ReadyAnnounce, TokenUpdate, TrackerMessage, decode, encode};

//! Message variants and the tolerant envelope codec.
//!
//! The wire format matches the Python trackers exactly — the marker ID field
//! arrives as `marker_id`, `qr_id`, or `aruco_id` depending on the tracker
//! generation, so [`TokenUpdate`] accepts all three.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tabula_core::errors::ProtocolError;
use tabula_core::ids::{EntityId, SceneId};
use tabula_core::observation::MarkerObservation;

/// Inbound messages the bridge consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackerMessage {
    /// Handshake acknowledgment from the tracker.
    Handshake(HandshakeAck),
    /// One marker observation.
    TokenUpdate(TokenUpdate),
}

/// Server→client handshake acknowledgment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HandshakeAck {
    /// Scene the tracker is calibrated for, if it declares one.
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Detection dictionary in use (e.g. `"aruco"`, `"qr"`).
    #[serde(default)]
    pub marker_system: Option<String>,
    /// Free-text greeting, logged only.
    #[serde(default)]
    pub message: Option<String>,
}

/// Server→client marker observation. The sole data-carrying message type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TokenUpdate {
    /// Marker identifier. Historical trackers send `qr_id` or `aruco_id`.
    #[serde(alias = "qr_id", alias = "aruco_id")]
    pub marker_id: u32,
    /// Explicit entity reference, when the tracker already knows it.
    #[serde(default)]
    pub token_id: Option<String>,
    /// Horizontal position in scene coordinates.
    pub x: f64,
    /// Vertical position in scene coordinates.
    pub y: f64,
    /// Detection confidence. Trackers that cannot estimate it omit the field.
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Scene the update is addressed to.
    #[serde(default)]
    pub scene_id: Option<String>,
    /// Category the tracker claims for the marker.
    #[serde(default)]
    pub marker_type: Option<String>,
}

impl From<TokenUpdate> for MarkerObservation {
    fn from(update: TokenUpdate) -> Self {
        Self {
            marker_id: update.marker_id,
            x: update.x,
            y: update.y,
            confidence: update.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
            scene_id: update.scene_id.map(SceneId::from),
            entity_id: update.token_id.map(EntityId::from),
            declared_category: update.marker_type,
        }
    }
}

/// Client→server announcement sent immediately after connecting.
#[derive(Clone, Debug, Serialize)]
pub struct ReadyAnnounce {
    /// Envelope type, always `"foundry_ready"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Active scene on the host.
    pub scene_id: Option<String>,
    /// Address the host is reachable at.
    pub host_address: String,
    /// Port the host is reachable at.
    pub host_port: u16,
    /// Connected user, if the host exposes one.
    pub user_id: Option<String>,
    /// Detection dictionary the bridge expects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_system: Option<String>,
    /// Epoch milliseconds at send time.
    pub timestamp: u64,
}

impl ReadyAnnounce {
    /// Build an announcement with the fixed `foundry_ready` type tag.
    #[must_use]
    pub fn new(
        scene_id: Option<String>,
        host_address: String,
        host_port: u16,
        user_id: Option<String>,
        marker_system: Option<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            kind: "foundry_ready",
            scene_id,
            host_address,
            host_port,
            user_id,
            marker_system,
            timestamp,
        }
    }
}

/// Outcome of decoding one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    /// A message the bridge handles.
    Message(TrackerMessage),
    /// A recognized envelope with an unhandled `type`; carries the type tag.
    Ignored(String),
}

/// Decode one inbound text frame.
///
/// Unknown `type` values are not errors — they decode to
/// [`Decoded::Ignored`] so the receive loop can log and move on. Malformed
/// payloads (non-JSON, missing `type`, or missing required fields for the
/// declared type) are errors the caller discards at the message boundary.
pub fn decode(text: &str) -> Result<Decoded, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
    let message_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_owned();

    match message_type.as_str() {
        // Older trackers ack with `handshake_ack`.
        "handshake" | "handshake_ack" => serde_json::from_value::<HandshakeAck>(value)
            .map(|ack| Decoded::Message(TrackerMessage::Handshake(ack)))
            .map_err(|e| ProtocolError::MalformedPayload {
                message_type,
                message: e.to_string(),
            }),
        "token_update" => serde_json::from_value::<TokenUpdate>(value)
            .map(|update| Decoded::Message(TrackerMessage::TokenUpdate(update)))
            .map_err(|e| ProtocolError::MalformedPayload {
                message_type,
                message: e.to_string(),
            }),
        _ => Ok(Decoded::Ignored(message_type)),
    }
}

/// Encode the connect-time announcement as a JSON text frame.
pub fn encode(announce: &ReadyAnnounce) -> Result<String, ProtocolError> {
    serde_json::to_string(announce).map_err(|e| ProtocolError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_token_update() {
        let frame = r#"{"type":"token_update","marker_id":15,"x":250,"y":300,"confidence":0.95,"scene_id":"S1"}"#;
        let decoded = decode(frame).unwrap();
        let Decoded::Message(TrackerMessage::TokenUpdate(update)) = decoded else {
            panic!("expected token update, got {decoded:?}");
        };
        assert_eq!(update.marker_id, 15);
        assert_eq!(update.x, 250.0);
        assert_eq!(update.y, 300.0);
        assert_eq!(update.confidence, Some(0.95));
        assert_eq!(update.scene_id.as_deref(), Some("S1"));
    }

    #[test]
    fn accepts_qr_id_field_name() {
        let frame = r#"{"type":"token_update","qr_id":7,"x":1,"y":2}"#;
        let Decoded::Message(TrackerMessage::TokenUpdate(update)) = decode(frame).unwrap() else {
            panic!("expected token update");
        };
        assert_eq!(update.marker_id, 7);
        assert_eq!(update.confidence, None);
    }

    #[test]
    fn accepts_aruco_id_field_name() {
        let frame = r#"{"type":"token_update","aruco_id":33,"token_id":"tok-4","x":10.5,"y":20.5,"marker_type":"item"}"#;
        let Decoded::Message(TrackerMessage::TokenUpdate(update)) = decode(frame).unwrap() else {
            panic!("expected token update");
        };
        assert_eq!(update.marker_id, 33);
        assert_eq!(update.token_id.as_deref(), Some("tok-4"));
        assert_eq!(update.marker_type.as_deref(), Some("item"));
    }

    #[test]
    fn decodes_handshake_ack() {
        let frame = r#"{"type":"handshake","scene_id":"S1","marker_system":"aruco"}"#;
        let Decoded::Message(TrackerMessage::Handshake(ack)) = decode(frame).unwrap() else {
            panic!("expected handshake");
        };
        assert_eq!(ack.marker_system.as_deref(), Some("aruco"));
    }

    #[test]
    fn legacy_handshake_ack_type_accepted() {
        let frame = r#"{"type":"handshake_ack","message":"ready"}"#;
        assert!(matches!(
            decode(frame).unwrap(),
            Decoded::Message(TrackerMessage::Handshake(_))
        ));
    }

    #[test]
    fn unknown_type_is_ignored_not_error() {
        let decoded = decode(r#"{"type":"welcome","message":"hi"}"#).unwrap();
        assert_eq!(decoded, Decoded::Ignored("welcome".into()));
    }

    #[test]
    fn non_json_is_protocol_error() {
        let err = decode("not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidJson(_)));
    }

    #[test]
    fn missing_type_field_is_protocol_error() {
        let err = decode(r#"{"marker_id":5,"x":1,"y":2}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingType));
    }

    #[test]
    fn token_update_missing_required_field_is_malformed() {
        let err = decode(r#"{"type":"token_update","marker_id":5,"x":1}"#).unwrap_err();
        assert!(
            matches!(err, ProtocolError::MalformedPayload { ref message_type, .. } if message_type == "token_update")
        );
    }

    #[test]
    fn update_converts_to_observation_with_default_confidence() {
        let update = TokenUpdate {
            marker_id: 9,
            token_id: None,
            x: 4.0,
            y: 5.0,
            confidence: None,
            scene_id: None,
            marker_type: None,
        };
        let obs = MarkerObservation::from(update);
        assert_eq!(obs.confidence, 1.0);
        assert!(obs.scene_id.is_none());
    }

    #[test]
    fn observation_confidence_is_clamped() {
        let update = TokenUpdate {
            marker_id: 9,
            token_id: None,
            x: 0.0,
            y: 0.0,
            confidence: Some(1.7),
            scene_id: None,
            marker_type: None,
        };
        let obs = MarkerObservation::from(update);
        assert_eq!(obs.confidence, 1.0);
    }

    #[test]
    fn announce_encodes_with_type_tag() {
        let announce = ReadyAnnounce::new(
            Some("S1".into()),
            "192.168.1.10".into(),
            30000,
            Some("gm".into()),
            Some("aruco".into()),
            1_700_000_000_000,
        );
        let json: Value = serde_json::from_str(&encode(&announce).unwrap()).unwrap();
        assert_eq!(json["type"], "foundry_ready");
        assert_eq!(json["scene_id"], "S1");
        assert_eq!(json["host_port"], 30000);
        assert_eq!(json["marker_system"], "aruco");
        assert_eq!(json["timestamp"], 1_700_000_000_000_u64);
    }

    #[test]
    fn announce_omits_absent_marker_system() {
        let announce = ReadyAnnounce::new(None, "127.0.0.1".into(), 30000, None, None, 0);
        let json: Value = serde_json::from_str(&encode(&announce).unwrap()).unwrap();
        assert!(json.get("marker_system").is_none());
        assert!(json["scene_id"].is_null());
    }
}

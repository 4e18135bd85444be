//! Marker observation and binding data model.
//!
//! A [`MarkerObservation`] is the ephemeral payload of one tracker update;
//! it is not persisted beyond processing. A [`MarkerBinding`] records the
//! association between a marker and its host entity and lives in the binding
//! cache for the lifetime of the bridge — bindings are never implicitly
//! deleted (marker expiry belongs to the detection process).

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, SceneId};
use crate::taxonomy::MarkerCategory;

/// One marker sighting reported by the tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    /// Numeric marker identifier.
    pub marker_id: u32,
    /// Horizontal position in scene coordinates.
    pub x: f64,
    /// Vertical position in scene coordinates.
    pub y: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Scene the observation is addressed to, if the tracker declared one.
    pub scene_id: Option<SceneId>,
    /// Explicit entity reference, if the tracker already knows the binding.
    pub entity_id: Option<EntityId>,
    /// Category the tracker claims for the marker. Advisory only — the
    /// taxonomy classification is authoritative.
    pub declared_category: Option<String>,
}

/// The recorded association between a marker and a host entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerBinding {
    /// Numeric marker identifier. One binding exists per marker.
    pub marker_id: u32,
    /// The bound host entity, once resolution has succeeded.
    pub bound_entity_id: Option<EntityId>,
    /// Category at the time of binding.
    pub category: MarkerCategory,
    /// When the last admitted observation was successfully applied
    /// (epoch milliseconds).
    pub last_seen_at_ms: u64,
    /// Confidence of the last applied observation.
    pub last_confidence: f32,
}

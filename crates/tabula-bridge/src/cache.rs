//! Process-local binding table.
//!
//! One [`MarkerBinding`] per marker ever successfully resolved. The
//! serialized dispatch loop is the only writer; diagnostics and status
//! queries read concurrently through cheap snapshots. Bindings are never
//! implicitly deleted.

use std::collections::HashMap;

use parking_lot::RwLock;

use tabula_core::ids::EntityId;
use tabula_core::observation::MarkerBinding;
use tabula_core::taxonomy::MarkerCategory;

/// Marker-ID-keyed table of bindings.
#[derive(Debug, Default)]
pub struct BindingCache {
    inner: RwLock<HashMap<u32, MarkerBinding>>,
}

impl BindingCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful bind for a marker.
    ///
    /// Called only after the entity's position mutation was confirmed.
    /// Replaces a previous `bound_entity_id` — the resolver only re-binds
    /// when the previous entity was found missing.
    pub fn record_bind(
        &self,
        marker_id: u32,
        entity: EntityId,
        category: MarkerCategory,
        now_ms: u64,
        confidence: f32,
    ) {
        let mut inner = self.inner.write();
        let _ = inner.insert(
            marker_id,
            MarkerBinding {
                marker_id,
                bound_entity_id: Some(entity),
                category,
                last_seen_at_ms: now_ms,
                last_confidence: confidence,
            },
        );
    }

    /// Clone of the binding for one marker.
    #[must_use]
    pub fn get(&self, marker_id: u32) -> Option<MarkerBinding> {
        self.inner.read().get(&marker_id).cloned()
    }

    /// Number of markers with a bound entity.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.inner
            .read()
            .values()
            .filter(|b| b.bound_entity_id.is_some())
            .count()
    }

    /// Full table snapshot, ordered by marker ID, for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MarkerBinding> {
        let mut bindings: Vec<MarkerBinding> = self.inner.read().values().cloned().collect();
        bindings.sort_by_key(|b| b.marker_id);
        bindings
    }
}

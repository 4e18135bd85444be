//! Marker-to-entity resolution.
//!
//! Resolution order, first match wins:
//!
//! 1. Explicit entity reference carried by the observation, if it still
//!    exists in the active scene.
//! 2. The cached binding, re-verified against the host — a vanished entity
//!    falls through to re-resolution (the only path that replaces a bound
//!    entity).
//! 3. An entity in the scene flagged with this marker ID.
//! 4. Auto-creation, when enabled.
//!
//! Observations addressed to another scene are inert and skip all steps.
//! The entity's position is mutated before the cache records the bind, so
//! the table never advertises a binding that did not actually move.

use std::sync::Arc;

use tabula_core::errors::HostError;
use tabula_core::ids::{EntityId, SceneId};
use tabula_core::observation::MarkerObservation;
use tabula_core::taxonomy::{MarkerCategory, MarkerTaxonomy};

use crate::cache::BindingCache;
use crate::config::CategoryImages;
use crate::host::{EntitySpec, TabletopHost};

/// Outcome of resolving one observation.
#[derive(Debug)]
pub enum Resolution {
    /// The marker is bound and its entity was moved.
    Bound(EntityId),
    /// No binding possible and auto-creation is disabled. Expected steady
    /// state for unmatched markers; callers log at low severity only.
    Suppressed,
    /// The observation is addressed to a scene that is not active.
    SceneMismatch,
    /// The host rejected entity creation. No binding is recorded; the next
    /// observation retries creation.
    CreateFailed(HostError),
    /// The host rejected the position update. No binding is recorded.
    MoveFailed(HostError),
}

/// Resolves observations to host entities and applies them.
pub struct EntityResolver {
    host: Arc<dyn TabletopHost>,
    cache: Arc<BindingCache>,
    taxonomy: Arc<MarkerTaxonomy>,
    auto_create: bool,
    images: CategoryImages,
}

impl EntityResolver {
    /// Build a resolver over the shared cache and host.
    #[must_use]
    pub fn new(
        host: Arc<dyn TabletopHost>,
        cache: Arc<BindingCache>,
        taxonomy: Arc<MarkerTaxonomy>,
        auto_create: bool,
        images: CategoryImages,
    ) -> Self {
        Self {
            host,
            cache,
            taxonomy,
            auto_create,
            images,
        }
    }

    /// Resolve and apply one observation.
    pub async fn resolve(&self, obs: &MarkerObservation, now_ms: u64) -> Resolution {
        let Some(active) = self.host.active_scene() else {
            return Resolution::SceneMismatch;
        };
        if let Some(declared) = &obs.scene_id {
            if *declared != active {
                return Resolution::SceneMismatch;
            }
        }

        let category = self.taxonomy.classify(obs.marker_id);
        let entity = match self.locate(obs, &active, category, now_ms).await {
            Ok(Some(entity)) => entity,
            Ok(None) => return Resolution::Suppressed,
            Err(e) => return Resolution::CreateFailed(e),
        };

        if let Err(e) = self.host.move_entity(&active, &entity, obs.x, obs.y).await {
            return Resolution::MoveFailed(e);
        }
        self.cache
            .record_bind(obs.marker_id, entity.clone(), category, now_ms, obs.confidence);
        Resolution::Bound(entity)
    }

    /// Find or create the entity for an observation.
    ///
    /// `Ok(None)` means no match with auto-creation disabled; `Err` is a
    /// host failure during creation (lookup failures also surface here).
    async fn locate(
        &self,
        obs: &MarkerObservation,
        scene: &SceneId,
        category: MarkerCategory,
        now_ms: u64,
    ) -> Result<Option<EntityId>, HostError> {
        if let Some(explicit) = &obs.entity_id {
            if self.host.entity_exists(scene, explicit).await? {
                return Ok(Some(explicit.clone()));
            }
            tracing::debug!(
                marker_id = obs.marker_id,
                entity = %explicit,
                "explicit entity reference is stale"
            );
        }

        if let Some(binding) = self.cache.get(obs.marker_id) {
            if let Some(bound) = binding.bound_entity_id {
                if self.host.entity_exists(scene, &bound).await? {
                    return Ok(Some(bound));
                }
                tracing::debug!(
                    marker_id = obs.marker_id,
                    entity = %bound,
                    "bound entity vanished, re-resolving"
                );
            }
        }

        if let Some(found) = self.host.find_entity_by_marker(scene, obs.marker_id).await? {
            return Ok(Some(found));
        }

        if !self.auto_create {
            return Ok(None);
        }

        let spec = EntitySpec {
            name: self.taxonomy.display_name(obs.marker_id),
            image: self.images.for_category(category).to_owned(),
            x: obs.x,
            y: obs.y,
            marker_id: obs.marker_id,
            category,
            created_at_ms: now_ms,
        };
        let name = spec.name.clone();
        let created = self.host.create_entity(scene, spec).await?;
        tracing::info!(marker_id = obs.marker_id, entity = %created, name, "created entity for marker");
        Ok(Some(created))
    }
}

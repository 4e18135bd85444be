//! The seam between the bridge and the surrounding tabletop host.
//!
//! The host application owns entity storage, rendering, settings, and user
//! notifications; the bridge only needs the narrow surface captured by
//! [`TabletopHost`]. [`memory::MemoryHost`] is a complete single-scene
//! implementation used by the CLI and the test suite.

use async_trait::async_trait;

use tabula_core::errors::HostError;
use tabula_core::ids::{EntityId, SceneId};
use tabula_core::taxonomy::MarkerCategory;

pub mod memory;

/// Severity of a user-visible notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Degraded but operating.
    Warning,
    /// Something the operator must look at.
    Error,
}

/// Everything needed to create one entity for a marker.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySpec {
    /// Display name from the taxonomy.
    pub name: String,
    /// Token image path.
    pub image: String,
    /// Initial horizontal position.
    pub x: f64,
    /// Initial vertical position.
    pub y: f64,
    /// Marker the entity is created for; persisted as a flag so future
    /// observations rediscover the entity.
    pub marker_id: u32,
    /// Marker category at creation time.
    pub category: MarkerCategory,
    /// Creation timestamp (epoch milliseconds).
    pub created_at_ms: u64,
}

/// Host-side operations the bridge depends on.
///
/// All entity operations are scoped to a scene; implementations reject
/// scenes they do not know. Methods must be cheap to call repeatedly — the
/// resolver consults the host on every admitted observation.
#[async_trait]
pub trait TabletopHost: Send + Sync {
    /// The scene currently shown to players, if any.
    fn active_scene(&self) -> Option<SceneId>;

    /// The user the bridge acts as, announced in the handshake.
    fn user_id(&self) -> Option<String> {
        None
    }

    /// Whether an entity exists in the scene.
    async fn entity_exists(&self, scene: &SceneId, entity: &EntityId) -> Result<bool, HostError>;

    /// Find an entity flagged with the given marker ID.
    async fn find_entity_by_marker(
        &self,
        scene: &SceneId,
        marker_id: u32,
    ) -> Result<Option<EntityId>, HostError>;

    /// Create an entity and return its reference.
    async fn create_entity(&self, scene: &SceneId, spec: EntitySpec)
    -> Result<EntityId, HostError>;

    /// Move an existing entity.
    async fn move_entity(
        &self,
        scene: &SceneId,
        entity: &EntityId,
        x: f64,
        y: f64,
    ) -> Result<(), HostError>;

    /// Show a notification to the operator. Must never block or fail.
    fn notify(&self, level: NoticeLevel, message: &str);
}

//! In-memory tabletop host.
//!
//! A single-scene host holding entities in a map, used by the CLI for
//! standalone operation and by the test suite. Mirrors the behavior the
//! bridge relies on from a real host: entities carry a marker flag from
//! creation, and lookup by marker scans those flags.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use tabula_core::errors::HostError;
use tabula_core::ids::{EntityId, SceneId};
use tabula_core::taxonomy::MarkerCategory;

use super::{EntitySpec, NoticeLevel, TabletopHost};

/// One entity in the in-memory scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Entity reference.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Token image path.
    pub image: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Marker flag, present on bridge-created entities.
    pub marker_id: Option<u32>,
    /// Category flag.
    pub category: Option<MarkerCategory>,
    /// Creation timestamp (epoch milliseconds).
    pub created_at_ms: u64,
}

/// A recorded notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

/// Single-scene in-memory host.
pub struct MemoryHost {
    scene: SceneId,
    user: Option<String>,
    entities: RwLock<HashMap<EntityId, Entity>>,
    notices: Mutex<Vec<Notice>>,
    reject_creation: AtomicBool,
}

impl MemoryHost {
    /// Create a host with one active scene.
    #[must_use]
    pub fn new(scene: impl Into<SceneId>) -> Self {
        Self {
            scene: scene.into(),
            user: None,
            entities: RwLock::new(HashMap::new()),
            notices: Mutex::new(Vec::new()),
            reject_creation: AtomicBool::new(false),
        }
    }

    /// Set the user the bridge acts as.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Number of entities in the scene.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().len()
    }

    /// Clone of an entity, if it exists.
    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<Entity> {
        self.entities.read().get(id).cloned()
    }

    /// All recorded notifications.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Remove an entity, simulating deletion by a game master.
    pub fn remove_entity(&self, id: &EntityId) {
        let _ = self.entities.write().remove(id);
    }

    /// Make `create_entity` fail until cleared, for failure-path tests.
    pub fn set_reject_creation(&self, reject: bool) {
        self.reject_creation.store(reject, Ordering::Relaxed);
    }

    fn check_scene(&self, scene: &SceneId) -> Result<(), HostError> {
        if *scene == self.scene {
            Ok(())
        } else {
            Err(HostError::SceneNotFound(scene.to_string()))
        }
    }
}

#[async_trait]
impl TabletopHost for MemoryHost {
    fn active_scene(&self) -> Option<SceneId> {
        Some(self.scene.clone())
    }

    fn user_id(&self) -> Option<String> {
        self.user.clone()
    }

    async fn entity_exists(&self, scene: &SceneId, entity: &EntityId) -> Result<bool, HostError> {
        self.check_scene(scene)?;
        Ok(self.entities.read().contains_key(entity))
    }

    async fn find_entity_by_marker(
        &self,
        scene: &SceneId,
        marker_id: u32,
    ) -> Result<Option<EntityId>, HostError> {
        self.check_scene(scene)?;
        Ok(self
            .entities
            .read()
            .values()
            .find(|e| e.marker_id == Some(marker_id))
            .map(|e| e.id.clone()))
    }

    async fn create_entity(
        &self,
        scene: &SceneId,
        spec: EntitySpec,
    ) -> Result<EntityId, HostError> {
        self.check_scene(scene)?;
        if self.reject_creation.load(Ordering::Relaxed) {
            return Err(HostError::CreationRejected("creation disabled".into()));
        }
        let id = EntityId::new();
        let entity = Entity {
            id: id.clone(),
            name: spec.name,
            image: spec.image,
            x: spec.x,
            y: spec.y,
            marker_id: Some(spec.marker_id),
            category: Some(spec.category),
            created_at_ms: spec.created_at_ms,
        };
        let _ = self.entities.write().insert(id.clone(), entity);
        Ok(id)
    }

    async fn move_entity(
        &self,
        scene: &SceneId,
        entity: &EntityId,
        x: f64,
        y: f64,
    ) -> Result<(), HostError> {
        self.check_scene(scene)?;
        let mut entities = self.entities.write();
        let Some(found) = entities.get_mut(entity) else {
            return Err(HostError::EntityNotFound(entity.to_string()));
        };
        found.x = x;
        found.y = y;
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().push(Notice {
            level,
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(marker_id: u32) -> EntitySpec {
        EntitySpec {
            name: format!("Marker_{marker_id}"),
            image: "icons/svg/mystery-man.svg".into(),
            x: 100.0,
            y: 200.0,
            marker_id,
            category: MarkerCategory::Player,
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn create_then_find_by_marker() {
        let host = MemoryHost::new("S1");
        let scene = host.active_scene().unwrap();
        let id = host.create_entity(&scene, spec(12)).await.unwrap();
        let found = host.find_entity_by_marker(&scene, 12).await.unwrap();
        assert_eq!(found, Some(id));
    }

    #[tokio::test]
    async fn find_unknown_marker_is_none() {
        let host = MemoryHost::new("S1");
        let scene = host.active_scene().unwrap();
        assert_eq!(host.find_entity_by_marker(&scene, 99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn move_updates_position() {
        let host = MemoryHost::new("S1");
        let scene = host.active_scene().unwrap();
        let id = host.create_entity(&scene, spec(12)).await.unwrap();
        host.move_entity(&scene, &id, 300.0, 400.0).await.unwrap();
        let entity = host.entity(&id).unwrap();
        assert_eq!((entity.x, entity.y), (300.0, 400.0));
    }

    #[tokio::test]
    async fn move_missing_entity_errors() {
        let host = MemoryHost::new("S1");
        let scene = host.active_scene().unwrap();
        let err = host
            .move_entity(&scene, &EntityId::from("ghost"), 0.0, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn wrong_scene_is_rejected() {
        let host = MemoryHost::new("S1");
        let err = host
            .entity_exists(&SceneId::from("S2"), &EntityId::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::SceneNotFound(_)));
    }

    #[tokio::test]
    async fn rejected_creation_errors() {
        let host = MemoryHost::new("S1");
        host.set_reject_creation(true);
        let scene = host.active_scene().unwrap();
        let err = host.create_entity(&scene, spec(12)).await.unwrap_err();
        assert!(matches!(err, HostError::CreationRejected(_)));
        assert_eq!(host.entity_count(), 0);
    }

    #[test]
    fn notices_are_recorded() {
        let host = MemoryHost::new("S1");
        host.notify(NoticeLevel::Warning, "tracker unreachable");
        let notices = host.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }
}

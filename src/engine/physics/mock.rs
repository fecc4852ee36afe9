// In-memory physics backend for controller tests

use glam::Vec2;
use std::collections::{HashMap, HashSet};

use super::{CharacterBody, ColliderHandle, ContactEvent, EntityId, PhysicsBackend};

#[derive(Debug, Clone)]
pub(crate) struct MockBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub gravity_scale: f32,
    pub size: Vec2,
    pub template: &'static str,
}

#[derive(Debug, Clone)]
pub(crate) struct MockTarget {
    pub entity: EntityId,
    pub position: Vec2,
    pub layer: u32,
}

/// Bodies never move on their own; tests set velocities and contacts explicitly.
#[derive(Debug)]
pub(crate) struct MockPhysics {
    pub bodies: HashMap<EntityId, MockBody>,
    pub targets: Vec<MockTarget>,
    pub contacts: HashMap<EntityId, Vec<ContactEvent>>,
    pub ignored: HashSet<(EntityId, ColliderHandle)>,
    pub despawned: Vec<EntityId>,
    pub gravity: Vec2,
    next_entity: EntityId,
}

impl MockPhysics {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            targets: Vec::new(),
            contacts: HashMap::new(),
            ignored: HashSet::new(),
            despawned: Vec::new(),
            gravity: Vec2::new(0.0, -9.81),
            next_entity: 1,
        }
    }

    /// Add a query target on `layer` at `position`
    pub fn add_target(&mut self, position: Vec2, layer: u32) -> EntityId {
        let entity = self.next_entity;
        self.next_entity += 1;
        self.targets.push(MockTarget {
            entity,
            position,
            layer,
        });
        entity
    }

    /// Queue a contact event to be reported for `entity`
    pub fn push_contact(&mut self, entity: EntityId, event: ContactEvent) {
        self.contacts.entry(entity).or_default().push(event);
    }

    /// Forget all queued contact events (what a physics step does)
    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }
}

impl PhysicsBackend for MockPhysics {
    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.bodies.get(&entity).map(|b| b.position)
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec2> {
        self.bodies.get(&entity).map(|b| b.velocity)
    }

    fn set_velocity(&mut self, entity: EntityId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&entity) {
            body.velocity = velocity;
        }
    }

    fn gravity_scale(&self, entity: EntityId) -> Option<f32> {
        self.bodies.get(&entity).map(|b| b.gravity_scale)
    }

    fn set_gravity_scale(&mut self, entity: EntityId, scale: f32) {
        if let Some(body) = self.bodies.get_mut(&entity) {
            body.gravity_scale = scale;
        }
    }

    fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: u32,
        max_results: usize,
        exclude: Option<EntityId>,
    ) -> Vec<EntityId> {
        self.targets
            .iter()
            .filter(|t| Some(t.entity) != exclude)
            .filter(|t| t.layer & mask != 0)
            .filter(|t| t.position.distance(center) <= radius)
            .map(|t| t.entity)
            .take(max_results)
            .collect()
    }

    fn set_collision_ignored(&mut self, entity: EntityId, collider: ColliderHandle, ignored: bool) {
        if ignored {
            self.ignored.insert((entity, collider));
        } else {
            self.ignored.remove(&(entity, collider));
        }
    }

    fn contact_events(&self, entity: EntityId) -> Vec<ContactEvent> {
        self.contacts.get(&entity).cloned().unwrap_or_default()
    }

    fn spawn_character(&mut self, body: CharacterBody, position: Vec2) -> EntityId {
        let entity = self.next_entity;
        self.next_entity += 1;
        self.bodies.insert(
            entity,
            MockBody {
                position,
                velocity: Vec2::ZERO,
                gravity_scale: 1.0,
                size: Vec2::new(body.width, body.height),
                template: body.template,
            },
        );
        entity
    }

    fn template(&self, entity: EntityId) -> Option<&'static str> {
        self.bodies.get(&entity).map(|b| b.template)
    }

    fn despawn(&mut self, entity: EntityId) {
        if self.bodies.remove(&entity).is_some() {
            self.despawned.push(entity);
        }
    }
}

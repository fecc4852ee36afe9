use glam::Vec2;
use rapier2d::prelude::*;
use std::collections::HashMap;

use super::body::presets;
use super::collision::{
    CollisionEvent as GameCollisionEvent, CollisionEventQueue, CollisionGroups, ContactFilter,
};
use super::{CharacterBody, ContactEvent, ContactPhase, EntityId, PhysicsBackend};
use crate::core::math::{from_physics, to_physics};

/// Physics world that manages all physics simulation
pub struct PhysicsWorld {
    /// Gravity vector (default: -9.81 m/s² in y-axis)
    gravity: Vector<Real>,

    /// Integration parameters for the physics simulation
    integration_parameters: IntegrationParameters,

    /// Physics pipeline handles collision detection and solving
    physics_pipeline: PhysicsPipeline,

    /// Island manager for sleeping bodies
    island_manager: IslandManager,

    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,

    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver for fast-moving objects
    ccd_solver: CCDSolver,

    /// Query pipeline for area queries
    query_pipeline: QueryPipeline,

    /// Rigid body set
    rigid_body_set: RigidBodySet,

    /// Collider set
    collider_set: ColliderSet,

    /// Collision event handler
    collision_event_queue: CollisionEventQueue,

    /// Per-pair collision exclusions (drop-through platforms)
    contact_filter: ContactFilter,

    /// Mapping between rigid bodies and game entity IDs
    body_to_entity: HashMap<RigidBodyHandle, EntityId>,
    entity_to_body: HashMap<EntityId, RigidBodyHandle>,
    /// Template each character entity was instantiated from
    templates: HashMap<EntityId, &'static str>,
    next_entity: EntityId,
}

impl PhysicsWorld {
    /// Create a new physics world with default settings
    pub fn new() -> Self {
        Self::with_gravity(vector![0.0, -9.81])
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vector<Real>) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        // Fixed timestep of 1/60 seconds (60 FPS)
        integration_parameters.dt = 1.0 / 60.0;

        Self {
            gravity,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            collision_event_queue: CollisionEventQueue::new(),
            contact_filter: ContactFilter::new(),
            body_to_entity: HashMap::new(),
            entity_to_body: HashMap::new(),
            templates: HashMap::new(),
            next_entity: 1,
        }
    }

    /// Step the physics simulation forward by one timestep
    pub fn step(&mut self) {
        // Clear previous step's collision events
        self.collision_event_queue.clear();

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &self.contact_filter,
            &self.collision_event_queue,
        );
    }

    /// Add a rigid body to the physics world
    pub fn add_rigid_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(body)
    }

    /// Add a collider attached to a rigid body
    pub fn add_collider(
        &mut self,
        collider: Collider,
        parent_handle: RigidBodyHandle,
    ) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent_handle, &mut self.rigid_body_set)
    }

    /// Register a body as a game entity and return its new ID
    pub fn register_entity(&mut self, body_handle: RigidBodyHandle) -> EntityId {
        let entity = self.next_entity;
        self.next_entity += 1;
        self.body_to_entity.insert(body_handle, entity);
        self.entity_to_body.insert(entity, body_handle);
        entity
    }

    /// Add a static box of solid ground
    pub fn add_ground(&mut self, x: Real, y: Real, width: Real, height: Real) -> ColliderHandle {
        let body = self.add_rigid_body(presets::static_body(x, y));
        self.add_collider(presets::ground_collider(width, height), body)
    }

    /// Add a one-way platform that characters can drop through
    pub fn add_one_way_platform(
        &mut self,
        x: Real,
        y: Real,
        width: Real,
        height: Real,
    ) -> ColliderHandle {
        let body = self.add_rigid_body(presets::static_body(x, y));
        self.add_collider(presets::one_way_platform_collider(width, height), body)
    }

    /// Add a static entity with a single collider (enemy hurtbox, interactable, ...)
    pub fn add_static_entity(&mut self, x: Real, y: Real, collider: Collider) -> EntityId {
        let body = self.add_rigid_body(presets::static_body(x, y));
        self.add_collider(collider, body);
        self.register_entity(body)
    }

    /// Remove a rigid body and all its attached colliders
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get(handle) {
            for collider in body.colliders() {
                self.contact_filter.forget(*collider);
            }
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true, // remove attached colliders
        );
        if let Some(entity) = self.body_to_entity.remove(&handle) {
            self.entity_to_body.remove(&entity);
            self.templates.remove(&entity);
        }
    }

    /// Get a reference to a rigid body
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Get the entity ID associated with a rigid body
    pub fn get_entity_id(&self, body_handle: RigidBodyHandle) -> Option<EntityId> {
        self.body_to_entity.get(&body_handle).copied()
    }

    /// Get the rigid body behind an entity
    pub fn entity_body(&self, entity: EntityId) -> Option<RigidBodyHandle> {
        self.entity_to_body.get(&entity).copied()
    }

    /// Resolve the entity owning a collider
    fn collider_entity(&self, collider: ColliderHandle) -> Option<EntityId> {
        let parent = self.collider_set.get(collider)?.parent()?;
        self.get_entity_id(parent)
    }

    fn entity_rigid_body(&self, entity: EntityId) -> Option<&RigidBody> {
        self.entity_body(entity)
            .and_then(|handle| self.rigid_body_set.get(handle))
    }

    fn entity_rigid_body_mut(&mut self, entity: EntityId) -> Option<&mut RigidBody> {
        let handle = self.entity_body(entity)?;
        self.rigid_body_set.get_mut(handle)
    }

    /// Whether contacts between two colliders are currently suppressed
    pub fn is_collision_ignored(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        self.contact_filter.is_ignored(a, b)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.entity_to_body.len()
    }

    /// Translate one raw collision event into a character contact event
    fn classify(
        &self,
        body: RigidBodyHandle,
        collider1: ColliderHandle,
        collider2: ColliderHandle,
        phase: ContactPhase,
    ) -> Option<ContactEvent> {
        let c1 = self.collider_set.get(collider1)?;
        let c2 = self.collider_set.get(collider2)?;

        let (own, other, other_handle) = if c1.parent() == Some(body) {
            (c1, c2, collider2)
        } else if c2.parent() == Some(body) {
            (c2, c1, collider1)
        } else {
            return None;
        };

        let layer = CollisionGroups::from_membership(other.collision_groups().memberships.bits());
        match (own.is_sensor(), layer) {
            (true, Some(CollisionGroups::Ground | CollisionGroups::OneWayPlatform)) => {
                Some(ContactEvent::Ground(phase))
            }
            (false, Some(CollisionGroups::OneWayPlatform)) => Some(ContactEvent::Platform {
                phase,
                collider: other_handle,
            }),
            _ => None,
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn gravity(&self) -> Vec2 {
        from_physics(&self.gravity)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.entity_rigid_body(entity)
            .map(|body| from_physics(body.translation()))
    }

    fn velocity(&self, entity: EntityId) -> Option<Vec2> {
        self.entity_rigid_body(entity)
            .map(|body| from_physics(body.linvel()))
    }

    fn set_velocity(&mut self, entity: EntityId, velocity: Vec2) {
        if let Some(body) = self.entity_rigid_body_mut(entity) {
            body.set_linvel(to_physics(velocity), true);
        }
    }

    fn gravity_scale(&self, entity: EntityId) -> Option<f32> {
        self.entity_rigid_body(entity).map(|body| body.gravity_scale())
    }

    fn set_gravity_scale(&mut self, entity: EntityId, scale: f32) {
        if let Some(body) = self.entity_rigid_body_mut(entity) {
            body.set_gravity_scale(scale, true);
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
        let mut hits = Vec::new();
        if max_results == 0 {
            return hits;
        }

        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(center.x, center.y);
        let on_layer =
            |_handle: ColliderHandle, collider: &Collider| collider.collision_groups().memberships.bits() & mask != 0;

        let mut filter = QueryFilter::default().predicate(&on_layer);
        if let Some(body) = exclude.and_then(|entity| self.entity_body(entity)) {
            filter = filter.exclude_rigid_body(body);
        }

        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &shape,
            filter,
            |handle| {
                if let Some(entity) = self.collider_entity(handle) {
                    hits.push(entity);
                }
                hits.len() < max_results
            },
        );

        hits
    }

    fn set_collision_ignored(&mut self, entity: EntityId, collider: ColliderHandle, ignored: bool) {
        let Some(body) = self.entity_rigid_body(entity) else {
            return;
        };

        let solid: Vec<ColliderHandle> = body
            .colliders()
            .iter()
            .copied()
            .filter(|handle| {
                self.collider_set
                    .get(*handle)
                    .is_some_and(|c| !c.is_sensor())
            })
            .collect();

        for own in solid {
            if ignored {
                self.contact_filter.ignore(own, collider);
            } else {
                self.contact_filter.restore(own, collider);
            }
        }
    }

    fn contact_events(&self, entity: EntityId) -> Vec<ContactEvent> {
        let Some(body) = self.entity_body(entity) else {
            return Vec::new();
        };

        self.collision_event_queue
            .events()
            .into_iter()
            .filter_map(|event| match event {
                GameCollisionEvent::Started {
                    collider1,
                    collider2,
                    ..
                } => self.classify(body, collider1, collider2, ContactPhase::Began),
                GameCollisionEvent::Stopped {
                    collider1,
                    collider2,
                    ..
                } => self.classify(body, collider1, collider2, ContactPhase::Ended),
            })
            .collect()
    }

    fn spawn_character(&mut self, body: CharacterBody, position: Vec2) -> EntityId {
        let handle = self.add_rigid_body(presets::player_body(position.x, position.y));
        self.add_collider(presets::player_collider(body.width, body.height), handle);
        self.add_collider(presets::foot_sensor(body.width, body.height), handle);
        let entity = self.register_entity(handle);
        self.templates.insert(entity, body.template);
        log::debug!("Instantiated {} as entity {}", body.template, entity);
        entity
    }

    fn template(&self, entity: EntityId) -> Option<&'static str> {
        self.templates.get(&entity).copied()
    }

    fn despawn(&mut self, entity: EntityId) {
        if let Some(body) = self.entity_body(entity) {
            self.remove_rigid_body(body);
        }
    }
}

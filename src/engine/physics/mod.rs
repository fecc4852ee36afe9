// Physics system using rapier2d
//
// The character core talks to physics only through `PhysicsBackend`.
// `PhysicsWorld` is the rapier2d implementation used by the game.

pub mod body;
mod collision;
#[cfg(test)]
pub(crate) mod mock;
mod world;

use glam::Vec2;

pub use body::{BodyBuilder, ColliderBuilder2D, ColliderHandle, RigidBodyHandle};
pub use collision::{CollisionGroups, ContactFilter};
pub use world::PhysicsWorld;

/// Game-side identifier for a physics-backed entity
pub type EntityId = u64;

/// Whether a contact started or ended this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Began,
    Ended,
}

/// Contact/overlap event relevant to a character, already tagged by layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    /// The character's ground sensor overlapped or left a ground-tagged region
    Ground(ContactPhase),
    /// The character's body touched or left a one-way platform collider
    Platform {
        phase: ContactPhase,
        collider: ColliderHandle,
    },
}

/// What a character body is built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterBody {
    /// Entity template the body is instantiated from
    pub template: &'static str,
    pub width: f32,
    pub height: f32,
}

/// Physics/collision collaborator contract
pub trait PhysicsBackend {
    /// World gravity vector
    fn gravity(&self) -> Vec2;

    fn position(&self, entity: EntityId) -> Option<Vec2>;

    fn velocity(&self, entity: EntityId) -> Option<Vec2>;

    fn set_velocity(&mut self, entity: EntityId, velocity: Vec2);

    fn gravity_scale(&self, entity: EntityId) -> Option<f32>;

    fn set_gravity_scale(&mut self, entity: EntityId, scale: f32);

    /// Entities with a collider on one of the `mask` layers overlapping the circle.
    /// One entry per matched collider, at most `max_results`, never `exclude`.
    fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: u32,
        max_results: usize,
        exclude: Option<EntityId>,
    ) -> Vec<EntityId>;

    /// Suppress (or restore) collision between an entity's solid colliders and one collider
    fn set_collision_ignored(&mut self, entity: EntityId, collider: ColliderHandle, ignored: bool);

    /// Ground and platform contact events for `entity` from the last physics step
    fn contact_events(&self, entity: EntityId) -> Vec<ContactEvent>;

    /// Instantiate a character body from its template at `position`
    fn spawn_character(&mut self, body: CharacterBody, position: Vec2) -> EntityId;

    /// Template an entity was spawned from
    fn template(&self, entity: EntityId) -> Option<&'static str>;

    /// Remove an entity and all of its colliders
    fn despawn(&mut self, entity: EntityId);
}

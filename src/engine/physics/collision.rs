use rapier2d::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Collision groups for filtering what objects can collide with each other
///
/// Groups double as the layer mask used by area queries: a query mask is the
/// bitwise OR of the groups it should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroups {
    /// Default group - interacts with everything
    Default = 0b0000_0001,

    /// Player-controlled character bodies
    Player = 0b0000_0010,

    /// Solid ground and walls
    Ground = 0b0000_0100,

    /// Platforms the player can stand on and drop through
    OneWayPlatform = 0b0000_1000,

    /// Enemy hurtboxes (the hittable layer)
    Enemy = 0b0001_0000,

    /// Doors, chests, NPCs
    Interactable = 0b0010_0000,

    /// Dropped skulls and other pickups
    Pickup = 0b0100_0000,

    /// Trigger volumes such as the ground sensor - don't cause physical collision
    Sensor = 0b1000_0000,
}

impl CollisionGroups {
    const ALL: [CollisionGroups; 8] = [
        CollisionGroups::Default,
        CollisionGroups::Player,
        CollisionGroups::Ground,
        CollisionGroups::OneWayPlatform,
        CollisionGroups::Enemy,
        CollisionGroups::Interactable,
        CollisionGroups::Pickup,
        CollisionGroups::Sensor,
    ];

    /// Raw membership bit
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Combine several groups into a query mask
    pub fn mask(groups: &[CollisionGroups]) -> u32 {
        groups.iter().fold(0, |mask, group| mask | group.bits())
    }

    /// Find the group a collider belongs to from its membership bits.
    /// The lowest matching bit wins when several are set.
    pub fn from_membership(bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|group| bits & group.bits() != 0)
    }

    /// Convert to rapier2d's InteractionGroups
    pub fn to_interaction_groups(self) -> InteractionGroups {
        let memberships = Group::from_bits_truncate(self as u32);

        let filter = match self {
            // Players stand on ground and platforms and touch pickups,
            // but pass through enemies and each other
            CollisionGroups::Player => Group::from_bits_truncate(Self::mask(&[
                CollisionGroups::Ground,
                CollisionGroups::OneWayPlatform,
                CollisionGroups::Pickup,
            ])),

            // Foot sensors only care about what can be stood on
            CollisionGroups::Sensor => Group::from_bits_truncate(Self::mask(&[
                CollisionGroups::Ground,
                CollisionGroups::OneWayPlatform,
            ])),

            // Level geometry supports every body type
            CollisionGroups::Ground | CollisionGroups::OneWayPlatform => {
                Group::from_bits_truncate(Self::mask(&[
                    CollisionGroups::Player,
                    CollisionGroups::Enemy,
                    CollisionGroups::Pickup,
                    CollisionGroups::Sensor,
                ]))
            }

            // Enemies walk on level geometry
            CollisionGroups::Enemy => Group::from_bits_truncate(Self::mask(&[
                CollisionGroups::Ground,
                CollisionGroups::OneWayPlatform,
            ])),

            // Interactables are found by queries, not contacts
            CollisionGroups::Interactable => Group::NONE,

            // Pickups rest on geometry and are touched by players
            CollisionGroups::Pickup => Group::from_bits_truncate(Self::mask(&[
                CollisionGroups::Ground,
                CollisionGroups::OneWayPlatform,
                CollisionGroups::Player,
            ])),

            CollisionGroups::Default => Group::ALL,
        };

        InteractionGroups::new(memberships, filter)
    }
}

/// Custom collision event for game logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEvent {
    /// Two colliders started touching
    Started {
        collider1: ColliderHandle,
        collider2: ColliderHandle,
        /// At least one of the colliders is a sensor
        sensor: bool,
    },

    /// Two colliders stopped touching
    Stopped {
        collider1: ColliderHandle,
        collider2: ColliderHandle,
        sensor: bool,
    },
}

/// Queue for storing collision events during physics step
pub struct CollisionEventQueue {
    events: Arc<Mutex<Vec<CollisionEvent>>>,
}

impl CollisionEventQueue {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::with_capacity(32))),
        }
    }

    /// Clear all events (call at start of physics step)
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    /// Get all collision events from this step
    pub fn events(&self) -> Vec<CollisionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Add a collision event
    fn push(&self, event: CollisionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for CollisionEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CollisionEventQueue {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: rapier2d::prelude::CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match event {
            rapier2d::prelude::CollisionEvent::Started(h1, h2, flags) => {
                self.push(CollisionEvent::Started {
                    collider1: h1,
                    collider2: h2,
                    sensor: flags.contains(CollisionEventFlags::SENSOR),
                });
            }
            rapier2d::prelude::CollisionEvent::Stopped(h1, h2, flags) => {
                self.push(CollisionEvent::Stopped {
                    collider1: h1,
                    collider2: h2,
                    sensor: flags.contains(CollisionEventFlags::SENSOR),
                });
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Contact-pair hook that suppresses solver contacts between specific collider pairs.
///
/// Only colliders with `ActiveHooks::FILTER_CONTACT_PAIRS` are consulted.
#[derive(Debug, Default, Clone)]
pub struct ContactFilter {
    ignored: HashSet<(ColliderHandle, ColliderHandle)>,
}

impl ContactFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop resolving contacts between `a` and `b`
    pub fn ignore(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.ignored.insert((a, b));
        self.ignored.insert((b, a));
    }

    /// Resolve contacts between `a` and `b` again
    pub fn restore(&mut self, a: ColliderHandle, b: ColliderHandle) {
        self.ignored.remove(&(a, b));
        self.ignored.remove(&(b, a));
    }

    /// Check whether contacts between `a` and `b` are suppressed
    pub fn is_ignored(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        self.ignored.contains(&(a, b))
    }

    /// Drop every exclusion that involves `collider`
    pub fn forget(&mut self, collider: ColliderHandle) {
        self.ignored.retain(|(a, b)| *a != collider && *b != collider);
    }

    /// Number of suppressed pairs
    pub fn len(&self) -> usize {
        self.ignored.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.ignored.is_empty()
    }
}

impl PhysicsHooks for ContactFilter {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if self.is_ignored(context.collider1, context.collider2) {
            None
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }
}

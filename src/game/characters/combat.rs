// Combat: attack swing timing, damage resolution and interaction
//
// Targets are matched by collision layer and then looked up by capability.
// The resolver never knows what kind of entity it is hitting.

use glam::Vec2;
use log::debug;
use std::collections::HashMap;
use std::fmt;

use crate::core::math::tick_down;
use crate::engine::physics::{CollisionGroups, EntityId, PhysicsBackend};

use super::stats::CharacterStats;

/// Anything that can receive combat damage
pub trait Damageable {
    fn take_damage(&mut self, amount: i32);
}

/// Anything the player can interact with (doors, chests, dropped skulls)
pub trait Interactable {
    fn interact(&mut self);
}

/// Timing of an attack clip: how long it plays and when it connects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackClip {
    pub frame_count: u32,
    pub fps: f32,
    /// Frame on which the hit is resolved
    pub active_frame: u32,
}

impl AttackClip {
    pub const fn new(frame_count: u32, fps: f32, active_frame: u32) -> Self {
        Self {
            frame_count,
            fps,
            active_frame,
        }
    }

    pub fn frame_duration(&self) -> f32 {
        1.0 / self.fps
    }

    pub fn total_duration(&self) -> f32 {
        self.frame_count as f32 * self.frame_duration()
    }
}

/// What happened during one swing update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwingTick {
    /// The active frame was reached; resolve the hit now
    pub strike: bool,
    /// Clip and recovery are both over
    pub complete: bool,
}

/// Playback of one attack: clip frames, then a recovery delay
#[derive(Debug, Clone, PartialEq)]
pub struct Swing {
    clip: AttackClip,
    frame_timer: f32,
    current_frame: u32,
    struck: bool,
    clip_finished: bool,
    recovery_remaining: f32,
}

impl Swing {
    pub fn new(clip: AttackClip, recovery: f32) -> Self {
        Self {
            clip,
            frame_timer: 0.0,
            current_frame: 0,
            struck: false,
            clip_finished: false,
            recovery_remaining: recovery,
        }
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn has_struck(&self) -> bool {
        self.struck
    }

    /// Clip progress in 0..=1
    pub fn progress(&self) -> f32 {
        if self.clip_finished {
            return 1.0;
        }
        let total = self.clip.total_duration();
        let elapsed = self.current_frame as f32 * self.clip.frame_duration() + self.frame_timer;
        (elapsed / total).min(1.0)
    }

    pub fn advance(&mut self, dt: f32) -> SwingTick {
        let mut tick = SwingTick::default();

        let just_finished = !self.clip_finished;
        if !self.clip_finished {
            let frame_duration = self.clip.frame_duration();
            self.frame_timer += dt;

            while self.frame_timer >= frame_duration && !self.clip_finished {
                self.frame_timer -= frame_duration;
                self.current_frame += 1;

                if self.current_frame >= self.clip.frame_count {
                    // Hold on the last frame
                    self.current_frame = self.clip.frame_count.saturating_sub(1);
                    self.clip_finished = true;
                }
            }

            if !self.struck && self.current_frame >= self.clip.active_frame {
                self.struck = true;
                tick.strike = true;
            }

            if !self.clip_finished {
                return tick;
            }
        }

        // Recovery starts counting on the tick after the clip ends
        if !just_finished {
            self.recovery_remaining = tick_down(self.recovery_remaining, dt);
        }
        tick.complete = self.recovery_remaining <= 0.0;
        tick
    }
}

/// Capability lookup for entities the physics layer knows about
#[derive(Default)]
pub struct TargetRegistry {
    damageables: HashMap<EntityId, Vec<Box<dyn Damageable>>>,
    interactables: HashMap<EntityId, Vec<Box<dyn Interactable>>>,
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("damageables", &self.damageables.len())
            .field("interactables", &self.interactables.len())
            .finish()
    }
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one more damage-receiving facet to `entity`
    pub fn add_damageable(&mut self, entity: EntityId, facet: Box<dyn Damageable>) {
        self.damageables.entry(entity).or_default().push(facet);
    }

    pub fn add_interactable(&mut self, entity: EntityId, facet: Box<dyn Interactable>) {
        self.interactables.entry(entity).or_default().push(facet);
    }

    /// Number of damage-receiving facets on `entity`
    pub fn facet_count(&self, entity: EntityId) -> usize {
        self.damageables.get(&entity).map_or(0, Vec::len)
    }

    /// Forget every capability of a despawned entity
    pub fn remove(&mut self, entity: EntityId) {
        self.damageables.remove(&entity);
        self.interactables.remove(&entity);
    }

    fn damageables_mut(&mut self, entity: EntityId) -> Option<&mut Vec<Box<dyn Damageable>>> {
        self.damageables.get_mut(&entity)
    }

    fn first_interactable(&mut self, entity: EntityId) -> Option<&mut Box<dyn Interactable>> {
        self.interactables.get_mut(&entity)?.first_mut()
    }
}

/// Area-query damage and interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatResolver {
    max_targets: usize,
}

impl CombatResolver {
    pub fn new(max_targets: usize) -> Self {
        Self { max_targets }
    }

    pub fn max_targets(&self) -> usize {
        self.max_targets
    }

    /// Hit everything on the hittable layers around `origin`.
    /// Every facet of every matched entity takes damage independently.
    /// Returns the number of damage calls made.
    pub fn strike(
        &self,
        physics: &dyn PhysicsBackend,
        targets: &mut TargetRegistry,
        origin: Vec2,
        stats: &CharacterStats,
        attacker: Option<EntityId>,
    ) -> usize {
        let amount = stats.strike_damage();
        let matched = physics.overlap_circle(
            origin,
            stats.attack_range,
            stats.hittable_mask,
            self.max_targets,
            attacker,
        );

        let mut calls = 0;
        for entity in matched {
            // No facet is a valid outcome
            let Some(facets) = targets.damageables_mut(entity) else {
                continue;
            };
            for facet in facets.iter_mut() {
                facet.take_damage(amount);
                calls += 1;
            }
        }

        debug!("Strike for {} hit {} facet(s)", amount, calls);
        calls
    }

    /// Interact with the nearest interactable in range. Returns true if one responded.
    pub fn interact(
        &self,
        physics: &dyn PhysicsBackend,
        targets: &mut TargetRegistry,
        origin: Vec2,
        range: f32,
        actor: Option<EntityId>,
    ) -> bool {
        let matched = physics.overlap_circle(
            origin,
            range,
            CollisionGroups::Interactable.bits(),
            1,
            actor,
        );

        let Some(&entity) = matched.first() else {
            return false;
        };
        let Some(facet) = targets.first_interactable(entity) else {
            return false;
        };
        facet.interact();
        true
    }
}

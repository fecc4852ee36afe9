// Ground and one-way platform sensing
//
// `grounded` is level-triggered from the foot sensor's begin/end events.
// The platform reference only enables dropping through; it says nothing
// about being grounded.

use crate::core::math::tick_down;
use crate::engine::physics::{ColliderHandle, ContactEvent, ContactPhase};

/// Grounded flag edge produced by a contact event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChange {
    Landed,
    LeftGround,
}

/// A time-boxed collision exclusion against one platform
#[derive(Debug, Clone, Copy, PartialEq)]
struct Exclusion {
    collider: ColliderHandle,
    remaining: f32,
}

#[derive(Debug, Clone)]
pub struct GroundSensor {
    grounded: bool,
    platform: Option<ColliderHandle>,
    exclusions: Vec<Exclusion>,
    window: f32,
}

impl GroundSensor {
    /// `window` is how long a dropped-through platform stays excluded
    pub fn new(window: f32) -> Self {
        Self {
            grounded: false,
            platform: None,
            exclusions: Vec::new(),
            window,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Most recent one-way platform the body is touching
    pub fn platform(&self) -> Option<ColliderHandle> {
        self.platform
    }

    /// Platforms currently excluded from collision
    pub fn excluded(&self) -> impl Iterator<Item = ColliderHandle> + '_ {
        self.exclusions.iter().map(|e| e.collider)
    }

    /// Apply one contact event. `vertical_velocity` filters out ground
    /// overlaps that begin while the body is still rising.
    pub fn handle_contact(
        &mut self,
        event: ContactEvent,
        vertical_velocity: f32,
    ) -> Option<SensorChange> {
        match event {
            ContactEvent::Ground(ContactPhase::Began) => {
                if vertical_velocity > 0.0 || self.grounded {
                    return None;
                }
                self.grounded = true;
                Some(SensorChange::Landed)
            }
            ContactEvent::Ground(ContactPhase::Ended) => {
                if !self.grounded {
                    return None;
                }
                self.grounded = false;
                Some(SensorChange::LeftGround)
            }
            ContactEvent::Platform {
                phase: ContactPhase::Began,
                collider,
            } => {
                self.platform = Some(collider);
                None
            }
            ContactEvent::Platform {
                phase: ContactPhase::Ended,
                collider,
            } => {
                if self.platform == Some(collider) {
                    self.platform = None;
                }
                None
            }
        }
    }

    /// Start excluding the touched platform. Returns the collider the caller
    /// must suppress collision with, or `None` without a platform contact.
    pub fn request_drop_through(&mut self) -> Option<ColliderHandle> {
        let collider = self.platform?;
        match self.exclusions.iter_mut().find(|e| e.collider == collider) {
            Some(existing) => existing.remaining = self.window,
            None => self.exclusions.push(Exclusion {
                collider,
                remaining: self.window,
            }),
        }
        Some(collider)
    }

    /// Advance exclusion windows. Returns the colliders whose window lapsed;
    /// collision with them must be restored even if still overlapping.
    pub fn tick(&mut self, dt: f32) -> Vec<ColliderHandle> {
        let mut expired = Vec::new();
        self.exclusions.retain_mut(|exclusion| {
            exclusion.remaining = tick_down(exclusion.remaining, dt);
            if exclusion.remaining <= 0.0 {
                expired.push(exclusion.collider);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Drop every exclusion at once (controller teardown)
    pub fn take_exclusions(&mut self) -> Vec<ColliderHandle> {
        self.exclusions.drain(..).map(|e| e.collider).collect()
    }
}

// Shared fixtures for controller tests

use glam::Vec2;

use crate::engine::physics::mock::MockPhysics;
use crate::engine::physics::{ContactEvent, ContactPhase, EntityId, PhysicsBackend};
use crate::game::config::{ControllerConfig, DEFAULT_CONFIG};

use super::character::{ControllerContext, PlayerController};
use super::combat::TargetRegistry;
use super::events::{ControllerEffect, EventQueue, GameStateLog};
use super::stats::CharacterStats;
use super::swap::SwapRequest;

/// Step length used by controller tests; exact in binary floating point
pub const DT: f32 = 0.25;

pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        fixed_timestep: DT,
        ..DEFAULT_CONFIG
    }
}

/// Mock physics plus recording collaborators
pub struct Harness {
    pub physics: MockPhysics,
    pub targets: TargetRegistry,
    pub game_state: GameStateLog,
    pub events: EventQueue,
    pub effects: Vec<ControllerEffect>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            physics: MockPhysics::new(),
            targets: TargetRegistry::new(),
            game_state: GameStateLog::default(),
            events: EventQueue::new(),
            effects: Vec::new(),
        }
    }

    pub fn context(&mut self) -> ControllerContext<'_> {
        ControllerContext {
            physics: &mut self.physics,
            targets: &mut self.targets,
            game_state: &mut self.game_state,
            events: &mut self.events,
            effects: &mut self.effects,
        }
    }

    pub fn spawn(&mut self, stats: CharacterStats) -> PlayerController {
        PlayerController::spawn(&mut self.physics, stats, Vec2::ZERO, &test_config())
            .expect("test stats are valid")
    }

    /// One fixed update; contact events are consumed like a physics step would
    pub fn tick(&mut self, controller: &mut PlayerController, dt: f32) -> Option<SwapRequest> {
        let request = {
            let mut ctx = self.context();
            controller.fixed_update(&mut ctx, dt)
        };
        self.physics.clear_contacts();
        request
    }

    pub fn ticks(&mut self, controller: &mut PlayerController, count: usize) {
        for _ in 0..count {
            self.tick(controller, DT);
        }
    }

    /// Put the controller on the ground with one tick
    pub fn land(&mut self, controller: &mut PlayerController) {
        self.physics.set_velocity(controller.entity(), Vec2::ZERO);
        self.physics
            .push_contact(controller.entity(), ContactEvent::Ground(ContactPhase::Began));
        self.tick(controller, DT);
    }

    pub fn velocity(&self, entity: EntityId) -> Vec2 {
        self.physics.velocity(entity).unwrap_or(Vec2::NAN)
    }

    pub fn set_velocity(&mut self, entity: EntityId, velocity: Vec2) {
        self.physics.set_velocity(entity, velocity);
    }

    pub fn effect_count(&self, effect: ControllerEffect) -> usize {
        self.effects.iter().filter(|e| **e == effect).count()
    }
}

// Character system
//
// This module contains the action-resolution core of a playable skull:
// - Stats and resource timers (jumps, dashes, cooldowns)
// - Ground/platform sensing and movement integration
// - The action state machine and the controller that owns it
// - Combat, swap/possession and collaborator notifications

pub mod character;
pub mod combat;
pub mod events;
pub mod movement;
pub mod resources;
pub mod sensor;
pub mod state;
pub mod stats;
pub mod swap;
#[cfg(test)]
mod testing;

use thiserror::Error;

use crate::engine::physics::EntityId;

// Re-export commonly used types
pub use character::{
    CharacterRuntimeState, ControllerContext, ControllerRegistry, PlayerController,
};
pub use combat::{AttackClip, CombatResolver, Damageable, Interactable, TargetRegistry};
pub use events::{ControllerEffect, EffectSink, EventBus, EventQueue, GameEvent, GameState};
pub use movement::{Facing, MovementIntegrator};
pub use resources::{Cooldown, DashCharges, JumpCharges, ResourcePool};
pub use sensor::{GroundSensor, SensorChange};
pub use state::{ActionState, ActionStateMachine, Trigger};
pub use stats::{CharacterStats, HEAVY_SKULL, LITTLE_BONE};
pub use swap::{SwapOutcome, SwapRequest};

/// Errors raised at the boundary where character data enters the core
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("invalid stat `{field}`: {reason}")]
    InvalidStat { field: &'static str, reason: String },

    #[error("no controller for entity {0}")]
    NotFound(EntityId),
}

// Controller tunables shared by every character

use glam::Vec2;

use crate::engine::game_loop::FIXED_TIMESTEP;
use crate::engine::input::buffer::MAX_BUFFER_SIZE;

/// Tunables that don't belong to a particular character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Duration of one fixed simulation step (seconds)
    pub fixed_timestep: f32,
    /// World gravity, used to precompute the extra fall acceleration
    pub gravity: Vec2,
    /// How long a dropped-through platform ignores the character (seconds)
    pub drop_through_window: f32,
    /// Delay between the attack swing finishing and control returning (seconds)
    pub attack_recovery: f32,
    /// Hit stun after taking non-lethal damage (seconds)
    pub hurt_duration: f32,
    /// Upper bound on targets considered by one attack query
    pub max_attack_targets: usize,
    /// Pending trigger capacity per controller
    pub max_pending_triggers: usize,
    /// Horizontal input magnitude below which the stick counts as centred
    pub input_deadzone: f32,
}

pub const DEFAULT_CONFIG: ControllerConfig = ControllerConfig {
    fixed_timestep: FIXED_TIMESTEP,
    gravity: Vec2::new(0.0, -9.81),
    drop_through_window: 0.5,
    attack_recovery: 0.1,
    hurt_duration: 0.2,
    max_attack_targets: 15,
    max_pending_triggers: MAX_BUFFER_SIZE,
    input_deadzone: 0.1,
};

impl Default for ControllerConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

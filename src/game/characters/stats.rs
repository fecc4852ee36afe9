// Character stats - one immutable record per skull
//
// Stats are owned by the asset/configuration layer and only ever read by a
// controller. Swapping skulls moves the record between controllers.

use super::combat::AttackClip;
use super::CharacterError;
use crate::engine::input::SkillSlot;
use crate::engine::physics::{CharacterBody, CollisionGroups};

/// Everything a controller needs to know about the skull it is driving
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterStats {
    /// Skull name (for logs and HUD)
    pub name: &'static str,
    /// Entity template used to spawn this skull's body or its dropped pickup
    pub template: &'static str,

    // Movement
    /// Horizontal movement speed (units/second)
    pub move_speed: f32,
    /// Vertical velocity applied by a jump
    pub jump_power: f32,
    /// Number of jumps before landing again
    pub jump_count: u8,
    /// Extra gravity multiplier while falling
    pub fall_multiplier: f32,
    /// Grace window after leaving the ground during which a jump is still allowed
    pub coyote_time: f32,

    // Dash
    pub dash_count: u8,
    pub dash_power: f32,
    pub dash_duration: f32,
    /// Time after the last dash before all charges come back
    pub dash_cooldown: f32,

    // Combat
    pub attack_range: f32,
    pub attack_damage: i32,
    pub damage_multiplier: f32,
    /// Layers the attack query matches
    pub hittable_mask: u32,
    pub attack_clip: AttackClip,

    // Skills
    pub skill_cooldowns: [f32; 2],
    pub swap_cooldown: f32,

    // Misc
    pub interact_range: f32,
    pub max_health: i32,

    // Dimensions (for physics collider)
    pub width: f32,
    pub height: f32,
}

/// The starting skull: nimble, double jump, two dashes
pub const LITTLE_BONE: CharacterStats = CharacterStats {
    name: "Little Bone",
    template: "skull_little_bone",

    move_speed: 6.0,
    jump_power: 12.0,
    jump_count: 2,
    fall_multiplier: 2.5,
    coyote_time: 0.1,

    dash_count: 2,
    dash_power: 18.0,
    dash_duration: 0.15,
    dash_cooldown: 1.5,

    attack_range: 1.2,
    attack_damage: 10,
    damage_multiplier: 1.0,
    hittable_mask: CollisionGroups::Enemy as u32,
    attack_clip: AttackClip::new(6, 15.0, 3),

    skill_cooldowns: [4.0, 8.0],
    swap_cooldown: 2.0,

    interact_range: 1.0,
    max_health: 100,

    width: 0.8,
    height: 1.6,
};

/// A heavy skull: slow, single jump and dash, hits hard
pub const HEAVY_SKULL: CharacterStats = CharacterStats {
    name: "Ogre",
    template: "skull_ogre",

    move_speed: 4.5,
    jump_power: 10.0,
    jump_count: 1,
    fall_multiplier: 3.0,
    coyote_time: 0.12,

    dash_count: 1,
    dash_power: 14.0,
    dash_duration: 0.2,
    dash_cooldown: 2.5,

    attack_range: 1.8,
    attack_damage: 18,
    damage_multiplier: 1.25,
    hittable_mask: CollisionGroups::Enemy as u32,
    attack_clip: AttackClip::new(8, 12.0, 5),

    skill_cooldowns: [6.0, 12.0],
    swap_cooldown: 2.0,

    interact_range: 1.0,
    max_health: 140,

    width: 1.2,
    height: 2.0,
};

impl Default for CharacterStats {
    fn default() -> Self {
        LITTLE_BONE
    }
}

impl CharacterStats {
    /// The starting skull
    pub fn standard() -> Self {
        LITTLE_BONE
    }

    /// Body to instantiate when this skull takes control
    pub fn body(&self) -> CharacterBody {
        CharacterBody {
            template: self.template,
            width: self.width,
            height: self.height,
        }
    }

    /// Damage dealt to each damage-receiving facet per strike
    pub fn strike_damage(&self) -> i32 {
        (self.attack_damage as f32 * self.damage_multiplier).ceil() as i32
    }

    /// Cooldown duration of a skill slot
    pub fn skill_cooldown(&self, slot: SkillSlot) -> f32 {
        self.skill_cooldowns[slot.index()]
    }

    /// Reject stats a controller cannot run with
    pub fn validate(&self) -> Result<(), CharacterError> {
        fn invalid(field: &'static str, reason: &str) -> Result<(), CharacterError> {
            Err(CharacterError::InvalidStat {
                field,
                reason: reason.to_string(),
            })
        }

        let non_negative = [
            ("move_speed", self.move_speed),
            ("jump_power", self.jump_power),
            ("fall_multiplier", self.fall_multiplier),
            ("coyote_time", self.coyote_time),
            ("dash_power", self.dash_power),
            ("dash_cooldown", self.dash_cooldown),
            ("attack_range", self.attack_range),
            ("damage_multiplier", self.damage_multiplier),
            ("skill1_cooldown", self.skill_cooldowns[0]),
            ("skill2_cooldown", self.skill_cooldowns[1]),
            ("swap_cooldown", self.swap_cooldown),
            ("interact_range", self.interact_range),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return invalid(field, "must be a finite, non-negative number");
            }
        }

        if !(self.dash_duration.is_finite() && self.dash_duration > 0.0) {
            return invalid("dash_duration", "must be positive");
        }
        if self.attack_damage < 0 {
            return invalid("attack_damage", "must not be negative");
        }
        if self.template.is_empty() {
            return invalid("template", "a skull needs an entity template to spawn from");
        }
        if self.max_health <= 0 {
            return invalid("max_health", "must be positive");
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return invalid("size", "width and height must be positive");
        }
        if self.attack_clip.frame_count == 0 || self.attack_clip.fps <= 0.0 {
            return invalid("attack_clip", "needs at least one frame and a positive fps");
        }
        if self.attack_clip.active_frame >= self.attack_clip.frame_count {
            return invalid("attack_clip", "active frame is past the last frame");
        }

        Ok(())
    }
}

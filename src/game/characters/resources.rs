// Resource timers: jump charges, coyote time, dash charges and cooldowns
//
// Everything here is a plain countdown advanced by an explicit `dt`.

use crate::core::math::tick_down;
use crate::engine::input::SkillSlot;

use super::stats::CharacterStats;

/// A single countdown that is either running or ready
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    remaining: f32,
    duration: f32,
}

impl Cooldown {
    /// A ready cooldown of the given duration
    pub fn new(duration: f32) -> Self {
        Self {
            remaining: 0.0,
            duration,
        }
    }

    /// Restart the full countdown, replacing any in-flight one
    pub fn start(&mut self) {
        self.remaining = self.duration;
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Fraction of the cooldown still to run (1.0 just started, 0.0 ready)
    pub fn ratio(&self) -> f32 {
        if self.duration <= 0.0 {
            0.0
        } else {
            self.remaining / self.duration
        }
    }

    /// Advance the countdown. Returns true on the tick it reaches zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.is_ready() {
            return false;
        }
        self.remaining = tick_down(self.remaining, dt);
        self.is_ready()
    }
}

/// Jump charges plus the coyote-time grace window
#[derive(Debug, Clone, PartialEq)]
pub struct JumpCharges {
    remaining: u8,
    max: u8,
    coyote_remaining: f32,
    coyote_time: f32,
}

impl JumpCharges {
    pub fn new(max: u8, coyote_time: f32) -> Self {
        Self {
            remaining: max,
            max,
            coyote_remaining: 0.0,
            coyote_time,
        }
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn coyote_remaining(&self) -> f32 {
        self.coyote_remaining
    }

    /// A jump is allowed inside the coyote window or with a charge left
    pub fn can_jump(&self) -> bool {
        self.coyote_remaining > 0.0 || self.remaining > 0
    }

    /// Spend a jump. Returns the charge count before spending, or `None` if
    /// no jump is available. Coyote time is used up by any jump.
    pub fn consume(&mut self) -> Option<u8> {
        if !self.can_jump() {
            return None;
        }
        let before = self.remaining;
        self.remaining = self.remaining.saturating_sub(1);
        self.coyote_remaining = 0.0;
        Some(before)
    }

    /// Landing refills every charge and the full coyote window
    pub fn land(&mut self) {
        self.remaining = self.max;
        self.coyote_remaining = self.coyote_time;
    }

    /// Refresh coyote time while standing, drain it while airborne
    pub fn tick(&mut self, dt: f32, grounded: bool, rising: bool) {
        if grounded && !rising {
            self.coyote_remaining = self.coyote_time;
        } else {
            self.coyote_remaining = tick_down(self.coyote_remaining, dt);
        }
    }
}

/// Dash charges with a single batch-refill cooldown
#[derive(Debug, Clone, PartialEq)]
pub struct DashCharges {
    remaining: u8,
    max: u8,
    cooldown: Cooldown,
}

impl DashCharges {
    pub fn new(max: u8, cooldown: f32) -> Self {
        Self {
            remaining: max,
            max,
            cooldown: Cooldown::new(cooldown),
        }
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn can_dash(&self) -> bool {
        self.remaining > 0
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Dash started: restart the refill countdown from full
    pub fn begin_dash(&mut self) {
        self.cooldown.start();
    }

    /// Dash ended: the charge is spent now. A countdown that already lapsed
    /// mid-dash is restarted so the charge still comes back.
    pub fn finish_dash(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.cooldown.is_ready() && self.remaining < self.max {
            self.cooldown.start();
        }
    }

    /// Returns true when the countdown expired and all charges were restored
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.cooldown.tick(dt) {
            self.remaining = self.max;
            return true;
        }
        false
    }
}

/// Every resource a controller gates its actions on
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool {
    pub jumps: JumpCharges,
    pub dashes: DashCharges,
    pub skills: [Cooldown; 2],
    pub swap: Cooldown,
}

impl ResourcePool {
    pub fn new(stats: &CharacterStats) -> Self {
        Self {
            jumps: JumpCharges::new(stats.jump_count, stats.coyote_time),
            dashes: DashCharges::new(stats.dash_count, stats.dash_cooldown),
            skills: [
                Cooldown::new(stats.skill_cooldowns[0]),
                Cooldown::new(stats.skill_cooldowns[1]),
            ],
            swap: Cooldown::new(stats.swap_cooldown),
        }
    }

    pub fn skill(&self, slot: SkillSlot) -> &Cooldown {
        &self.skills[slot.index()]
    }

    pub fn skill_mut(&mut self, slot: SkillSlot) -> &mut Cooldown {
        &mut self.skills[slot.index()]
    }

    /// Advance every timer except coyote time, which needs the ground state.
    /// Returns true if the dash charges were refilled this tick.
    pub fn tick(&mut self, dt: f32) -> bool {
        for skill in &mut self.skills {
            skill.tick(dt);
        }
        self.swap.tick(dt);
        self.dashes.tick(dt)
    }
}

// Horizontal movement and asymmetric fall integration

use glam::Vec2;

/// Horizontal facing. Drives dash direction and sprite orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// Unit direction along x
    pub fn sign(self) -> f32 {
        match self {
            Self::Right => 1.0,
            Self::Left => -1.0,
        }
    }

    /// Facing implied by a horizontal input, if it points anywhere
    pub fn from_input(x: f32) -> Option<Self> {
        if x > 0.0 {
            Some(Self::Right)
        } else if x < 0.0 {
            Some(Self::Left)
        } else {
            None
        }
    }
}

/// Per-step velocity policy for a non-dashing character
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementIntegrator {
    fall_boost: Vec2,
}

impl MovementIntegrator {
    /// Precompute the extra fall acceleration applied each falling step
    pub fn new(gravity: Vec2, fall_multiplier: f32, fixed_dt: f32) -> Self {
        Self {
            fall_boost: Vec2::Y * gravity.y * fall_multiplier * fixed_dt,
        }
    }

    pub fn fall_boost(&self) -> Vec2 {
        self.fall_boost
    }

    /// New velocity for one fixed step. `hold_horizontal` pins x at zero
    /// (grounded attack, swap, hurt).
    pub fn step(&self, velocity: Vec2, move_x: f32, speed: f32, hold_horizontal: bool) -> Vec2 {
        let mut next = velocity;
        next.x = if hold_horizontal { 0.0 } else { move_x * speed };
        if next.y < 0.0 {
            next += self.fall_boost;
        }
        next
    }
}

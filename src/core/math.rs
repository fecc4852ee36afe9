// Math utilities and helper functions

use glam::Vec2;
use rapier2d::prelude::{Real, Vector};

/// Advance a countdown by `dt`, never going below zero
pub fn tick_down(remaining: f32, dt: f32) -> f32 {
    (remaining - dt).max(0.0)
}

/// Convert a gameplay vector into a rapier vector
pub fn to_physics(v: Vec2) -> Vector<Real> {
    Vector::new(v.x, v.y)
}

/// Convert a rapier vector into a gameplay vector
pub fn from_physics(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

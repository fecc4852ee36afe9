//! Action-resolution core for a 2D action platformer built around
//! swappable skulls.
//!
//! - `core`: small math helpers shared by every layer
//! - `engine`: fixed-step loop, input events and the rapier2d physics seam
//! - `game`: the player controller, its state machine and combat

pub mod core;
pub mod engine;
pub mod game;

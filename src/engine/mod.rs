// Engine plumbing: fixed-step timing, input events and physics

pub mod game_loop;
pub mod input;
pub mod physics;

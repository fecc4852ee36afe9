// Gameplay layer

pub mod characters;
pub mod config;

// Discrete input events delivered by the input collaborator

use glam::Vec2;

/// One of the two skill slots a character exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillSlot {
    Primary,
    Secondary,
}

impl SkillSlot {
    /// Index into per-slot arrays
    pub fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// Represents all in-game inputs the character core reacts to.
///
/// Device binding happens elsewhere; the core only ever sees these events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Movement stick/keys changed. Components are in -1..=1.
    Move(Vec2),
    Jump,
    Dash,
    Attack,
    Skill(SkillSlot),
    Swap,
    Interact,
}

impl InputEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Jump => "jump",
            Self::Dash => "dash",
            Self::Attack => "attack",
            Self::Skill(SkillSlot::Primary) => "skill1",
            Self::Skill(SkillSlot::Secondary) => "skill2",
            Self::Swap => "swap",
            Self::Interact => "interact",
        }
    }
}

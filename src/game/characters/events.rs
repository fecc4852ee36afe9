// Collaborator contracts: game state, event bus and visual/audio cues

use crate::engine::input::SkillSlot;
use crate::engine::physics::EntityId;

use super::character::PlayerController;
use super::state::ActionState;
use super::stats::CharacterStats;

/// Cross-character bookkeeping owned outside the core
pub trait GameState {
    fn player_took_damage(&mut self, amount: i32);

    /// Control moved to `controller` after a skull swap
    fn handle_skull_swap(&mut self, controller: &PlayerController);

    fn player_defeated(&mut self, _entity: EntityId) {}
}

/// Named events exchanged over the generic event bus
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A skull was collected; the payload becomes the secondary slot
    SkullPickedUp(CharacterStats),
    SkullSwapped,
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SkullPickedUp(_) => "skullPickedUp",
            Self::SkullSwapped => "skullSwapped",
        }
    }
}

pub trait EventBus {
    fn publish(&mut self, event: GameEvent);
}

/// Simple in-order event bus; the owner drains it once per frame
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventBus for EventQueue {
    fn publish(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

/// Fire-and-forget cues for animation, particles and audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEffect {
    Entered(ActionState),
    Exited(ActionState),
    /// The last-but-one jump charge was spent
    DoubleJump,
    DashSmoke,
    PlayerHit,
    SkillUsed(SkillSlot),
    DroppedThrough,
}

pub trait EffectSink {
    fn emit(&mut self, effect: ControllerEffect);
}

impl EffectSink for Vec<ControllerEffect> {
    fn emit(&mut self, effect: ControllerEffect) {
        self.push(effect);
    }
}

/// Discards every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEffects;

impl EffectSink for NullEffects {
    fn emit(&mut self, _effect: ControllerEffect) {}
}

/// Game state double that records every notification
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct GameStateLog {
    pub damage: Vec<i32>,
    pub swaps: Vec<EntityId>,
    pub defeated: Vec<EntityId>,
}

#[cfg(test)]
impl GameState for GameStateLog {
    fn player_took_damage(&mut self, amount: i32) {
        self.damage.push(amount);
    }

    fn handle_skull_swap(&mut self, controller: &PlayerController) {
        self.swaps.push(controller.entity());
    }

    fn player_defeated(&mut self, entity: EntityId) {
        self.defeated.push(entity);
    }
}

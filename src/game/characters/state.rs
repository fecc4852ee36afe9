// Action state machine
//
// One state at a time: dashing, attacking and swapping are variants of the
// same enum, so they can never overlap. Triggers are queued and consumed one
// per fixed tick; timers advance every tick whether a trigger arrived or not.

use log::{debug, warn};

use crate::core::math::tick_down;
use crate::engine::input::{InputBuffer, SkillSlot};

use super::combat::{SwingTick, Swing};

/// Vertical speed above which a body counts as rising
pub const RISE_THRESHOLD: f32 = 0.01;

/// Represents the current action of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionState {
    /// Standing still on ground
    #[default]
    Idle,
    /// Moving horizontally on ground
    Move,
    /// In the air, moving upward
    Jump,
    /// In the air, moving downward
    Fall,
    Dash,
    Attack,
    /// Handing control to the secondary skull; terminal for this controller
    Swap,
    /// Hit stun
    Hurt,
    /// Health ran out; terminal
    Defeated,
}

impl ActionState {
    /// Idle, Move, Jump or Fall: the states physics picks between
    pub fn is_locomotion(&self) -> bool {
        matches!(self, Self::Idle | Self::Move | Self::Jump | Self::Fall)
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self, Self::Jump | Self::Fall)
    }

    /// Jump is also accepted mid-attack (velocity only, no state change)
    pub fn can_jump(&self) -> bool {
        self.is_locomotion() || *self == Self::Attack
    }

    pub fn can_dash(&self) -> bool {
        self.is_locomotion()
    }

    pub fn can_attack(&self) -> bool {
        self.is_locomotion()
    }

    pub fn can_use_skill(&self) -> bool {
        self.is_locomotion()
    }

    pub fn can_swap(&self) -> bool {
        self.is_locomotion()
    }

    pub fn can_interact(&self) -> bool {
        self.is_locomotion()
    }

    /// Only plain movement states are interrupted by a hit
    pub fn can_be_stunned(&self) -> bool {
        self.is_locomotion()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Swap | Self::Defeated)
    }

    /// Name used by logs and the visual collaborator
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Move => "move",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Dash => "dash",
            Self::Attack => "attack",
            Self::Swap => "swap",
            Self::Hurt => "hurt",
            Self::Defeated => "defeated",
        }
    }
}

/// Events the state machine reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Jump,
    Dash,
    Attack,
    Skill(SkillSlot),
    Swap,
    Interact,
    /// Ground sensor started overlapping ground
    Grounded,
    /// Ground sensor stopped overlapping ground
    Airborne,
    /// Damage already subtracted from health, still to be reacted to
    Damage(i32),
}

/// Physics-derived inputs for picking between the locomotion states
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locomotion {
    pub grounded: bool,
    pub vertical_velocity: f32,
    pub moving: bool,
}

impl Locomotion {
    pub fn resolve(&self) -> ActionState {
        let rising = self.vertical_velocity > RISE_THRESHOLD;
        if self.grounded && !rising {
            if self.moving {
                ActionState::Move
            } else {
                ActionState::Idle
            }
        } else if rising {
            ActionState::Jump
        } else {
            ActionState::Fall
        }
    }
}

/// Completion signals produced by one `advance`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineTick {
    pub dash_finished: bool,
    pub hurt_finished: bool,
    /// The attack reached its active frame this tick
    pub strike: bool,
    pub attack_finished: bool,
}

#[derive(Debug)]
pub struct ActionStateMachine {
    current_state: ActionState,
    previous_state: ActionState,
    state_time: f32,
    pending: InputBuffer<Trigger>,
    dash_remaining: f32,
    hurt_remaining: f32,
    swing: Option<Swing>,
    changes: Vec<(ActionState, ActionState)>,
}

impl ActionStateMachine {
    /// `capacity` bounds the pending trigger queue
    pub fn new(capacity: usize) -> Self {
        Self {
            current_state: ActionState::Idle,
            previous_state: ActionState::Idle,
            state_time: 0.0,
            pending: InputBuffer::with_capacity(capacity),
            dash_remaining: 0.0,
            hurt_remaining: 0.0,
            swing: None,
            changes: Vec::new(),
        }
    }

    pub fn state(&self) -> ActionState {
        self.current_state
    }

    pub fn previous_state(&self) -> ActionState {
        self.previous_state
    }

    /// Time spent in the current state
    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    pub fn is_dashing(&self) -> bool {
        self.current_state == ActionState::Dash
    }

    pub fn is_attacking(&self) -> bool {
        self.current_state == ActionState::Attack
    }

    pub fn is_swapping(&self) -> bool {
        self.current_state == ActionState::Swap
    }

    pub fn is_defeated(&self) -> bool {
        self.current_state == ActionState::Defeated
    }

    pub fn swing(&self) -> Option<&Swing> {
        self.swing.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a trigger. Returns false if it was discarded.
    pub fn push(&mut self, trigger: Trigger) -> bool {
        if self.is_defeated() {
            debug!("Discarding {:?}: defeated", trigger);
            return false;
        }
        if let Some(dropped) = self.pending.push(trigger) {
            warn!("Trigger queue full, dropped oldest {:?}", dropped);
        }
        true
    }

    /// Next pending trigger in arrival order
    pub fn pop(&mut self) -> Option<Trigger> {
        self.pending.pop()
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Switch state, recording the change for the visual collaborator
    pub fn transition(&mut self, next: ActionState) {
        if self.current_state == next {
            return;
        }
        debug!("{} -> {}", self.current_state.name(), next.name());
        self.changes.push((self.current_state, next));
        self.previous_state = self.current_state;
        self.current_state = next;
        self.state_time = 0.0;
    }

    /// Transitions since the last call, oldest first
    pub fn take_changes(&mut self) -> Vec<(ActionState, ActionState)> {
        std::mem::take(&mut self.changes)
    }

    pub fn jump(&mut self) {
        if self.current_state.is_locomotion() {
            self.transition(ActionState::Jump);
        }
    }

    pub fn enter_dash(&mut self, duration: f32) {
        self.dash_remaining = duration;
        self.transition(ActionState::Dash);
    }

    /// Start a swing. Ignored while one is already playing.
    pub fn enter_attack(&mut self, swing: Swing) -> bool {
        if self.is_attacking() {
            return false;
        }
        self.swing = Some(swing);
        self.transition(ActionState::Attack);
        true
    }

    pub fn enter_swap(&mut self) {
        self.transition(ActionState::Swap);
    }

    /// Hit stun, only from plain movement states
    pub fn enter_hurt(&mut self, duration: f32) -> bool {
        if !self.current_state.can_be_stunned() {
            return false;
        }
        self.hurt_remaining = duration;
        self.transition(ActionState::Hurt);
        true
    }

    /// Enter the terminal defeat state from anywhere
    pub fn defeat(&mut self) {
        self.swing = None;
        self.dash_remaining = 0.0;
        self.hurt_remaining = 0.0;
        self.pending.clear();
        self.transition(ActionState::Defeated);
    }

    /// Touched down: airborne states settle to Idle/Move
    pub fn land(&mut self, moving: bool) {
        if self.current_state.is_airborne() {
            self.transition(if moving {
                ActionState::Move
            } else {
                ActionState::Idle
            });
        }
    }

    /// Walked off a ledge or was launched: ground states go airborne
    pub fn leave_ground(&mut self, vertical_velocity: f32) {
        if matches!(self.current_state, ActionState::Idle | ActionState::Move) {
            self.transition(if vertical_velocity > RISE_THRESHOLD {
                ActionState::Jump
            } else {
                ActionState::Fall
            });
        }
    }

    /// Pick the locomotion state that matches physics. No-op outside locomotion.
    pub fn settle(&mut self, locomotion: Locomotion) {
        if self.current_state.is_locomotion() {
            self.transition(locomotion.resolve());
        }
    }

    /// Advance per-state timers once. Finished actions fall back to the
    /// locomotion state `locomotion` resolves to.
    pub fn advance(&mut self, dt: f32, locomotion: Locomotion) -> MachineTick {
        let mut tick = MachineTick::default();

        match self.current_state {
            ActionState::Dash => {
                self.dash_remaining = tick_down(self.dash_remaining, dt);
                if self.dash_remaining <= 0.0 {
                    tick.dash_finished = true;
                    self.transition(locomotion.resolve());
                }
            }
            ActionState::Hurt => {
                self.hurt_remaining = tick_down(self.hurt_remaining, dt);
                if self.hurt_remaining <= 0.0 {
                    tick.hurt_finished = true;
                    self.transition(locomotion.resolve());
                }
            }
            ActionState::Attack => {
                let SwingTick { strike, complete } = match self.swing.as_mut() {
                    Some(swing) => swing.advance(dt),
                    None => SwingTick {
                        strike: false,
                        complete: true,
                    },
                };
                tick.strike = strike;
                if complete {
                    tick.attack_finished = true;
                    self.swing = None;
                    self.transition(locomotion.resolve());
                }
            }
            _ => {}
        }

        self.state_time += dt;
        tick
    }
}

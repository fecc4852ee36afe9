// Player controller and controller lifecycle management

use glam::Vec2;
use log::{debug, info, warn};

use crate::engine::input::{InputEvent, SkillSlot};
use crate::engine::physics::{ColliderHandle, ContactEvent, EntityId, PhysicsBackend};
use crate::game::config::ControllerConfig;

use super::combat::{CombatResolver, Damageable, Swing, TargetRegistry};
use super::events::{ControllerEffect, EffectSink, EventBus, GameEvent, GameState};
use super::movement::{Facing, MovementIntegrator};
use super::resources::ResourcePool;
use super::sensor::{GroundSensor, SensorChange};
use super::state::{ActionState, ActionStateMachine, Locomotion, Trigger, RISE_THRESHOLD};
use super::stats::CharacterStats;
use super::swap::{self, SwapOutcome, SwapParts, SwapRequest};
use super::CharacterError;

/// Downward input needed for a jump to become a drop-through
const DROP_THROUGH_INPUT: f32 = 0.5;

/// Collaborators a controller talks to during a fixed update
pub struct ControllerContext<'a> {
    pub physics: &'a mut dyn PhysicsBackend,
    pub targets: &'a mut TargetRegistry,
    pub game_state: &'a mut dyn GameState,
    pub events: &'a mut dyn EventBus,
    pub effects: &'a mut dyn EffectSink,
}

/// Read-only snapshot of a controller for HUD and visuals
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRuntimeState {
    pub entity: EntityId,
    pub state: ActionState,
    pub facing: Facing,
    pub move_input: Vec2,
    pub grounded: bool,
    pub remaining_jumps: u8,
    pub coyote_remaining: f32,
    pub dashing: bool,
    pub remaining_dashes: u8,
    pub dash_cooldown: f32,
    pub attacking: bool,
    pub swapping: bool,
    pub skill_cooldowns: [f32; 2],
    pub skill_ratios: [f32; 2],
    pub swap_cooldown: f32,
    pub swap_ratio: f32,
    pub platform: Option<ColliderHandle>,
    /// Name of the held secondary skull
    pub secondary: Option<&'static str>,
    pub health: i32,
    pub max_health: i32,
}

/// Drives one controlled skull body
#[derive(Debug)]
pub struct PlayerController {
    entity: EntityId,
    stats: CharacterStats,
    secondary: Option<CharacterStats>,
    config: ControllerConfig,

    machine: ActionStateMachine,
    resources: ResourcePool,
    sensor: GroundSensor,
    movement: MovementIntegrator,
    combat: CombatResolver,

    facing: Facing,
    move_input: Vec2,
    health: i32,
    /// Hits taken since the last fixed update, not yet told to the game state
    unreported_hits: Vec<i32>,
    /// Gravity scale to restore when a dash ends
    stored_gravity_scale: Option<f32>,
}

impl PlayerController {
    /// Build a controller for an existing body. `stats` must already be validated.
    pub fn new(entity: EntityId, stats: CharacterStats, config: &ControllerConfig) -> Self {
        Self {
            entity,
            secondary: None,
            config: *config,
            machine: ActionStateMachine::new(config.max_pending_triggers),
            resources: ResourcePool::new(&stats),
            sensor: GroundSensor::new(config.drop_through_window),
            movement: MovementIntegrator::new(
                config.gravity,
                stats.fall_multiplier,
                config.fixed_timestep,
            ),
            combat: CombatResolver::new(config.max_attack_targets),
            facing: Facing::Right,
            move_input: Vec2::ZERO,
            health: stats.max_health,
            unreported_hits: Vec::new(),
            stored_gravity_scale: None,
            stats,
        }
    }

    /// Validate `stats`, create a body for them and wrap it in a controller
    pub fn spawn(
        physics: &mut dyn PhysicsBackend,
        stats: CharacterStats,
        position: Vec2,
        config: &ControllerConfig,
    ) -> Result<Self, CharacterError> {
        stats.validate()?;
        let entity = physics.spawn_character(stats.body(), position);
        let config = ControllerConfig {
            gravity: physics.gravity(),
            ..*config
        };
        info!("Spawned {} as entity {}", stats.name, entity);
        Ok(Self::new(entity, stats, &config))
    }

    /// Controller taking over after a swap: carries health and facing over
    /// and holds the previous skull as its secondary
    pub(super) fn swapped_in(
        entity: EntityId,
        stats: CharacterStats,
        previous: CharacterStats,
        health: i32,
        unreported_hits: Vec<i32>,
        facing: Facing,
        config: &ControllerConfig,
    ) -> Self {
        let mut controller = Self::new(entity, stats, config);
        controller.health = health.min(controller.stats.max_health);
        controller.unreported_hits = unreported_hits;
        controller.facing = facing;
        controller.secondary = Some(previous);
        controller.resources.swap.start();
        controller
    }

    /// Tear this controller down for a swap. Gives it back unchanged when
    /// there is no secondary skull to swap to.
    pub(super) fn into_swap_parts(mut self) -> Result<SwapParts, Self> {
        let Some(next) = self.secondary.take() else {
            return Err(self);
        };
        Ok(SwapParts {
            excluded: self.sensor.take_exclusions(),
            entity: self.entity,
            previous: self.stats,
            next,
            health: self.health,
            unreported_hits: self.unreported_hits,
            config: self.config,
        })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn stats(&self) -> &CharacterStats {
        &self.stats
    }

    pub fn secondary(&self) -> Option<&CharacterStats> {
        self.secondary.as_ref()
    }

    pub fn state(&self) -> ActionState {
        self.machine.state()
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn is_grounded(&self) -> bool {
        self.sensor.is_grounded()
    }

    pub fn is_defeated(&self) -> bool {
        self.machine.is_defeated()
    }

    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn pending_triggers(&self) -> usize {
        self.machine.pending_len()
    }

    /// Horizontal input with the dead-zone applied
    fn horizontal_input(&self) -> f32 {
        if self.move_input.x.abs() < self.config.input_deadzone {
            0.0
        } else {
            self.move_input.x
        }
    }

    fn is_moving(&self) -> bool {
        self.horizontal_input() != 0.0
    }

    fn locomotion(&self, vertical_velocity: f32) -> Locomotion {
        Locomotion {
            grounded: self.sensor.is_grounded(),
            vertical_velocity,
            moving: self.is_moving(),
        }
    }

    fn velocity(&self, ctx: &ControllerContext<'_>) -> Vec2 {
        ctx.physics.velocity(self.entity).unwrap_or(Vec2::ZERO)
    }

    fn position(&self, ctx: &ControllerContext<'_>) -> Vec2 {
        ctx.physics.position(self.entity).unwrap_or(Vec2::ZERO)
    }

    /// Accept one input event. Move updates the input vector (and facing)
    /// right away; everything else is queued for the next fixed update.
    pub fn handle_input(&mut self, input: InputEvent) {
        if self.machine.is_defeated() {
            return;
        }
        let swapping = self.machine.is_swapping();

        let trigger = match input {
            InputEvent::Move(direction) => {
                self.move_input = direction.clamp(Vec2::NEG_ONE, Vec2::ONE);
                if !swapping {
                    if let Some(facing) = Facing::from_input(self.horizontal_input()) {
                        self.facing = facing;
                    }
                }
                return;
            }
            _ if swapping => {
                debug!("Ignoring {} while swapping", input.name());
                return;
            }
            InputEvent::Jump => Trigger::Jump,
            InputEvent::Dash => Trigger::Dash,
            InputEvent::Attack => Trigger::Attack,
            InputEvent::Skill(slot) => Trigger::Skill(slot),
            InputEvent::Swap => Trigger::Swap,
            InputEvent::Interact => Trigger::Interact,
        };
        self.machine.push(trigger);
    }

    /// Apply a contact event from the physics step. Landing and leaving the
    /// ground take effect immediately.
    pub fn handle_contact(
        &mut self,
        ctx: &mut ControllerContext<'_>,
        event: ContactEvent,
    ) -> Option<SensorChange> {
        let vertical_velocity = self.velocity(ctx).y;
        let change = self.sensor.handle_contact(event, vertical_velocity)?;
        match change {
            SensorChange::Landed => self.fire(Trigger::Grounded, ctx),
            SensorChange::LeftGround => self.fire(Trigger::Airborne, ctx),
        }
        Some(change)
    }

    /// Store a collected skull as the secondary slot
    pub fn receive_skull(&mut self, stats: CharacterStats) -> Result<(), CharacterError> {
        stats.validate()?;
        if let Some(previous) = &self.secondary {
            debug!("Replacing held skull {}", previous.name);
        }
        info!("Entity {} picked up {}", self.entity, stats.name);
        self.secondary = Some(stats);
        Ok(())
    }

    /// One fixed simulation step: contacts, at most one trigger, timers,
    /// then state effects. Returns a request when control must pass to the
    /// secondary skull.
    pub fn fixed_update(
        &mut self,
        ctx: &mut ControllerContext<'_>,
        dt: f32,
    ) -> Option<SwapRequest> {
        if self.machine.is_defeated() {
            return None;
        }

        for event in ctx.physics.contact_events(self.entity) {
            self.handle_contact(ctx, event);
        }

        // Reported here so a dropped or cleared Damage trigger loses no hit
        for amount in self.unreported_hits.drain(..) {
            ctx.game_state.player_took_damage(amount);
            ctx.effects.emit(ControllerEffect::PlayerHit);
        }

        if let Some(trigger) = self.machine.pop() {
            self.fire(trigger, ctx);
        }
        // A dropped damage trigger must not leave a dead player standing
        if self.health <= 0 && !self.machine.is_defeated() {
            self.defeat(ctx);
        }
        if self.machine.is_defeated() {
            self.emit_changes(ctx);
            return None;
        }

        // Timers
        let velocity = self.velocity(ctx);
        self.resources.tick(dt);
        self.resources.jumps.tick(
            dt,
            self.sensor.is_grounded(),
            velocity.y > RISE_THRESHOLD,
        );
        for collider in self.sensor.tick(dt) {
            ctx.physics.set_collision_ignored(self.entity, collider, false);
            debug!("Collision with platform {:?} restored", collider);
        }
        let tick = self.machine.advance(dt, self.locomotion(velocity.y));

        // Effects
        if tick.dash_finished {
            self.finish_dash(ctx);
        }
        if tick.strike {
            let origin = self.position(ctx);
            self.combat.strike(
                &*ctx.physics,
                ctx.targets,
                origin,
                &self.stats,
                Some(self.entity),
            );
        }
        if !self.machine.is_dashing() {
            self.integrate(ctx);
        }
        let vertical_velocity = self.velocity(ctx).y;
        self.machine.settle(self.locomotion(vertical_velocity));
        self.emit_changes(ctx);

        if self.machine.is_swapping() {
            return Some(SwapRequest {
                entity: self.entity,
                position: self.position(ctx),
                velocity: self.velocity(ctx),
                facing: self.facing,
            });
        }
        None
    }

    /// Snapshot for the per-frame collaborators
    pub fn frame_update(&self) -> CharacterRuntimeState {
        let skills = &self.resources.skills;
        CharacterRuntimeState {
            entity: self.entity,
            state: self.machine.state(),
            facing: self.facing,
            move_input: self.move_input,
            grounded: self.sensor.is_grounded(),
            remaining_jumps: self.resources.jumps.remaining(),
            coyote_remaining: self.resources.jumps.coyote_remaining(),
            dashing: self.machine.is_dashing(),
            remaining_dashes: self.resources.dashes.remaining(),
            dash_cooldown: self.resources.dashes.cooldown().remaining(),
            attacking: self.machine.is_attacking(),
            swapping: self.machine.is_swapping(),
            skill_cooldowns: [skills[0].remaining(), skills[1].remaining()],
            skill_ratios: [skills[0].ratio(), skills[1].ratio()],
            swap_cooldown: self.resources.swap.remaining(),
            swap_ratio: self.resources.swap.ratio(),
            platform: self.sensor.platform(),
            secondary: self.secondary.as_ref().map(|s| s.name),
            health: self.health,
            max_health: self.stats.max_health,
        }
    }

    fn fire(&mut self, trigger: Trigger, ctx: &mut ControllerContext<'_>) {
        match trigger {
            Trigger::Grounded => {
                self.resources.jumps.land();
                self.machine.land(self.is_moving());
            }
            Trigger::Airborne => {
                let vertical_velocity = self.velocity(ctx).y;
                self.machine.leave_ground(vertical_velocity);
            }
            Trigger::Jump => self.jump(ctx),
            Trigger::Dash => self.dash(ctx),
            Trigger::Attack => self.attack(),
            Trigger::Skill(slot) => self.use_skill(slot, ctx),
            Trigger::Swap => self.begin_swap(),
            Trigger::Interact => self.interact(ctx),
            Trigger::Damage(amount) => self.react_to_damage(amount, ctx),
        }
    }

    fn jump(&mut self, ctx: &mut ControllerContext<'_>) {
        let state = self.machine.state();
        if !state.can_jump() {
            debug!("Jump rejected in {}", state.name());
            return;
        }

        // Down + jump on a one-way platform drops through instead
        if self.move_input.y < -DROP_THROUGH_INPUT && state.is_locomotion() {
            if let Some(collider) = self.sensor.request_drop_through() {
                ctx.physics.set_collision_ignored(self.entity, collider, true);
                ctx.effects.emit(ControllerEffect::DroppedThrough);
                debug!("Dropping through platform {:?}", collider);
                return;
            }
        }

        let Some(before) = self.resources.jumps.consume() else {
            debug!("Jump rejected: no charges and no coyote time");
            return;
        };
        if before == 1 {
            ctx.effects.emit(ControllerEffect::DoubleJump);
        }

        let mut velocity = self.velocity(ctx);
        velocity.y = self.stats.jump_power;
        ctx.physics.set_velocity(self.entity, velocity);
        self.machine.jump();
    }

    fn dash(&mut self, ctx: &mut ControllerContext<'_>) {
        let state = self.machine.state();
        if !state.can_dash() || !self.resources.dashes.can_dash() {
            debug!(
                "Dash rejected in {} with {} charge(s)",
                state.name(),
                self.resources.dashes.remaining()
            );
            return;
        }

        self.resources.dashes.begin_dash();
        ctx.effects.emit(ControllerEffect::DashSmoke);

        let scale = ctx.physics.gravity_scale(self.entity).unwrap_or(1.0);
        self.stored_gravity_scale = Some(scale);
        ctx.physics.set_gravity_scale(self.entity, 0.0);
        ctx.physics.set_velocity(
            self.entity,
            Vec2::new(self.facing.sign() * self.stats.dash_power, 0.0),
        );
        self.machine.enter_dash(self.stats.dash_duration);
    }

    /// Keep vertical velocity, kill the slide, restore gravity, spend the charge
    fn finish_dash(&mut self, ctx: &mut ControllerContext<'_>) {
        let mut velocity = self.velocity(ctx);
        velocity.x = 0.0;
        ctx.physics.set_velocity(self.entity, velocity);
        self.restore_gravity(ctx);
        self.resources.dashes.finish_dash();
    }

    fn restore_gravity(&mut self, ctx: &mut ControllerContext<'_>) {
        if let Some(scale) = self.stored_gravity_scale.take() {
            ctx.physics.set_gravity_scale(self.entity, scale);
        }
    }

    fn attack(&mut self) {
        let state = self.machine.state();
        if !state.can_attack() {
            debug!("Attack ignored in {}", state.name());
            return;
        }
        let swing = Swing::new(self.stats.attack_clip, self.config.attack_recovery);
        self.machine.enter_attack(swing);
    }

    fn use_skill(&mut self, slot: SkillSlot, ctx: &mut ControllerContext<'_>) {
        if !self.machine.state().can_use_skill() {
            return;
        }
        let cooldown = self.resources.skill_mut(slot);
        if !cooldown.is_ready() {
            debug!("Skill {:?} on cooldown ({:.2}s)", slot, cooldown.remaining());
            return;
        }
        cooldown.start();
        ctx.effects.emit(ControllerEffect::SkillUsed(slot));
    }

    fn begin_swap(&mut self) {
        let Some(next) = &self.secondary else {
            debug!("Swap ignored: no secondary skull");
            return;
        };
        if !self.resources.swap.is_ready() {
            debug!("Swap on cooldown ({:.2}s)", self.resources.swap.remaining());
            return;
        }
        let state = self.machine.state();
        if !state.can_swap() {
            debug!("Swap ignored in {}", state.name());
            return;
        }
        info!("Swapping {} -> {}", self.stats.name, next.name);
        self.machine.enter_swap();
    }

    fn interact(&mut self, ctx: &mut ControllerContext<'_>) {
        if !self.machine.state().can_interact() {
            return;
        }
        let origin = self.position(ctx);
        let used = self.combat.interact(
            &*ctx.physics,
            ctx.targets,
            origin,
            self.stats.interact_range,
            Some(self.entity),
        );
        if !used {
            debug!("Nothing to interact with");
        }
    }

    fn react_to_damage(&mut self, amount: i32, ctx: &mut ControllerContext<'_>) {
        if self.health <= 0 {
            self.defeat(ctx);
        } else if self.machine.enter_hurt(self.config.hurt_duration) {
            debug!("Hurt for {} ({} left)", amount, self.health);
        }
    }

    fn defeat(&mut self, ctx: &mut ControllerContext<'_>) {
        self.restore_gravity(ctx);
        self.machine.defeat();

        let mut velocity = self.velocity(ctx);
        velocity.x = 0.0;
        ctx.physics.set_velocity(self.entity, velocity);

        info!("{} (entity {}) defeated", self.stats.name, self.entity);
        ctx.game_state.player_defeated(self.entity);
    }

    fn integrate(&mut self, ctx: &mut ControllerContext<'_>) {
        let state = self.machine.state();
        let hold = (state == ActionState::Attack && self.sensor.is_grounded())
            || matches!(state, ActionState::Swap | ActionState::Hurt);
        let next = self.movement.step(
            self.velocity(ctx),
            self.horizontal_input(),
            self.stats.move_speed,
            hold,
        );
        ctx.physics.set_velocity(self.entity, next);
    }

    fn emit_changes(&mut self, ctx: &mut ControllerContext<'_>) {
        for (from, to) in self.machine.take_changes() {
            ctx.effects.emit(ControllerEffect::Exited(from));
            ctx.effects.emit(ControllerEffect::Entered(to));
        }
    }
}

impl Damageable for PlayerController {
    /// Health drops right away; the report and the reaction happen on the
    /// next fixed update
    fn take_damage(&mut self, amount: i32) {
        if amount <= 0 || self.machine.is_defeated() {
            return;
        }
        self.health = (self.health - amount).max(0);
        self.unreported_hits.push(amount);
        self.machine.push(Trigger::Damage(amount));
    }
}

/// Owns every active controller and routes input, events and ticks to them
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: Vec<PlayerController>,
    config: ControllerConfig,
}

impl ControllerRegistry {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            controllers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Spawn a controller for `stats` at `position`
    pub fn spawn(
        &mut self,
        physics: &mut dyn PhysicsBackend,
        stats: CharacterStats,
        position: Vec2,
    ) -> Result<EntityId, CharacterError> {
        let controller = PlayerController::spawn(physics, stats, position, &self.config)?;
        let entity = controller.entity();
        self.controllers.push(controller);
        Ok(entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&PlayerController> {
        self.controllers.iter().find(|c| c.entity == entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut PlayerController> {
        self.controllers.iter_mut().find(|c| c.entity == entity)
    }

    fn require_mut(&mut self, entity: EntityId) -> Result<&mut PlayerController, CharacterError> {
        self.get_mut(entity).ok_or(CharacterError::NotFound(entity))
    }

    pub fn all(&self) -> &[PlayerController] {
        &self.controllers
    }

    pub fn count(&self) -> usize {
        self.controllers.len()
    }

    /// Controllers that are not defeated
    pub fn active_count(&self) -> usize {
        self.controllers.iter().filter(|c| !c.is_defeated()).count()
    }

    pub fn route_input(&mut self, entity: EntityId, input: InputEvent) -> Result<(), CharacterError> {
        self.require_mut(entity)?.handle_input(input);
        Ok(())
    }

    /// Deliver a bus event addressed to `entity`'s player
    pub fn route_event(&mut self, entity: EntityId, event: &GameEvent) -> Result<(), CharacterError> {
        let controller = self.require_mut(entity)?;
        match event {
            GameEvent::SkullPickedUp(stats) => {
                controller.receive_skull(stats.clone()).map_err(|err| {
                    warn!("Rejected skull pickup for entity {}: {}", entity, err);
                    err
                })
            }
            GameEvent::SkullSwapped => Ok(()),
        }
    }

    pub fn damage(&mut self, entity: EntityId, amount: i32) -> Result<(), CharacterError> {
        self.require_mut(entity)?.take_damage(amount);
        Ok(())
    }

    /// Run one fixed step for every controller, then complete any swaps
    /// they requested. The old controller is only retired once the new one
    /// exists and has been handed control.
    pub fn fixed_update(&mut self, ctx: &mut ControllerContext<'_>, dt: f32) -> Vec<SwapOutcome> {
        let mut requests = Vec::new();
        for controller in &mut self.controllers {
            if let Some(request) = controller.fixed_update(ctx, dt) {
                requests.push(request);
            }
        }

        let mut outcomes = Vec::new();
        for request in requests {
            let Some(index) = self.controllers.iter().position(|c| c.entity == request.entity)
            else {
                continue;
            };
            let old = self.controllers.remove(index);
            match swap::possess(old, &request, ctx) {
                Ok((controller, outcome)) => {
                    self.controllers.insert(index, controller);
                    outcomes.push(outcome);
                }
                Err(old) => self.controllers.insert(index, old),
            }
        }
        outcomes
    }

    /// Remove a controller without despawning its body
    pub fn remove(&mut self, entity: EntityId) -> Option<PlayerController> {
        let index = self.controllers.iter().position(|c| c.entity == entity)?;
        Some(self.controllers.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::{CollisionGroups, ContactPhase};
    use crate::game::characters::combat::Interactable;
    use crate::game::characters::stats::{HEAVY_SKULL, LITTLE_BONE};
    use crate::game::characters::testing::{test_config, Harness, DT};
    use crate::engine::physics::mock::MockPhysics;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct HitLog(Rc<RefCell<Vec<i32>>>);

    impl Damageable for HitLog {
        fn take_damage(&mut self, amount: i32) {
            self.0.borrow_mut().push(amount);
        }
    }

    #[derive(Clone, Default)]
    struct Door(Rc<RefCell<u32>>);

    impl Interactable for Door {
        fn interact(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    fn exclusive(snapshot: &CharacterRuntimeState) -> bool {
        [snapshot.dashing, snapshot.attacking, snapshot.swapping]
            .iter()
            .filter(|flag| **flag)
            .count()
            <= 1
    }

    #[test]
    fn test_spawn_rejects_invalid_stats() {
        let mut physics = MockPhysics::new();
        let stats = CharacterStats {
            max_health: 0,
            ..LITTLE_BONE
        };
        let result = PlayerController::spawn(&mut physics, stats, Vec2::ZERO, &test_config());
        assert!(matches!(
            result,
            Err(CharacterError::InvalidStat {
                field: "max_health",
                ..
            })
        ));
        assert!(physics.bodies.is_empty());
    }

    #[test]
    fn test_move_updates_velocity_and_facing() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);
        assert!(c.is_grounded());
        assert_eq!(c.state(), ActionState::Idle);

        c.handle_input(InputEvent::Move(Vec2::new(-1.0, 0.0)));
        // Facing flips on input, before any tick
        assert_eq!(c.facing(), Facing::Left);

        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Move);
        assert_eq!(h.velocity(c.entity()).x, -6.0);

        c.handle_input(InputEvent::Move(Vec2::ZERO));
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Idle);
        assert_eq!(c.facing(), Facing::Left);
    }

    #[test]
    fn test_move_deadzone() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Move(Vec2::new(-0.05, 0.0)));
        assert_eq!(c.facing(), Facing::Right);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Idle);
        assert_eq!(h.velocity(c.entity()).x, 0.0);
    }

    #[test]
    fn test_jump_charges_and_double_jump_cue() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        h.land(&mut c);

        // Leave the ground and jump in the same tick
        h.physics
            .push_contact(e, ContactEvent::Ground(ContactPhase::Ended));
        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);
        assert_eq!(h.velocity(e).y, 12.0);
        assert_eq!(c.state(), ActionState::Jump);
        assert_eq!(c.frame_update().remaining_jumps, 1);
        assert_eq!(h.effect_count(ControllerEffect::DoubleJump), 0);

        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);
        assert_eq!(c.frame_update().remaining_jumps, 0);
        assert_eq!(h.effect_count(ControllerEffect::DoubleJump), 1);

        // Out of charges and coyote time: nothing happens
        h.set_velocity(e, Vec2::ZERO);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Fall);

        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);
        assert_eq!(h.velocity(e), Vec2::ZERO);
        assert_eq!(c.state(), ActionState::Fall);
        assert_eq!(c.frame_update().remaining_jumps, 0);
    }

    #[test]
    fn test_landing_resets_jumps_and_coyote() {
        let mut h = Harness::new();
        let stats = CharacterStats {
            jump_count: 3,
            coyote_time: 0.2,
            ..LITTLE_BONE
        };
        let mut c = h.spawn(stats);
        let e = c.entity();

        for _ in 0..3 {
            c.handle_input(InputEvent::Jump);
            h.tick(&mut c, DT);
        }
        assert_eq!(c.frame_update().remaining_jumps, 0);

        h.set_velocity(e, Vec2::new(0.0, -3.0));
        h.physics
            .push_contact(e, ContactEvent::Ground(ContactPhase::Began));
        h.tick(&mut c, DT);

        let snapshot = c.frame_update();
        assert!(snapshot.grounded);
        assert_eq!(snapshot.remaining_jumps, 3);
        assert_eq!(snapshot.coyote_remaining, 0.2);
        assert_eq!(c.state(), ActionState::Idle);
    }

    #[test]
    fn test_rising_through_ground_sensor() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();

        h.set_velocity(e, Vec2::new(0.0, 5.0));
        h.physics
            .push_contact(e, ContactEvent::Ground(ContactPhase::Began));
        h.tick(&mut c, DT);
        assert!(!c.is_grounded());
        assert_eq!(c.state(), ActionState::Jump);
    }

    #[test]
    fn test_fall_multiplier_applied_when_descending() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();

        h.set_velocity(e, Vec2::new(0.0, -1.0));
        h.tick(&mut c, DT);
        // -9.81 * 2.5 * 0.25 added to the descent
        approx::assert_relative_eq!(h.velocity(e).y, -1.0 - 9.81 * 2.5 * 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_dash_physics() {
        let mut h = Harness::new();
        let stats = CharacterStats {
            dash_duration: 0.5,
            ..LITTLE_BONE
        };
        let mut c = h.spawn(stats);
        let e = c.entity();
        h.land(&mut c);

        c.handle_input(InputEvent::Move(Vec2::new(-1.0, 0.0)));
        c.handle_input(InputEvent::Move(Vec2::ZERO));
        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);

        assert_eq!(c.state(), ActionState::Dash);
        assert_eq!(h.velocity(e), Vec2::new(-18.0, 0.0));
        assert_eq!(h.physics.gravity_scale(e), Some(0.0));
        assert_eq!(h.effect_count(ControllerEffect::DashSmoke), 1);
        // The charge is spent when the dash ends
        assert_eq!(c.frame_update().remaining_dashes, 2);

        // Jump mid-dash is rejected
        h.set_velocity(e, Vec2::new(-18.0, 3.0));
        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);

        assert_ne!(c.state(), ActionState::Dash);
        assert_eq!(h.velocity(e), Vec2::new(0.0, 3.0));
        assert_eq!(h.physics.gravity_scale(e), Some(1.0));
        let snapshot = c.frame_update();
        assert_eq!(snapshot.remaining_dashes, 1);
        assert_eq!(snapshot.remaining_jumps, 2);
    }

    #[test]
    fn test_dash_cooldown_replenishes_all_at_once() {
        let mut h = Harness::new();
        let stats = CharacterStats {
            dash_count: 2,
            dash_cooldown: 3.0,
            dash_duration: DT,
            ..LITTLE_BONE
        };
        let mut c = h.spawn(stats);

        // t = 0
        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        assert_eq!(c.frame_update().remaining_dashes, 1);

        // t = 1.0: second dash restarts the cooldown
        h.ticks(&mut c, 3);
        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        assert_eq!(c.frame_update().remaining_dashes, 0);

        // t = 3.0 passes without a refill
        h.ticks(&mut c, 7);
        assert_eq!(c.frame_update().remaining_dashes, 0);
        h.ticks(&mut c, 3);
        assert_eq!(c.frame_update().remaining_dashes, 0);

        // t = 4.0: both charges together
        h.tick(&mut c, DT);
        assert_eq!(c.frame_update().remaining_dashes, 2);
    }

    #[test]
    fn test_dash_without_charges_rejected() {
        let mut h = Harness::new();
        let stats = CharacterStats {
            dash_count: 1,
            dash_duration: DT,
            ..LITTLE_BONE
        };
        let mut c = h.spawn(stats);

        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        assert_ne!(c.state(), ActionState::Dash);
        assert_eq!(h.effect_count(ControllerEffect::DashSmoke), 1);
    }

    #[test]
    fn test_actions_mutually_exclusive() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        c.receive_skull(HEAVY_SKULL).expect("valid skull");
        h.land(&mut c);

        let script = [
            InputEvent::Dash,
            InputEvent::Attack,
            InputEvent::Jump,
            InputEvent::Attack,
            InputEvent::Dash,
            InputEvent::Skill(SkillSlot::Primary),
            InputEvent::Swap,
            InputEvent::Attack,
            InputEvent::Dash,
        ];
        for input in script {
            c.handle_input(input);
            h.tick(&mut c, DT);
            assert!(exclusive(&c.frame_update()));
        }
        for _ in 0..20 {
            h.tick(&mut c, DT);
            assert!(exclusive(&c.frame_update()));
        }
    }

    #[test]
    fn test_grounded_attack_holds_position() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Move(Vec2::new(1.0, 0.0)));
        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);
        assert_eq!(h.velocity(c.entity()).x, 0.0);
    }

    #[test]
    fn test_air_attack_keeps_drift() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);

        c.handle_input(InputEvent::Move(Vec2::new(1.0, 0.0)));
        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);
        assert_eq!(h.velocity(c.entity()).x, 6.0);
    }

    #[test]
    fn test_attack_strikes_every_facet_once() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        let log = HitLog::default();
        let target = h
            .physics
            .add_target(Vec2::new(0.5, 0.0), CollisionGroups::Enemy.bits());
        h.targets.add_damageable(target, Box::new(log.clone()));
        h.targets.add_damageable(target, Box::new(log.clone()));

        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        assert_eq!(*log.0.borrow(), vec![10, 10]);

        // Re-triggering mid-swing is ignored
        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);

        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Idle);
        assert_eq!(log.0.borrow().len(), 2);
    }

    #[test]
    fn test_jump_during_attack_keeps_attacking() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        h.land(&mut c);

        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);
        assert_eq!(h.velocity(e).y, 12.0);

        // Swing over while rising
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Jump);
    }

    #[test]
    fn test_swap_without_secondary_is_noop() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Swap);
        assert!(h.tick(&mut c, DT).is_none());
        assert_eq!(c.state(), ActionState::Idle);
        assert!(h.physics.despawned.is_empty());
        assert!(h.events.is_empty());
        assert!(h.game_state.swaps.is_empty());
    }

    #[test]
    fn test_swap_request_suspends_input() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        c.receive_skull(HEAVY_SKULL).expect("valid skull");
        h.land(&mut c);

        c.handle_input(InputEvent::Swap);
        let request = h.tick(&mut c, DT).expect("swap requested");
        assert_eq!(request.entity, e);
        assert_eq!(c.state(), ActionState::Swap);

        c.handle_input(InputEvent::Move(Vec2::new(-1.0, 0.0)));
        c.handle_input(InputEvent::Jump);
        assert_eq!(c.facing(), Facing::Right);
        assert_eq!(c.pending_triggers(), 0);

        assert!(h.tick(&mut c, DT).is_some());
        assert_eq!(h.velocity(e).x, 0.0);
    }

    #[test]
    fn test_damage_enters_hurt() {
        let mut h = Harness::new();
        let config = ControllerConfig {
            hurt_duration: 0.5,
            ..test_config()
        };
        let mut c = PlayerController::spawn(&mut h.physics, LITTLE_BONE, Vec2::ZERO, &config)
            .expect("valid stats");
        let e = c.entity();
        h.land(&mut c);

        c.handle_input(InputEvent::Move(Vec2::new(1.0, 0.0)));
        c.take_damage(10);
        assert_eq!(c.health(), 90);

        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Hurt);
        assert_eq!(h.velocity(e).x, 0.0);
        assert_eq!(h.game_state.damage, vec![10]);
        assert_eq!(h.effect_count(ControllerEffect::PlayerHit), 1);

        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Move);
        assert_eq!(h.velocity(e).x, 6.0);
    }

    #[test]
    fn test_damage_does_not_interrupt_dash() {
        let mut h = Harness::new();
        let stats = CharacterStats {
            dash_duration: 0.5,
            ..LITTLE_BONE
        };
        let mut c = h.spawn(stats);

        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        c.take_damage(10);
        h.tick(&mut c, DT);

        assert_ne!(c.state(), ActionState::Hurt);
        assert_eq!(c.health(), 90);
        assert_eq!(h.game_state.damage, vec![10]);
        assert_eq!(c.frame_update().remaining_dashes, 1);
    }

    #[test]
    fn test_defeat_is_terminal() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        h.land(&mut c);

        c.take_damage(150);
        assert_eq!(c.health(), 0);
        h.tick(&mut c, DT);

        assert!(c.is_defeated());
        assert_eq!(h.game_state.defeated, vec![e]);
        assert_eq!(h.game_state.damage, vec![150]);

        c.handle_input(InputEvent::Jump);
        c.take_damage(5);
        assert_eq!(c.pending_triggers(), 0);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Defeated);
        assert_eq!(h.game_state.damage, vec![150]);
        assert_eq!(h.velocity(e), Vec2::ZERO);
    }

    #[test]
    fn test_lethal_hit_behind_queued_trigger_is_reported() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        h.land(&mut c);

        // Jump is consumed this tick; defeat then clears the queued Damage
        c.handle_input(InputEvent::Jump);
        c.take_damage(150);
        h.tick(&mut c, DT);

        assert!(c.is_defeated());
        assert_eq!(h.game_state.defeated, vec![e]);
        assert_eq!(h.game_state.damage, vec![150]);
        assert_eq!(h.effect_count(ControllerEffect::PlayerHit), 1);
    }

    #[test]
    fn test_hit_evicted_from_full_queue_is_reported() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.take_damage(10);
        for _ in 0..test_config().max_pending_triggers {
            c.handle_input(InputEvent::Attack);
        }
        assert_eq!(c.pending_triggers(), test_config().max_pending_triggers);

        h.ticks(&mut c, 40);
        assert_eq!(c.health(), 90);
        assert_eq!(h.game_state.damage, vec![10]);
        assert_eq!(c.pending_triggers(), 0);
    }

    #[test]
    fn test_one_trigger_consumed_per_update() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Attack);
        c.handle_input(InputEvent::Dash);
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);
        assert_eq!(c.pending_triggers(), 1);
        assert_eq!(h.effect_count(ControllerEffect::DashSmoke), 0);

        // Dash comes up next and is turned away mid-swing
        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Attack);
        assert_eq!(c.pending_triggers(), 0);
        assert_eq!(h.effect_count(ControllerEffect::DashSmoke), 0);
        assert_eq!(c.frame_update().remaining_dashes, LITTLE_BONE.dash_count);

        h.tick(&mut c, DT);
        assert_eq!(c.state(), ActionState::Idle);
        assert_eq!(h.effect_count(ControllerEffect::DashSmoke), 0);
    }

    #[test]
    fn test_drop_through_platform_window() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let e = c.entity();
        let platform = ColliderHandle::from_raw_parts(7, 0);

        h.physics.push_contact(
            e,
            ContactEvent::Platform {
                phase: ContactPhase::Began,
                collider: platform,
            },
        );
        h.land(&mut c);
        assert_eq!(c.frame_update().platform, Some(platform));

        c.handle_input(InputEvent::Move(Vec2::new(0.0, -1.0)));
        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);

        assert!(h.physics.ignored.contains(&(e, platform)));
        assert_eq!(h.velocity(e).y, 0.0);
        assert_eq!(c.frame_update().remaining_jumps, 2);
        assert_eq!(h.effect_count(ControllerEffect::DroppedThrough), 1);

        // 0.5s later collision is back, still overlapping
        h.tick(&mut c, DT);
        assert!(!h.physics.ignored.contains(&(e, platform)));
        assert_eq!(c.frame_update().platform, Some(platform));
    }

    #[test]
    fn test_down_jump_without_platform_jumps() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Move(Vec2::new(0.0, -1.0)));
        c.handle_input(InputEvent::Jump);
        h.tick(&mut c, DT);
        assert_eq!(h.velocity(c.entity()).y, 12.0);
        assert!(h.physics.ignored.is_empty());
    }

    #[test]
    fn test_interact() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        let door = Door::default();
        let entity = h
            .physics
            .add_target(Vec2::new(0.5, 0.0), CollisionGroups::Interactable.bits());
        h.targets.add_interactable(entity, Box::new(door.clone()));

        c.handle_input(InputEvent::Interact);
        h.tick(&mut c, DT);
        assert_eq!(*door.0.borrow(), 1);
    }

    #[test]
    fn test_skill_cooldowns() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);

        c.handle_input(InputEvent::Skill(SkillSlot::Primary));
        h.tick(&mut c, DT);
        c.handle_input(InputEvent::Skill(SkillSlot::Primary));
        h.tick(&mut c, DT);
        c.handle_input(InputEvent::Skill(SkillSlot::Secondary));
        h.tick(&mut c, DT);

        assert_eq!(
            h.effect_count(ControllerEffect::SkillUsed(SkillSlot::Primary)),
            1
        );
        assert_eq!(
            h.effect_count(ControllerEffect::SkillUsed(SkillSlot::Secondary)),
            1
        );
        let snapshot = c.frame_update();
        // 4.0s cooldown, three ticks in
        approx::assert_relative_eq!(snapshot.skill_ratios[0], 3.25 / 4.0);
        approx::assert_relative_eq!(snapshot.skill_cooldowns[1], 7.75);
    }

    #[test]
    fn test_state_change_cues() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);
        h.land(&mut c);

        c.handle_input(InputEvent::Attack);
        h.tick(&mut c, DT);
        assert_eq!(h.effect_count(ControllerEffect::Exited(ActionState::Idle)), 1);
        assert_eq!(
            h.effect_count(ControllerEffect::Entered(ActionState::Attack)),
            1
        );
    }

    #[test]
    fn test_receive_skull() {
        let mut h = Harness::new();
        let mut c = h.spawn(LITTLE_BONE);

        let invalid = CharacterStats {
            dash_duration: -1.0,
            ..HEAVY_SKULL
        };
        assert!(c.receive_skull(invalid).is_err());
        assert!(c.secondary().is_none());

        c.receive_skull(HEAVY_SKULL).expect("valid skull");
        let snapshot = c.frame_update();
        assert_eq!(snapshot.secondary, Some("Ogre"));
        assert_eq!(snapshot.health, 100);
        assert_eq!(snapshot.max_health, 100);
    }

    #[test]
    fn test_registry_routing() {
        let mut h = Harness::new();
        let mut registry = ControllerRegistry::new(test_config());
        let entity = registry
            .spawn(&mut h.physics, LITTLE_BONE, Vec2::ZERO)
            .expect("valid stats");
        assert_eq!(registry.count(), 1);
        assert!(registry.get(entity).is_some());

        assert!(matches!(
            registry.route_input(999, InputEvent::Jump),
            Err(CharacterError::NotFound(999))
        ));
        assert!(registry.route_input(entity, InputEvent::Jump).is_ok());
        assert!(registry
            .route_event(entity, &GameEvent::SkullSwapped)
            .is_ok());

        let invalid = CharacterStats {
            max_health: -5,
            ..HEAVY_SKULL
        };
        assert!(registry
            .route_event(entity, &GameEvent::SkullPickedUp(invalid))
            .is_err());
        assert!(registry
            .get(entity)
            .and_then(|c| c.secondary())
            .is_none());
    }

    #[test]
    fn test_registry_swap_round_trip() {
        let mut h = Harness::new();
        let mut registry = ControllerRegistry::new(test_config());
        let first = registry
            .spawn(&mut h.physics, LITTLE_BONE, Vec2::new(2.0, 1.0))
            .expect("valid stats");

        registry
            .route_event(first, &GameEvent::SkullPickedUp(HEAVY_SKULL))
            .expect("valid skull");
        registry
            .route_input(first, InputEvent::Swap)
            .expect("known entity");

        let outcomes = {
            let mut ctx = h.context();
            registry.fixed_update(&mut ctx, DT)
        };
        assert_eq!(outcomes.len(), 1);
        let outcome = outcomes[0];
        assert_eq!(outcome.retired, first);
        assert_eq!(outcome.skull, "Ogre");
        let second = outcome.activated;
        assert_ne!(second, first);

        // Old controller and body are gone, the new one holds the old skull
        assert!(registry.get(first).is_none());
        assert_eq!(registry.count(), 1);
        let controller = registry.get(second).expect("new controller");
        assert_eq!(controller.stats(), &HEAVY_SKULL);
        assert_eq!(controller.secondary(), Some(&LITTLE_BONE));
        assert_eq!(h.physics.despawned, vec![first]);
        assert_eq!(h.physics.bodies[&second].size, Vec2::new(1.2, 2.0));
        assert_eq!(h.physics.bodies[&second].position, Vec2::new(2.0, 1.0));
        assert_eq!(h.game_state.swaps, vec![second]);
        assert_eq!(h.events.events(), &[GameEvent::SkullSwapped]);

        // Swapping straight back is blocked by the swap cooldown
        registry
            .route_input(second, InputEvent::Swap)
            .expect("known entity");
        let outcomes = {
            let mut ctx = h.context();
            registry.fixed_update(&mut ctx, DT)
        };
        assert!(outcomes.is_empty());

        for _ in 0..7 {
            let mut ctx = h.context();
            registry.fixed_update(&mut ctx, DT);
        }
        registry
            .route_input(second, InputEvent::Swap)
            .expect("known entity");
        let outcomes = {
            let mut ctx = h.context();
            registry.fixed_update(&mut ctx, DT)
        };
        assert_eq!(outcomes.len(), 1);
        let controller = registry
            .get(outcomes[0].activated)
            .expect("swapped back");
        assert_eq!(controller.stats(), &LITTLE_BONE);
        assert_eq!(controller.secondary(), Some(&HEAVY_SKULL));
    }

    #[test]
    fn test_registry_damage_and_defeat() {
        let mut h = Harness::new();
        let mut registry = ControllerRegistry::new(test_config());
        let entity = registry
            .spawn(&mut h.physics, LITTLE_BONE, Vec2::ZERO)
            .expect("valid stats");
        assert_eq!(registry.active_count(), 1);

        registry.damage(entity, 200).expect("known entity");
        {
            let mut ctx = h.context();
            registry.fixed_update(&mut ctx, DT);
        }
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.count(), 1);
        assert!(registry.remove(entity).is_some());
        assert_eq!(registry.count(), 0);
    }
}

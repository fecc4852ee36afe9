use anyhow::{Context, Result};
use glam::Vec2;
use log::{debug, info};
use std::time::Duration;

use skull_swap::engine::game_loop::GameLoop;
use skull_swap::engine::input::{InputEvent, SkillSlot};
use skull_swap::engine::physics::{body::presets, EntityId, PhysicsBackend, PhysicsWorld};
use skull_swap::game::characters::{
    CharacterStats, ControllerContext, ControllerEffect, ControllerRegistry, Damageable,
    EventBus, EventQueue, GameEvent, GameState, PlayerController, TargetRegistry, HEAVY_SKULL,
    LITTLE_BONE,
};
use skull_swap::game::config::DEFAULT_CONFIG;

/// Frames the scripted run lasts
const DEMO_FRAMES: u64 = 300;

/// Uneven frame times, cycled, so the fixed-step accumulator has work to do
const FRAME_TIMES_MS: [u64; 4] = [12, 20, 16, 22];

/// Player-wide bookkeeping that outlives any one skull
#[derive(Debug, Default)]
struct Session {
    active: Option<EntityId>,
    damage_taken: i32,
    swaps: u32,
    defeated: bool,
}

impl GameState for Session {
    fn player_took_damage(&mut self, amount: i32) {
        self.damage_taken += amount;
        info!("Player took {} damage ({} total)", amount, self.damage_taken);
    }

    fn handle_skull_swap(&mut self, controller: &PlayerController) {
        self.active = Some(controller.entity());
        self.swaps += 1;
        info!(
            "{} now in control with {}/{} health",
            controller.stats().name,
            controller.health(),
            controller.stats().max_health
        );
    }

    fn player_defeated(&mut self, entity: EntityId) {
        self.defeated = true;
        info!("Entity {} was defeated", entity);
    }
}

/// Training dummy standing next to the spawn point
struct Dummy {
    health: i32,
}

impl Damageable for Dummy {
    fn take_damage(&mut self, amount: i32) {
        self.health -= amount;
        info!("Dummy hit for {}, {} health left", amount, self.health);
    }
}

/// One scripted action
enum Step {
    Input(InputEvent),
    Pickup(CharacterStats),
    Hit(i32),
    TogglePause,
}

fn script() -> Vec<(u64, Step)> {
    vec![
        (10, Step::Input(InputEvent::Move(Vec2::new(1.0, 0.0)))),
        (40, Step::Input(InputEvent::Jump)),
        (55, Step::Input(InputEvent::Jump)),
        (90, Step::Input(InputEvent::Move(Vec2::ZERO))),
        (95, Step::Input(InputEvent::Attack)),
        (120, Step::Input(InputEvent::Dash)),
        (150, Step::Pickup(HEAVY_SKULL)),
        (160, Step::Hit(15)),
        (180, Step::Input(InputEvent::Swap)),
        (190, Step::TogglePause),
        (196, Step::TogglePause),
        (200, Step::Input(InputEvent::Skill(SkillSlot::Primary))),
        (220, Step::Input(InputEvent::Attack)),
        (260, Step::Input(InputEvent::Swap)),
    ]
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting skull-swap demo...");

    let mut physics = PhysicsWorld::new();
    physics.add_ground(0.0, -0.5, 40.0, 1.0);
    physics.add_one_way_platform(6.0, 2.5, 4.0, 0.2);
    let dummy = physics.add_static_entity(3.0, 0.6, presets::enemy_hurtbox(0.5));

    let mut targets = TargetRegistry::new();
    targets.add_damageable(dummy, Box::new(Dummy { health: 60 }));

    let mut registry = ControllerRegistry::new(DEFAULT_CONFIG);
    let mut player = registry
        .spawn(&mut physics, LITTLE_BONE, Vec2::new(0.0, 1.0))
        .context("Failed to spawn the starting skull")?;

    let mut session = Session {
        active: Some(player),
        ..Session::default()
    };
    let mut events = EventQueue::new();
    let mut effects: Vec<ControllerEffect> = Vec::new();
    let mut game_loop = GameLoop::new();
    let script = script();

    for frame in 0..DEMO_FRAMES {
        for (_, step) in script.iter().filter(|(at, _)| *at == frame) {
            match step {
                Step::Input(input) => registry.route_input(player, *input)?,
                Step::Pickup(stats) => events.publish(GameEvent::SkullPickedUp(stats.clone())),
                Step::Hit(amount) => registry.damage(player, *amount)?,
                Step::TogglePause => game_loop.toggle_pause(),
            }
        }

        let frame_ms = FRAME_TIMES_MS[frame as usize % FRAME_TIMES_MS.len()];
        let frame_time = Duration::from_millis(frame_ms);
        let updates = game_loop.begin_frame(frame_time);
        if game_loop.is_paused() {
            debug!("frame {}: paused", frame);
            continue;
        }
        for _ in 0..updates {
            physics.step();
            let outcomes = {
                let mut ctx = ControllerContext {
                    physics: &mut physics,
                    targets: &mut targets,
                    game_state: &mut session,
                    events: &mut events,
                    effects: &mut effects,
                };
                registry.fixed_update(&mut ctx, game_loop.fixed_timestep())
            };
            for outcome in outcomes {
                info!(
                    "{} took over from entity {} (body from {})",
                    outcome.skull,
                    outcome.retired,
                    physics.template(outcome.activated).unwrap_or("?")
                );
                if outcome.retired == player {
                    player = outcome.activated;
                }
            }
        }

        for event in events.drain() {
            info!("Event: {}", event.name());
            registry.route_event(player, &event)?;
        }
        for effect in effects.drain(..) {
            debug!("Effect: {:?}", effect);
        }

        if frame % 30 == 0 {
            if let Some(controller) = registry.get(player) {
                let snapshot = controller.frame_update();
                info!(
                    "frame {:>3} ({:.1} ms, alpha {:.2}): {} {:?} facing {:?} grounded={} jumps={} dashes={} hp={}",
                    frame,
                    game_loop.frame_delta_time() * 1000.0,
                    game_loop.alpha(),
                    controller.stats().name,
                    snapshot.state,
                    snapshot.facing,
                    snapshot.grounded,
                    snapshot.remaining_jumps,
                    snapshot.remaining_dashes,
                    snapshot.health
                );
            }
        }
    }

    info!(
        "Demo finished after {} frames and {} updates: {} swaps, {} damage taken, defeated={}, active={:?}",
        game_loop.frame_count(),
        game_loop.update_count(),
        session.swaps,
        session.damage_taken,
        session.defeated,
        session.active
    );
    Ok(())
}

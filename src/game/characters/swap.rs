// Skull swap / possession
//
// A swap builds the new controller first, hands it control, and only then
// retires the old body. The old controller never runs again after it has
// been taken apart.

use glam::Vec2;
use log::{debug, info};

use crate::engine::physics::{ColliderHandle, EntityId};
use crate::game::config::ControllerConfig;

use super::character::{ControllerContext, PlayerController};
use super::events::GameEvent;
use super::movement::Facing;
use super::stats::CharacterStats;

/// Emitted by a controller that entered `Swap`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapRequest {
    pub entity: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Facing,
}

/// Result of a completed swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub retired: EntityId,
    pub activated: EntityId,
    /// Name of the skull now in control
    pub skull: &'static str,
}

/// What is left of a controller being swapped out
#[derive(Debug)]
pub(super) struct SwapParts {
    pub entity: EntityId,
    /// The skull that was in control; becomes the new secondary
    pub previous: CharacterStats,
    /// The held secondary; takes control
    pub next: CharacterStats,
    pub health: i32,
    /// Hits the old controller took but never reported
    pub unreported_hits: Vec<i32>,
    pub config: ControllerConfig,
    /// Platforms the old body was still dropping through
    pub excluded: Vec<ColliderHandle>,
}

/// Replace `old` with a controller for its secondary skull.
/// Returns `old` untouched when it holds no secondary.
pub fn possess(
    old: PlayerController,
    request: &SwapRequest,
    ctx: &mut ControllerContext<'_>,
) -> Result<(PlayerController, SwapOutcome), PlayerController> {
    let parts = match old.into_swap_parts() {
        Ok(parts) => parts,
        Err(old) => {
            debug!("Entity {} has no secondary skull to swap to", old.entity());
            return Err(old);
        }
    };

    let entity = ctx.physics.spawn_character(parts.next.body(), request.position);
    ctx.physics.set_velocity(entity, request.velocity);

    let config = ControllerConfig {
        gravity: ctx.physics.gravity(),
        ..parts.config
    };
    let skull = parts.next.name;
    let controller = PlayerController::swapped_in(
        entity,
        parts.next,
        parts.previous,
        parts.health,
        parts.unreported_hits,
        request.facing,
        &config,
    );

    // Hand off control before the old body goes away
    ctx.game_state.handle_skull_swap(&controller);

    for collider in parts.excluded {
        ctx.physics.set_collision_ignored(parts.entity, collider, false);
    }
    ctx.targets.remove(parts.entity);
    ctx.physics.despawn(parts.entity);

    ctx.events.publish(GameEvent::SkullSwapped);
    info!(
        "Swap complete: entity {} retired, {} active as entity {}",
        parts.entity, skull, entity
    );

    Ok((
        controller,
        SwapOutcome {
            retired: parts.entity,
            activated: entity,
            skull,
        },
    ))
}

use std::f32::consts::TAU;

use rayon::prelude::*;

use crate::config::GameConfig;
use crate::game::state::{Arena, GameState, Player};
use crate::util::vec2::Vec2;

/// Keep a circle inside `[0, extent]` on one axis.
///
/// Crossing an edge clamps the position back inside and reflects the velocity
/// inward, scaled by `bounce`.
#[inline]
fn bounce_axis(position: &mut f32, velocity: &mut f32, radius: f32, extent: f32, bounce: f32) {
    let lo = radius.min(extent / 2.0);
    let hi = (extent - radius).max(extent / 2.0);

    if *position < lo {
        *position = lo;
        *velocity = velocity.abs() * bounce;
    } else if *position > hi {
        *position = hi;
        *velocity = -velocity.abs() * bounce;
    }
}

#[inline]
fn bounce_off_walls(position: &mut Vec2, velocity: &mut Vec2, radius: f32, arena: Arena, bounce: f32) {
    bounce_axis(&mut position.x, &mut velocity.x, radius, arena.width, bounce);
    bounce_axis(&mut position.y, &mut velocity.y, radius, arena.height, bounce);
}

/// Steer, thrust and move a single player by one tick
fn integrate_player(player: &mut Player, config: &GameConfig, arena: Arena) {
    let controls = player.controls;

    if controls.left {
        player.heading += config.turn_step;
    }
    if controls.right {
        player.heading -= config.turn_step;
    }
    player.heading = player.heading.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if player.heading >= TAU {
        player.heading = 0.0;
    }

    player.velocity *= config.player_friction;

    if controls.up {
        player.velocity += Vec2::from_heading(player.heading) * config.acceleration;
    }

    player.velocity = player.velocity.clamp_length(config.max_velocity);
    player.position += player.velocity;

    bounce_off_walls(
        &mut player.position,
        &mut player.velocity,
        config.player_radius,
        arena,
        config.wall_bounce_factor,
    );
}

/// Advance players and junk by one tick.
///
/// Only alive players move, and their bump timers count down. Junk follows
/// the same friction, clamp, move and bounce pipeline without thrust, and its
/// debounces count down.
pub fn update(state: &mut GameState, config: &GameConfig) {
    let arena = state.arena;

    state.players.par_iter_mut().for_each(|player| {
        if player.alive {
            integrate_player(player, config, arena);
            player.tick_bump_timers();
        }
    });

    state.junk.par_iter_mut().for_each(|junk| {
        junk.velocity *= config.junk_friction;
        junk.velocity = junk.velocity.clamp_length(config.junk_max_velocity);
        junk.position += junk.velocity;

        bounce_off_walls(
            &mut junk.position,
            &mut junk.velocity,
            config.junk_radius,
            arena,
            config.junk_bounce_factor,
        );

        junk.debounce = junk.debounce.saturating_sub(1);
        junk.junk_debounce = junk.junk_debounce.saturating_sub(1);
    });
}

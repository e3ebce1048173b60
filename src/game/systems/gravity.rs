//! Hole gravity
//!
//! Every alive hole pulls players and junk that sit inside its gravity radius
//! but outside the hole itself. The pull points at the hole centre and falls
//! off as `1/r`, scaled by the hole radius and a per-entity damping factor.

use rayon::prelude::*;

use crate::config::GameConfig;
use crate::game::state::{GameState, Hole};
use crate::util::geometry::circles_overlap;
use crate::util::vec2::Vec2;

/// A hole's pull as seen by everything it can reach this tick
#[derive(Debug, Clone, Copy)]
struct Well {
    position: Vec2,
    radius: f32,
    gravity_radius: f32,
}

impl Well {
    fn from_hole(hole: &Hole, factor: f32) -> Self {
        Self {
            position: hole.position,
            radius: hole.radius,
            gravity_radius: hole.gravity_radius(factor),
        }
    }
}

/// Velocity change toward a single well for a body of `body_radius` at `position`
fn pull(position: Vec2, body_radius: f32, well: &Well, damping: f32) -> Vec2 {
    if circles_overlap(position, body_radius, well.position, well.radius)
        || !circles_overlap(position, body_radius, well.position, well.gravity_radius)
    {
        return Vec2::ZERO;
    }

    let delta = well.position - position;
    let distance = delta.length();
    if distance <= 0.0 {
        return Vec2::ZERO;
    }

    delta.normalize() * (well.radius * damping / distance)
}

fn total_pull(position: Vec2, body_radius: f32, wells: &[Well], damping: f32) -> Vec2 {
    wells
        .iter()
        .fold(Vec2::ZERO, |acc, well| acc + pull(position, body_radius, well, damping))
}

/// Apply every alive hole's pull to alive players and all junk
pub fn update(state: &mut GameState, config: &GameConfig) {
    let wells: Vec<Well> = state
        .holes
        .iter()
        .filter(|h| h.is_alive())
        .map(|h| Well::from_hole(h, config.gravity_radius_factor))
        .collect();
    if wells.is_empty() {
        return;
    }

    state.players.par_iter_mut().for_each(|player| {
        if player.alive {
            player.velocity += total_pull(
                player.position,
                config.player_radius,
                &wells,
                config.player_gravity_damping,
            );
        }
    });

    state.junk.par_iter_mut().for_each(|junk| {
        junk.velocity += total_pull(junk.position, config.junk_radius, &wells, config.junk_gravity_damping);
    });
}

use smallvec::SmallVec;
use tracing::debug;

use crate::config::GameConfig;
use crate::game::state::{GameState, HoleId, PlayerId};
use crate::util::geometry::circles_overlap;
use crate::util::vec2::Vec2;

/// Outcome of a single contact
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    /// A player drove into a hole and is out
    PlayerFell { player_id: PlayerId, hole_id: HoleId },
    /// A junk dropped into a hole; `scorer` is whoever hit it last, if still present
    JunkSunk { hole_id: HoleId, scorer: Option<PlayerId>, points: u32 },
    /// A player bumped a junk
    JunkHit { player_id: PlayerId },
    /// Two players bumped into each other
    PlayersBumped { first: PlayerId, second: PlayerId },
    /// A player fell shortly after being bumped; `scorer` did the bumping
    KnockOut { scorer: PlayerId, victim: PlayerId, points: u32 },
}

pub type CollisionEvents = SmallVec<[CollisionEvent; 8]>;

/// Resolve all contacts for this tick.
///
/// Order is fixed: players against holes, then junk against holes, then
/// players against junk, then players against players, then junk against
/// junk. Sinking junk first means nothing that fell this tick can be hit
/// afterwards.
pub fn update(state: &mut GameState, config: &GameConfig) -> CollisionEvents {
    let mut events = CollisionEvents::new();
    player_hole_collisions(state, config, &mut events);
    junk_hole_collisions(state, config, &mut events);
    player_junk_collisions(state, config, &mut events);
    player_player_collisions(state, config, &mut events);
    junk_junk_collisions(state, config);
    events
}

/// Exchange momentum between two equal-mass circles along their contact normal.
///
/// Returns the new velocities, or `None` when the pair is already separating.
fn bounce_apart(pa: Vec2, va: Vec2, pb: Vec2, vb: Vec2, restitution: f32) -> Option<(Vec2, Vec2)> {
    let normal = (pb - pa).normalize();
    let approach = (va - vb).dot(normal);
    if approach <= 0.0 {
        return None;
    }
    let impulse = normal * ((1.0 + restitution) * approach / 2.0);
    Some((va - impulse, vb + impulse))
}

fn player_hole_collisions(state: &mut GameState, config: &GameConfig, events: &mut CollisionEvents) {
    let holes = &state.holes;
    let mut credited = Vec::new();

    for player in state.players.iter_mut().filter(|p| p.alive) {
        let fell_into = holes
            .iter()
            .filter(|h| h.is_alive())
            .find(|h| circles_overlap(player.position, config.player_radius, h.position, h.radius));

        if let Some(hole) = fell_into {
            player.alive = false;
            player.velocity = Vec2::ZERO;
            debug!("Player {} fell into hole {}", player.id, hole.id);
            events.push(CollisionEvent::PlayerFell {
                player_id: player.id,
                hole_id: hole.id,
            });
            if let Some(bumper) = player.last_bumped_by.take() {
                credited.push((bumper, player.id));
            }
            player.bump_credit = 0;
        }
    }

    for (bumper, victim) in credited {
        if let Some(scorer) = state.get_player_mut(bumper) {
            scorer.points += config.points_per_player;
            debug!("Player {} knocked out {}", bumper, victim);
            events.push(CollisionEvent::KnockOut {
                scorer: bumper,
                victim,
                points: config.points_per_player,
            });
        }
    }
}

fn junk_hole_collisions(state: &mut GameState, config: &GameConfig, events: &mut CollisionEvents) {
    let sunk: Vec<Option<HoleId>> = state
        .junk
        .iter()
        .map(|junk| {
            state
                .holes
                .iter()
                .filter(|h| h.is_alive())
                .find(|h| circles_overlap(junk.position, config.junk_radius, h.position, h.radius))
                .map(|h| h.id)
        })
        .collect();

    if sunk.iter().all(Option::is_none) {
        return;
    }

    let mut scorers = Vec::new();
    for (junk, hole_id) in state.junk.iter().zip(&sunk) {
        if let Some(hole_id) = *hole_id {
            scorers.push((hole_id, junk.last_hit_by));
        }
    }

    let mut flags = sunk.iter();
    state.junk.retain(|_| matches!(flags.next(), Some(None)));

    for (hole_id, last_hit_by) in scorers {
        let scorer = last_hit_by.and_then(|id| state.get_player_mut(id));
        let (scorer, points) = match scorer {
            Some(player) => {
                player.points += config.points_per_junk;
                (Some(player.id), config.points_per_junk)
            }
            None => (None, 0),
        };
        events.push(CollisionEvent::JunkSunk { hole_id, scorer, points });
    }
}

fn player_junk_collisions(state: &mut GameState, config: &GameConfig, events: &mut CollisionEvents) {
    for player in state.players.iter().filter(|p| p.alive) {
        for junk in state.junk.iter_mut().filter(|j| j.can_be_hit()) {
            if circles_overlap(player.position, config.player_radius, junk.position, config.junk_radius) {
                junk.hit_by(
                    player,
                    config.bump_factor,
                    config.minimum_bump,
                    config.junk_max_velocity,
                    config.junk_debounce_ticks,
                );
                events.push(CollisionEvent::JunkHit { player_id: player.id });
            }
        }
    }
}

fn player_player_collisions(state: &mut GameState, config: &GameConfig, events: &mut CollisionEvents) {
    let radius = config.player_radius;
    let players = &mut state.players;

    for i in 0..players.len() {
        let (head, tail) = players.split_at_mut(i + 1);
        let a = &mut head[i];
        if !a.alive {
            continue;
        }

        for b in tail.iter_mut().filter(|p| p.alive) {
            if !a.can_bump() || !b.can_bump() {
                continue;
            }
            if !circles_overlap(a.position, radius, b.position, radius) {
                continue;
            }
            let Some((va, vb)) = bounce_apart(a.position, a.velocity, b.position, b.velocity, config.player_restitution)
            else {
                continue;
            };

            a.velocity = va.clamp_length(config.max_velocity);
            b.velocity = vb.clamp_length(config.max_velocity);
            a.bumped_by(b.id, config.player_debounce_ticks, config.bump_credit_ticks);
            b.bumped_by(a.id, config.player_debounce_ticks, config.bump_credit_ticks);
            events.push(CollisionEvent::PlayersBumped { first: a.id, second: b.id });
        }
    }
}

fn junk_junk_collisions(state: &mut GameState, config: &GameConfig) {
    let radius = config.junk_radius;
    let junk = &mut state.junk;

    for i in 0..junk.len() {
        let (head, tail) = junk.split_at_mut(i + 1);
        let a = &mut head[i];

        for b in tail.iter_mut() {
            if a.junk_debounce != 0 || b.junk_debounce != 0 {
                continue;
            }
            if !circles_overlap(a.position, radius, b.position, radius) {
                continue;
            }
            let Some((va, vb)) = bounce_apart(a.position, a.velocity, b.position, b.velocity, config.junk_restitution)
            else {
                continue;
            };

            a.velocity = va.clamp_length(config.junk_max_velocity);
            b.velocity = vb.clamp_length(config.junk_max_velocity);
            a.junk_debounce = config.junk_debounce_ticks;
            b.junk_debounce = config.junk_debounce_ticks;
        }
    }
}

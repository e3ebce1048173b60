use rand::Rng;
use smallvec::SmallVec;
use tracing::debug;

use crate::config::GameConfig;
use crate::game::placement::generate_coordinates;
use crate::game::state::{GameState, Hole, HoleId, HolePhase};
use crate::util::vec2::Vec2;

/// Hole lifecycle transition
#[derive(Debug, Clone, PartialEq)]
pub enum HoleEvent {
    Expired { hole_id: HoleId },
    Respawned { hole_id: HoleId, position: Vec2, radius: f32 },
}

pub type HoleEvents = SmallVec<[HoleEvent; 4]>;

/// Draw a fresh radius and lifespan for a hole
pub fn random_hole(id: HoleId, position: Vec2, config: &GameConfig, rng: &mut impl Rng) -> Hole {
    let radius = rng.gen_range(config.hole_min_radius..=config.hole_max_radius);
    let lifespan = rng.gen_range(config.hole_min_life..=config.hole_max_life);
    Hole::new(id, position, radius, lifespan)
}

/// Advance every hole slot by one tick.
///
/// Alive holes count down and grow toward the maximum radius; one that reaches
/// zero becomes `Expired`. A hole already `Expired` at the start of this tick
/// respawns in place with a new position, radius and lifespan.
pub fn update(state: &mut GameState, config: &GameConfig, rng: &mut impl Rng) -> HoleEvents {
    let mut events = HoleEvents::new();

    for index in 0..state.holes.len() {
        let phase = state.holes[index].phase;
        match phase {
            HolePhase::Alive => {
                let hole = &mut state.holes[index];
                hole.lifespan = hole.lifespan.saturating_sub(1);
                hole.radius = (hole.radius + config.hole_growth).min(config.hole_max_radius);
                if hole.lifespan == 0 {
                    hole.phase = HolePhase::Expired;
                    debug!("Hole {} expired", hole.id);
                    events.push(HoleEvent::Expired { hole_id: hole.id });
                }
            }
            HolePhase::Expired => {
                let occupied = respawn_obstacles(state, index);
                let position = generate_coordinates(
                    1,
                    config.hole_spawn_separation,
                    state.arena.bounds(),
                    &occupied,
                    config.max_placement_attempts,
                    rng,
                )
                .pop()
                .unwrap_or_else(|| state.arena.bounds().center());

                let id = state.holes[index].id;
                let fresh = random_hole(id, position, config, rng);
                events.push(HoleEvent::Respawned {
                    hole_id: id,
                    position,
                    radius: fresh.radius,
                });
                state.holes[index] = fresh;
            }
        }
    }

    events
}

/// Everything a respawning hole must keep clear of
fn respawn_obstacles(state: &GameState, skip: usize) -> Vec<Vec2> {
    state
        .holes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, h)| h.position)
        .chain(state.junk.iter().map(|j| j.position))
        .chain(state.alive_players().map(|p| p.position))
        .collect()
}

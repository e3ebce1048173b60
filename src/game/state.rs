//! Game state definitions and structures
//!
//! Contains all entities (players, junk, holes) and the arena bounds. The
//! `GameState` value is the single mutable ground truth; systems receive it
//! by `&mut` and nothing else holds entity data between ticks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{arena, junk};
use crate::util::geometry::Bounds;
use crate::util::vec2::Vec2;

/// Unique player identifier
pub type PlayerId = Uuid;

/// Stable hole slot identifier
pub type HoleId = usize;

/// Rectangular world bounds, fixed for the lifetime of a game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.bounds().contains(point)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(arena::WIDTH, arena::HEIGHT)
    }
}

/// Currently held control keys
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub up: bool,
}

/// Player state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    // Hot: touched by the integrator every tick
    pub position: Vec2,
    pub velocity: Vec2,
    /// Heading in radians, kept in `[0, 2π)`
    pub heading: f32,
    pub controls: Controls,
    pub alive: bool,
    /// Ticks before this player can bump another player again
    pub bump_debounce: u32,
    /// Player who last bumped this one, credited if this player falls
    pub last_bumped_by: Option<PlayerId>,
    /// Ticks left on `last_bumped_by`
    pub bump_credit: u32,

    pub points: u32,
    /// CSS hex colour, shared with junk the player last hit
    pub color: String,

    pub id: PlayerId,
    pub name: String,
    pub country: Option<String>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, country: Option<String>, color: String) -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            heading: 0.0,
            controls: Controls::default(),
            alive: true,
            bump_debounce: 0,
            last_bumped_by: None,
            bump_credit: 0,
            points: 0,
            color,
            id,
            name,
            country,
        }
    }

    /// Put the player back into play at `position`, keeping identity and colour
    pub fn respawn(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.heading = 0.0;
        self.controls = Controls::default();
        self.alive = true;
        self.bump_debounce = 0;
        self.last_bumped_by = None;
        self.bump_credit = 0;
        self.points = 0;
    }

    pub fn can_bump(&self) -> bool {
        self.bump_debounce == 0
    }

    /// Record a bump from `other`, crediting them for `credit_ticks`
    pub fn bumped_by(&mut self, other: PlayerId, debounce_ticks: u32, credit_ticks: u32) {
        self.bump_debounce = debounce_ticks;
        self.last_bumped_by = Some(other);
        self.bump_credit = credit_ticks;
    }

    /// Count down bump timers; the credit lapses when its timer runs out
    pub fn tick_bump_timers(&mut self) {
        self.bump_debounce = self.bump_debounce.saturating_sub(1);
        self.bump_credit = self.bump_credit.saturating_sub(1);
        if self.bump_credit == 0 {
            self.last_bumped_by = None;
        }
    }
}

/// Bumpable debris
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Junk {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: String,
    /// Last player to hit this junk; persists until the junk is destroyed
    pub last_hit_by: Option<PlayerId>,
    /// Ticks remaining before the junk can be hit again
    pub debounce: u32,
    /// Ticks remaining before the junk can collide with other junk again
    pub junk_debounce: u32,
}

impl Junk {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            color: junk::NEUTRAL_COLOR.to_string(),
            last_hit_by: None,
            debounce: 0,
            junk_debounce: 0,
        }
    }

    pub fn can_be_hit(&self) -> bool {
        self.debounce == 0
    }

    /// Transfer a hit from `player`.
    ///
    /// Velocity becomes the player's scaled by `bump_factor`, with each axis
    /// raised to at least `minimum_bump` and the result clamped to
    /// `max_velocity`. A still axis takes its sign from the player-to-junk
    /// direction so the junk is pushed away.
    pub fn hit_by(
        &mut self,
        player: &Player,
        bump_factor: f32,
        minimum_bump: f32,
        max_velocity: f32,
        debounce_ticks: u32,
    ) {
        let away = self.position - player.position;
        let bump_axis = |player_v: f32, away: f32| {
            let scaled = player_v * bump_factor;
            if scaled.abs() >= minimum_bump {
                scaled
            } else {
                let sign = if player_v != 0.0 {
                    player_v.signum()
                } else if away != 0.0 {
                    away.signum()
                } else {
                    1.0
                };
                sign * minimum_bump
            }
        };

        self.velocity = Vec2::new(
            bump_axis(player.velocity.x, away.x),
            bump_axis(player.velocity.y, away.y),
        )
        .clamp_length(max_velocity);
        self.color = player.color.clone();
        self.last_hit_by = Some(player.id);
        self.debounce = debounce_ticks;
    }
}

/// Hole lifecycle phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HolePhase {
    /// Growing and collidable
    Alive,
    /// Faded, not collidable; respawns on the next tick
    Expired,
}

/// A decaying hole in a fixed slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hole {
    pub id: HoleId,
    pub position: Vec2,
    pub radius: f32,
    /// Ticks left while alive; never negative
    pub lifespan: u32,
    pub phase: HolePhase,
}

impl Hole {
    pub fn new(id: HoleId, position: Vec2, radius: f32, lifespan: u32) -> Self {
        Self {
            id,
            position,
            radius,
            lifespan,
            phase: HolePhase::Alive,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.phase == HolePhase::Alive
    }

    /// Reach of the hole's pull, a multiple of its radius
    pub fn gravity_radius(&self, factor: f32) -> f32 {
        self.radius * factor
    }
}

/// Complete game state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    pub tick: u64,
    pub arena: Arena,
    /// Players in join order
    pub players: Vec<Player>,
    pub junk: Vec<Junk>,
    /// Hole slots, indexed by `HoleId`
    pub holes: Vec<Hole>,
}

impl GameState {
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            ..Self::default()
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Add a player, replacing any existing entry with the same id in place
    pub fn add_player(&mut self, player: Player) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn alive_hole_count(&self) -> usize {
        self.holes.iter().filter(|h| h.is_alive()).count()
    }

    /// Positions every live entity currently occupies
    pub fn occupied_positions(&self) -> Vec<Vec2> {
        self.alive_players()
            .map(|p| p.position)
            .chain(self.junk.iter().map(|j| j.position))
            .chain(self.holes.iter().map(|h| h.position))
            .collect()
    }

    pub fn color_in_use(&self, color: &str) -> bool {
        self.players.iter().any(|p| p.color == color)
    }
}

//! Authoritative simulation driver
//!
//! Owns the `GameState`, a seeded RNG and the input queue, and advances the
//! world one fixed step at a time. The loop is transport-agnostic: the server
//! session and a local single-player host drive the same type.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::game::constants::color;
use crate::game::input_buffer::{InputBuffer, InputSender, KeyInput};
use crate::game::placement::generate_coordinates;
use crate::game::state::{Arena, GameState, HoleId, Junk, Player, PlayerId};
use crate::game::systems::collision::{self, CollisionEvent};
use crate::game::systems::holes::{self, HoleEvent};
use crate::game::systems::{gravity, physics};
use crate::util::vec2::Vec2;

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum GameLoopEvent {
    PlayerFell { player_id: PlayerId, hole_id: HoleId },
    JunkSunk { hole_id: HoleId, scorer: Option<PlayerId>, points: u32 },
    JunkHit { player_id: PlayerId },
    PlayersBumped { first: PlayerId, second: PlayerId },
    KnockOut { scorer: PlayerId, victim: PlayerId, points: u32 },
    JunkReplenished { count: usize },
    HoleExpired { hole_id: HoleId },
    HoleRespawned { hole_id: HoleId },
}

impl From<CollisionEvent> for GameLoopEvent {
    fn from(event: CollisionEvent) -> Self {
        match event {
            CollisionEvent::PlayerFell { player_id, hole_id } => Self::PlayerFell { player_id, hole_id },
            CollisionEvent::JunkSunk { hole_id, scorer, points } => Self::JunkSunk { hole_id, scorer, points },
            CollisionEvent::JunkHit { player_id } => Self::JunkHit { player_id },
            CollisionEvent::PlayersBumped { first, second } => Self::PlayersBumped { first, second },
            CollisionEvent::KnockOut { scorer, victim, points } => Self::KnockOut { scorer, victim, points },
        }
    }
}

impl From<HoleEvent> for GameLoopEvent {
    fn from(event: HoleEvent) -> Self {
        match event {
            HoleEvent::Expired { hole_id } => Self::HoleExpired { hole_id },
            HoleEvent::Respawned { hole_id, .. } => Self::HoleRespawned { hole_id },
        }
    }
}

pub struct GameLoop {
    state: GameState,
    config: GameConfig,
    rng: StdRng,
    input_buffer: InputBuffer,
}

impl GameLoop {
    /// Build a fresh arena: holes placed first, then junk clear of them
    pub fn new(config: GameConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let arena = Arena::new(config.arena_width, config.arena_height);
        let mut state = GameState::new(arena);

        let hole_positions = generate_coordinates(
            config.hole_count,
            config.spawn_separation,
            arena.bounds(),
            &[],
            config.max_placement_attempts,
            &mut rng,
        );
        state.holes = hole_positions
            .iter()
            .enumerate()
            .map(|(id, position)| holes::random_hole(id, *position, &config, &mut rng))
            .collect();

        let junk_positions = generate_coordinates(
            config.junk_count,
            config.spawn_separation,
            arena.bounds(),
            &hole_positions,
            config.max_placement_attempts,
            &mut rng,
        );
        state.junk = junk_positions.into_iter().map(Junk::new).collect();

        info!(
            "Arena {}x{} ready with {} holes and {} junk",
            arena.width,
            arena.height,
            state.holes.len(),
            state.junk.len()
        );

        Self {
            state,
            config,
            rng,
            input_buffer: InputBuffer::default(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Sender handle for connection tasks
    pub fn input_sender(&self) -> InputSender {
        self.input_buffer.sender()
    }

    /// Apply a key event immediately, bypassing the queue
    pub fn apply_input(&mut self, player_id: PlayerId, input: KeyInput) {
        if let Some(player) = self.state.get_player_mut(player_id) {
            input.apply(&mut player.controls);
        }
    }

    /// Create a player at a free spot and return its id
    pub fn spawn_player(&mut self, name: String, country: Option<String>) -> PlayerId {
        let id = Uuid::new_v4();
        let color = self.unique_color();
        let mut player = Player::new(id, name, country, color);
        player.position = self.free_position();

        info!("Player {} ({}) spawned at ({:.0}, {:.0})", player.name, id, player.position.x, player.position.y);
        self.state.add_player(player);
        id
    }

    /// Bring a player back with the same identity at a new spot
    pub fn respawn_player(&mut self, player_id: PlayerId) -> bool {
        if self.state.get_player(player_id).is_none() {
            return false;
        }
        let position = self.free_position();
        match self.state.get_player_mut(player_id) {
            Some(player) => {
                player.respawn(position);
                debug!("Respawned player {}", player_id);
                true
            }
            None => false,
        }
    }

    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        let removed = self.state.remove_player(player_id);
        if removed.is_some() {
            info!("Player {} removed", player_id);
        }
        removed
    }

    /// Advance the simulation by one step
    pub fn tick(&mut self) -> Vec<GameLoopEvent> {
        self.state.tick += 1;
        self.process_inputs();

        gravity::update(&mut self.state, &self.config);
        physics::update(&mut self.state, &self.config);

        let mut events: Vec<GameLoopEvent> = collision::update(&mut self.state, &self.config)
            .into_iter()
            .map(GameLoopEvent::from)
            .collect();

        events.extend(
            holes::update(&mut self.state, &self.config, &mut self.rng)
                .into_iter()
                .map(GameLoopEvent::from),
        );

        let added = self.replenish_junk();
        if added > 0 {
            events.push(GameLoopEvent::JunkReplenished { count: added });
        }

        events
    }

    /// Reset any non-finite player or junk state. Returns the number of fixes.
    pub fn sanitize(&mut self) -> usize {
        let mut fixes = 0;
        let arena = self.state.arena;

        for index in 0..self.state.players.len() {
            if !self.state.players[index].position.is_finite() {
                warn!("Fixed NaN position for player {}", self.state.players[index].id);
                let position = self.free_position();
                self.state.players[index].position = position;
                fixes += 1;
            }
            let player = &mut self.state.players[index];
            if !player.velocity.is_finite() {
                warn!("Fixed NaN velocity for player {}", player.id);
                player.velocity = Vec2::ZERO;
                fixes += 1;
            }
            if !player.heading.is_finite() {
                warn!("Fixed NaN heading for player {}", player.id);
                player.heading = 0.0;
                fixes += 1;
            }
        }

        for junk in &mut self.state.junk {
            if !junk.position.is_finite() || !junk.velocity.is_finite() {
                warn!("Fixed non-finite junk state");
                junk.position = arena.bounds().center();
                junk.velocity = Vec2::ZERO;
                fixes += 1;
            }
        }

        fixes
    }

    fn process_inputs(&mut self) {
        for message in self.input_buffer.drain() {
            if let Some(player) = self.state.get_player_mut(message.player_id) {
                message.input.apply(&mut player.controls);
            }
        }
    }

    /// Top the junk count back up to the configured amount
    fn replenish_junk(&mut self) -> usize {
        let missing = self.config.junk_count.saturating_sub(self.state.junk.len());
        if missing == 0 {
            return 0;
        }

        let occupied = self.state.occupied_positions();
        let positions = generate_coordinates(
            missing,
            self.config.spawn_separation,
            self.state.arena.bounds(),
            &occupied,
            self.config.max_placement_attempts,
            &mut self.rng,
        );
        self.state.junk.extend(positions.into_iter().map(Junk::new));
        missing
    }

    fn free_position(&mut self) -> Vec2 {
        let occupied = self.state.occupied_positions();
        generate_coordinates(
            1,
            self.config.spawn_separation,
            self.state.arena.bounds(),
            &occupied,
            self.config.max_placement_attempts,
            &mut self.rng,
        )
        .pop()
        .unwrap_or_else(|| self.state.arena.bounds().center())
    }

    fn random_color(&mut self) -> String {
        let digits = color::HEX_DIGITS;
        let mut out = String::with_capacity(7);
        out.push('#');
        for _ in 0..6 {
            out.push(digits[self.rng.gen_range(0..digits.len())] as char);
        }
        out
    }

    /// Random colour not used by another player, within a bounded number of tries
    fn unique_color(&mut self) -> String {
        let mut candidate = self.random_color();
        for _ in 1..color::MAX_ATTEMPTS {
            if !self.state.color_in_use(&candidate) {
                break;
            }
            candidate = self.random_color();
        }
        candidate
    }
}

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use thiserror::Error;

use crate::game::constants::{arena, hole, junk, placement, player, timing};

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Port cannot be 0")]
    ZeroPort,
    #[error("Metrics port must differ from the game port ({0})")]
    PortClash(u16),
    #[error("Tick rate must be 1-240 Hz, got {0}")]
    InvalidTickRate(u32),
    #[error("Arena dimensions must be positive, got {width}x{height}")]
    InvalidArena { width: f32, height: f32 },
    #[error("Hole radius range is invalid: min {min}, max {max}")]
    InvalidHoleRadius { min: f32, max: f32 },
    #[error("Hole lifespan range is invalid: min {min} ticks, max {max} ticks")]
    InvalidHoleLife { min: u32, max: u32 },
    #[error("{name} is out of range, got {value}")]
    InvalidTunable { name: &'static str, value: f32 },
    #[error("max_players must be at least 1")]
    ZeroMaxPlayers,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// WebTransport port
    pub port: u16,
    /// Prometheus metrics port
    pub metrics_port: u16,
    /// Simulation rate in Hz
    pub tick_rate: u32,
    pub arena_width: f32,
    pub arena_height: f32,
    /// Junk pieces held on the field
    pub junk_count: usize,
    /// Hole slots
    pub hole_count: usize,
    /// Maximum concurrent players
    pub max_players: usize,
    /// Fixed RNG seed (random when unset)
    pub seed: Option<u64>,
    /// Path to TLS certificate file
    pub tls_cert_path: Option<String>,
    /// Path to TLS key file
    pub tls_key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            metrics_port: 9090,
            tick_rate: timing::TICK_RATE,
            arena_width: arena::WIDTH,
            arena_height: arena::HEIGHT,
            junk_count: arena::JUNK_COUNT,
            hole_count: arena::HOLE_COUNT,
            max_players: 100,
            seed: None,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

/// Parse `name` from the environment, keeping `current` when unset or rejected
fn env_override<T>(name: &str, current: T, accept: impl Fn(&T) -> bool) -> T
where
    T: FromStr,
{
    let Ok(raw) = std::env::var(name) else {
        return current;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) if accept(&parsed) => parsed,
        Ok(_) => {
            tracing::warn!("{} '{}' out of range, using default", name, raw);
            current
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            current
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let defaults = Self::default();

        let mut config = Self {
            bind_address: env_override("BIND_ADDRESS", defaults.bind_address, |_| true),
            port: env_override("PORT", defaults.port, |p| *p > 0),
            metrics_port: env_override("METRICS_PORT", defaults.metrics_port, |p| *p > 0),
            tick_rate: env_override("TICK_RATE", defaults.tick_rate, |r| (1..=240).contains(r)),
            arena_width: env_override("ARENA_WIDTH", defaults.arena_width, |w| {
                w.is_finite() && *w > 0.0
            }),
            arena_height: env_override("ARENA_HEIGHT", defaults.arena_height, |h| {
                h.is_finite() && *h > 0.0
            }),
            junk_count: env_override("JUNK_COUNT", defaults.junk_count, |n| *n <= 1000),
            hole_count: env_override("HOLE_COUNT", defaults.hole_count, |n| *n <= 1000),
            max_players: env_override("MAX_PLAYERS", defaults.max_players, |n| {
                (1..=10_000).contains(n)
            }),
            seed: None,
            tls_cert_path: std::env::var("TLS_CERT_PATH").ok(),
            tls_key_path: std::env::var("TLS_KEY_PATH").ok(),
        };

        if let Ok(seed) = std::env::var("GAME_SEED") {
            match seed.parse::<u64>() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid GAME_SEED '{}', using random seed", seed),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 || self.metrics_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.port == self.metrics_port {
            return Err(ConfigError::PortClash(self.port));
        }
        if self.max_players == 0 {
            return Err(ConfigError::ZeroMaxPlayers);
        }
        self.game_config().validate()
    }

    /// Simulation tunables for this server
    pub fn game_config(&self) -> GameConfig {
        let mut game = GameConfig::with_tick_rate(self.tick_rate);
        game.arena_width = self.arena_width;
        game.arena_height = self.arena_height;
        game.junk_count = self.junk_count;
        game.hole_count = self.hole_count;
        game.seed = self.seed;
        game
    }
}

/// Simulation tunables.
///
/// Per-tick values are expressed in ticks; durations given in seconds are
/// converted with `tick_rate` when the config is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub tick_rate: u32,
    pub arena_width: f32,
    pub arena_height: f32,
    pub junk_count: usize,
    pub hole_count: usize,

    pub player_radius: f32,
    pub acceleration: f32,
    pub player_friction: f32,
    pub max_velocity: f32,
    pub turn_step: f32,
    pub wall_bounce_factor: f32,
    pub points_per_junk: u32,
    pub points_per_player: u32,
    pub player_debounce_ticks: u32,
    /// Ticks a bump stays credited for a knock-out
    pub bump_credit_ticks: u32,
    pub player_restitution: f32,
    pub player_gravity_damping: f32,

    pub junk_radius: f32,
    pub junk_friction: f32,
    pub junk_max_velocity: f32,
    pub junk_bounce_factor: f32,
    pub bump_factor: f32,
    pub minimum_bump: f32,
    pub junk_debounce_ticks: u32,
    pub junk_restitution: f32,
    pub junk_gravity_damping: f32,

    pub hole_min_radius: f32,
    pub hole_max_radius: f32,
    pub hole_growth: f32,
    pub hole_min_life: u32,
    pub hole_max_life: u32,
    /// Separation used when a hole respawns
    pub hole_spawn_separation: f32,
    pub gravity_radius_factor: f32,

    /// Separation used for initial and replacement placement
    pub spawn_separation: f32,
    pub max_placement_attempts: usize,

    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::with_tick_rate(timing::TICK_RATE)
    }
}

impl GameConfig {
    pub fn with_tick_rate(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            arena_width: arena::WIDTH,
            arena_height: arena::HEIGHT,
            junk_count: arena::JUNK_COUNT,
            hole_count: arena::HOLE_COUNT,

            player_radius: player::RADIUS,
            acceleration: player::ACCELERATION,
            player_friction: player::FRICTION,
            max_velocity: player::MAX_VELOCITY,
            turn_step: player::TURN_STEP,
            wall_bounce_factor: player::WALL_BOUNCE_FACTOR,
            points_per_junk: player::POINTS_PER_JUNK,
            points_per_player: player::POINTS_PER_PLAYER,
            player_debounce_ticks: player::DEBOUNCE_TICKS,
            bump_credit_ticks: player::BUMP_CREDIT_TICKS,
            player_restitution: player::RESTITUTION,
            player_gravity_damping: player::GRAVITY_DAMPING,

            junk_radius: junk::RADIUS,
            junk_friction: junk::FRICTION,
            junk_max_velocity: junk::MAX_VELOCITY,
            junk_bounce_factor: junk::WALL_BOUNCE_FACTOR,
            bump_factor: junk::BUMP_FACTOR,
            minimum_bump: junk::MINIMUM_BUMP,
            junk_debounce_ticks: junk::DEBOUNCE_TICKS,
            junk_restitution: junk::RESTITUTION,
            junk_gravity_damping: junk::GRAVITY_DAMPING,

            hole_min_radius: hole::MIN_RADIUS,
            hole_max_radius: hole::MAX_RADIUS,
            hole_growth: hole::GROWTH_PER_TICK,
            hole_min_life: timing::seconds_to_ticks(hole::MIN_LIFE_SECS, tick_rate),
            hole_max_life: timing::seconds_to_ticks(hole::MAX_LIFE_SECS, tick_rate),
            hole_spawn_separation: hole::MAX_RADIUS,
            gravity_radius_factor: hole::GRAVITY_RADIUS_FACTOR,

            spawn_separation: placement::MIN_SEPARATION,
            max_placement_attempts: placement::MAX_PLACEMENT_ATTEMPTS,

            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 240 {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        if !(self.arena_width > 0.0 && self.arena_height > 0.0)
            || !self.arena_width.is_finite()
            || !self.arena_height.is_finite()
        {
            return Err(ConfigError::InvalidArena {
                width: self.arena_width,
                height: self.arena_height,
            });
        }
        if !(self.hole_min_radius > 0.0 && self.hole_min_radius <= self.hole_max_radius) {
            return Err(ConfigError::InvalidHoleRadius {
                min: self.hole_min_radius,
                max: self.hole_max_radius,
            });
        }
        if self.hole_min_life == 0 || self.hole_min_life > self.hole_max_life {
            return Err(ConfigError::InvalidHoleLife {
                min: self.hole_min_life,
                max: self.hole_max_life,
            });
        }

        // Friction multiplies velocity every tick, so it must shrink it
        for (name, value) in [
            ("player_friction", self.player_friction),
            ("junk_friction", self.junk_friction),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::InvalidTunable { name, value });
            }
        }

        let tunables = [
            ("player_radius", self.player_radius),
            ("acceleration", self.acceleration),
            ("max_velocity", self.max_velocity),
            ("turn_step", self.turn_step),
            ("wall_bounce_factor", self.wall_bounce_factor),
            ("player_restitution", self.player_restitution),
            ("player_gravity_damping", self.player_gravity_damping),
            ("junk_radius", self.junk_radius),
            ("junk_max_velocity", self.junk_max_velocity),
            ("junk_bounce_factor", self.junk_bounce_factor),
            ("bump_factor", self.bump_factor),
            ("minimum_bump", self.minimum_bump),
            ("junk_restitution", self.junk_restitution),
            ("junk_gravity_damping", self.junk_gravity_damping),
            ("hole_growth", self.hole_growth),
            ("gravity_radius_factor", self.gravity_radius_factor),
            ("hole_spawn_separation", self.hole_spawn_separation),
            ("spawn_separation", self.spawn_separation),
        ];
        for (name, value) in tunables {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTunable { name, value });
            }
        }

        Ok(())
    }
}

/// Simulation timing
pub mod timing {
    /// Default server tick rate in Hz
    pub const TICK_RATE: u32 = 60;

    /// Convert a duration in seconds to a tick count at `tick_rate`
    pub fn seconds_to_ticks(seconds: f32, tick_rate: u32) -> u32 {
        (seconds * tick_rate as f32).round().max(0.0) as u32
    }
}

/// Default arena dimensions and population
pub mod arena {
    pub const WIDTH: f32 = 2000.0;
    pub const HEIGHT: f32 = 1500.0;
    /// Junk pieces kept on the field
    pub const JUNK_COUNT: usize = 10;
    /// Hole slots
    pub const HOLE_COUNT: usize = 10;
}

/// Player craft constants
pub mod player {
    /// Collision radius
    pub const RADIUS: f32 = 25.0;
    /// Thrust added per tick while "up" is held
    pub const ACCELERATION: f32 = 0.5;
    /// Velocity multiplier applied every tick
    pub const FRICTION: f32 = 0.97;
    /// Maximum velocity magnitude
    pub const MAX_VELOCITY: f32 = 15.0;
    /// Heading change per tick while turning (radians)
    pub const TURN_STEP: f32 = 0.1;
    /// Wall reflection multiplier, deliberately above 1 so walls kick back
    pub const WALL_BOUNCE_FACTOR: f32 = 1.5;
    /// Points awarded for sinking a junk
    pub const POINTS_PER_JUNK: u32 = 100;
    /// Points awarded for bumping a player who then falls
    pub const POINTS_PER_PLAYER: u32 = 500;
    /// Ticks before the same player can bump again
    pub const DEBOUNCE_TICKS: u32 = 15;
    /// Ticks a bump stays credited to the bumper
    pub const BUMP_CREDIT_TICKS: u32 = 100;
    /// Share of approach speed kept after a player-player bump
    pub const RESTITUTION: f32 = 0.95;
    /// Hole pull multiplier
    pub const GRAVITY_DAMPING: f32 = 0.075;
    /// Maximum sanitized name length
    pub const MAX_NAME_LENGTH: usize = 16;
}

/// Junk (bumpable debris) constants
pub mod junk {
    pub const RADIUS: f32 = 15.0;
    pub const FRICTION: f32 = 0.98;
    pub const MAX_VELOCITY: f32 = 15.0;
    pub const WALL_BOUNCE_FACTOR: f32 = 1.0;
    /// Player velocity multiplier transferred on a hit
    pub const BUMP_FACTOR: f32 = 1.4;
    /// Minimum per-axis speed after a hit
    pub const MINIMUM_BUMP: f32 = 0.5;
    /// Ticks before the same junk can be hit again
    pub const DEBOUNCE_TICKS: u32 = 10;
    /// Share of approach speed kept after a junk-junk collision
    pub const RESTITUTION: f32 = 1.0;
    /// Hole pull multiplier
    pub const GRAVITY_DAMPING: f32 = 0.025;
    /// Colour of junk nobody has touched yet
    pub const NEUTRAL_COLOR: &str = "white";
}

/// Hole constants
pub mod hole {
    pub const MIN_RADIUS: f32 = 15.0;
    pub const MAX_RADIUS: f32 = 45.0;
    /// Radius growth per tick while alive
    pub const GROWTH_PER_TICK: f32 = 0.02;
    /// Gravity reach as a multiple of the radius
    pub const GRAVITY_RADIUS_FACTOR: f32 = 5.0;
    /// Minimum lifetime in seconds
    pub const MIN_LIFE_SECS: f32 = 25.0;
    /// Maximum lifetime in seconds
    pub const MAX_LIFE_SECS: f32 = 75.0;
}

/// Placement generator constants
pub mod placement {
    /// Candidates sampled per point before falling back
    pub const MAX_PLACEMENT_ATTEMPTS: usize = 50;
    /// Minimum separation between spawned entities
    pub const MIN_SEPARATION: f32 = super::hole::MAX_RADIUS;
}

/// Player colour generation
pub mod color {
    /// Hex digits used for player colours (skips dark values)
    pub const HEX_DIGITS: &[u8] = b"3456789ABCDEF";
    /// Attempts at finding an unused colour before accepting a duplicate
    pub const MAX_ATTEMPTS: usize = 5;
}

/// Network limits
pub mod network {
    /// Bounded input queue capacity between connections and the loop
    pub const INPUT_BUFFER_CAPACITY: usize = 4096;
    /// Largest accepted frame
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(timing::seconds_to_ticks(25.0, 60), 1500);
        assert_eq!(timing::seconds_to_ticks(75.0, 60), 4500);
        assert_eq!(timing::seconds_to_ticks(1.0, 30), 30);
        assert_eq!(timing::seconds_to_ticks(-1.0, 30), 0);
    }

    #[test]
    fn test_hole_radius_range() {
        assert!(hole::MIN_RADIUS > 0.0);
        assert!(hole::MIN_RADIUS <= hole::MAX_RADIUS);
        assert!(hole::MIN_LIFE_SECS <= hole::MAX_LIFE_SECS);
    }

    #[test]
    fn test_arena_fits_population() {
        assert!(arena::WIDTH > 2.0 * placement::MIN_SEPARATION);
        assert!(arena::HEIGHT > 2.0 * placement::MIN_SEPARATION);
    }
}

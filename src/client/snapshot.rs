//! Render-side world snapshot
//!
//! Built from an `update` payload in one pass and published as a whole; the
//! renderer never sees a half-applied snapshot.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::game::constants::junk::NEUTRAL_COLOR;
use crate::game::leaderboard::Scored;
use crate::game::state::PlayerId;
use crate::net::protocol::{HoleWire, JunkWire, PlayerWire, UpdateData};
use crate::util::vec2::Vec2;

/// Resolve an optional wire position. Missing positions become an inert
/// entity at the origin.
fn resolve(position: Option<Vec2>) -> (Vec2, bool) {
    match position {
        Some(p) if p.is_finite() => (p, true),
        _ => (Vec2::ZERO, false),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlayer {
    pub id: PlayerId,
    pub name: String,
    pub country: Option<String>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub color: String,
    pub points: u32,
    pub alive: bool,
    /// False for an inert placeholder
    pub collidable: bool,
}

impl From<PlayerWire> for RenderPlayer {
    fn from(wire: PlayerWire) -> Self {
        let (position, collidable) = resolve(wire.position);
        Self {
            id: wire.id,
            name: wire.name,
            country: wire.country,
            position,
            velocity: if collidable { wire.velocity.unwrap_or(Vec2::ZERO) } else { Vec2::ZERO },
            angle: wire.angle,
            color: if collidable { wire.color } else { NEUTRAL_COLOR.to_string() },
            points: wire.points,
            alive: wire.alive,
            collidable,
        }
    }
}

impl Scored for RenderPlayer {
    fn id(&self) -> PlayerId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
    fn color(&self) -> &str {
        &self.color
    }
    fn points(&self) -> u32 {
        self.points
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderJunk {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: String,
    pub collidable: bool,
}

impl From<JunkWire> for RenderJunk {
    fn from(wire: JunkWire) -> Self {
        let (position, collidable) = resolve(wire.position);
        Self {
            position,
            velocity: if collidable { wire.velocity.unwrap_or(Vec2::ZERO) } else { Vec2::ZERO },
            color: if collidable { wire.color } else { NEUTRAL_COLOR.to_string() },
            collidable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderHole {
    pub position: Vec2,
    pub radius: f32,
    pub is_alive: bool,
    pub collidable: bool,
}

impl From<HoleWire> for RenderHole {
    fn from(wire: HoleWire) -> Self {
        let (position, collidable) = resolve(wire.position);
        Self {
            position,
            radius: wire.radius,
            is_alive: wire.is_alive,
            collidable: collidable && wire.is_alive,
        }
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    pub players: Vec<RenderPlayer>,
    pub junk: Vec<RenderJunk>,
    pub holes: Vec<RenderHole>,
}

impl WorldSnapshot {
    pub fn from_update(update: UpdateData) -> Self {
        Self {
            players: update.players.into_iter().map(RenderPlayer::from).collect(),
            junk: update.junk.into_iter().map(RenderJunk::from).collect(),
            holes: update.holes.into_iter().map(RenderHole::from).collect(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&RenderPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Number of entities that arrived without a usable position
    pub fn inert_count(&self) -> usize {
        self.players.iter().filter(|p| !p.collidable).count()
            + self.junk.iter().filter(|j| !j.collidable).count()
            + self.holes.iter().filter(|h| !h.collidable && h.is_alive).count()
    }
}

/// Latest published snapshot. Writers swap the whole `Arc`; readers clone it
/// and keep a consistent view for as long as they hold it.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<WorldSnapshot>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<WorldSnapshot> {
        self.current.read().clone()
    }

    pub fn store(&self, snapshot: WorldSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn wire_player(position: Option<Vec2>) -> PlayerWire {
        PlayerWire {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            country: None,
            position,
            velocity: Some(Vec2::new(1.0, 2.0)),
            angle: 0.5,
            color: "#ABCDEF".to_string(),
            points: 300,
            alive: true,
        }
    }

    #[test]
    fn test_missing_position_is_inert() {
        let player = RenderPlayer::from(wire_player(None));
        assert_eq!(player.position, Vec2::ZERO);
        assert_eq!(player.velocity, Vec2::ZERO);
        assert_eq!(player.color, NEUTRAL_COLOR);
        assert!(!player.collidable);
        assert_eq!(player.points, 300);
    }

    #[test]
    fn test_present_position_kept() {
        let player = RenderPlayer::from(wire_player(Some(Vec2::new(5.0, 6.0))));
        assert_eq!(player.position, Vec2::new(5.0, 6.0));
        assert_eq!(player.color, "#ABCDEF");
        assert!(player.collidable);
    }

    #[test]
    fn test_expired_hole_not_collidable() {
        let hole = RenderHole::from(HoleWire {
            position: Some(Vec2::new(10.0, 10.0)),
            radius: 20.0,
            is_alive: false,
        });
        assert!(!hole.collidable);
        assert_eq!(hole.position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_one_bad_record_does_not_spoil_the_rest() {
        let update = UpdateData {
            tick: 3,
            junk: vec![
                JunkWire { position: None, velocity: None, color: "red".to_string() },
                JunkWire {
                    position: Some(Vec2::new(3.0, 4.0)),
                    velocity: None,
                    color: "red".to_string(),
                },
            ],
            holes: vec![],
            players: vec![wire_player(Some(Vec2::new(1.0, 1.0)))],
        };
        let snapshot = WorldSnapshot::from_update(update);
        assert_eq!(snapshot.inert_count(), 1);
        assert_eq!(snapshot.junk[1].position, Vec2::new(3.0, 4.0));
        assert_eq!(snapshot.junk[1].color, "red");
    }

    #[test]
    fn test_cell_swaps_whole_snapshot() {
        let cell = SnapshotCell::new();
        let before = cell.load();
        assert!(before.players.is_empty());

        cell.store(WorldSnapshot {
            players: vec![RenderPlayer::from(wire_player(Some(Vec2::new(1.0, 1.0))))],
            ..WorldSnapshot::default()
        });

        // The old handle is untouched; a fresh load sees the new world
        assert!(before.players.is_empty());
        assert_eq!(cell.load().players.len(), 1);
    }
}

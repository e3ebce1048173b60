//! Player-centred camera
//!
//! The local player is drawn at the canvas centre until the camera would show
//! space outside the arena; near an edge the camera pins and the player moves
//! toward that edge of the canvas instead. Everything is recomputed from raw
//! world positions each frame.

use serde::{Deserialize, Serialize};

use crate::client::snapshot::{RenderPlayer, WorldSnapshot};
use crate::game::state::{Arena, PlayerId};
use crate::util::vec2::Vec2;

/// Drawable area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Where a coordinate `p` is drawn on an axis of canvas length `c` in a world
/// of length `a`
#[inline]
pub fn axis(p: f32, c: f32, a: f32) -> f32 {
    let half = c / 2.0;
    if p <= half {
        p
    } else if p <= a - half {
        half
    } else {
        p - (a - c)
    }
}

/// Which arena walls are on screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFlags {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl EdgeFlags {
    pub fn compute(p: Vec2, canvas: Canvas, arena: Arena) -> Self {
        Self {
            left: p.x < canvas.width / 2.0,
            right: p.x > arena.width - canvas.width / 2.0,
            top: p.y < canvas.height / 2.0,
            bottom: p.y > arena.height - canvas.height / 2.0,
        }
    }
}

/// Camera for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Screen position of the local player
    pub offset: Vec2,
    /// Added to every other world position
    pub translation: Vec2,
    pub walls: EdgeFlags,
}

impl Camera {
    pub fn follow(p: Vec2, canvas: Canvas, arena: Arena) -> Self {
        let offset = Vec2::new(
            axis(p.x, canvas.width, arena.width),
            axis(p.y, canvas.height, arena.height),
        );
        Self {
            offset,
            translation: offset - p,
            walls: EdgeFlags::compute(p, canvas, arena),
        }
    }

    #[inline]
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        world + self.translation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnPlayer {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec2,
    pub angle: f32,
    pub color: String,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnJunk {
    pub position: Vec2,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnHole {
    pub position: Vec2,
    pub radius: f32,
    /// Expired holes are drawn faded
    pub faded: bool,
}

/// Screen-space contents of one rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub camera: Camera,
    pub local: DrawnPlayer,
    pub players: Vec<DrawnPlayer>,
    pub junk: Vec<DrawnJunk>,
    pub holes: Vec<DrawnHole>,
}

impl Frame {
    /// Lay out `snapshot` around the local player. `None` if the local player
    /// is not in the snapshot.
    pub fn compose(snapshot: &WorldSnapshot, local_id: PlayerId, canvas: Canvas, arena: Arena) -> Option<Self> {
        let me = snapshot.player(local_id)?;
        let camera = Camera::follow(me.position, canvas, arena);

        let drawn = |p: &RenderPlayer, position: Vec2| DrawnPlayer {
            id: p.id,
            name: p.name.clone(),
            position,
            angle: p.angle,
            color: p.color.clone(),
            alive: p.alive,
        };

        Some(Self {
            local: drawn(me, camera.offset),
            players: snapshot
                .players
                .iter()
                .filter(|p| p.id != local_id)
                .map(|p| drawn(p, camera.to_screen(p.position)))
                .collect(),
            junk: snapshot
                .junk
                .iter()
                .map(|j| DrawnJunk {
                    position: camera.to_screen(j.position),
                    color: j.color.clone(),
                })
                .collect(),
            holes: snapshot
                .holes
                .iter()
                .map(|h| DrawnHole {
                    position: camera.to_screen(h.position),
                    radius: h.radius,
                    faded: !h.is_alive,
                })
                .collect(),
            camera,
        })
    }
}

//! Camera placement against an 800x600 canvas in a 2000x1500 arena

use bumper_server::client::snapshot::{RenderHole, RenderJunk, RenderPlayer, WorldSnapshot};
use bumper_server::client::viewport::{axis, Camera, Canvas, EdgeFlags, Frame};
use bumper_server::game::state::Arena;
use bumper_server::util::vec2::Vec2;
use uuid::Uuid;

fn arena() -> Arena {
    Arena::new(2000.0, 1500.0)
}

fn canvas() -> Canvas {
    Canvas::new(800.0, 600.0)
}

fn player_at(position: Vec2) -> RenderPlayer {
    RenderPlayer {
        id: Uuid::new_v4(),
        name: "me".to_string(),
        country: None,
        position,
        velocity: Vec2::ZERO,
        angle: 0.0,
        color: "#345678".to_string(),
        points: 0,
        alive: true,
        collidable: true,
    }
}

#[test]
fn near_corner_is_not_clamped() {
    let camera = Camera::follow(Vec2::new(50.0, 50.0), canvas(), arena());
    assert_eq!(camera.offset, Vec2::new(50.0, 50.0));
    assert_eq!(camera.translation, Vec2::ZERO);
    assert_eq!(
        camera.walls,
        EdgeFlags {
            left: true,
            right: false,
            top: true,
            bottom: false
        }
    );
}

#[test]
fn arena_centre_draws_player_at_canvas_centre() {
    let camera = Camera::follow(Vec2::new(1000.0, 750.0), canvas(), arena());
    assert_eq!(camera.offset, Vec2::new(400.0, 300.0));
    assert_eq!(camera.walls, EdgeFlags::default());
}

#[test]
fn right_edge_pins_camera() {
    let camera = Camera::follow(Vec2::new(1990.0, 750.0), canvas(), arena());
    assert_eq!(camera.offset.x, 790.0);
    assert_eq!(camera.offset.y, 300.0);
    assert!(camera.walls.right);
    assert!(!camera.walls.left);
}

#[test]
fn transform_is_idempotent() {
    let me = player_at(Vec2::new(1700.0, 100.0));
    let local_id = me.id;
    let snapshot = WorldSnapshot {
        players: vec![me, player_at(Vec2::new(1500.0, 200.0))],
        junk: vec![RenderJunk {
            position: Vec2::new(1800.0, 50.0),
            velocity: Vec2::ZERO,
            color: "white".to_string(),
            collidable: true,
        }],
        holes: vec![RenderHole {
            position: Vec2::new(1600.0, 400.0),
            radius: 30.0,
            is_alive: false,
            collidable: false,
        }],
    };

    let first = Frame::compose(&snapshot, local_id, canvas(), arena()).unwrap();
    let second = Frame::compose(&snapshot, local_id, canvas(), arena()).unwrap();
    assert_eq!(first, second);

    // x pinned at the right edge, y near the top
    assert_eq!(first.local.position, Vec2::new(500.0, 100.0));
    assert_eq!(first.players[0].position, Vec2::new(300.0, 200.0));
    assert_eq!(first.junk[0].position, Vec2::new(600.0, 50.0));
    assert!(first.holes[0].faded);
}

#[test]
fn axis_matches_camera_on_each_axis() {
    for x in [0.0, 399.0, 400.0, 401.0, 1000.0, 1600.0, 1601.0, 2000.0] {
        let camera = Camera::follow(Vec2::new(x, 750.0), canvas(), arena());
        assert_eq!(camera.offset.x, axis(x, 800.0, 2000.0));
    }
}

#[test]
fn missing_local_player_yields_no_frame() {
    let snapshot = WorldSnapshot {
        players: vec![player_at(Vec2::new(10.0, 10.0))],
        ..WorldSnapshot::default()
    };
    assert!(Frame::compose(&snapshot, Uuid::new_v4(), canvas(), arena()).is_none());
}

//! Thin client core
//!
//! Holds no simulation of its own: it applies server snapshots whole and lays
//! them out around the local player. Rendering and input capture live outside
//! this crate and talk to it through `ClientState` and the `Outbox`.

pub mod outbox;
pub mod snapshot;
pub mod viewport;

use std::sync::Arc;

use tracing::{debug, info};

use crate::game::leaderboard::{Leaderboard, TOP_N};
use crate::game::state::{Arena, PlayerId};
use crate::net::protocol::{decode_server, ProtocolError, ServerMessage};

pub use snapshot::{SnapshotCell, WorldSnapshot};
pub use viewport::{Camera, Canvas, EdgeFlags, Frame};

/// What a server message changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// `initial` arrived: the local player exists
    Joined { player_id: PlayerId },
    /// First snapshot ever received
    Initialized,
    Updated,
    /// Snapshot older than the one already shown; ignored
    Stale,
    /// Local player fell; the caller decides whether to reconnect
    Died,
}

#[derive(Debug, Default)]
pub struct ClientState {
    player_id: Option<PlayerId>,
    arena: Option<Arena>,
    initialized: bool,
    dead: bool,
    /// Tick of the snapshot currently held
    last_tick: Option<u64>,
    snapshot: Arc<SnapshotCell>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Arena announced by the server, or the default size until then
    pub fn arena(&self) -> Arena {
        self.arena.unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Shared handle for a render thread
    pub fn snapshot_cell(&self) -> Arc<SnapshotCell> {
        self.snapshot.clone()
    }

    /// Decode, validate and apply one frame from the server
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Option<ClientEvent>, ProtocolError> {
        let message = decode_server(frame)?;
        Ok(self.handle_message(message))
    }

    pub fn handle_message(&mut self, message: ServerMessage) -> Option<ClientEvent> {
        match message {
            ServerMessage::Initial(data) => {
                info!("Joined as {} in {}x{} arena", data.player_id, data.arena_width, data.arena_height);
                self.player_id = Some(data.player_id);
                self.arena = Some(Arena::new(data.arena_width, data.arena_height));
                self.dead = false;
                // A restarted server counts ticks from zero again
                self.last_tick = None;
                Some(ClientEvent::Joined {
                    player_id: data.player_id,
                })
            }
            ServerMessage::Update(data) => {
                if self.last_tick.is_some_and(|last| data.tick < last) {
                    debug!("Dropping snapshot for tick {} behind {:?}", data.tick, self.last_tick);
                    return Some(ClientEvent::Stale);
                }
                self.last_tick = Some(data.tick);

                let snapshot = WorldSnapshot::from_update(data);
                let inert = snapshot.inert_count();
                if inert > 0 {
                    debug!("Snapshot had {} entities without a position", inert);
                }
                self.snapshot.store(snapshot);

                if self.initialized {
                    Some(ClientEvent::Updated)
                } else {
                    self.initialized = true;
                    Some(ClientEvent::Initialized)
                }
            }
            ServerMessage::Death => {
                if self.dead {
                    return None;
                }
                info!("Local player died");
                self.dead = true;
                Some(ClientEvent::Died)
            }
        }
    }

    /// Screen layout for the latest snapshot
    pub fn frame(&self, canvas: Canvas) -> Option<Frame> {
        let player_id = self.player_id?;
        Frame::compose(&self.snapshot.load(), player_id, canvas, self.arena())
    }

    pub fn leaderboard(&self) -> Leaderboard {
        let snapshot = self.snapshot.load();
        Leaderboard::rank(&snapshot.players, self.player_id, TOP_N)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{encode, InitialData, PlayerWire, UpdateData};
    use crate::util::vec2::Vec2;
    use uuid::Uuid;

    fn player(id: PlayerId, x: f32, y: f32, points: u32) -> PlayerWire {
        PlayerWire {
            id,
            name: format!("p{points}"),
            country: None,
            position: Some(Vec2::new(x, y)),
            velocity: Some(Vec2::ZERO),
            angle: 0.0,
            color: "#333333".to_string(),
            points,
            alive: true,
        }
    }

    fn update(players: Vec<PlayerWire>) -> ServerMessage {
        ServerMessage::Update(UpdateData {
            players,
            ..UpdateData::default()
        })
    }

    fn update_at(tick: u64, players: Vec<PlayerWire>) -> ServerMessage {
        ServerMessage::Update(UpdateData {
            tick,
            players,
            ..UpdateData::default()
        })
    }

    #[test]
    fn test_first_update_initializes() {
        let mut client = ClientState::new();
        assert!(!client.is_initialized());

        assert_eq!(client.handle_message(update(vec![])), Some(ClientEvent::Initialized));
        assert!(client.is_initialized());
        assert_eq!(client.handle_message(update(vec![])), Some(ClientEvent::Updated));
    }

    #[test]
    fn test_initial_then_frame() {
        let id = Uuid::new_v4();
        let mut client = ClientState::new();
        client.handle_message(ServerMessage::Initial(InitialData {
            player_id: id,
            arena_width: 2000.0,
            arena_height: 1500.0,
        }));
        client.handle_message(update(vec![player(id, 1000.0, 750.0, 0)]));

        let frame = client.frame(Canvas::default()).unwrap();
        assert_eq!(frame.camera.offset, Vec2::new(400.0, 300.0));
        assert_eq!(frame.local.position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_older_snapshot_is_ignored() {
        let id = Uuid::new_v4();
        let mut client = ClientState::new();
        client.handle_message(ServerMessage::Initial(InitialData {
            player_id: id,
            arena_width: 2000.0,
            arena_height: 1500.0,
        }));

        assert_eq!(
            client.handle_message(update_at(7, vec![player(id, 1000.0, 750.0, 0)])),
            Some(ClientEvent::Initialized)
        );
        assert_eq!(
            client.handle_message(update_at(6, vec![player(id, 100.0, 100.0, 0)])),
            Some(ClientEvent::Stale)
        );
        assert_eq!(client.snapshot_cell().load().players[0].position, Vec2::new(1000.0, 750.0));

        // Same tick again is accepted; a newer one replaces it
        assert_eq!(
            client.handle_message(update_at(7, vec![player(id, 1000.0, 750.0, 0)])),
            Some(ClientEvent::Updated)
        );
        assert_eq!(
            client.handle_message(update_at(8, vec![player(id, 1010.0, 750.0, 0)])),
            Some(ClientEvent::Updated)
        );
        assert_eq!(client.snapshot_cell().load().players[0].position, Vec2::new(1010.0, 750.0));
    }

    #[test]
    fn test_no_frame_without_identity() {
        let mut client = ClientState::new();
        client.handle_message(update(vec![player(Uuid::new_v4(), 10.0, 10.0, 0)]));
        assert!(client.frame(Canvas::default()).is_none());
    }

    #[test]
    fn test_death_reported_once() {
        let mut client = ClientState::new();
        assert_eq!(client.handle_message(ServerMessage::Death), Some(ClientEvent::Died));
        assert_eq!(client.handle_message(ServerMessage::Death), None);
        assert!(client.is_dead());
    }

    #[test]
    fn test_handle_frame_rejects_bad_arena() {
        let mut client = ClientState::new();
        let frame = encode(&ServerMessage::Initial(InitialData {
            player_id: Uuid::new_v4(),
            arena_width: 0.0,
            arena_height: 1500.0,
        }))
        .unwrap();
        assert!(matches!(client.handle_frame(&frame), Err(ProtocolError::Invalid(_))));
        assert!(client.player_id().is_none());
    }

    #[test]
    fn test_leaderboard_from_snapshot() {
        let me = Uuid::new_v4();
        let mut players: Vec<PlayerWire> = (0..6u32)
            .map(|i| player(Uuid::new_v4(), 10.0, 10.0, (i + 1) * 100))
            .collect();
        players.push(player(me, 10.0, 10.0, 0));

        let mut client = ClientState::new();
        client.handle_message(ServerMessage::Initial(InitialData {
            player_id: me,
            arena_width: 2000.0,
            arena_height: 1500.0,
        }));
        client.handle_message(update(players));

        let board = client.leaderboard();
        assert_eq!(board.top.len(), TOP_N);
        assert_eq!(board.top[0].points, 600);
        assert_eq!(board.local.as_ref().map(|s| s.rank), Some(7));
    }
}

//! Game session manager - runs the game loop and broadcasts state to players

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::game::game_loop::{GameLoop, GameLoopEvent};
use crate::game::input_buffer::InputSender;
use crate::game::state::PlayerId;
use crate::metrics::Metrics;
use crate::net::framing::{write_message, FramingError};
use crate::net::protocol::{encode, InitialData, ServerMessage, UpdateData};

/// Outbound half of a player's stream; `None` once the stream has gone away
pub type SharedWriter = Arc<RwLock<Option<wtransport::SendStream>>>;

/// A connected player's stream writer
pub struct PlayerConnection {
    pub player_id: PlayerId,
    pub writer: SharedWriter,
}

/// Result of one tick, gathered under the session lock
#[derive(Debug)]
pub struct TickOutcome {
    pub events: Vec<GameLoopEvent>,
    pub snapshot: UpdateData,
    /// Players who fell this tick
    pub fallen: Vec<PlayerId>,
}

/// Shared game session: the simulation plus its player connections
pub struct GameSession {
    pub game_loop: GameLoop,
    pub connections: HashMap<PlayerId, PlayerConnection>,
    max_players: usize,
    metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(config: GameConfig, max_players: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            game_loop: GameLoop::new(config),
            connections: HashMap::new(),
            max_players,
            metrics,
        }
    }

    pub fn player_count(&self) -> usize {
        self.game_loop.state().players.len()
    }

    pub fn is_full(&self) -> bool {
        self.player_count() >= self.max_players
    }

    pub fn input_sender(&self) -> InputSender {
        self.game_loop.input_sender()
    }

    /// `initial` payload for a player
    pub fn initial_for(&self, player_id: PlayerId) -> InitialData {
        let arena = self.game_loop.state().arena;
        InitialData {
            player_id,
            arena_width: arena.width,
            arena_height: arena.height,
        }
    }

    /// Spawn a new player.
    ///
    /// The player gets no broadcasts until `attach` binds a writer, so the
    /// caller can deliver `initial` before the first `update`.
    pub fn join(&mut self, name: String, country: Option<String>) -> InitialData {
        let player_id = self.game_loop.spawn_player(name, country);
        self.metrics.observe_state(self.game_loop.state());
        self.initial_for(player_id)
    }

    /// Start broadcasting to a joined player. `false` if the player is gone.
    pub fn attach(&mut self, player_id: PlayerId, writer: SharedWriter) -> bool {
        if self.game_loop.state().get_player(player_id).is_none() {
            return false;
        }
        self.connections.insert(player_id, PlayerConnection { player_id, writer });
        true
    }

    /// Respawn a fallen player. `None` if the player is unknown.
    pub fn reconnect(&mut self, player_id: PlayerId) -> Option<InitialData> {
        if self.game_loop.respawn_player(player_id) {
            Some(self.initial_for(player_id))
        } else {
            None
        }
    }

    pub fn leave(&mut self, player_id: PlayerId) {
        self.game_loop.remove_player(player_id);
        self.connections.remove(&player_id);
        self.metrics.observe_state(self.game_loop.state());
    }

    /// Run one tick with NaN guards on either side
    pub fn tick(&mut self) -> TickOutcome {
        let started = Instant::now();

        self.game_loop.sanitize();
        let events = self.game_loop.tick();
        self.game_loop.sanitize();

        let fallen = events
            .iter()
            .filter_map(|e| match e {
                GameLoopEvent::PlayerFell { player_id, .. } => Some(*player_id),
                _ => None,
            })
            .collect();
        let snapshot = UpdateData::from_game_state(self.game_loop.state());

        self.metrics.record_tick_time(started.elapsed());
        self.metrics.observe_state(self.game_loop.state());
        self.metrics.observe_events(&events);

        TickOutcome { events, snapshot, fallen }
    }

    /// Writers for every connection, or just the listed players
    fn writers_for(&self, only: Option<&[PlayerId]>) -> Vec<(PlayerId, SharedWriter)> {
        match only {
            None => self
                .connections
                .values()
                .map(|c| (c.player_id, c.writer.clone()))
                .collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.connections.get(id))
                .map(|c| (c.player_id, c.writer.clone()))
                .collect(),
        }
    }
}

/// Write one pre-encoded frame to a player. A missing writer drops silently.
async fn write_frame(writer: &SharedWriter, frame: &[u8]) -> Result<bool, FramingError> {
    match &mut *writer.write().await {
        Some(stream) => {
            write_message(stream, frame).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Send a message to a specific player
pub async fn send_to_player(writer: &SharedWriter, message: &ServerMessage) -> Result<(), FramingError> {
    let encoded = encode(message)?;
    if !write_frame(writer, &encoded).await? {
        debug!("Dropping message for closed stream");
    }
    Ok(())
}

/// Send `message` to each target without waiting on slow readers
fn fan_out(targets: Vec<(PlayerId, SharedWriter)>, message: &ServerMessage, metrics: &Arc<Metrics>) {
    let encoded: Arc<[u8]> = match encode(message) {
        Ok(data) => data.into(),
        Err(e) => {
            warn!("Failed to encode message for broadcast: {}", e);
            return;
        }
    };

    for (player_id, writer) in targets {
        let encoded = encoded.clone();
        let metrics = metrics.clone();
        tokio::spawn(async move {
            match write_frame(&writer, &encoded).await {
                Ok(true) => {
                    metrics.messages_sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                Ok(false) => debug!("Broadcast to {}: writer is None", player_id),
                Err(e) => debug!("Broadcast to {} failed: {}", player_id, e),
            }
        });
    }
}

/// Start the game loop background task.
///
/// Ticks at `tick_rate` Hz until `shutdown` flips to true. Shutdown is only
/// observed between ticks, so a tick in progress always completes.
pub fn start_game_loop(
    session: Arc<RwLock<GameSession>>,
    tick_rate: u32,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick_duration = Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64);
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Game loop started at {} Hz", tick_rate);
        let start = Instant::now();
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Game loop stopping after {} ticks", tick_count);
                        break;
                    }
                    continue;
                }
            }
            tick_count += 1;

            let (outcome, everyone, fallen) = {
                let mut session_guard = session.write().await;
                let outcome = session_guard.tick();
                let everyone = session_guard.writers_for(None);
                let fallen = session_guard.writers_for(Some(&outcome.fallen));
                (outcome, everyone, fallen)
            };

            for player_id in &outcome.fallen {
                debug!("Player {} fell", player_id);
            }

            fan_out(everyone, &ServerMessage::Update(outcome.snapshot), &metrics);
            if !fallen.is_empty() {
                fan_out(fallen, &ServerMessage::Death, &metrics);
            }

            // Periodic summary every 30 seconds
            if tick_count % (tick_rate.max(1) as u64 * 30) == 0 {
                let session_guard = session.read().await;
                let state = session_guard.game_loop.state();
                info!(
                    "Game: {}s, tick {}, {} players ({} alive), {} junk, {} holes alive",
                    start.elapsed().as_secs(),
                    state.tick,
                    state.players.len(),
                    state.alive_count(),
                    state.junk.len(),
                    state.alive_hole_count()
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Hole;

    fn create_test_session() -> GameSession {
        let config = GameConfig {
            seed: Some(11),
            ..GameConfig::default()
        };
        GameSession::new(config, 4, Arc::new(Metrics::new()))
    }

    fn closed_writer() -> SharedWriter {
        Arc::new(RwLock::new(None))
    }

    #[test]
    fn test_join_returns_initial() {
        let mut session = create_test_session();
        let initial = session.join("Ann".to_string(), None);

        assert_eq!(initial.arena_width, 2000.0);
        assert_eq!(initial.arena_height, 1500.0);
        assert_eq!(session.player_count(), 1);
    }

    #[test]
    fn test_no_broadcasts_before_attach() {
        let mut session = create_test_session();
        let id = session.join("Ann".to_string(), None).player_id;

        // Ticks before the writer is attached reach nobody
        session.tick();
        assert!(session.writers_for(None).is_empty());

        assert!(session.attach(id, closed_writer()));
        let everyone = session.writers_for(None);
        assert_eq!(everyone.len(), 1);
        assert_eq!(everyone[0].0, id);
    }

    #[test]
    fn test_attach_after_leave_is_refused() {
        let mut session = create_test_session();
        let id = session.join("Ann".to_string(), None).player_id;
        session.leave(id);

        assert!(!session.attach(id, closed_writer()));
        assert!(session.connections.is_empty());
    }

    #[test]
    fn test_capacity() {
        let mut session = create_test_session();
        for i in 0..4 {
            assert!(!session.is_full());
            session.join(format!("p{i}"), None);
        }
        assert!(session.is_full());
    }

    #[test]
    fn test_leave_removes_everything() {
        let mut session = create_test_session();
        let id = session.join("Ann".to_string(), None).player_id;
        session.attach(id, closed_writer());
        session.leave(id);
        assert!(session.connections.is_empty());
        assert_eq!(session.player_count(), 0);
    }

    #[test]
    fn test_tick_reports_fallen_players() {
        let mut session = create_test_session();
        let id = session.join("Ann".to_string(), None).player_id;
        let position = session.game_loop.state().get_player(id).unwrap().position;
        session.game_loop.state_mut().holes[0] = Hole::new(0, position, 40.0, 1000);

        let outcome = session.tick();
        assert_eq!(outcome.fallen, vec![id]);
        assert_eq!(outcome.snapshot.tick, session.game_loop.state().tick);
        assert_eq!(outcome.snapshot.players.len(), 1);
        assert!(!outcome.snapshot.players[0].alive);

        let initial = session.reconnect(id).unwrap();
        assert_eq!(initial.player_id, id);
        assert!(session.game_loop.state().get_player(id).unwrap().alive);
    }

    #[test]
    fn test_reconnect_unknown_player() {
        let mut session = create_test_session();
        assert!(session.reconnect(uuid::Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_send_to_closed_writer_is_silent() {
        let writer = closed_writer();
        assert!(send_to_player(&writer, &ServerMessage::Death).await.is_ok());
    }

    #[tokio::test]
    async fn test_game_loop_stops_on_shutdown() {
        let metrics = Arc::new(Metrics::new());
        let session = Arc::new(RwLock::new(GameSession::new(
            GameConfig { seed: Some(1), ..GameConfig::default() },
            4,
            metrics.clone(),
        )));
        let (tx, rx) = watch::channel(false);

        let handle = start_game_loop(session.clone(), 200, metrics, rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let ticks = session.read().await.game_loop.state().tick;
        assert!(ticks > 0);

        // No further ticks once stopped
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.read().await.game_loop.state().tick, ticks);
    }
}

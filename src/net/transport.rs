//! WebTransport server implementation
//!
//! Accepts sessions, reads length-prefixed JSON from each bidirectional
//! stream and hands decoded messages to the shared `GameSession`.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::game::constants::player::MAX_NAME_LENGTH;
use crate::game::input_buffer::InputBufferError;
use crate::game::state::PlayerId;
use crate::metrics::Metrics;
use crate::net::framing::{read_message, FramingError};
use crate::net::game_session::{send_to_player, start_game_loop, GameSession, SharedWriter};
use crate::net::protocol::{decode_client, ClientMessage, ServerMessage, SpawnData};
use crate::net::tls::TlsConfig;

/// WebTransport server
pub struct WebTransportServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    game_session: Arc<RwLock<GameSession>>,
    metrics: Arc<Metrics>,
}

impl WebTransportServer {
    /// Load TLS and build the game session
    pub async fn new(config: ServerConfig, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(&config).await?;
        let game_session = Arc::new(RwLock::new(GameSession::new(
            config.game_config(),
            config.max_players,
            metrics.clone(),
        )));

        Ok(Self {
            config,
            tls_config,
            game_session,
            metrics,
        })
    }

    /// Certificate hash for client pinning
    pub fn cert_hash(&self) -> &str {
        &self.tls_config.cert_hash
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    pub fn session(&self) -> Arc<RwLock<GameSession>> {
        self.game_session.clone()
    }

    /// Run the server until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        use wtransport::Endpoint;

        // with_bind_default listens dual-stack on all interfaces
        let server_config = wtransport::ServerConfig::builder()
            .with_bind_default(self.config.port)
            .with_identity(self.tls_config.identity)
            .build();

        let server = Endpoint::server(server_config)?;

        info!("WebTransport server listening on port {}", self.config.port);
        info!("Certificate hash: {}", self.tls_config.cert_hash);

        let game_loop = start_game_loop(
            self.game_session.clone(),
            self.config.tick_rate,
            self.metrics.clone(),
            shutdown.clone(),
        );

        loop {
            tokio::select! {
                incoming = server.accept() => {
                    let game_session = self.game_session.clone();
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(incoming, game_session, metrics).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Server shutting down");
                        break;
                    }
                }
            }
        }

        game_loop.await?;
        Ok(())
    }
}

/// Handle a single WebTransport connection
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    game_session: Arc<RwLock<GameSession>>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;

    debug!(
        "New connection from: {:?}, path: {}",
        session_request.authority(),
        session_request.path()
    );

    let connection = session_request.accept().await?;
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);

    // Set once this connection spawns a player
    let player_id: Arc<RwLock<Option<PlayerId>>> = Arc::new(RwLock::new(None));

    loop {
        match connection.accept_bi().await {
            Ok((send, recv)) => {
                debug!("Accepted bidirectional stream");
                let writer: SharedWriter = Arc::new(RwLock::new(Some(send)));

                tokio::spawn(handle_stream(
                    recv,
                    writer,
                    player_id.clone(),
                    game_session.clone(),
                    metrics.clone(),
                ));
            }
            Err(e) => {
                debug!("Stream accept error: {}", e);
                break;
            }
        }
    }

    if let Some(pid) = *player_id.read().await {
        debug!("Connection closed, removing player {}", pid);
        game_session.write().await.leave(pid);
    }
    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);

    Ok(())
}

/// Read messages from one stream until it closes
async fn handle_stream(
    mut recv: wtransport::RecvStream,
    writer: SharedWriter,
    player_id: Arc<RwLock<Option<PlayerId>>>,
    game_session: Arc<RwLock<GameSession>>,
    metrics: Arc<Metrics>,
) {
    loop {
        let frame = match read_message(&mut recv).await {
            Ok(frame) => frame,
            Err(FramingError::MessageTooLarge(len, _)) => {
                warn!("Rejected oversized message: {} bytes", len);
                break;
            }
            Err(e) => {
                debug!("Stream read error: {}", e);
                break;
            }
        };
        metrics.messages_received.fetch_add(1, Ordering::Relaxed);

        let client_msg = match decode_client(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to decode client message: {}", e);
                continue;
            }
        };

        match client_msg {
            ClientMessage::Spawn(SpawnData { name, country }) => {
                let Some(name) = sanitize_player_name(&name) else {
                    warn!("Rejecting player with empty/invalid name");
                    continue;
                };
                let country = country.as_deref().and_then(sanitize_country);
                match spawn_player(&player_id, &game_session, &writer, name, country).await {
                    Ok(Some(pid)) => debug!("Stream bound to player {}", pid),
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to send initial: {}", e);
                        break;
                    }
                }
            }

            ClientMessage::KeyHandler(key) => {
                let Some(pid) = *player_id.read().await else {
                    continue;
                };
                let Some(input) = key.to_input() else {
                    debug!("Ignoring key code {}", key.key);
                    continue;
                };

                let sender = game_session.read().await.input_sender();
                match sender.try_send(pid, input) {
                    Ok(()) => {}
                    Err(InputBufferError::Full) => {
                        metrics.messages_dropped.fetch_add(1, Ordering::Relaxed);
                        debug!("Input buffer full, dropped key from {}", pid);
                    }
                    Err(InputBufferError::Disconnected) => break,
                }
            }

            ClientMessage::Reconnect(_) => {
                let Some(pid) = *player_id.read().await else {
                    continue;
                };
                let initial = game_session.write().await.reconnect(pid);
                match initial {
                    Some(initial) => {
                        if let Err(e) = send_to_player(&writer, &ServerMessage::Initial(initial)).await {
                            warn!("Failed to send initial: {}", e);
                            break;
                        }
                    }
                    None => debug!("Reconnect for unknown player {}", pid),
                }
            }
        }
    }

    // Further broadcasts to this stream become no-ops
    *writer.write().await = None;

    if let Some(pid) = *player_id.read().await {
        debug!("Player {} stream closed, removing from game", pid);
        game_session.write().await.leave(pid);
    }
}

/// Join a player for this connection unless it already has one.
///
/// `bound` stays write-locked from the check until the writer is attached, so
/// concurrent spawns on one connection create a single player. The writer is
/// attached only after `initial` is written, so no `update` can precede it.
/// Returns the new player's id, or `None` if the spawn was ignored.
async fn spawn_player(
    bound: &RwLock<Option<PlayerId>>,
    game_session: &RwLock<GameSession>,
    writer: &SharedWriter,
    name: String,
    country: Option<String>,
) -> Result<Option<PlayerId>, FramingError> {
    let mut bound = bound.write().await;
    if bound.is_some() {
        debug!("Ignoring repeated spawn from '{}'", name);
        return Ok(None);
    }

    let initial = {
        let mut session = game_session.write().await;
        if session.is_full() {
            warn!("Rejecting '{}': server full", name);
            return Ok(None);
        }
        session.join(name, country)
    };
    // Set before sending so a failed send still removes the player on close
    *bound = Some(initial.player_id);

    send_to_player(writer, &ServerMessage::Initial(initial)).await?;
    if !game_session.write().await.attach(initial.player_id, writer.clone()) {
        debug!("Player {} left before its stream was attached", initial.player_id);
    }
    Ok(Some(initial.player_id))
}

/// Trim, strip control and markup characters, cap the length, collapse
/// whitespace. `None` if nothing printable is left.
pub fn sanitize_player_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .filter(|c| *c != '<' && *c != '>' && *c != '&')
        .take(MAX_NAME_LENGTH)
        .collect();

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Country codes are two ASCII letters, stored upper-case
fn sanitize_country(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then(|| code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_trims_and_collapses() {
        assert_eq!(sanitize_player_name("  Ann   Lee  ").as_deref(), Some("Ann Lee"));
    }

    #[test]
    fn test_sanitize_strips_markup_and_control() {
        assert_eq!(sanitize_player_name("<b>Bob</b>\u{7}").as_deref(), Some("bBob/b"));
        assert_eq!(sanitize_player_name("a&b").as_deref(), Some("ab"));
    }

    #[test]
    fn test_sanitize_caps_length() {
        let name = sanitize_player_name(&"x".repeat(40)).unwrap();
        assert_eq!(name.chars().count(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(sanitize_player_name("").is_none());
        assert!(sanitize_player_name("   ").is_none());
        assert!(sanitize_player_name("<>&").is_none());
    }

    #[test]
    fn test_sanitize_country() {
        assert_eq!(sanitize_country("de").as_deref(), Some("DE"));
        assert!(sanitize_country("DEU").is_none());
        assert!(sanitize_country("1a").is_none());
    }

    fn test_session(max_players: usize) -> RwLock<GameSession> {
        let config = crate::config::GameConfig {
            seed: Some(5),
            ..crate::config::GameConfig::default()
        };
        RwLock::new(GameSession::new(config, max_players, Arc::new(Metrics::new())))
    }

    fn closed_writer() -> SharedWriter {
        Arc::new(RwLock::new(None))
    }

    #[tokio::test]
    async fn test_spawn_binds_and_attaches() {
        let bound = RwLock::new(None);
        let session = test_session(4);
        let writer = closed_writer();

        let pid = spawn_player(&bound, &session, &writer, "Ann".to_string(), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*bound.read().await, Some(pid));
        let session = session.read().await;
        assert!(session.connections.contains_key(&pid));
        assert_eq!(session.player_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_spawns_make_one_player() {
        let bound = RwLock::new(None);
        let session = test_session(4);
        let first = closed_writer();
        let second = closed_writer();

        let (a, b) = tokio::join!(
            spawn_player(&bound, &session, &first, "Ann".to_string(), None),
            spawn_player(&bound, &session, &second, "Ann".to_string(), None),
        );
        let spawned: Vec<PlayerId> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();

        assert_eq!(spawned.len(), 1);
        assert_eq!(*bound.read().await, Some(spawned[0]));
        let session = session.read().await;
        assert_eq!(session.player_count(), 1);
        assert_eq!(session.connections.len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_refused_when_full() {
        let bound = RwLock::new(None);
        let session = test_session(1);
        session.write().await.join("Bob".to_string(), None);

        let result = spawn_player(&bound, &session, &closed_writer(), "Ann".to_string(), None).await;

        assert_eq!(result.unwrap(), None);
        assert!(bound.read().await.is_none());
        assert_eq!(session.read().await.player_count(), 1);
    }

    #[tokio::test]
    async fn test_server_requires_certificate() {
        let config = ServerConfig {
            tls_cert_path: Some("/nonexistent/cert.pem".to_string()),
            tls_key_path: Some("/nonexistent/key.pem".to_string()),
            ..ServerConfig::default()
        };
        let result = WebTransportServer::new(config, Arc::new(Metrics::new())).await;
        assert!(result.is_err());
    }
}

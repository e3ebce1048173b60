//! Prometheus-compatible metrics endpoint
//!
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::game_loop::GameLoopEvent;
use crate::game::state::GameState;

/// Tick samples kept for percentiles
const TICK_HISTORY: usize = 1000;

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // World gauges
    pub players: AtomicU64,
    pub alive_players: AtomicU64,
    pub junk_count: AtomicU64,
    pub holes_alive: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Gameplay counters
    pub junk_sunk: AtomicU64,
    pub player_falls: AtomicU64,
    pub knockouts: AtomicU64,
    pub holes_respawned: AtomicU64,

    // Network
    pub connections_active: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub messages_dropped: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            players: AtomicU64::new(0),
            alive_players: AtomicU64::new(0),
            junk_count: AtomicU64::new(0),
            holes_alive: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            junk_sunk: AtomicU64::new(0),
            player_falls: AtomicU64::new(0),
            knockouts: AtomicU64::new(0),
            holes_respawned: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Refresh world gauges from the current state
    pub fn observe_state(&self, state: &GameState) {
        self.players.store(state.players.len() as u64, Ordering::Relaxed);
        self.alive_players.store(state.alive_count() as u64, Ordering::Relaxed);
        self.junk_count.store(state.junk.len() as u64, Ordering::Relaxed);
        self.holes_alive.store(state.alive_hole_count() as u64, Ordering::Relaxed);
    }

    /// Count gameplay events from one tick
    pub fn observe_events(&self, events: &[GameLoopEvent]) {
        for event in events {
            match event {
                GameLoopEvent::JunkSunk { .. } => {
                    self.junk_sunk.fetch_add(1, Ordering::Relaxed);
                }
                GameLoopEvent::PlayerFell { .. } => {
                    self.player_falls.fetch_add(1, Ordering::Relaxed);
                }
                GameLoopEvent::KnockOut { .. } => {
                    self.knockouts.fetch_add(1, Ordering::Relaxed);
                }
                GameLoopEvent::HoleRespawned { .. } => {
                    self.holes_respawned.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                let _ = write!(
                    output,
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                );
            };
        }

        metric!("bumper_players", "Connected players", "gauge",
            self.players.load(Ordering::Relaxed));
        metric!("bumper_players_alive", "Players still in play", "gauge",
            self.alive_players.load(Ordering::Relaxed));
        metric!("bumper_junk", "Junk on the field", "gauge",
            self.junk_count.load(Ordering::Relaxed));
        metric!("bumper_holes_alive", "Collidable holes", "gauge",
            self.holes_alive.load(Ordering::Relaxed));

        metric!("bumper_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("bumper_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("bumper_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("bumper_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("bumper_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("bumper_junk_sunk_total", "Junk knocked into holes", "counter",
            self.junk_sunk.load(Ordering::Relaxed));
        metric!("bumper_player_falls_total", "Players lost to holes", "counter",
            self.player_falls.load(Ordering::Relaxed));
        metric!("bumper_knockouts_total", "Falls credited to a bumping player", "counter",
            self.knockouts.load(Ordering::Relaxed));
        metric!("bumper_holes_respawned_total", "Hole respawns", "counter",
            self.holes_respawned.load(Ordering::Relaxed));

        metric!("bumper_connections_active", "Active WebTransport connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("bumper_messages_sent_total", "Total messages sent", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("bumper_messages_received_total", "Total messages received", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("bumper_messages_dropped_total", "Inbound messages dropped", "counter",
            self.messages_dropped.load(Ordering::Relaxed));
        metric!("bumper_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// JSON view of the same numbers
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "players": {
                "total": self.players.load(Ordering::Relaxed),
                "alive": self.alive_players.load(Ordering::Relaxed),
            },
            "world": {
                "junk": self.junk_count.load(Ordering::Relaxed),
                "holes_alive": self.holes_alive.load(Ordering::Relaxed),
                "junk_sunk": self.junk_sunk.load(Ordering::Relaxed),
                "player_falls": self.player_falls.load(Ordering::Relaxed),
                "knockouts": self.knockouts.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
            },
            "network": {
                "connections": self.connections_active.load(Ordering::Relaxed),
                "messages_sent": self.messages_sent.load(Ordering::Relaxed),
                "messages_received": self.messages_received.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Route a raw HTTP request line to a response
fn respond(metrics: &Metrics, request: &str) -> String {
    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        http_response("application/json", &metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        http_response("text/plain", "OK")
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];
            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = respond(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Failed to read from metrics socket {}: {}", peer, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::game_loop::GameLoop;
    use uuid::Uuid;

    #[test]
    fn test_record_tick_time() {
        let metrics = Metrics::new();
        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) >= 1000);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_history_is_bounded() {
        let metrics = Metrics::new();
        for _ in 0..(TICK_HISTORY + 50) {
            metrics.record_tick_time(Duration::from_micros(5));
        }
        assert_eq!(metrics.tick_history.read().len(), TICK_HISTORY);
    }

    #[test]
    fn test_observe_state_and_events() {
        let metrics = Metrics::new();
        let mut game = GameLoop::new(GameConfig { seed: Some(9), ..GameConfig::default() });
        game.spawn_player("Ann".to_string(), None);
        metrics.observe_state(game.state());

        assert_eq!(metrics.players.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.junk_count.load(Ordering::Relaxed), 10);
        assert_eq!(metrics.holes_alive.load(Ordering::Relaxed), 10);

        metrics.observe_events(&[
            GameLoopEvent::JunkSunk { hole_id: 0, scorer: None, points: 0 },
            GameLoopEvent::JunkReplenished { count: 1 },
            GameLoopEvent::KnockOut { scorer: Uuid::new_v4(), victim: Uuid::new_v4(), points: 500 },
        ]);
        assert_eq!(metrics.junk_sunk.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.knockouts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.players.store(7, Ordering::Relaxed);

        let output = metrics.to_prometheus();
        assert!(output.contains("# TYPE bumper_players gauge"));
        assert!(output.contains("bumper_players 7"));
        assert!(output.contains("bumper_junk_sunk_total 0"));
    }

    #[test]
    fn test_json_is_valid() {
        let metrics = Metrics::new();
        metrics.connections_active.store(3, Ordering::Relaxed);
        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(value["network"]["connections"], 3);
    }

    #[test]
    fn test_routes() {
        let metrics = Metrics::new();
        assert!(respond(&metrics, "GET /metrics HTTP/1.1").contains("bumper_tick_count"));
        assert!(respond(&metrics, "GET /metrics/json HTTP/1.1").contains("application/json"));
        assert!(respond(&metrics, "GET /health HTTP/1.1").ends_with("OK"));
        assert!(respond(&metrics, "GET /nope HTTP/1.1").starts_with("HTTP/1.1 404"));
    }
}

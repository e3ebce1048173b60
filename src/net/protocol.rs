//! JSON wire messages
//!
//! Every message is an object `{"type": ..., "data": ...}`. Server variants
//! without a payload omit `data` when encoded; `reconnect` always carries
//! `"data": null`. Decoding accepts `data` as null or missing for both.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::game::constants::network::MAX_MESSAGE_SIZE;
use crate::game::input_buffer::{Key, KeyInput};
use crate::game::state::{GameState, Hole, Junk, Player, PlayerId};
use crate::util::vec2::Vec2;

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// A steering key went down or up
    KeyHandler(KeyData),
    /// Join the arena
    Spawn(SpawnData),
    /// Come back after dying
    Reconnect(NoData),
}

/// Empty payload, encoded as `null`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoData;

impl Serialize for NoData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }
}

impl<'de> Deserialize<'de> for NoData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing `data` field arrives here as `None`
        Option::<IgnoredAny>::deserialize(deserializer).map(|_| NoData)
    }
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once a player exists: who you are and how big the world is
    Initial(InitialData),
    /// Whole-world snapshot
    Update(UpdateData),
    /// You fell into a hole
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    /// Browser key code
    pub key: u32,
    pub pressed: bool,
}

impl KeyData {
    pub fn from_input(input: KeyInput) -> Self {
        Self {
            key: input.key.code(),
            pressed: input.pressed,
        }
    }

    /// `None` for keys the game does not use
    pub fn to_input(self) -> Option<KeyInput> {
        Key::from_code(self.key).map(|key| KeyInput {
            key,
            pressed: self.pressed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    pub arena_width: f32,
    pub arena_height: f32,
}

/// Player as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerWire {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub velocity: Option<Vec2>,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub alive: bool,
}

impl PlayerWire {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            country: player.country.clone(),
            position: Some(player.position),
            velocity: Some(player.velocity),
            angle: player.heading,
            color: player.color.clone(),
            points: player.points,
            alive: player.alive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunkWire {
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub velocity: Option<Vec2>,
    #[serde(default)]
    pub color: String,
}

impl JunkWire {
    pub fn from_junk(junk: &Junk) -> Self {
        Self {
            position: Some(junk.position),
            velocity: Some(junk.velocity),
            color: junk.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleWire {
    #[serde(default)]
    pub position: Option<Vec2>,
    #[serde(default)]
    pub radius: f32,
    #[serde(rename = "isAlive", default)]
    pub is_alive: bool,
}

impl HoleWire {
    pub fn from_hole(hole: &Hole) -> Self {
        Self {
            position: Some(hole.position),
            radius: hole.radius,
            is_alive: hole.is_alive(),
        }
    }
}

/// Whole-world snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateData {
    /// Simulation tick the snapshot was taken at; lets clients drop stale frames
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub junk: Vec<JunkWire>,
    #[serde(default)]
    pub holes: Vec<HoleWire>,
    #[serde(default)]
    pub players: Vec<PlayerWire>,
}

impl UpdateData {
    pub fn from_game_state(state: &GameState) -> Self {
        Self {
            tick: state.tick,
            junk: state.junk.iter().map(JunkWire::from_junk).collect(),
            holes: state.holes.iter().map(HoleWire::from_hole).collect(),
            players: state.players.iter().map(PlayerWire::from_player).collect(),
        }
    }
}

impl ServerMessage {
    /// Reject payloads the simulation or viewport cannot use
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ServerMessage::Initial(data) => {
                let valid = |v: f32| v.is_finite() && v > 0.0;
                if !valid(data.arena_width) || !valid(data.arena_height) {
                    return Err(ProtocolError::Invalid(format!(
                        "arena must be positive, got {}x{}",
                        data.arena_width, data.arena_height
                    )));
                }
                Ok(())
            }
            ServerMessage::Update(data) => {
                if let Some(hole) = data.holes.iter().find(|h| !h.radius.is_finite() || h.radius < 0.0) {
                    return Err(ProtocolError::Invalid(format!("hole radius {}", hole.radius)));
                }
                Ok(())
            }
            ServerMessage::Death => Ok(()),
        }
    }
}

impl ClientMessage {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMessage::Spawn(data) if data.name.trim().is_empty() => {
                Err(ProtocolError::Invalid("empty player name".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Encode a message as JSON
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decode a JSON message
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    serde_json::from_slice(data).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Decode and validate a server message
pub fn decode_server(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let message: ServerMessage = decode(data)?;
    message.validate()?;
    Ok(message)
}

/// Decode and validate a client message
pub fn decode_client(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let message: ClientMessage = decode(data)?;
    message.validate()?;
    Ok(message)
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Invalid message: {0}")]
    Invalid(String),
    #[error("Message too large: {0} bytes")]
    TooLarge(usize),
}

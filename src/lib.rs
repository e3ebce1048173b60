//! Bumper arena server library
//!
//! A real-time multiplayer arena over WebTransport: players steer round
//! craft, knock junk into growing holes for points and try not to fall in
//! themselves.
//!
//! The simulation in [`game`] is transport-agnostic and can be driven by the
//! server in [`net`] or stepped locally. [`client`] holds the render-side core:
//! whole-snapshot application, the player-centred viewport and the outbox.

pub mod client;
pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod util;

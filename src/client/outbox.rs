//! Outbound client messages
//!
//! Sends go straight to the transport when it is open and are dropped when it
//! is not. Nothing is queued: key state is re-sent on the next edge anyway.

use std::io;

use thiserror::Error;
use tracing::debug;

use crate::game::input_buffer::KeyInput;
use crate::net::protocol::{encode, ClientMessage, KeyData, NoData, ProtocolError, SpawnData};

/// The client's connection to the server
pub trait Transport {
    fn is_open(&self) -> bool;
    fn send_text(&self, text: &str) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),
}

/// What happened to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Transport was closed
    Dropped,
}

pub struct Outbox<T: Transport> {
    transport: T,
}

impl<T: Transport> Outbox<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn send(&self, message: &ClientMessage) -> Result<Delivery, OutboxError> {
        if !self.transport.is_open() {
            debug!("Transport closed, dropping {:?}", message);
            return Ok(Delivery::Dropped);
        }
        let encoded = encode(message)?;
        // serde_json only ever produces UTF-8
        let text = String::from_utf8_lossy(&encoded);
        self.transport.send_text(&text)?;
        Ok(Delivery::Sent)
    }

    pub fn key(&self, input: KeyInput) -> Result<Delivery, OutboxError> {
        self.send(&ClientMessage::KeyHandler(KeyData::from_input(input)))
    }

    pub fn spawn(&self, name: &str, country: Option<&str>) -> Result<Delivery, OutboxError> {
        self.send(&ClientMessage::Spawn(SpawnData {
            name: name.to_string(),
            country: country.map(str::to_string),
        }))
    }

    pub fn reconnect(&self) -> Result<Delivery, OutboxError> {
        self.send(&ClientMessage::Reconnect(NoData))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::input_buffer::Key;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory transport that records what it was given
    #[derive(Default)]
    pub struct RecordingTransport {
        pub open: AtomicBool,
        pub sent: Mutex<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn is_open(&self) -> bool {
            self.open.load(Ordering::Relaxed)
        }

        fn send_text(&self, text: &str) -> io::Result<()> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_closed_transport_drops_silently() {
        let outbox = Outbox::new(RecordingTransport::default());
        let delivery = outbox.key(KeyInput { key: Key::Up, pressed: true }).unwrap();
        assert_eq!(delivery, Delivery::Dropped);
        assert!(outbox.transport().sent.lock().is_empty());
    }

    #[test]
    fn test_open_transport_sends_json() {
        let transport = RecordingTransport::default();
        transport.open.store(true, Ordering::Relaxed);
        let outbox = Outbox::new(transport);

        assert_eq!(outbox.key(KeyInput { key: Key::Left, pressed: true }).unwrap(), Delivery::Sent);
        assert_eq!(outbox.reconnect().unwrap(), Delivery::Sent);

        let sent = outbox.transport().sent.lock();
        assert_eq!(sent[0], r#"{"type":"keyHandler","data":{"key":37,"pressed":true}}"#);
        assert_eq!(sent[1], r#"{"type":"reconnect","data":null}"#);
    }

    #[test]
    fn test_nothing_queued_across_reopen() {
        let outbox = Outbox::new(RecordingTransport::default());
        outbox.spawn("Ann", None).unwrap();

        outbox.transport().open.store(true, Ordering::Relaxed);
        outbox.spawn("Bob", Some("DE")).unwrap();

        let sent = outbox.transport().sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Bob"));
    }
}

//! Socket collaborator interface
//!
//! A [`Socket`] is one bidirectional message channel towards a single
//! signaling server. It never reports results synchronously: connection
//! state and inbound frames are pushed into the [`SocketEvents`] handle it
//! receives from [`Socket::connect`].

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// A frame received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// Events a socket reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The socket is open and ready to carry messages
    Connected,
    /// The socket closed or failed to open
    Disconnected {
        /// `true` when the close was not a clean one
        error: bool,
        code: Option<u16>,
        reason: Option<String>,
    },
    /// A frame arrived
    Data(Frame),
}

/// Handle a socket uses to report events
///
/// Each handle is tied to one binding. Once the owner unbinds, whatever the
/// socket keeps emitting through an old handle is discarded.
#[derive(Clone)]
pub struct SocketEvents {
    binding: u64,
    tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
}

impl SocketEvents {
    pub(crate) fn new(binding: u64, tx: mpsc::UnboundedSender<(u64, SocketEvent)>) -> Self {
        Self { binding, tx }
    }

    /// Report an event; returns `false` once the owner is gone
    pub fn emit(&self, event: SocketEvent) -> bool {
        self.tx.send((self.binding, event)).is_ok()
    }

    pub fn connected(&self) -> bool {
        self.emit(SocketEvent::Connected)
    }

    pub fn disconnected(&self, error: bool, code: Option<u16>, reason: Option<String>) -> bool {
        self.emit(SocketEvent::Disconnected { error, code, reason })
    }

    pub fn data(&self, frame: Frame) -> bool {
        self.emit(SocketEvent::Data(frame))
    }
}

impl fmt::Debug for SocketEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketEvents")
            .field("binding", &self.binding)
            .finish()
    }
}

/// One message channel towards a signaling server
#[async_trait]
pub trait Socket: Send + Sync + fmt::Debug {
    /// Transport token used in Via headers (`WSS`, `WS`, ...)
    fn via_transport(&self) -> &str;

    /// Server URL
    fn url(&self) -> &str;

    /// Canonical SIP URI of the server
    fn sip_uri(&self) -> &str;

    /// Start opening the channel; the outcome is reported through `events`
    async fn connect(&self, events: SocketEvents);

    /// Close the channel
    async fn disconnect(&self);

    /// Write a text message, returning whether it was accepted
    async fn send(&self, message: &str) -> bool;
}

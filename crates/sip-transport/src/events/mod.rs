//! Transport event system
//!
//! Consumers subscribe to a broadcast stream of [`TransportEvent`]s and
//! unsubscribe by dropping the receiver.

use tokio::sync::broadcast;

/// Events emitted by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection attempt towards `url` started
    Connecting {
        url: String,
        /// Reconnection attempts made so far
        attempts: u32,
    },
    /// The active socket is open
    Connected { url: String },
    /// The transport lost or closed its connection
    Disconnected {
        url: String,
        error: bool,
        code: Option<u16>,
        reason: Option<String>,
        /// `true` when the application asked for the disconnect
        requested: bool,
    },
    /// A text message arrived from the server
    Data { message: String },
}

/// Broadcast emitter shared by the transport handle and its control task
#[derive(Debug, Clone)]
pub struct TransportEventEmitter {
    sender: broadcast::Sender<TransportEvent>,
}

impl TransportEventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event; having no subscriber is fine
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

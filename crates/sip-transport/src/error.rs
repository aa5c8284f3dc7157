//! Error types for the signaling transport

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while building or driving a [`Transport`](crate::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was built without any endpoint
    #[error("Invalid argument: at least one endpoint is required")]
    NoEndpoints,

    /// An endpoint weight is negative or not a finite number
    #[error("Invalid argument: endpoint weight {weight} for {url} is not a finite, non-negative number")]
    InvalidWeight { url: String, weight: f64 },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The transport control task is gone
    #[error("Transport control task is not running")]
    ChannelClosed,

    /// Socket level error
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// WebSocket handshake or framing error
    #[cfg(feature = "ws")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl TransportError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a socket error
    pub fn socket(message: impl Into<String>) -> Self {
        Self::Socket {
            message: message.into(),
        }
    }
}

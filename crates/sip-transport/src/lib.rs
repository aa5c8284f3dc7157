//! SIP signaling transport for the confsig stack
//!
//! This crate keeps a single logical signaling connection alive on top of a
//! set of candidate servers. It chooses among them by weight, reconnects with
//! randomized exponential backoff when the connection drops, and probes the
//! connection with CRLF keepalives.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use confsig_sip_transport::prelude::*;
//!
//! # async fn example() -> confsig_sip_transport::Result<()> {
//! let primary = Arc::new(WebSocketSocket::new("wss://edge-1.example.com/ws")?);
//! let backup = Arc::new(WebSocketSocket::new("wss://edge-2.example.com/ws")?);
//!
//! let transport = Transport::new(
//!     vec![Endpoint::new(primary, 10.0)?, Endpoint::new(backup, 5.0)?],
//!     TransportConfig::default(),
//! )?;
//!
//! let mut events = transport.subscribe();
//! transport.connect().await?;
//! while let Ok(event) = events.recv().await {
//!     if let TransportEvent::Data { message } = event {
//!         println!("received {}", message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod socket;
pub mod transport;

#[cfg(test)]
mod tests;

pub use config::{EndpointConfig, KeepAliveConfig, RecoveryOptions, TransportConfig};
pub use endpoint::{Endpoint, EndpointSet, EndpointStatus};
pub use error::{Result, TransportError};
pub use events::{TransportEvent, TransportEventEmitter};
pub use socket::{Frame, Socket, SocketEvent, SocketEvents};
pub use transport::{Transport, TransportSnapshot, TransportStatus, KEEP_ALIVE_ACK, KEEP_ALIVE_PROBE};
#[cfg(feature = "ws")]
pub use transport::ws::WebSocketSocket;

/// Build WebSocket endpoints from configuration entries
#[cfg(feature = "ws")]
pub fn websocket_endpoints(configs: &[EndpointConfig]) -> Result<Vec<Endpoint>> {
    configs
        .iter()
        .map(|config| {
            let socket = std::sync::Arc::new(WebSocketSocket::new(config.url.clone())?);
            Endpoint::new(socket, config.weight)
        })
        .collect()
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        Endpoint, EndpointConfig, Frame, RecoveryOptions, Result, Socket, SocketEvent, SocketEvents, Transport,
        TransportConfig, TransportError, TransportEvent, TransportStatus,
    };
    #[cfg(feature = "ws")]
    pub use crate::{websocket_endpoints, WebSocketSocket};
}

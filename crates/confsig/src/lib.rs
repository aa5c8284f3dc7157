//! # confsig - SIP conferencing signaling client
//!
//! The client is made of two layers:
//!
//! - [`sip_transport`]: one logical signaling connection over a weighted set
//!   of servers, with backoff reconnection and CRLF keepalives
//! - [`conference_core`]: the conference document protocol, the command
//!   codec and the join orchestrator, driven through a SIP user agent
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use confsig::prelude::*;
//!
//! # async fn example(agent: Arc<dyn SignalingAgent>) -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let endpoints = websocket_endpoints(&[
//!     EndpointConfig::new("wss://edge-1.example.com/ws").with_weight(10.0),
//!     EndpointConfig::new("wss://edge-2.example.com/ws").with_weight(5.0),
//! ])?;
//! let transport = Transport::new(endpoints, TransportConfig::default())?;
//! transport.connect().await?;
//!
//! let conference = Conference::new(agent, ConferenceConfig::default())?;
//! conference.dial_in("800123", "4321").await?;
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]

pub use confsig_conference_core as conference_core;
pub use confsig_sip_transport as sip_transport;

/// Common imports for confsig applications
pub mod prelude {
    pub use crate::conference_core::prelude::*;
    pub use crate::sip_transport::prelude::*;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

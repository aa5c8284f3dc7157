//! Transport configuration
//!
//! Every tunable of the transport lives in a typed structure with a default
//! and a `validate()` step. Durations are expressed in whole seconds, the
//! same way the server side of the service expresses them.
//!
//! ```rust
//! use confsig_sip_transport::config::{TransportConfig, RecoveryOptions};
//!
//! let config = TransportConfig::new()
//!     .with_recovery(RecoveryOptions::new(2, 10))
//!     .with_keep_alive_interval(15);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.recovery.max_interval_secs, 10);
//! assert_eq!(config.keep_alive.interval_secs, 15);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// Default lower bound between two reconnection attempts
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 2;
/// Default upper bound between two reconnection attempts
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 30;
/// Default base keepalive interval
pub const DEFAULT_KEEP_ALIVE_INTERVAL_SECS: u64 = 5;
/// Default time to wait for the keepalive acknowledgment
pub const DEFAULT_KEEP_ALIVE_TIMEOUT_SECS: u64 = 10;

/// Bounds applied to the randomized reconnection backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryOptions {
    /// Minimum interval in seconds between recover attempts
    pub min_interval_secs: u64,
    /// Maximum interval in seconds between recover attempts
    pub max_interval_secs: u64,
}

impl RecoveryOptions {
    pub fn new(min_interval_secs: u64, max_interval_secs: u64) -> Self {
        Self {
            min_interval_secs,
            max_interval_secs,
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    /// Check the bounds
    pub fn validate(&self) -> Result<()> {
        if self.min_interval_secs == 0 {
            return Err(TransportError::config("recovery min_interval must be at least 1 second"));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(TransportError::config(format!(
                "recovery min_interval ({}) exceeds max_interval ({})",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        Ok(())
    }
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

/// Keepalive probe settings
///
/// An `interval_secs` of zero turns keepalives off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Base interval; each probe fires somewhere in `[0.8, 1.0]` of it
    pub interval_secs: u64,
    /// How long to wait for the bare CRLF acknowledgment
    pub timeout_secs: u64,
}

impl KeepAliveConfig {
    pub fn is_enabled(&self) -> bool {
        self.interval_secs > 0
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_enabled() && self.timeout_secs == 0 {
            return Err(TransportError::config("keepalive timeout must be at least 1 second"));
        }
        Ok(())
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_KEEP_ALIVE_INTERVAL_SECS,
            timeout_secs: DEFAULT_KEEP_ALIVE_TIMEOUT_SECS,
        }
    }
}

/// One configured signaling server
///
/// Mirrors the `servers` entries an application hands over: either a bare
/// URL or a URL with a selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// WebSocket URL of the signaling server
    pub url: String,
    /// Selection weight; higher wins, ties are broken at random
    #[serde(default)]
    pub weight: f64,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            weight: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Complete transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Reconnection backoff bounds
    pub recovery: RecoveryOptions,
    /// Keepalive probing
    pub keep_alive: KeepAliveConfig,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recovery(mut self, recovery: RecoveryOptions) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_keep_alive_interval(mut self, interval_secs: u64) -> Self {
        self.keep_alive.interval_secs = interval_secs;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.recovery.validate()?;
        self.keep_alive.validate()?;
        if self.event_capacity == 0 {
            return Err(TransportError::config("event_capacity must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recovery: RecoveryOptions::default(),
            keep_alive: KeepAliveConfig::default(),
            event_capacity: 256,
        }
    }
}

//! Conference configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConferenceError, ConferenceResult};

/// Default lifetime of the conference event subscription
pub const DEFAULT_SUBSCRIPTION_EXPIRES_SECS: u32 = 3600;
/// Default time a deferred command may stay pending
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
/// Default capacity of the conference event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Conference behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConferenceConfig {
    /// `Expires` of the conference event subscription, in seconds
    pub subscription_expires: u32,
    /// How long a command answered with `pending` may wait for its
    /// completion, in seconds; `None` waits until disconnect
    pub command_timeout_secs: Option<u64>,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl ConferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription_expires(mut self, secs: u32) -> Self {
        self.subscription_expires = secs;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout_secs = timeout.map(|t| t.as_secs());
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConferenceResult<()> {
        if self.subscription_expires == 0 {
            return Err(ConferenceError::config("subscription_expires must be greater than zero"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(ConferenceError::config("command_timeout must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(ConferenceError::config("event_capacity must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ConferenceConfig {
    fn default() -> Self {
        Self {
            subscription_expires: DEFAULT_SUBSCRIPTION_EXPIRES_SECS,
            command_timeout_secs: Some(DEFAULT_COMMAND_TIMEOUT_SECS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConferenceConfig::default();
        assert_eq!(config.subscription_expires, 3600);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(ConferenceConfig::new().with_subscription_expires(0).validate().is_err());
        assert!(ConferenceConfig::new()
            .with_command_timeout(Some(Duration::ZERO))
            .validate()
            .is_err());
        assert!(ConferenceConfig::new().with_event_capacity(0).validate().is_err());
        assert!(ConferenceConfig::new().with_command_timeout(None).validate().is_ok());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ConferenceConfig = serde_json::from_str(r#"{"command_timeout_secs": null}"#).unwrap();
        assert_eq!(config.command_timeout(), None);
        assert_eq!(config.subscription_expires, 3600);
    }
}

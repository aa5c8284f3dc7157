//! Error types for the conference layer

use thiserror::Error;

use crate::info::Description;
use crate::xml::Element;

/// Result type for conference operations
pub type ConferenceResult<T> = Result<T, ConferenceError>;

/// Errors surfaced by the conference layer
///
/// Protocol problems with inbound documents (stale versions, foreign
/// entities, malformed notifications) never show up here: they are dropped
/// and logged. Only command and join failures reach the caller.
#[derive(Debug, Clone, Error)]
pub enum ConferenceError {
    /// XML could not be read or written
    #[error("XML error: {message}")]
    Xml { message: String },

    /// A reply that must carry a body came without one
    #[error("Missing content")]
    MissingContent,

    /// A reply body is not the expected document
    #[error("Parse response failed: {message}")]
    ParseResponse { message: String },

    /// The redirect probe was refused
    ///
    /// A `480` carries the conference description decoded from the reply.
    #[error("Join refused with {status_code} {reason}")]
    Redirect {
        status_code: u16,
        reason: String,
        description: Option<Box<Description>>,
    },

    /// The redirect offered no join target
    #[error("No conference found for {target}")]
    NotFound { target: String },

    /// The server answered a command with `failure`
    #[error("Command failed: {cause}")]
    Command { cause: String, result: Option<Element> },

    /// The session layer rejected a request
    #[error("SIP failure {status_code} {reason}")]
    SessionFailure { status_code: u16, reason: String },

    /// The operation was abandoned because the conference went away
    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    /// A deferred command got no completion in time
    #[error("Request {request_id} timed out")]
    Timeout { request_id: String },

    /// Invalid state error
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The roster has no such user
    #[error("Missing user: {entity}")]
    MissingUser { entity: String },

    /// The user has no endpoint of the given session type
    #[error("Missing {session_type} endpoint for {entity}")]
    MissingEndpoint { entity: String, session_type: String },

    /// The user has no media with the given label
    #[error("Missing {label} media for {entity}")]
    MissingMedia { entity: String, label: String },

    /// Only `conference-view` and `conference-description` can be modified
    #[error("Unsupported key: {key}")]
    UnsupportedKey { key: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ConferenceError {
    /// Create an XML error
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Create a response parsing error
    pub fn parse_response(message: impl Into<String>) -> Self {
        Self::ParseResponse {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled { reason: reason.into() }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the error came from the remote side rejecting a command
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::Command { .. })
    }
}

//! Conference control over SIP
//!
//! Implements the client side of the conference document protocol:
//!
//! - [`xml`]: a small owned element tree used for every XML body
//! - [`command`]: the `application/conference-ctrl+xml` command envelope
//! - [`info`]: the versioned `application/conference-info+xml` document
//!   with its description, state, view and roster sections
//! - [`conference`]: the join orchestrator and the administrative commands
//! - [`session`]: the traits a SIP user agent implements to carry it all
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use confsig_conference_core::prelude::*;
//!
//! # async fn example(agent: Arc<dyn SignalingAgent>) -> ConferenceResult<()> {
//! let conference = Conference::new(agent, ConferenceConfig::default())?;
//! let mut events = conference.subscribe();
//!
//! conference.dial_in("800123", "4321").await?;
//! conference.modify_conference_lock(LockOptions::lock()).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ConferenceEvent::UserAdded(user) = event {
//!         println!("{} joined", user.entity);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod conference;
pub mod config;
pub mod error;
pub mod info;
pub mod session;
pub mod xml;

#[cfg(test)]
mod tests;

pub use command::{CommandEnvelope, OutcomeCode};
pub use conference::{Conference, ConferenceEvent, ConferencePhase};
pub use config::ConferenceConfig;
pub use error::{ConferenceError, ConferenceResult};
pub use info::{ConferenceDocument, DocumentEvent, UpdateKind, UpdateOutcome};
pub use session::{
    ChannelKind, InviteOptions, Session, SessionEvent, SessionEventSink, SignalingAgent, SipReply, SubscribeRequest,
    Subscription, SubscriptionEvent, SubscriptionEventSink,
};
pub use xml::Element;

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::conference::{
        AdmissionPolicy, AutoPromote, FilterRule, FilterState, Layout, LockOptions, MediaUpdate, Title,
    };
    pub use crate::info::{Description, Permission, User};
    pub use crate::{
        ChannelKind, Conference, ConferenceConfig, ConferenceDocument, ConferenceError, ConferenceEvent,
        ConferenceResult, Element, Session, SessionEvent, SessionEventSink, SignalingAgent, SipReply, Subscription,
        SubscriptionEvent, SubscriptionEventSink,
    };
}

//! Signaling collaborators
//!
//! The conference layer does not speak SIP itself. It drives a
//! [`SignalingAgent`] (the user agent) that can probe a target, open INVITE
//! sessions and SUBSCRIBE dialogs. Sessions and subscriptions report back
//! through the sinks handed to them, which feed the conference's sequential
//! event loop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ConferenceResult;

/// Final response to a request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SipReply {
    pub status_code: u16,
    pub reason: String,
    pub content_type: Option<String>,
    pub body: Option<String>,
    /// Contact URIs in header order
    pub contacts: Vec<String>,
}

impl SipReply {
    pub fn new(status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            status_code,
            reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body.into());
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contacts.push(contact.into());
        self
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302)
    }
}

/// The logical channels a conference keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Conference control
    Focus,
    /// Main audio and video
    Media,
    /// Application sharing
    Share,
}

/// Events of an INVITE session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The INVITE got a 2xx
    Accepted { reply: SipReply },
    /// A media session is up; carries the conference it joined and the
    /// focus URI to control it through
    Confirmed { entity: String, focus_uri: String },
    /// The INVITE failed
    Failed { reply: Option<SipReply>, cause: String },
    /// The established session ended
    Ended { cause: String },
    /// The remote side sent an in-dialog message (INFO)
    NewMessage { content_type: String, body: String },
}

/// Events of a SUBSCRIBE dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Notify { body: String },
    Failed { cause: String },
    Terminated,
}

#[derive(Debug)]
pub(crate) enum Signal {
    Session {
        kind: ChannelKind,
        generation: u64,
        event: SessionEvent,
    },
    Subscription {
        generation: u64,
        event: SubscriptionEvent,
    },
}

/// Where a session reports its events
#[derive(Clone)]
pub struct SessionEventSink {
    kind: ChannelKind,
    generation: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl SessionEventSink {
    pub(crate) fn new(kind: ChannelKind, generation: u64, tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { kind, generation, tx }
    }

    /// Channel the session belongs to
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Report an event; returns `false` once the conference is gone
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.tx
            .send(Signal::Session {
                kind: self.kind,
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

impl fmt::Debug for SessionEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEventSink")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Where a subscription reports its events
#[derive(Clone)]
pub struct SubscriptionEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl SubscriptionEventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { generation, tx }
    }

    pub fn emit(&self, event: SubscriptionEvent) -> bool {
        self.tx
            .send(Signal::Subscription {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

impl fmt::Debug for SubscriptionEventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionEventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Parameters of an outgoing INVITE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteOptions {
    pub kind: ChannelKind,
    pub target: String,
    /// Body sent instead of an SDP offer
    pub content_type: Option<String>,
    pub body: Option<String>,
}

/// Parameters of an outgoing SUBSCRIBE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub target: String,
    pub event: String,
    pub expires: u32,
    pub extra_headers: Vec<String>,
}

/// An INVITE dialog
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// Send an INFO; a non-2xx final response is returned as `Err`
    async fn send_info(&self, content_type: &str, body: &str) -> Result<SipReply, SipReply>;

    /// Hang up or cancel
    async fn terminate(&self);

    fn is_established(&self) -> bool;
}

/// A SUBSCRIBE dialog
#[async_trait]
pub trait Subscription: Send + Sync + fmt::Debug {
    async fn terminate(&self);
}

/// The user agent the conference runs on
#[async_trait]
pub trait SignalingAgent: Send + Sync {
    /// URI of the local user
    fn local_uri(&self) -> String;

    /// Send an SDP-less INVITE to `target` and return its final response
    async fn probe(&self, target: &str) -> ConferenceResult<SipReply>;

    /// Start an INVITE session; its progress is reported through `events`
    async fn invite(&self, options: InviteOptions, events: SessionEventSink) -> ConferenceResult<Arc<dyn Session>>;

    /// Start a subscription; notifications arrive through `events`
    async fn subscribe(
        &self,
        request: SubscribeRequest,
        events: SubscriptionEventSink,
    ) -> ConferenceResult<Arc<dyn Subscription>>;
}

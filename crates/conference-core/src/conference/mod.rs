//! Conference orchestrator
//!
//! A [`Conference`] joins a conference through a [`SignalingAgent`] and keeps
//! the local conference document current while joined.
//!
//! ```text
//!   dial_in(number, pin)
//!        │
//!        ├─ probe  number**pin ─────────► 301/302 Contact list
//!        ├─ INVITE media ───────────────► Confirmed { entity, focus_uri }
//!        ├─ INVITE focus (addUser) ─────► Accepted (local user entity)
//!        └─ SUBSCRIBE conference ───────► Notify ... (document updates)
//! ```
//!
//! Session and subscription events flow through one channel into a
//! dispatcher task that handles them in order. Every channel carries a
//! generation; events from a released session are dropped.
//!
//! Administrative commands are sent as INFO on the focus session. A command
//! answered with `pending` waits until a focus INFO with the same request id
//! and a terminal code arrives, the optional command timeout expires, or the
//! conference disconnects.

mod commands;
pub mod events;
pub mod types;

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use events::ConferenceEvent;
pub use types::{
    AdmissionPolicy, AutoPromote, ConferenceKey, FilterRule, FilterState, Layout, LockOptions, MediaUpdate,
    RollDirection, Title, TitlePosition, TitleType,
};

use crate::command::{self, OutcomeCode, ADD_USER};
use crate::config::ConferenceConfig;
use crate::error::{ConferenceError, ConferenceResult};
use crate::info::{self, description, ConferenceDocument, Description, DocumentEvent};
use crate::session::{
    ChannelKind, InviteOptions, Session, SessionEvent, SessionEventSink, Signal, SignalingAgent, SipReply,
    SubscribeRequest, Subscription, SubscriptionEvent, SubscriptionEventSink,
};
use crate::xml::Element;

/// Event package of the conference subscription
pub const EVENT_PACKAGE: &str = "conference";

/// Lifecycle of a conference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferencePhase {
    Idle,
    Joining,
    Connected,
}

type CommandReply = oneshot::Sender<ConferenceResult<Option<Element>>>;

#[derive(Default)]
struct Channel {
    target: Option<String>,
    session: Option<Arc<dyn Session>>,
    generation: u64,
}

struct Shared {
    number: Option<String>,
    pin: Option<String>,
    local_uri: String,
    entity: Option<String>,
    document: ConferenceDocument,
    focus: Channel,
    media: Channel,
    share: Channel,
    subscription: Option<Arc<dyn Subscription>>,
    subscription_generation: u64,
    next_generation: u64,
    join: Option<oneshot::Sender<ConferenceResult<()>>>,
    error: Option<ConferenceError>,
    phase: ConferencePhase,
}

impl Shared {
    fn channel(&self, kind: ChannelKind) -> &Channel {
        match kind {
            ChannelKind::Focus => &self.focus,
            ChannelKind::Media => &self.media,
            ChannelKind::Share => &self.share,
        }
    }

    fn channel_mut(&mut self, kind: ChannelKind) -> &mut Channel {
        match kind {
            ChannelKind::Focus => &mut self.focus,
            ChannelKind::Media => &mut self.media,
            ChannelKind::Share => &mut self.share,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Start a new generation for a channel; events of the previous one are stale
    fn renew(&mut self, kind: ChannelKind) -> u64 {
        let generation = self.bump();
        self.channel_mut(kind).generation = generation;
        generation
    }

    /// Detach every session; targets are kept
    fn release_channels(&mut self) -> Vec<Arc<dyn Session>> {
        let mut sessions = Vec::new();
        for kind in [ChannelKind::Focus, ChannelKind::Media, ChannelKind::Share] {
            self.renew(kind);
            if let Some(session) = self.channel_mut(kind).session.take() {
                sessions.push(session);
            }
        }
        sessions
    }

    fn renew_subscription(&mut self) -> u64 {
        self.subscription_generation = self.bump();
        self.subscription_generation
    }

    fn release_subscription(&mut self) -> Option<Arc<dyn Subscription>> {
        self.renew_subscription();
        self.subscription.take()
    }
}

struct Inner {
    agent: Arc<dyn SignalingAgent>,
    config: ConferenceConfig,
    shared: Mutex<Shared>,
    pending: DashMap<String, CommandReply>,
    events: broadcast::Sender<ConferenceEvent>,
    signals: mpsc::UnboundedSender<Signal>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.get_mut().take() {
            handle.abort();
        }
    }
}

/// A conference the local user joins and controls
///
/// Cloning is cheap; clones share the same conference. Must be created
/// inside a tokio runtime.
#[derive(Clone)]
pub struct Conference {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Conference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.inner.shared.lock();
        f.debug_struct("Conference")
            .field("entity", &shared.entity)
            .field("local_uri", &shared.local_uri)
            .field("phase", &shared.phase)
            .field("version", &shared.document.version())
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

impl Conference {
    pub fn new(agent: Arc<dyn SignalingAgent>, config: ConferenceConfig) -> ConferenceResult<Self> {
        config.validate()?;

        let (events, _) = broadcast::channel(config.event_capacity);
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let shared = Shared {
            number: None,
            pin: None,
            local_uri: agent.local_uri(),
            entity: None,
            document: ConferenceDocument::default(),
            focus: Channel::default(),
            media: Channel::default(),
            share: Channel::default(),
            subscription: None,
            subscription_generation: 0,
            next_generation: 0,
            join: None,
            error: None,
            phase: ConferencePhase::Idle,
        };

        let inner = Arc::new(Inner {
            agent,
            config,
            shared: Mutex::new(shared),
            pending: DashMap::new(),
            events,
            signals,
            dispatcher: Mutex::new(None),
        });

        let handle = tokio::spawn(dispatch(Arc::downgrade(&inner), signal_rx));
        *inner.dispatcher.lock() = Some(handle);

        Ok(Self { inner })
    }

    /// Subscribe to conference events
    pub fn subscribe(&self) -> broadcast::Receiver<ConferenceEvent> {
        self.inner.events.subscribe()
    }

    /// Join the conference reachable as `number` with `pin`
    ///
    /// Resolves once the focus accepted the local user and the conference
    /// subscription is up.
    pub async fn dial_in(&self, number: &str, pin: &str) -> ConferenceResult<()> {
        {
            let mut shared = self.inner.shared.lock();
            if shared.phase != ConferencePhase::Idle {
                return Err(ConferenceError::invalid_state("conference is already joining or joined"));
            }
            shared.number = Some(number.to_string());
            shared.pin = Some(pin.to_string());
            shared.error = None;
            shared.phase = ConferencePhase::Joining;
        }

        let target = format!("{number}**{pin}");
        info!(target = %target, "dialing in");

        let targets = match self.inner.redirect(&target).await {
            Ok(targets) => targets,
            Err(e) => {
                debug!(error = %e, "redirect failed");
                self.inner.fail_join(e.clone()).await;
                return Err(e);
            }
        };

        let (join_tx, join_rx) = oneshot::channel();
        let (media_target, generation) = {
            let mut shared = self.inner.shared.lock();
            if shared.phase != ConferencePhase::Joining {
                return Err(ConferenceError::cancelled("disconnected while joining"));
            }
            shared.join = Some(join_tx);
            let media_target = targets[0].clone();
            shared.media.target = Some(media_target.clone());
            (media_target, shared.renew(ChannelKind::Media))
        };

        let options = InviteOptions {
            kind: ChannelKind::Media,
            target: media_target,
            content_type: None,
            body: None,
        };
        let sink = SessionEventSink::new(ChannelKind::Media, generation, self.inner.signals.clone());
        match self.inner.agent.invite(options, sink).await {
            Ok(session) => self.inner.attach(ChannelKind::Media, generation, session).await,
            Err(e) => {
                self.inner.fail_join(e.clone()).await;
                return Err(e);
            }
        }

        join_rx
            .await
            .unwrap_or_else(|_| Err(ConferenceError::cancelled("conference dropped")))
    }

    /// Leave the conference
    ///
    /// Hangs up every channel, ends the subscription, clears the document and
    /// rejects commands still waiting for a completion.
    pub async fn disconnect(&self) {
        let (sessions, subscription, join, was_active) = {
            let mut shared = self.inner.shared.lock();
            let was_active = shared.phase != ConferencePhase::Idle;
            shared.phase = ConferencePhase::Idle;
            shared.error = None;
            shared.document.clear();
            (
                shared.release_channels(),
                shared.release_subscription(),
                shared.join.take(),
                was_active,
            )
        };

        if let Some(join) = join {
            let _ = join.send(Err(ConferenceError::cancelled("disconnect requested")));
        }
        self.inner.reject_pending("disconnect requested");

        for session in sessions {
            session.terminate().await;
        }
        if let Some(subscription) = subscription {
            subscription.terminate().await;
        }

        if was_active {
            info!("left conference");
            self.inner.emit(ConferenceEvent::Disconnected {
                cause: "disconnect requested".to_string(),
            });
        }
    }

    pub fn phase(&self) -> ConferencePhase {
        self.inner.shared.lock().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == ConferencePhase::Connected
    }

    /// The focus session is established
    pub fn is_established(&self) -> bool {
        self.inner
            .shared
            .lock()
            .focus
            .session
            .as_ref()
            .is_some_and(|s| s.is_established())
    }

    pub fn number(&self) -> Option<String> {
        self.inner.shared.lock().number.clone()
    }

    pub fn pin(&self) -> Option<String> {
        self.inner.shared.lock().pin.clone()
    }

    /// URI commands are sent from; the focus may replace it on join
    pub fn local_uri(&self) -> String {
        self.inner.shared.lock().local_uri.clone()
    }

    /// Conference entity, known once the media session is confirmed
    pub fn entity(&self) -> Option<String> {
        self.inner.shared.lock().entity.clone()
    }

    /// Last join error
    pub fn error(&self) -> Option<ConferenceError> {
        self.inner.shared.lock().error.clone()
    }

    /// Snapshot of the conference document
    pub fn document(&self) -> ConferenceDocument {
        self.inner.shared.lock().document.clone()
    }

    pub fn description(&self) -> Description {
        self.inner.shared.lock().document.description().clone()
    }

    /// Whether the local user may share their screen right now
    pub fn is_share_available(&self) -> bool {
        let shared = self.inner.shared.lock();
        shared.document.is_share_available(&shared.local_uri)
    }

    /// Current target URI of a channel
    pub fn channel_target(&self, kind: ChannelKind) -> Option<String> {
        self.inner.shared.lock().channel(kind).target.clone()
    }

    /// Commands waiting for a deferred completion
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Send one action over the focus session and wait for its outcome
    pub(crate) async fn send_command(&self, action: Element) -> ConferenceResult<Option<Element>> {
        let (session, local_uri, entity) = {
            let shared = self.inner.shared.lock();
            let session = shared
                .focus
                .session
                .clone()
                .ok_or_else(|| ConferenceError::invalid_state("not connected to the conference focus"))?;
            let entity = shared
                .entity
                .clone()
                .ok_or_else(|| ConferenceError::invalid_state("conference entity is unknown"))?;
            (session, shared.local_uri.clone(), entity)
        };

        let request_id = command::new_request_id();
        let action_name = action.name.clone();
        let body = command::make(&local_uri, &entity, &request_id, std::slice::from_ref(&action))?;

        // a completion may be dispatched before send_info returns
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(request_id.clone(), tx);
        let _registration = PendingRegistration {
            pending: &self.inner.pending,
            request_id: &request_id,
        };
        debug!(action = %action_name, request_id = %request_id, "sending conference command");

        let reply = session
            .send_info(command::CONTENT_TYPE, &body)
            .await
            .map_err(|reply| ConferenceError::SessionFailure {
                status_code: reply.status_code,
                reason: reply.reason,
            })?;

        let body = reply
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or(ConferenceError::MissingContent)?;
        let envelope = command::parse(body)?;

        match envelope.code.clone() {
            Some(OutcomeCode::Success) => Ok(envelope.into_result()),
            Some(OutcomeCode::Failure) => Err(ConferenceError::Command {
                cause: OutcomeCode::Failure.as_str().to_string(),
                result: envelope.into_result(),
            }),
            Some(OutcomeCode::Pending) => {
                debug!(action = %action_name, request_id = %request_id, "command pending");
                self.wait_for_completion(&request_id, rx).await
            }
            Some(OutcomeCode::Other(code)) => Err(ConferenceError::Command {
                cause: code,
                result: envelope.into_result(),
            }),
            None => Err(ConferenceError::Command {
                cause: "missing code".to_string(),
                result: envelope.into_result(),
            }),
        }
    }

    async fn wait_for_completion(
        &self,
        request_id: &str,
        rx: oneshot::Receiver<ConferenceResult<Option<Element>>>,
    ) -> ConferenceResult<Option<Element>> {
        let completion = match self.inner.config.command_timeout() {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(completion) => completion,
                Err(_) => {
                    warn!(request_id = %request_id, "no completion for pending command");
                    return Err(ConferenceError::Timeout {
                        request_id: request_id.to_string(),
                    });
                }
            },
            None => rx.await,
        };

        completion.unwrap_or_else(|_| Err(ConferenceError::cancelled("conference dropped")))
    }

    /// Conference entity, local URI and audio-video target for building commands
    pub(crate) fn command_context(&self) -> (String, String, Option<String>) {
        let shared = self.inner.shared.lock();
        (
            shared.entity.clone().unwrap_or_default(),
            shared.local_uri.clone(),
            shared.media.target.clone(),
        )
    }
}

/// Keeps a command's pending entry registered until the command returns
struct PendingRegistration<'a> {
    pending: &'a DashMap<String, CommandReply>,
    request_id: &'a str,
}

impl Drop for PendingRegistration<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.request_id);
    }
}

async fn dispatch(inner: Weak<Inner>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_signal(signal).await;
    }
    debug!("conference dispatcher stopped");
}

impl Inner {
    fn emit(&self, event: ConferenceEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Probe the dial-in target and collect the join candidates
    async fn redirect(&self, target: &str) -> ConferenceResult<Vec<String>> {
        let reply = self.agent.probe(target).await?;
        debug!(status = reply.status_code, reason = %reply.reason, "redirect reply");

        match reply.status_code {
            301 | 302 => {
                let targets: Vec<String> = reply.contacts.iter().rev().cloned().collect();
                debug!(?targets, "conference uris");
                if targets.is_empty() {
                    return Err(ConferenceError::NotFound {
                        target: target.to_string(),
                    });
                }
                Ok(targets)
            }
            480 => Err(ConferenceError::Redirect {
                status_code: reply.status_code,
                reason: reply.reason.clone(),
                description: unavailable_description(&reply).map(Box::new),
            }),
            _ => Err(ConferenceError::Redirect {
                status_code: reply.status_code,
                reason: reply.reason,
                description: None,
            }),
        }
    }

    async fn attach(&self, kind: ChannelKind, generation: u64, session: Arc<dyn Session>) {
        let stale = {
            let mut shared = self.shared.lock();
            let channel = shared.channel_mut(kind);
            if channel.generation == generation {
                channel.session = Some(session.clone());
                false
            } else {
                true
            }
        };
        if stale {
            debug!(?kind, "session outlived its join, terminating");
            session.terminate().await;
        }
    }

    async fn fail_join(&self, error: ConferenceError) {
        let (join, sessions, subscription) = {
            let mut shared = self.shared.lock();
            shared.error = Some(error.clone());
            shared.phase = ConferencePhase::Idle;
            (shared.join.take(), shared.release_channels(), shared.release_subscription())
        };

        warn!(error = %error, "join failed");
        self.emit(ConferenceEvent::ConnectFailed(error.clone()));
        if let Some(join) = join {
            let _ = join.send(Err(error));
        }

        for session in sessions {
            session.terminate().await;
        }
        if let Some(subscription) = subscription {
            subscription.terminate().await;
        }
    }

    fn reject_pending(&self, reason: &str) {
        let request_ids: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for request_id in request_ids {
            if let Some((_, reply)) = self.pending.remove(&request_id) {
                debug!(request_id = %request_id, reason, "rejecting pending command");
                let _ = reply.send(Err(ConferenceError::cancelled(reason)));
            }
        }
    }

    async fn handle_signal(&self, signal: Signal) {
        match signal {
            Signal::Session { kind, generation, event } => {
                if self.shared.lock().channel(kind).generation != generation {
                    debug!(?kind, "dropping event of a released session");
                    return;
                }
                match (kind, event) {
                    (ChannelKind::Media, SessionEvent::Confirmed { entity, focus_uri }) => {
                        self.on_media_confirmed(entity, focus_uri).await
                    }
                    (ChannelKind::Focus, SessionEvent::Accepted { reply }) => self.on_focus_accepted(reply).await,
                    (ChannelKind::Focus, SessionEvent::Ended { cause }) => self.on_focus_ended(cause).await,
                    (ChannelKind::Focus, SessionEvent::NewMessage { content_type, body }) => {
                        self.on_new_message(&content_type, &body)
                    }
                    (kind, SessionEvent::Failed { reply, cause }) => self.on_failed(kind, reply, cause).await,
                    (kind, SessionEvent::Ended { cause }) => {
                        debug!(?kind, cause = %cause, "session ended");
                        self.shared.lock().channel_mut(kind).session = None;
                    }
                    (kind, event) => debug!(?kind, ?event, "ignoring session event"),
                }
            }
            Signal::Subscription { generation, event } => {
                if self.shared.lock().subscription_generation != generation {
                    debug!("dropping event of a released subscription");
                    return;
                }
                match event {
                    SubscriptionEvent::Notify { body } => self.on_notify(&body),
                    SubscriptionEvent::Failed { cause } => warn!(cause = %cause, "conference subscription failed"),
                    SubscriptionEvent::Terminated => {
                        debug!("conference subscription terminated");
                        self.shared.lock().subscription = None;
                    }
                }
            }
        }
    }

    async fn on_media_confirmed(&self, entity: String, focus_uri: String) {
        let changed = {
            let mut shared = self.shared.lock();
            if shared.phase != ConferencePhase::Joining {
                debug!("media confirmed outside of a join");
                return;
            }
            let changed = shared.entity.as_deref() != Some(entity.as_str());
            shared.entity = Some(entity.clone());
            shared.document.bind(entity.clone());
            shared.focus.target = Some(focus_uri);
            changed
        };

        if changed {
            self.emit(ConferenceEvent::EntityChanged { entity });
        }
        self.connect_focus().await;
    }

    /// INVITE the focus with an `addUser` for the local user
    async fn connect_focus(&self) {
        let (local_uri, entity, target, generation) = {
            let mut shared = self.shared.lock();
            let generation = shared.renew(ChannelKind::Focus);
            (
                shared.local_uri.clone(),
                shared.entity.clone().unwrap_or_default(),
                shared.focus.target.clone().unwrap_or_default(),
                generation,
            )
        };

        let action = Element::new(ADD_USER)
            .with_child(commands::conference_keys(&entity))
            .with_child(Element::new("user").with_attr("requestUri", local_uri.as_str()));
        let body = match command::make(&local_uri, &entity, &command::new_request_id(), &[action]) {
            Ok(body) => body,
            Err(e) => return self.fail_join(e).await,
        };

        debug!(target = %target, "connecting focus");
        self.emit(ConferenceEvent::Connecting);

        let options = InviteOptions {
            kind: ChannelKind::Focus,
            target,
            content_type: Some(command::CONTENT_TYPE.to_string()),
            body: Some(body),
        };
        let sink = SessionEventSink::new(ChannelKind::Focus, generation, self.signals.clone());
        match self.agent.invite(options, sink).await {
            Ok(session) => self.attach(ChannelKind::Focus, generation, session).await,
            Err(e) => self.fail_join(e).await,
        }
    }

    async fn on_focus_accepted(&self, reply: SipReply) {
        if self.shared.lock().phase != ConferencePhase::Joining {
            debug!("focus accepted outside of a join");
            return;
        }

        let Some(body) = reply.body.as_deref().filter(|b| !b.trim().is_empty()) else {
            return self.fail_join(ConferenceError::MissingContent).await;
        };
        let envelope = match command::parse(body) {
            Ok(envelope) => envelope,
            Err(e @ ConferenceError::ParseResponse { .. }) => return self.fail_join(e).await,
            Err(e) => return self.fail_join(ConferenceError::parse_response(e.to_string())).await,
        };
        let Some(local_entity) = envelope
            .action(ADD_USER)
            .and_then(|action| action.child("user"))
            .and_then(|user| user.attr("entity"))
            .map(str::to_string)
        else {
            return self
                .fail_join(ConferenceError::parse_response("addUser reply carries no user entity"))
                .await;
        };

        let changed = {
            let mut shared = self.shared.lock();
            let changed = shared.local_uri != local_entity;
            shared.local_uri = local_entity.clone();
            changed
        };
        if changed {
            self.emit(ConferenceEvent::LocalUriChanged {
                uri: local_entity.clone(),
            });
        }

        if let Err(e) = self.subscribe_conference().await {
            return self.fail_join(e).await;
        }

        let join = {
            let mut shared = self.shared.lock();
            shared.phase = ConferencePhase::Connected;
            shared.join.take()
        };
        info!(local_entity = %local_entity, "joined conference");
        self.emit(ConferenceEvent::Connected { local_entity });
        if let Some(join) = join {
            let _ = join.send(Ok(()));
        }
    }

    async fn subscribe_conference(&self) -> ConferenceResult<()> {
        let (target, generation) = {
            let mut shared = self.shared.lock();
            let target = shared
                .focus
                .target
                .clone()
                .ok_or_else(|| ConferenceError::invalid_state("no focus target to subscribe to"))?;
            (target, shared.renew_subscription())
        };

        let request = SubscribeRequest {
            target,
            event: EVENT_PACKAGE.to_string(),
            expires: self.config.subscription_expires,
            extra_headers: vec![format!("Accept: {}", info::CONTENT_TYPE)],
        };
        let sink = SubscriptionEventSink::new(generation, self.signals.clone());
        let subscription = self.agent.subscribe(request, sink).await?;

        let stale = {
            let mut shared = self.shared.lock();
            if shared.subscription_generation == generation {
                shared.subscription = Some(subscription.clone());
                false
            } else {
                true
            }
        };
        if stale {
            subscription.terminate().await;
        }
        Ok(())
    }

    async fn on_failed(&self, kind: ChannelKind, reply: Option<SipReply>, cause: String) {
        let joining = {
            let mut shared = self.shared.lock();
            shared.channel_mut(kind).session = None;
            shared.phase == ConferencePhase::Joining
        };

        if !joining {
            warn!(?kind, cause = %cause, "session failed");
            return;
        }

        let error = match reply {
            Some(reply) => ConferenceError::SessionFailure {
                status_code: reply.status_code,
                reason: reply.reason,
            },
            None => ConferenceError::cancelled(cause),
        };
        self.fail_join(error).await;
    }

    async fn on_focus_ended(&self, cause: String) {
        let (subscription, join) = {
            let mut shared = self.shared.lock();
            shared.focus.session = None;
            shared.phase = ConferencePhase::Idle;
            shared.document.clear();
            (shared.release_subscription(), shared.join.take())
        };

        info!(cause = %cause, "focus session ended");
        if let Some(subscription) = subscription {
            subscription.terminate().await;
        }
        if let Some(join) = join {
            let _ = join.send(Err(ConferenceError::cancelled(cause.clone())));
        }
        self.reject_pending("focus session ended");
        self.emit(ConferenceEvent::Disconnected { cause });
    }

    /// Correlate a focus INFO with a command waiting for its completion
    fn on_new_message(&self, content_type: &str, body: &str) {
        if content_type != command::CONTENT_TYPE {
            debug!(content_type, "ignoring focus message");
            return;
        }

        let envelope = match command::parse(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "dropping unparseable conference-ctrl");
                return;
            }
        };
        let Some(request_id) = envelope.request_id.clone() else {
            debug!("dropping conference-ctrl without request id");
            return;
        };

        match envelope.code.clone() {
            Some(code) if code.is_terminal() => {
                let Some((_, reply)) = self.pending.remove(&request_id) else {
                    debug!(request_id = %request_id, "received unknown conference-ctrl");
                    return;
                };
                let outcome = match code {
                    OutcomeCode::Success => Ok(envelope.into_result()),
                    _ => Err(ConferenceError::Command {
                        cause: code.as_str().to_string(),
                        result: envelope.into_result(),
                    }),
                };
                let _ = reply.send(outcome);
            }
            code => {
                debug!(request_id = %request_id, ?code, "non-terminal conference-ctrl ignored");
            }
        }
    }

    fn on_notify(&self, body: &str) {
        let (version, events) = {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            let outcome = shared.document.update(body);
            if !outcome.is_applied() {
                return;
            }

            let document = &shared.document;
            if outcome.events().contains(&DocumentEvent::DescriptionUpdated) {
                let description = document.description();
                for (purpose, kind) in [
                    (description::PURPOSE_FOCUS, ChannelKind::Focus),
                    (description::PURPOSE_AUDIO_VIDEO, ChannelKind::Media),
                    (description::PURPOSE_APPLICATION_SHARING, ChannelKind::Share),
                ] {
                    if let Some(uri) = description.uri_for(purpose) {
                        debug!(purpose, uri, "channel target");
                        match kind {
                            ChannelKind::Focus => shared.focus.target = Some(uri.to_string()),
                            ChannelKind::Media => shared.media.target = Some(uri.to_string()),
                            ChannelKind::Share => shared.share.target = Some(uri.to_string()),
                        }
                    }
                }
            }

            let events: Vec<ConferenceEvent> = outcome
                .events()
                .iter()
                .map(|event| match event {
                    DocumentEvent::DescriptionUpdated => {
                        ConferenceEvent::DescriptionUpdated(document.description().clone())
                    }
                    DocumentEvent::StateUpdated => ConferenceEvent::StateUpdated(document.state().clone()),
                    DocumentEvent::ViewUpdated => ConferenceEvent::ViewUpdated(document.view().clone()),
                    DocumentEvent::UsersUpdated => ConferenceEvent::UsersUpdated {
                        count: document.users().participant_count(),
                    },
                    DocumentEvent::UserAdded(user) => ConferenceEvent::UserAdded(user.clone()),
                    DocumentEvent::UserUpdated(user) => ConferenceEvent::UserUpdated(user.clone()),
                    DocumentEvent::UserRemoved(user) => ConferenceEvent::UserRemoved(user.clone()),
                })
                .collect();
            (document.version(), events)
        };

        self.emit(ConferenceEvent::InformationUpdated { version });
        for event in events {
            self.emit(event);
        }
    }
}

/// Conference description carried by a `480` redirect reply
fn unavailable_description(reply: &SipReply) -> Option<Description> {
    let body = reply.body.as_deref()?;
    match Element::parse(body) {
        Ok(root) => root.child("conference-description").map(Description::from_element),
        Err(e) => {
            debug!(error = %e, "480 body is not a conference document");
            None
        }
    }
}

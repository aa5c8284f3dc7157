//! Scripted user agent, sessions and subscriptions

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::command::{self, CommandEnvelope, OutcomeCode};
use crate::error::{ConferenceError, ConferenceResult};
use crate::session::{
    ChannelKind, InviteOptions, Session, SessionEvent, SessionEventSink, SignalingAgent, SipReply, SubscribeRequest,
    Subscription, SubscriptionEvent, SubscriptionEventSink,
};
use crate::xml::Element;

pub const LOCAL_URI: &str = "sip:alice@example.com";
pub const LOCAL_ENTITY: &str = "sip:alice@example.com;uid=7";
pub const CONF_ENTITY: &str = "sip:conf-42@conf.example.com";
pub const FOCUS_URI: &str = "sip:focus-42@conf.example.com";
pub const MCU_URI: &str = "sip:mcu-1@conf.example.com";

#[derive(Debug, Default)]
pub struct MockSession {
    replies: Mutex<VecDeque<Result<SipReply, SipReply>>>,
    infos: Mutex<Vec<String>>,
    terminated: AtomicBool,
    events: Mutex<Option<SessionEventSink>>,
    early_completions: Mutex<VecDeque<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockSession {
    fn with_events(events: SessionEventSink) -> Self {
        Self {
            events: Mutex::new(Some(events)),
            ..Self::default()
        }
    }

    /// Deliver a completion with `code` for the next INFO before its reply
    pub fn complete_before_reply(&self, code: &str) {
        self.early_completions.lock().unwrap().push_back(code.to_string());
    }

    /// Hold INFO replies until the returned handle is notified
    pub fn hold_replies(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Queue the reply to the next INFO
    pub fn reply_with(&self, reply: Result<SipReply, SipReply>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Queue an INFO reply with an outcome envelope
    pub fn reply_code(&self, code: &str, result: Option<Element>) {
        let envelope = CommandEnvelope {
            from: Some(CONF_ENTITY.to_string()),
            entity: Some(CONF_ENTITY.to_string()),
            request_id: None,
            code: Some(OutcomeCode::parse(code)),
            actions: result.into_iter().collect(),
        };
        self.reply_with(Ok(SipReply::new(200, "OK").with_body(command::CONTENT_TYPE, envelope.to_xml().unwrap())));
    }

    /// Bodies of every INFO sent so far
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    /// The last INFO, parsed
    pub fn last_command(&self) -> CommandEnvelope {
        let infos = self.infos();
        command::parse(infos.last().expect("no INFO sent")).unwrap()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send_info(&self, content_type: &str, body: &str) -> Result<SipReply, SipReply> {
        assert_eq!(content_type, command::CONTENT_TYPE);
        self.infos.lock().unwrap().push(body.to_string());

        let early = self.early_completions.lock().unwrap().pop_front();
        if let Some(code) = early {
            let request_id = command::parse(body).unwrap().request_id.unwrap();
            let events = self.events.lock().unwrap().clone().expect("session has no event sink");
            events.emit(SessionEvent::NewMessage {
                content_type: command::CONTENT_TYPE.to_string(),
                body: completion(&request_id, &code, None),
            });
            // let the dispatcher handle it first
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SipReply::new(500, "No reply scripted")))
    }

    async fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn is_established(&self) -> bool {
        !self.is_terminated()
    }
}

#[derive(Debug, Default)]
pub struct MockSubscription {
    terminated: AtomicBool,
}

impl MockSubscription {
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Subscription for MockSubscription {
    async fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

/// How the focus answers the join INVITE
#[derive(Debug, Clone)]
pub enum FocusScript {
    /// 200 with an addUser reply naming the local entity
    Accept,
    /// 200 with the given body, or none
    AcceptWith(Option<String>),
    /// The INVITE fails with this reply
    Reject(SipReply),
}

#[derive(Debug)]
pub struct Invite {
    pub options: InviteOptions,
    pub sink: SessionEventSink,
    pub session: Arc<MockSession>,
}

#[derive(Debug)]
pub struct Subscribe {
    pub request: SubscribeRequest,
    pub sink: SubscriptionEventSink,
    pub subscription: Arc<MockSubscription>,
}

pub struct MockAgent {
    probe: Mutex<Option<ConferenceResult<SipReply>>>,
    probed: Mutex<Vec<String>>,
    confirm_media: AtomicBool,
    focus: Mutex<FocusScript>,
    invites: Mutex<Vec<Invite>>,
    subscriptions: Mutex<Vec<Subscribe>>,
}

impl MockAgent {
    /// An agent whose probe redirects to the MCU and whose focus accepts
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            probe: Mutex::new(Some(Ok(redirect(&[MCU_URI])))),
            probed: Mutex::new(Vec::new()),
            confirm_media: AtomicBool::new(true),
            focus: Mutex::new(FocusScript::Accept),
            invites: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn probe_reply(&self, reply: ConferenceResult<SipReply>) {
        *self.probe.lock().unwrap() = Some(reply);
    }

    /// Leave the media session unconfirmed until the test drives it
    pub fn hold_media(&self) {
        self.confirm_media.store(false, Ordering::SeqCst);
    }

    pub fn focus_script(&self, script: FocusScript) {
        *self.focus.lock().unwrap() = script;
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    pub fn invite_count(&self) -> usize {
        self.invites.lock().unwrap().len()
    }

    /// Options and session of the latest INVITE on a channel
    pub fn invite(&self, kind: ChannelKind) -> Option<(InviteOptions, Arc<MockSession>)> {
        self.invites
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|i| i.options.kind == kind)
            .map(|i| (i.options.clone(), i.session.clone()))
    }

    /// Report an event on the latest session of a channel
    pub fn emit(&self, kind: ChannelKind, event: SessionEvent) -> bool {
        let invites = self.invites.lock().unwrap();
        let invite = invites
            .iter()
            .rev()
            .find(|i| i.options.kind == kind)
            .expect("no INVITE on this channel");
        invite.sink.emit(event)
    }

    pub fn focus_session(&self) -> Arc<MockSession> {
        self.invite(ChannelKind::Focus).expect("focus was never invited").1
    }

    pub fn subscription(&self) -> Option<(SubscribeRequest, Arc<MockSubscription>)> {
        self.subscriptions
            .lock()
            .unwrap()
            .last()
            .map(|s| (s.request.clone(), s.subscription.clone()))
    }

    /// Deliver a NOTIFY on the latest subscription
    pub fn notify(&self, body: impl Into<String>) -> bool {
        let subscriptions = self.subscriptions.lock().unwrap();
        let subscribe = subscriptions.last().expect("never subscribed");
        subscribe.sink.emit(SubscriptionEvent::Notify { body: body.into() })
    }

    /// Deliver a command completion as a focus INFO
    pub fn complete(&self, request_id: &str, code: &str, result: Option<Element>) {
        self.emit(
            ChannelKind::Focus,
            SessionEvent::NewMessage {
                content_type: command::CONTENT_TYPE.to_string(),
                body: completion(request_id, code, result),
            },
        );
    }
}

#[async_trait]
impl SignalingAgent for MockAgent {
    fn local_uri(&self) -> String {
        LOCAL_URI.to_string()
    }

    async fn probe(&self, target: &str) -> ConferenceResult<SipReply> {
        self.probed.lock().unwrap().push(target.to_string());
        self.probe
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ConferenceError::invalid_state("no probe scripted")))
    }

    async fn invite(&self, options: InviteOptions, events: SessionEventSink) -> ConferenceResult<Arc<dyn Session>> {
        let session = Arc::new(MockSession::with_events(events.clone()));

        match options.kind {
            ChannelKind::Media if self.confirm_media.load(Ordering::SeqCst) => {
                events.emit(SessionEvent::Confirmed {
                    entity: CONF_ENTITY.to_string(),
                    focus_uri: FOCUS_URI.to_string(),
                });
            }
            ChannelKind::Focus => match self.focus.lock().unwrap().clone() {
                FocusScript::Accept => {
                    events.emit(SessionEvent::Accepted {
                        reply: SipReply::new(200, "OK").with_body(command::CONTENT_TYPE, add_user_reply(LOCAL_ENTITY)),
                    });
                }
                FocusScript::AcceptWith(body) => {
                    let mut reply = SipReply::new(200, "OK");
                    reply.body = body;
                    events.emit(SessionEvent::Accepted { reply });
                }
                FocusScript::Reject(reply) => {
                    events.emit(SessionEvent::Failed {
                        cause: reply.reason.clone(),
                        reply: Some(reply),
                    });
                }
            },
            _ => {}
        }

        self.invites.lock().unwrap().push(Invite {
            options,
            sink: events,
            session: session.clone(),
        });
        Ok(session)
    }

    async fn subscribe(
        &self,
        request: SubscribeRequest,
        events: SubscriptionEventSink,
    ) -> ConferenceResult<Arc<dyn Subscription>> {
        let subscription = Arc::new(MockSubscription::default());
        self.subscriptions.lock().unwrap().push(Subscribe {
            request,
            sink: events,
            subscription: subscription.clone(),
        });
        Ok(subscription)
    }
}

/// A 302 listing `contacts` in header order
pub fn redirect(contacts: &[&str]) -> SipReply {
    contacts
        .iter()
        .fold(SipReply::new(302, "Moved Temporarily"), |reply, contact| reply.with_contact(*contact))
}

/// A focus INFO completing `request_id` with `code`
pub fn completion(request_id: &str, code: &str, result: Option<Element>) -> String {
    CommandEnvelope {
        from: Some(CONF_ENTITY.to_string()),
        entity: Some(CONF_ENTITY.to_string()),
        request_id: Some(request_id.to_string()),
        code: Some(OutcomeCode::parse(code)),
        actions: result.into_iter().collect(),
    }
    .to_xml()
    .unwrap()
}

/// The focus answer to the join `addUser`
pub fn add_user_reply(local_entity: &str) -> String {
    CommandEnvelope {
        from: Some(CONF_ENTITY.to_string()),
        entity: Some(CONF_ENTITY.to_string()),
        request_id: Some("0000000001".to_string()),
        code: Some(OutcomeCode::Success),
        actions: vec![Element::new(command::ADD_USER).with_child(Element::new("user").with_attr("entity", local_entity))],
    }
    .to_xml()
    .unwrap()
}

/// A conference document for the joined conference
pub fn document(version: u64, state: &str, content: &str) -> String {
    format!(r#"<conference-info entity="{CONF_ENTITY}" version="{version}" state="{state}">{content}</conference-info>"#)
}

/// A roster user with an audio-video endpoint carrying main audio
pub fn av_user(entity: &str, display_text: &str) -> String {
    format!(
        r#"<user entity="{entity}">
             <display-text>{display_text}</display-text>
             <endpoint entity="{entity};av" session-type="audio-video">
               <status>connected</status>
               <media id="11"><label>main-audio</label><status>sendrecv</status></media>
             </endpoint>
           </user>"#
    )
}

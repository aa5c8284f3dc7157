//! Conference control command codec
//!
//! Commands travel in `application/conference-ctrl+xml` bodies:
//!
//! ```xml
//! <conference-ctrl from="sip:alice@example.com" entity="sip:conf@example.com" requestId="4817203954">
//!   <addUser>
//!     <conferenceKeys confEntity="sip:conf@example.com"/>
//!     <user requestUri="sip:bob@example.com"/>
//!   </addUser>
//! </conference-ctrl>
//! ```
//!
//! Replies and deferred completions use the same envelope with a `code`
//! attribute. Action bodies are kept as opaque [`Element`] trees so unknown
//! actions survive a parse.

use rand::Rng;

use crate::error::{ConferenceError, ConferenceResult};
use crate::xml::Element;

/// Content type of command bodies
pub const CONTENT_TYPE: &str = "application/conference-ctrl+xml";
/// Root element name of the envelope
pub const ROOT: &str = "conference-ctrl";

pub const GET_CONFERENCE: &str = "getConference";
pub const GET_BOOK_CONFERENCE_TEMPLATE: &str = "getBookConferenceTemplate";
pub const MODIFY_CONFERENCE: &str = "modifyConference";
pub const MODIFY_CONFERENCE_LOCK: &str = "modifyConferenceLock";
pub const ADD_USER: &str = "addUser";
pub const DELETE_USER: &str = "deleteUser";
pub const MODIFY_USER_ROLES: &str = "modifyUserRoles";
pub const MODIFY_ENDPOINT_MEDIA: &str = "modifyEndpointMedia";
pub const MODIFY_ENDPOINT_MEDIA_BATCH: &str = "modifyEndpointMediaBatch";
pub const SET_LOBBY_ACCESS: &str = "setLobbyAccess";
pub const SET_DEMONSTRATOR: &str = "setDemonstrator";
pub const SET_TITLE: &str = "setTitle";
pub const CANCEL_TITLE: &str = "cancelTitle";
pub const ADD_RTMP_USER: &str = "addRtmpUser";
pub const ADD_RTMP_USER_BATCH: &str = "addRtmpUserBatch";
pub const MODIFY_RTMP_ENDPOINT_MEDIA: &str = "modifyRtmpEpMedia";
pub const HOLD_RTMP_USER: &str = "holdRtmpUser";
pub const RESUME_RTMP_USER: &str = "resumeRtmpUser";

/// Outcome code carried by replies and completions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeCode {
    Success,
    Failure,
    /// Accepted; completion follows in a later notification
    Pending,
    Other(String),
}

impl OutcomeCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "pending" => Self::Pending,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Pending => "pending",
            Self::Other(other) => other,
        }
    }

    /// `success` and `failure` end a request
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// A parsed or to-be-sent command envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub from: Option<String>,
    pub entity: Option<String>,
    pub request_id: Option<String>,
    pub code: Option<OutcomeCode>,
    /// One element per action, in document order
    pub actions: Vec<Element>,
}

impl CommandEnvelope {
    /// Body of the named action
    pub fn action(&self, name: &str) -> Option<&Element> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Payload a reply resolves with: the last action in the envelope
    pub fn result(&self) -> Option<&Element> {
        self.actions.last()
    }

    pub fn into_result(mut self) -> Option<Element> {
        self.actions.pop()
    }

    pub fn to_element(&self) -> Element {
        let mut root = Element::new(ROOT);
        if let Some(from) = &self.from {
            root.set_attr("from", from.as_str());
        }
        if let Some(entity) = &self.entity {
            root.set_attr("entity", entity.as_str());
        }
        if let Some(request_id) = &self.request_id {
            root.set_attr("requestId", request_id.as_str());
        }
        if let Some(code) = &self.code {
            root.set_attr("code", code.as_str());
        }
        root.children = self.actions.clone();
        root
    }

    pub fn to_xml(&self) -> ConferenceResult<String> {
        self.to_element().to_xml()
    }
}

/// Build a command document
///
/// Each element of `actions` becomes one action of the envelope.
pub fn make(from: &str, entity: &str, request_id: &str, actions: &[Element]) -> ConferenceResult<String> {
    CommandEnvelope {
        from: Some(from.to_string()),
        entity: Some(entity.to_string()),
        request_id: Some(request_id.to_string()),
        code: None,
        actions: actions.to_vec(),
    }
    .to_xml()
}

/// Parse a command document
pub fn parse(xml: &str) -> ConferenceResult<CommandEnvelope> {
    let root = Element::parse(xml)?;
    if root.name != ROOT {
        return Err(ConferenceError::parse_response(format!(
            "expected <{}>, found <{}>",
            ROOT, root.name
        )));
    }

    Ok(CommandEnvelope {
        from: root.attr("from").map(str::to_string),
        entity: root.attr("entity").map(str::to_string),
        request_id: root.attr("requestId").map(str::to_string),
        code: root.attr("code").map(OutcomeCode::parse),
        actions: root.children,
    })
}

/// Ten random decimal digits
pub fn new_request_id() -> String {
    let mut rng = rand::thread_rng();
    (0..10).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

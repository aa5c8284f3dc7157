//! Roster entries
//!
//! A [`User`] is an immutable snapshot decoded from a `<user>` element of the
//! conference document. Updates replace the whole snapshot.

use std::fmt;

use crate::xml::Element;

/// Endpoint session types
pub const SESSION_FOCUS: &str = "focus";
pub const SESSION_AUDIO_VIDEO: &str = "audio-video";
pub const SESSION_APPLICATION_SHARING: &str = "applicationsharing";

/// Media labels
pub const LABEL_MAIN_AUDIO: &str = "main-audio";
pub const LABEL_MAIN_VIDEO: &str = "main-video";
pub const LABEL_APPLICATION_SHARING: &str = "applicationsharing";

/// Permission level of a participant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Attendee,
    CastViewer,
    Presenter,
    Organizer,
    Other(String),
}

impl Permission {
    pub fn parse(value: &str) -> Self {
        match value {
            "attendee" => Self::Attendee,
            "castviewer" => Self::CastViewer,
            "presenter" => Self::Presenter,
            "organizer" => Self::Organizer,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Attendee => "attendee",
            Self::CastViewer => "castviewer",
            Self::Presenter => "presenter",
            Self::Organizer => "organizer",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demonstration state of a participant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DemoState {
    #[default]
    Audience,
    Demonstrator,
    Other(String),
}

impl DemoState {
    pub fn parse(value: &str) -> Self {
        match value {
            "audience" => Self::Audience,
            "demonstrator" => Self::Demonstrator,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Role triple of a participant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roles {
    pub permission: Permission,
    pub demo_state: DemoState,
    pub presenter_demo_state: DemoState,
}

impl Roles {
    /// Defaults overridden by `<entry entity="...">value</entry>` items
    fn from_element(roles: Option<&Element>) -> Self {
        let mut result = Self::default();
        let Some(roles) = roles else {
            return result;
        };

        for entry in roles.children_named("entry") {
            let value = entry.text().unwrap_or_default();
            match entry.attr("entity") {
                Some("permission") => result.permission = Permission::parse(value),
                Some("demostate") => result.demo_state = DemoState::parse(value),
                Some("presenter-demostate") => result.presenter_demo_state = DemoState::parse(value),
                _ => {}
            }
        }
        result
    }
}

/// Ingress and egress filter of one media stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaFilter {
    pub ingress: Option<String>,
    pub egress: Option<String>,
}

/// A media stream of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Media {
    pub id: Option<String>,
    pub label: Option<String>,
    pub media_type: Option<String>,
    pub status: Option<String>,
    pub ingress_filter: Option<String>,
    pub egress_filter: Option<String>,
}

impl Media {
    fn from_element(element: &Element) -> Self {
        Self {
            id: element.attr("id").map(str::to_string),
            label: text_of(element, "label"),
            media_type: text_of(element, "type"),
            status: text_of(element, "status"),
            ingress_filter: text_of(element, "media-ingress-filter"),
            egress_filter: text_of(element, "media-egress-filter"),
        }
    }

    pub fn filter(&self) -> MediaFilter {
        MediaFilter {
            ingress: self.ingress_filter.clone(),
            egress: self.egress_filter.clone(),
        }
    }
}

/// One device or channel a participant is connected with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserEndpoint {
    pub entity: Option<String>,
    pub session_type: Option<String>,
    pub status: Option<String>,
    pub display_text: Option<String>,
    pub media: Vec<Media>,
}

impl UserEndpoint {
    fn from_element(element: &Element) -> Self {
        Self {
            entity: element.attr("entity").map(str::to_string),
            session_type: element.attr("session-type").map(str::to_string),
            status: text_of(element, "status"),
            display_text: text_of(element, "display-text"),
            media: element.children_named("media").map(Media::from_element).collect(),
        }
    }
}

/// A conference participant
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub entity: String,
    pub display_text: Option<String>,
    pub account_type: Option<String>,
    pub uid: Option<String>,
    pub phone: Option<String>,
    pub ip: Option<String>,
    pub protocol: Option<String>,
    pub user_agent: Option<String>,
    pub roles: Roles,
    pub endpoints: Vec<UserEndpoint>,
}

impl User {
    /// Decode a `<user>` element; `None` when it carries no entity
    pub fn from_element(element: &Element) -> Option<Self> {
        let entity = element.attr("entity")?.to_string();
        Some(Self {
            entity,
            display_text: text_of(element, "display-text"),
            account_type: text_of(element, "account-type"),
            uid: text_of(element, "uid"),
            phone: text_of(element, "phone"),
            ip: text_of(element, "ip"),
            protocol: text_of(element, "protocol"),
            user_agent: text_of(element, "user-agent"),
            roles: Roles::from_element(element.child("roles")),
            endpoints: element
                .children_named("endpoint")
                .map(UserEndpoint::from_element)
                .collect(),
        })
    }

    /// First endpoint of the given session type
    pub fn endpoint(&self, session_type: &str) -> Option<&UserEndpoint> {
        self.endpoints
            .iter()
            .find(|e| e.session_type.as_deref() == Some(session_type))
    }

    /// Media of every endpoint, in order
    pub fn media_list(&self) -> impl Iterator<Item = &Media> {
        self.endpoints.iter().flat_map(|e| e.media.iter())
    }

    /// First media with the given label
    pub fn media(&self, label: &str) -> Option<&Media> {
        self.media_list().find(|m| m.label.as_deref() == Some(label))
    }

    pub fn audio_filter(&self) -> MediaFilter {
        self.media(LABEL_MAIN_AUDIO).map(Media::filter).unwrap_or_default()
    }

    pub fn video_filter(&self) -> MediaFilter {
        self.media(LABEL_MAIN_VIDEO).map(Media::filter).unwrap_or_default()
    }

    pub fn is_presenter(&self) -> bool {
        self.roles.permission == Permission::Presenter
    }

    /// The focus endpoint, or failing that the audio-video one, is on hold
    pub fn is_on_hold(&self) -> bool {
        self.endpoint(SESSION_FOCUS)
            .or_else(|| self.endpoint(SESSION_AUDIO_VIDEO))
            .is_some_and(|e| e.status.as_deref() == Some("on-hold"))
    }

    /// Application sharing media is being sent
    pub fn is_sharing(&self) -> bool {
        self.media(LABEL_APPLICATION_SHARING)
            .is_some_and(|m| m.status.as_deref() == Some("sendonly"))
    }
}

fn text_of(element: &Element, name: &str) -> Option<String> {
    element.child_text(name).map(str::to_string)
}

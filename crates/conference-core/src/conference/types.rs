//! Parameter types of conference commands

use std::fmt;
use std::str::FromStr;

use crate::error::ConferenceError;
use crate::info::user::{LABEL_MAIN_AUDIO, LABEL_MAIN_VIDEO};
use crate::xml::Element;

/// Sections `modifyConference` may change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferenceKey {
    View,
    Description,
}

impl ConferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "conference-view",
            Self::Description => "conference-description",
        }
    }
}

impl FromStr for ConferenceKey {
    type Err = ConferenceError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "conference-view" => Ok(Self::View),
            "conference-description" => Ok(Self::Description),
            other => Err(ConferenceError::UnsupportedKey { key: other.to_string() }),
        }
    }
}

/// Who may enter an unlocked conference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    ClosedAuthenticated,
    OpenAuthenticated,
    Anonymous,
}

impl AdmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosedAuthenticated => "closedAuthenticated",
            Self::OpenAuthenticated => "openAuthenticated",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Who is promoted out of the lobby automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoPromote {
    Specified,
    Everyone,
    Company,
}

impl AutoPromote {
    pub fn value(&self) -> u64 {
        match self {
            Self::Specified => 0,
            Self::Everyone => 2_147_483_648,
            Self::Company => 32_768,
        }
    }
}

/// Mixer layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Equality,
    SpeechExcitation,
    Exclusive,
    Presentation,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equality => "Equality",
            Self::SpeechExcitation => "SpeechExcitation",
            Self::Exclusive => "Exclusive",
            Self::Presentation => "Presentation",
        }
    }

    /// `<layout>` element for a view modification
    pub fn to_element(&self) -> Element {
        Element::text_node("layout", self.as_str())
    }
}

/// `modifyConferenceLock` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    pub locked: bool,
    /// Only sent when unlocking
    pub admission_policy: Option<AdmissionPolicy>,
    /// Only sent when unlocking
    pub auto_promote: Option<AutoPromote>,
}

impl LockOptions {
    pub fn lock() -> Self {
        Self {
            locked: true,
            admission_policy: None,
            auto_promote: None,
        }
    }

    pub fn unlock(admission_policy: AdmissionPolicy, auto_promote: AutoPromote) -> Self {
        Self {
            locked: false,
            admission_policy: Some(admission_policy),
            auto_promote: Some(auto_promote),
        }
    }
}

/// Media filter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Block,
    Unblock,
}

impl FilterState {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Unblock
        } else {
            Self::Block
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Unblock => "unblock",
        }
    }
}

/// Initial filter for a role; `None` leaves a direction unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterRule {
    pub ingress: Option<bool>,
    pub egress: Option<bool>,
}

impl FilterRule {
    pub(crate) fn to_element(self, role: &str) -> Element {
        let mut filter = Element::new("initialFilters").with_child(Element::text_node("role", role));
        if let Some(ingress) = self.ingress {
            filter.push_child(Element::text_node("ingressFilter", FilterState::from_allowed(ingress).as_str()));
        }
        if let Some(egress) = self.egress {
            filter.push_child(Element::text_node("egressFilter", FilterState::from_allowed(egress).as_str()));
        }
        Element::new("mediaFiltersRules").with_child(filter)
    }
}

/// A media change for `modifyEndpointMedia`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpdate {
    pub label: String,
    pub ingress_filter: Option<FilterState>,
    pub egress_filter: Option<FilterState>,
}

impl MediaUpdate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ingress_filter: None,
            egress_filter: None,
        }
    }

    pub fn with_ingress(mut self, filter: FilterState) -> Self {
        self.ingress_filter = Some(filter);
        self
    }

    pub fn with_egress(mut self, filter: FilterState) -> Self {
        self.egress_filter = Some(filter);
        self
    }

    /// Media id used by batch changes: video is 2, everything else 1
    pub fn batch_id(&self) -> &'static str {
        match self.label.as_str() {
            LABEL_MAIN_VIDEO => "2",
            _ => "1",
        }
    }

    pub(crate) fn to_element(&self) -> Element {
        let mut media = Element::new("media").with_child(Element::text_node("label", self.label.as_str()));
        if let Some(ingress) = self.ingress_filter {
            media.push_child(Element::text_node("media-ingress-filter", ingress.as_str()));
        }
        if let Some(egress) = self.egress_filter {
            media.push_child(Element::text_node("media-egress-filter", egress.as_str()));
        }
        media
    }
}

impl Default for MediaUpdate {
    /// Unmute main audio in both directions
    fn default() -> Self {
        Self::new(LABEL_MAIN_AUDIO)
            .with_ingress(FilterState::Unblock)
            .with_egress(FilterState::Unblock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleType {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitlePosition {
    Top,
    Medium,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollDirection {
    RightToLeft,
    LeftToRight,
}

/// On-screen caption shown to participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub title_type: TitleType,
    pub repeat_count: u32,
    /// Seconds between repetitions
    pub repeat_interval: u32,
    /// Seconds the caption stays up
    pub display_time: u32,
    pub display_text: String,
    pub position: TitlePosition,
    pub roll_direction: RollDirection,
}

impl Title {
    pub fn new(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            ..Default::default()
        }
    }

    pub(crate) fn elements(&self) -> Vec<Element> {
        let title_type = match self.title_type {
            TitleType::Static => "Static",
            TitleType::Dynamic => "Dynamic",
        };
        let position = match self.position {
            TitlePosition::Top => "top",
            TitlePosition::Medium => "medium",
            TitlePosition::Bottom => "bottom",
        };
        let roll_direction = match self.roll_direction {
            RollDirection::RightToLeft => "R2L",
            RollDirection::LeftToRight => "L2R",
        };

        vec![
            Element::text_node("type", title_type),
            Element::text_node("repeatCount", self.repeat_count.to_string()),
            Element::text_node("repeatInterval", self.repeat_interval.to_string()),
            Element::text_node("displayTime", self.display_time.to_string()),
            Element::text_node("displayText", self.display_text.as_str()),
            Element::text_node("position", position),
            Element::text_node("rollDirection", roll_direction),
        ]
    }
}

impl Default for Title {
    fn default() -> Self {
        Self {
            title_type: TitleType::Static,
            repeat_count: 3,
            repeat_interval: 5,
            display_time: 5,
            display_text: "title".to_string(),
            position: TitlePosition::Top,
            roll_direction: RollDirection::RightToLeft,
        }
    }
}

impl fmt::Display for ConferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

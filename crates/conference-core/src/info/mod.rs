//! Conference document
//!
//! Local mirror of the `application/conference-info+xml` document the focus
//! publishes. Each notification carries the document `entity`, a `version`
//! and an update kind in `state`:
//!
//! - `full` replaces every section,
//! - `partial` merges fragments into the current sections,
//! - `deleted` resets the document to its empty initial state.
//!
//! Notifications for another conference, or with a version not newer than the
//! current one, are ignored. Delivery order is not guaranteed by the server,
//! so duplicates and stale documents are expected.

pub mod description;
pub mod state;
pub mod user;
pub mod users;
pub mod view;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

pub use description::{ConfUri, Description};
pub use state::ConferenceState;
pub use user::{DemoState, Media, MediaFilter, Permission, Roles, User, UserEndpoint};
pub use users::Users;
pub use view::{ConferenceView, EntityView, InitialFilter};

use crate::error::ConferenceResult;
use crate::xml::Element;

/// Content type of conference documents
pub const CONTENT_TYPE: &str = "application/conference-info+xml";
/// Root element name of conference documents
pub const ROOT: &str = "conference-info";

/// Update kind carried in the root `state` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Full,
    Partial,
    Deleted,
}

impl UpdateKind {
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "full" => Some(Self::Full),
            "partial" => Some(Self::Partial),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Change notifications produced by an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    DescriptionUpdated,
    StateUpdated,
    ViewUpdated,
    UsersUpdated,
    UserAdded(User),
    UserUpdated(User),
    UserRemoved(User),
}

/// Why a document was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The document belongs to another conference
    EntityMismatch { expected: Option<String>, found: Option<String> },
    /// The version is not newer than the current one
    StaleVersion { current: u64, received: u64 },
    /// The `state` attribute is not a known update kind
    UnknownState(String),
    /// The document is not a conference document
    Malformed(String),
}

/// Result of applying a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { kind: UpdateKind, events: Vec<DocumentEvent> },
    Ignored(IgnoreReason),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn events(&self) -> &[DocumentEvent] {
        match self {
            Self::Applied { events, .. } => events,
            Self::Ignored(_) => &[],
        }
    }
}

/// Versioned conference document bound to one conference entity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConferenceDocument {
    entity: Option<String>,
    version: u64,
    time: Option<String>,
    description: Description,
    state: ConferenceState,
    view: ConferenceView,
    users: Users,
}

impl ConferenceDocument {
    /// Empty document, version 0, bound to `entity`
    pub fn new(entity: Option<String>) -> Self {
        Self {
            entity,
            ..Default::default()
        }
    }

    /// Decode a standalone document, binding to the entity it carries
    pub fn from_xml(xml: &str) -> ConferenceResult<Self> {
        let root = Element::parse(xml)?;
        let mut document = Self::new(root.attr("entity").map(str::to_string));
        document.apply(&root);
        Ok(document)
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Bind the document to a conference; the content is kept
    pub fn bind(&mut self, entity: impl Into<String>) {
        self.entity = Some(entity.into());
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Raw `now-time` of the last applied document
    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    /// `now-time` as a UTC timestamp when it is in a recognised format
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let time = self.time.as_deref()?.trim();
        DateTime::parse_from_rfc3339(time)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|t| t.and_utc())
            })
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn state(&self) -> &ConferenceState {
        &self.state
    }

    pub fn view(&self) -> &ConferenceView {
        &self.view
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Parse and apply a notification body
    ///
    /// Unparseable bodies are reported as ignored, like any other document
    /// the protocol drops.
    pub fn update(&mut self, xml: &str) -> UpdateOutcome {
        match Element::parse(xml) {
            Ok(root) => self.apply(&root),
            Err(e) => {
                warn!(error = %e, "dropping unparseable conference document");
                UpdateOutcome::Ignored(IgnoreReason::Malformed(e.to_string()))
            }
        }
    }

    /// Apply a parsed `<conference-info>` element
    pub fn apply(&mut self, root: &Element) -> UpdateOutcome {
        if root.name != ROOT {
            debug!(root = %root.name, "not a conference document");
            return UpdateOutcome::Ignored(IgnoreReason::Malformed(format!("unexpected root <{}>", root.name)));
        }

        let found = root.attr("entity");
        if self.entity.is_none() || self.entity.as_deref() != found {
            debug!(expected = ?self.entity, found = ?found, "entity mismatch, document dropped");
            return UpdateOutcome::Ignored(IgnoreReason::EntityMismatch {
                expected: self.entity.clone(),
                found: found.map(str::to_string),
            });
        }

        let Some(received) = root.attr("version").and_then(|v| v.trim().parse::<u64>().ok()) else {
            debug!("document without a usable version dropped");
            return UpdateOutcome::Ignored(IgnoreReason::Malformed("missing or invalid version".to_string()));
        };
        if received <= self.version {
            debug!(current = self.version, received, "stale document dropped");
            return UpdateOutcome::Ignored(IgnoreReason::StaleVersion {
                current: self.version,
                received,
            });
        }

        let state = root.attr("state").unwrap_or_default();
        let Some(kind) = UpdateKind::parse(state) else {
            debug!(state, "unknown update kind dropped");
            return UpdateOutcome::Ignored(IgnoreReason::UnknownState(state.to_string()));
        };

        let events = match kind {
            UpdateKind::Full => self.full_update(root, received),
            UpdateKind::Partial => self.partial_update(root, received),
            UpdateKind::Deleted => {
                self.clear();
                Vec::new()
            }
        };

        debug!(version = self.version, ?kind, events = events.len(), "conference document applied");
        UpdateOutcome::Applied { kind, events }
    }

    /// Reset to the empty initial state; the entity binding is kept
    pub fn clear(&mut self) {
        self.version = 0;
        self.time = None;
        self.description = Description::default();
        self.state = ConferenceState::default();
        self.view = ConferenceView::default();
        self.users = Users::default();
    }

    /// Whether the local participant may share their screen
    ///
    /// Under the `default` profile only presenters share. Under the
    /// `demonstrator` profile a demonstrator always shares, a plain attendee
    /// never does, and any other permission level may.
    pub fn is_share_available(&self, local_entity: &str) -> bool {
        let Some(user) = self.users.user(local_entity) else {
            return false;
        };

        match self.description.profile.as_deref() {
            Some(description::PROFILE_DEFAULT) => user.roles.permission == Permission::Presenter,
            Some(description::PROFILE_DEMONSTRATOR) => {
                user.roles.demo_state == DemoState::Demonstrator || user.roles.permission != Permission::Attendee
            }
            _ => false,
        }
    }

    fn full_update(&mut self, root: &Element, version: u64) -> Vec<DocumentEvent> {
        self.version = version;
        self.time = root.child_text("now-time").map(str::to_string);

        self.description = root
            .child("conference-description")
            .map(Description::from_element)
            .unwrap_or_default();
        self.state = root
            .child("conference-state")
            .map(ConferenceState::from_element)
            .unwrap_or_default();
        self.view = root
            .child("conference-view")
            .map(ConferenceView::from_element)
            .unwrap_or_default();
        self.users = root.child("users").map(Users::from_element).unwrap_or_default();

        section_events(root)
    }

    fn partial_update(&mut self, root: &Element, version: u64) -> Vec<DocumentEvent> {
        let before = self.users.participant_count() as i64;

        self.version = version;
        self.time = root.child_text("now-time").map(str::to_string);

        if let Some(description) = root.child("conference-description") {
            self.description.merge(description);
        }
        if let Some(state) = root.child("conference-state") {
            self.state.merge(state);
        }
        if let Some(view) = root.child("conference-view") {
            self.view.merge(view);
        }
        match root.child("users") {
            Some(users) => self.users.merge(users),
            None => self.users.merge(&Element::new("users")),
        }

        let mut events = section_events(root);

        let delta = self.users.participant_count() as i64 - before;
        let updated = self.users.updated_users();
        if updated.is_empty() {
            debug!("partial update touched no user");
        }
        events.extend(updated.iter().cloned().map(|user| match delta {
            d if d > 0 => DocumentEvent::UserAdded(user),
            0 => DocumentEvent::UserUpdated(user),
            _ => DocumentEvent::UserRemoved(user),
        }));

        events
    }
}

fn section_events(root: &Element) -> Vec<DocumentEvent> {
    let mut events = Vec::new();
    if root.child("conference-description").is_some() {
        events.push(DocumentEvent::DescriptionUpdated);
    }
    if root.child("conference-state").is_some() {
        events.push(DocumentEvent::StateUpdated);
    }
    if root.child("conference-view").is_some() {
        events.push(DocumentEvent::ViewUpdated);
    }
    if root.child("users").is_some() {
        events.push(DocumentEvent::UsersUpdated);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONF: &str = "sip:conf-1@example.com";

    fn full(version: u64) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <conference-info entity="{CONF}" version="{version}" state="full">
              <now-time>2024-03-01 10:00:00</now-time>
              <conference-description>
                <subject>Standup</subject>
                <profile>default</profile>
              </conference-description>
              <conference-state><active>true</active><locked>false</locked></conference-state>
              <users>
                <user entity="sip:alice@example.com">
                  <display-text>Alice</display-text>
                  <roles><entry entity="permission">presenter</entry></roles>
                </user>
                <user entity="sip:bob@example.com"><display-text>Bob</display-text></user>
              </users>
            </conference-info>"#
        )
    }

    fn bound() -> ConferenceDocument {
        ConferenceDocument::new(Some(CONF.to_string()))
    }

    #[test]
    fn full_update_replaces_everything() {
        let mut document = bound();
        let outcome = document.update(&full(1));

        assert_eq!(
            outcome,
            UpdateOutcome::Applied {
                kind: UpdateKind::Full,
                events: vec![
                    DocumentEvent::DescriptionUpdated,
                    DocumentEvent::StateUpdated,
                    DocumentEvent::UsersUpdated,
                ],
            }
        );
        assert_eq!(document.version(), 1);
        assert_eq!(document.description().subject.as_deref(), Some("Standup"));
        assert!(document.state().is_active());
        assert_eq!(document.users().len(), 2);
        assert_eq!(document.timestamp().unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn stale_or_duplicate_versions_are_ignored() {
        let mut document = bound();
        document.update(&full(5));
        let snapshot = document.clone();

        for version in [5, 4, 0] {
            let outcome = document.update(&full(version));
            assert!(matches!(
                outcome,
                UpdateOutcome::Ignored(IgnoreReason::StaleVersion { current: 5, .. })
            ));
            assert!(outcome.events().is_empty());
            assert_eq!(document, snapshot);
        }
    }

    #[test]
    fn foreign_entity_is_ignored() {
        let mut document = ConferenceDocument::new(Some("sip:other@example.com".to_string()));
        let outcome = document.update(&full(1));
        assert!(matches!(outcome, UpdateOutcome::Ignored(IgnoreReason::EntityMismatch { .. })));
        assert_eq!(document.version(), 0);

        let mut unbound = ConferenceDocument::default();
        assert!(!unbound.update(&full(1)).is_applied());
    }

    #[test]
    fn partial_removal_is_reported_as_removed() {
        let mut document = bound();
        document.update(&full(7));

        let outcome = document.update(&format!(
            r#"<conference-info entity="{CONF}" version="8" state="partial">
                 <users><user entity="sip:bob@example.com" state="deleted"/></users>
               </conference-info>"#
        ));

        let UpdateOutcome::Applied { kind, events } = outcome else {
            panic!("partial update was not applied");
        };
        assert_eq!(kind, UpdateKind::Partial);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], DocumentEvent::UsersUpdated);
        match &events[1] {
            DocumentEvent::UserRemoved(user) => {
                assert_eq!(user.entity, "sip:bob@example.com");
                assert_eq!(user.display_text.as_deref(), Some("Bob"));
            }
            other => panic!("expected UserRemoved, got {:?}", other),
        }
        assert!(document.users().user("sip:bob@example.com").is_none());
        assert_eq!(document.version(), 8);
        // sections absent from a partial update are untouched
        assert_eq!(document.description().subject.as_deref(), Some("Standup"));
    }

    #[test]
    fn partial_roster_delta_classifies_users() {
        let mut document = bound();
        document.update(&full(1));

        let added = document.update(&format!(
            r#"<conference-info entity="{CONF}" version="2" state="partial">
                 <users><user entity="sip:carol@example.com"><display-text>Carol</display-text></user></users>
               </conference-info>"#
        ));
        assert!(matches!(added.events().last(), Some(DocumentEvent::UserAdded(u)) if u.entity == "sip:carol@example.com"));

        let updated = document.update(&format!(
            r#"<conference-info entity="{CONF}" version="3" state="partial">
                 <users><user entity="sip:carol@example.com" state="partial"><display-text>Carol R.</display-text></user></users>
               </conference-info>"#
        ));
        assert!(matches!(updated.events().last(), Some(DocumentEvent::UserUpdated(u)) if u.display_text.as_deref() == Some("Carol R.")));
        assert_eq!(document.users().len(), 3);
    }

    #[test]
    fn partial_sections_merge() {
        let mut document = bound();
        document.update(&full(1));

        let outcome = document.update(&format!(
            r#"<conference-info entity="{CONF}" version="2" state="partial">
                 <conference-state><locked>true</locked></conference-state>
               </conference-info>"#
        ));
        assert_eq!(outcome.events(), &[DocumentEvent::StateUpdated]);
        assert!(document.state().is_locked());
        assert!(document.state().is_active());
        assert_eq!(document.users().len(), 2);
    }

    #[test]
    fn deleted_resets_to_initial_state() {
        let mut document = bound();
        document.update(&full(3));

        let outcome = document.update(&format!(r#"<conference-info entity="{CONF}" version="9" state="deleted"/>"#));
        assert!(outcome.is_applied());
        assert_eq!(document.version(), 0);
        assert_eq!(document.time(), None);
        assert_eq!(document, bound());

        // a fresh full document is accepted again afterwards
        assert!(document.update(&full(1)).is_applied());
    }

    #[test]
    fn unknown_kind_and_garbage_are_ignored() {
        let mut document = bound();
        assert!(matches!(
            document.update(&format!(r#"<conference-info entity="{CONF}" version="1" state="odd"/>"#)),
            UpdateOutcome::Ignored(IgnoreReason::UnknownState(_))
        ));
        assert!(matches!(
            document.update("<conference-info"),
            UpdateOutcome::Ignored(IgnoreReason::Malformed(_))
        ));
        assert!(matches!(
            document.update(&format!(r#"<conference-info entity="{CONF}" state="full"/>"#)),
            UpdateOutcome::Ignored(IgnoreReason::Malformed(_))
        ));
        assert_eq!(document.version(), 0);
    }

    #[test]
    fn from_xml_binds_to_document_entity() {
        let document = ConferenceDocument::from_xml(&full(2)).unwrap();
        assert_eq!(document.entity(), Some(CONF));
        assert_eq!(document.version(), 2);
        assert_eq!(document.users().len(), 2);
    }

    #[test]
    fn share_permission_follows_profile() {
        let mut document = bound();
        document.update(&full(1));
        assert!(document.is_share_available("sip:alice@example.com"));
        assert!(!document.is_share_available("sip:bob@example.com"));
        assert!(!document.is_share_available("sip:nobody@example.com"));

        document.update(&format!(
            r#"<conference-info entity="{CONF}" version="2" state="partial">
                 <conference-description><profile>demonstrator</profile></conference-description>
                 <users>
                   <user entity="sip:bob@example.com"><roles><entry entity="demostate">demonstrator</entry></roles></user>
                   <user entity="sip:dave@example.com"><roles><entry entity="permission">castviewer</entry></roles></user>
                   <user entity="sip:erin@example.com"/>
                 </users>
               </conference-info>"#
        ));
        assert!(document.is_share_available("sip:bob@example.com"));
        assert!(document.is_share_available("sip:dave@example.com"));
        assert!(!document.is_share_available("sip:erin@example.com"));
        assert!(document.is_share_available("sip:alice@example.com"));
    }
}

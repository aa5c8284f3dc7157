//! `<conference-description>` section

use crate::xml::Element;

pub const PURPOSE_FOCUS: &str = "focus";
pub const PURPOSE_AUDIO_VIDEO: &str = "audio-video";
pub const PURPOSE_APPLICATION_SHARING: &str = "applicationsharing";

/// Conference profile that only lets presenters share
pub const PROFILE_DEFAULT: &str = "default";
/// Conference profile where demonstrators share
pub const PROFILE_DEMONSTRATOR: &str = "demonstrator";

/// A conference URI with its purpose
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfUri {
    pub uri: String,
    pub display_text: Option<String>,
    pub purpose: Option<String>,
}

/// Static properties of the conference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    pub display_text: Option<String>,
    pub subject: Option<String>,
    pub free_text: Option<String>,
    pub profile: Option<String>,
    pub conference_number: Option<String>,
    pub organizer: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub maximum_user_count: Option<u32>,
    pub admission_policy: Option<String>,
    pub auto_promote: Option<u64>,
    pub conf_uris: Vec<ConfUri>,
}

impl Description {
    pub fn from_element(element: &Element) -> Self {
        let mut description = Self::default();
        description.merge(element);
        description
    }

    /// Overwrite every field the fragment carries
    pub fn merge(&mut self, element: &Element) {
        merge_text(&mut self.display_text, element, "display-text");
        merge_text(&mut self.subject, element, "subject");
        merge_text(&mut self.free_text, element, "free-text");
        merge_text(&mut self.profile, element, "profile");
        merge_text(&mut self.conference_number, element, "conference-number");
        merge_text(&mut self.organizer, element, "organizer");
        merge_text(&mut self.start_time, element, "start-time");
        merge_text(&mut self.end_time, element, "end-time");
        merge_text(&mut self.admission_policy, element, "admission-policy");

        if let Some(count) = element.child_text("maximum-user-count") {
            self.maximum_user_count = count.trim().parse().ok();
        }
        if let Some(value) = element.child_text("autopromote") {
            self.auto_promote = value.trim().parse().ok();
        }

        if let Some(uris) = element.child("conf-uris") {
            self.conf_uris = uris
                .children_named("entry")
                .filter_map(|entry| {
                    Some(ConfUri {
                        uri: entry.child_text("uri")?.to_string(),
                        display_text: entry.child_text("display-text").map(str::to_string),
                        purpose: entry.child_text("purpose").map(str::to_string),
                    })
                })
                .collect();
        }
    }

    /// URI registered for a purpose (`focus`, `audio-video`, ...)
    pub fn uri_for(&self, purpose: &str) -> Option<&str> {
        self.conf_uris
            .iter()
            .find(|u| u.purpose.as_deref() == Some(purpose))
            .map(|u| u.uri.as_str())
    }
}

fn merge_text(field: &mut Option<String>, element: &Element, name: &str) {
    if let Some(child) = element.child(name) {
        *field = child.text().map(str::to_string);
    }
}

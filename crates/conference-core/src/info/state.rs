//! `<conference-state>` section

use crate::xml::Element;

/// Dynamic state of the conference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConferenceState {
    pub active: Option<bool>,
    pub locked: Option<bool>,
    pub user_count: Option<u32>,
}

impl ConferenceState {
    pub fn from_element(element: &Element) -> Self {
        let mut state = Self::default();
        state.merge(element);
        state
    }

    pub fn merge(&mut self, element: &Element) {
        if let Some(active) = element.child_text("active") {
            self.active = parse_bool(active);
        }
        if let Some(locked) = element.child_text("locked") {
            self.locked = parse_bool(locked);
        }
        if let Some(count) = element.child_text("user-count") {
            self.user_count = count.trim().parse().ok();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

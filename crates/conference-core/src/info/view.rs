//! `<conference-view>` section

use crate::xml::Element;

/// Media filter applied to a role when it joins
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitialFilter {
    pub role: Option<String>,
    pub ingress: Option<String>,
    pub egress: Option<String>,
}

/// Layout and filter state of one mixer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityView {
    pub entity: String,
    pub layout: Option<String>,
    pub presenter: Option<String>,
    pub max_view: Option<u32>,
    pub initial_filters: Vec<InitialFilter>,
}

impl EntityView {
    fn merge(&mut self, element: &Element) {
        let Some(state) = element.child("entity-state") else {
            return;
        };

        if let Some(layout) = state.child("layout") {
            self.layout = layout.text().map(str::to_string);
        }
        if let Some(presenter) = state.child("presenter") {
            self.presenter = presenter.text().map(str::to_string);
        }
        if let Some(max_view) = state.child_text("max-view") {
            self.max_view = max_view.trim().parse().ok();
        }
        if let Some(rules) = state.child("mediaFiltersRules") {
            self.initial_filters = rules
                .children_named("initialFilters")
                .map(|filter| InitialFilter {
                    role: filter.child_text("role").map(str::to_string),
                    ingress: filter.child_text("ingressFilter").map(str::to_string),
                    egress: filter.child_text("egressFilter").map(str::to_string),
                })
                .collect();
        }
    }

    /// Initial filter of a role (`default`, `attendee`, ...)
    pub fn initial_filter(&self, role: &str) -> Option<&InitialFilter> {
        self.initial_filters
            .iter()
            .find(|f| f.role.as_deref() == Some(role))
    }
}

/// All entity views of the conference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConferenceView {
    pub entity_views: Vec<EntityView>,
}

impl ConferenceView {
    pub fn from_element(element: &Element) -> Self {
        let mut view = Self::default();
        view.merge(element);
        view
    }

    /// Merge entity views by entity
    pub fn merge(&mut self, element: &Element) {
        for fragment in element.children_named("entity-view") {
            let Some(entity) = fragment.attr("entity") else {
                continue;
            };
            match self.entity_views.iter_mut().find(|v| v.entity == entity) {
                Some(view) => view.merge(fragment),
                None => {
                    let mut view = EntityView {
                        entity: entity.to_string(),
                        ..Default::default()
                    };
                    view.merge(fragment);
                    self.entity_views.push(view);
                }
            }
        }
    }

    pub fn entity_view(&self, entity: &str) -> Option<&EntityView> {
        self.entity_views.iter().find(|v| v.entity == entity)
    }
}

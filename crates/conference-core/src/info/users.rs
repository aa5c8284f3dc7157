//! `<users>` section

use tracing::debug;

use super::user::User;
use crate::xml::Element;

/// The conference roster, in document order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Users {
    users: Vec<User>,
    /// Users touched by the last update
    updated: Vec<User>,
}

impl Users {
    pub fn from_element(element: &Element) -> Self {
        let users: Vec<User> = element.children_named("user").filter_map(User::from_element).collect();
        Self {
            updated: users.clone(),
            users,
        }
    }

    /// Apply a partial `<users>` fragment
    ///
    /// Users flagged `state="deleted"` are removed, every other user is
    /// inserted or replaced wholesale.
    pub fn merge(&mut self, element: &Element) {
        self.updated.clear();

        for fragment in element.children_named("user") {
            let Some(entity) = fragment.attr("entity") else {
                debug!("skipping user without entity");
                continue;
            };
            let position = self.users.iter().position(|u| u.entity == entity);

            if fragment.attr("state") == Some("deleted") {
                match position {
                    Some(idx) => self.updated.push(self.users.remove(idx)),
                    None => debug!(entity, "deleted user is not in the roster"),
                }
                continue;
            }

            let Some(user) = User::from_element(fragment) else {
                continue;
            };
            match position {
                Some(idx) => self.users[idx] = user.clone(),
                None => self.users.push(user.clone()),
            }
            self.updated.push(user);
        }
    }

    pub fn user(&self, entity: &str) -> Option<&User> {
        self.users.iter().find(|u| u.entity == entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of participants on the roster
    pub fn participant_count(&self) -> usize {
        self.users.len()
    }

    /// Users added, replaced or removed by the last update
    pub fn updated_users(&self) -> &[User] {
        &self.updated
    }
}

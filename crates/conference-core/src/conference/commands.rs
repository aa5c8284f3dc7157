//! Administrative commands
//!
//! Each command resolves with the payload of the reply, the last action
//! element of the outcome envelope, when there is one.

use super::types::{ConferenceKey, FilterRule, Layout, LockOptions, MediaUpdate, Title};
use super::Conference;
use crate::command::*;
use crate::error::{ConferenceError, ConferenceResult};
use crate::info::user::SESSION_AUDIO_VIDEO;
use crate::info::Permission;
use crate::xml::Element;

/// `<conferenceKeys confEntity=".."/>`
pub(crate) fn conference_keys(entity: &str) -> Element {
    Element::new("conferenceKeys").with_attr("confEntity", entity)
}

fn user_keys(entity: &str, user: &str) -> Element {
    Element::new("userKeys")
        .with_attr("confEntity", entity)
        .with_attr("userEntity", user)
}

fn user_entities<S: AsRef<str>>(entities: &[S]) -> impl Iterator<Item = Element> + '_ {
    entities
        .iter()
        .map(|entity| Element::text_node("userEntity", entity.as_ref()))
}

type Reply = ConferenceResult<Option<Element>>;

impl Conference {
    /// Fetch the full conference document
    pub async fn get_conference(&self) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(Element::new(GET_CONFERENCE).with_child(conference_keys(&entity)))
            .await
    }

    /// Fetch the booking template of the conference
    pub async fn get_conference_template(&self) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(
            Element::new(GET_BOOK_CONFERENCE_TEMPLATE)
                .with_child(Element::new("conference-info").with_attr("entity", entity)),
        )
        .await
    }

    /// Modify the `conference-view` or `conference-description` section
    ///
    /// `content` becomes the children of the section element.
    pub async fn modify_conference(&self, key: &str, content: Vec<Element>) -> Reply {
        let key: ConferenceKey = key.parse()?;
        let (entity, _, _) = self.command_context();

        let info = Element::new("conference-info")
            .with_attr("entity", entity)
            .with_attr("state", "partial")
            .with_child(Element::new(key.as_str()).with_children(content));

        self.send_command(Element::new(MODIFY_CONFERENCE).with_child(info)).await
    }

    /// Change the view of the audio-video mixer
    pub async fn modify_conference_view(&self, entity_state: Vec<Element>) -> Reply {
        let (_, _, media_target) = self.command_context();

        let mut entity_view = Element::new("entity-view");
        if let Some(target) = media_target {
            entity_view.set_attr("entity", target);
        }
        entity_view.set_attr("state", "partial");
        entity_view.push_child(Element::new("entity-state").with_children(entity_state));

        self.modify_conference(ConferenceKey::View.as_str(), vec![entity_view])
            .await
    }

    pub async fn modify_conference_description(&self, fields: Vec<Element>) -> Reply {
        self.modify_conference(ConferenceKey::Description.as_str(), fields)
            .await
    }

    pub async fn set_layout(&self, layout: Layout) -> Reply {
        self.modify_conference_view(vec![layout.to_element()]).await
    }

    /// Initial media filters for users without a role
    pub async fn set_default_filter(&self, rule: FilterRule) -> Reply {
        self.modify_conference_view(vec![rule.to_element("default")]).await
    }

    /// Initial media filters for attendees
    pub async fn set_attendee_filter(&self, rule: FilterRule) -> Reply {
        self.modify_conference_view(vec![rule.to_element(Permission::Attendee.as_str())])
            .await
    }

    /// Lock or unlock the conference
    pub async fn modify_conference_lock(&self, options: LockOptions) -> Reply {
        let (entity, _, _) = self.command_context();

        let mut action = Element::new(MODIFY_CONFERENCE_LOCK)
            .with_child(conference_keys(&entity))
            .with_child(Element::text_node("locked", options.locked.to_string()));
        if !options.locked {
            if let Some(policy) = options.admission_policy {
                action.push_child(Element::text_node("admission-policy", policy.as_str()));
            }
            if let Some(promote) = options.auto_promote {
                action.push_child(Element::text_node("autopromote", promote.value().to_string()));
            }
        }

        self.send_command(action).await
    }

    /// Invite users into the conference
    pub async fn add_user<S: AsRef<str>>(&self, uris: &[S]) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(ADD_USER)
            .with_child(conference_keys(&entity))
            .with_children(
                uris.iter()
                    .map(|uri| Element::new("user").with_attr("requestUri", uri.as_ref())),
            );

        self.send_command(action).await
    }

    /// Remove a user from the conference
    pub async fn delete_user(&self, user: &str) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(Element::new(DELETE_USER).with_child(user_keys(&entity, user)))
            .await
    }

    /// Change the permission role of a user, the local user by default
    pub async fn modify_user_role(&self, user: Option<&str>, role: Permission) -> Reply {
        let (entity, local_uri, _) = self.command_context();
        let user = user.unwrap_or(local_uri.as_str());

        let action = Element::new(MODIFY_USER_ROLES)
            .with_child(user_keys(&entity, user))
            .with_child(Element::new("user-roles").with_child(Element::text_node("entry", role.as_str())));

        self.send_command(action).await
    }

    /// Change one media stream of a user, the local user by default
    ///
    /// The user must be on the roster with an audio-video endpoint carrying
    /// media of the requested label.
    pub async fn modify_endpoint_media(&self, user: Option<&str>, media: MediaUpdate) -> Reply {
        let (entity, local_uri, media_target) = self.command_context();
        let user_entity = user.unwrap_or(local_uri.as_str()).to_string();

        let (endpoint_entity, media_id) = {
            let document = self.document();
            let user = document
                .users()
                .user(&user_entity)
                .ok_or_else(|| ConferenceError::MissingUser {
                    entity: user_entity.clone(),
                })?;
            let endpoint = user
                .endpoint(SESSION_AUDIO_VIDEO)
                .ok_or_else(|| ConferenceError::MissingEndpoint {
                    entity: user_entity.clone(),
                    session_type: SESSION_AUDIO_VIDEO.to_string(),
                })?;
            let user_media = user.media(&media.label).ok_or_else(|| ConferenceError::MissingMedia {
                entity: user_entity.clone(),
                label: media.label.clone(),
            })?;
            (endpoint.entity.clone(), user_media.id.clone())
        };

        let mut keys = Element::new("mediaKeys")
            .with_attr("confEntity", entity)
            .with_attr("userEntity", user_entity);
        if let Some(endpoint_entity) = endpoint_entity {
            keys.set_attr("endpointEntity", endpoint_entity);
        }
        if let Some(media_id) = media_id {
            keys.set_attr("mediaId", media_id);
        }

        let mut action = Element::new(MODIFY_ENDPOINT_MEDIA);
        if let Some(target) = media_target {
            action.set_attr("mcuUri", target);
        }
        action.push_child(keys);
        action.push_child(media.to_element());

        self.send_command(action).await
    }

    /// Apply the same media changes to the audio-video endpoint of many users
    pub async fn modify_endpoint_media_batch<S: AsRef<str>>(&self, users: &[S], media: &[MediaUpdate]) -> Reply {
        let (entity, _, _) = self.command_context();

        let endpoint = Element::new("endpoint")
            .with_attr("session-type", SESSION_AUDIO_VIDEO)
            .with_children(media.iter().map(|m| {
                let mut element = m.to_element();
                element.set_attr("id", m.batch_id());
                element
            }));

        let action = Element::new(MODIFY_ENDPOINT_MEDIA_BATCH)
            .with_child(conference_keys(&entity))
            .with_children(user_entities(users))
            .with_child(endpoint);

        self.send_command(action).await
    }

    /// Let users out of the lobby, or turn them away
    pub async fn set_lobby_access<S: AsRef<str>>(&self, users: &[S], granted: bool) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(SET_LOBBY_ACCESS)
            .with_child(conference_keys(&entity))
            .with_children(user_entities(users))
            .with_child(Element::text_node("access", if granted { "granted" } else { "denied" }));

        self.send_command(action).await
    }

    pub async fn set_demonstrator<S: AsRef<str>>(&self, users: &[S], enable: bool) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(SET_DEMONSTRATOR)
            .with_child(conference_keys(&entity))
            .with_children(user_entities(users))
            .with_child(Element::text_node("demoState", if enable { "OnDemo" } else { "OffDemo" }));

        self.send_command(action).await
    }

    /// Show a caption to users
    ///
    /// `None` targets the local user; an empty list sends no user and lets
    /// the server show the caption to everyone.
    pub async fn set_title(&self, users: Option<&[String]>, title: Title) -> Reply {
        let (entity, local_uri, _) = self.command_context();
        let users = match users {
            Some(users) => users.to_vec(),
            None => vec![local_uri],
        };

        let action = Element::new(SET_TITLE)
            .with_child(conference_keys(&entity))
            .with_children(user_entities(&users[..]))
            .with_children(title.elements());

        self.send_command(action).await
    }

    pub async fn cancel_title(&self) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(Element::new(CANCEL_TITLE).with_child(conference_keys(&entity)))
            .await
    }

    /// Add an RTMP participant described by `fields`
    pub async fn add_rtmp_user(&self, fields: Vec<Element>) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(ADD_RTMP_USER)
            .with_child(conference_keys(&entity))
            .with_child(Element::new("rtmp-user").with_children(fields));

        self.send_command(action).await
    }

    pub async fn add_rtmp_user_batch(&self, users: Vec<Vec<Element>>) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(ADD_RTMP_USER_BATCH)
            .with_child(conference_keys(&entity))
            .with_children(
                users
                    .into_iter()
                    .map(|fields| Element::new("rtmp-user").with_children(fields)),
            );

        self.send_command(action).await
    }

    pub async fn modify_rtmp_endpoint_media(&self, user: &str, endpoint: Vec<Element>) -> Reply {
        let (entity, _, _) = self.command_context();

        let action = Element::new(MODIFY_RTMP_ENDPOINT_MEDIA)
            .with_child(user_keys(&entity, user))
            .with_child(Element::new("endpoint").with_children(endpoint));

        self.send_command(action).await
    }

    pub async fn hold_rtmp_user(&self, user: &str) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(Element::new(HOLD_RTMP_USER).with_child(user_keys(&entity, user)))
            .await
    }

    pub async fn resume_rtmp_user(&self, user: &str) -> Reply {
        let (entity, _, _) = self.command_context();
        self.send_command(Element::new(RESUME_RTMP_USER).with_child(user_keys(&entity, user)))
            .await
    }
}

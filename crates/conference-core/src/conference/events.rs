//! Conference events

use crate::error::ConferenceError;
use crate::info::{ConferenceState, ConferenceView, Description, User};

/// Events emitted by a [`Conference`](super::Conference)
#[derive(Debug, Clone)]
pub enum ConferenceEvent {
    /// The focus INVITE is on its way
    Connecting,
    /// Joined; the local participant is known by `local_entity`
    Connected { local_entity: String },
    /// The join failed
    ConnectFailed(ConferenceError),
    /// The conference session is over
    Disconnected { cause: String },
    /// A conference document was applied
    InformationUpdated { version: u64 },
    DescriptionUpdated(Description),
    StateUpdated(ConferenceState),
    ViewUpdated(ConferenceView),
    /// The roster changed; `count` is the new participant count
    UsersUpdated { count: usize },
    UserAdded(User),
    UserUpdated(User),
    UserRemoved(User),
    /// The conference entity was bound
    EntityChanged { entity: String },
    /// The local participant URI changed
    LocalUriChanged { uri: String },
}

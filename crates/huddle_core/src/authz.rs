//! Authorization predicates for meeting operations.
//!
//! Predicates are pure; the service turns a `false` into
//! `SchedulingError::Unauthorized` through [`require`].

use crate::model::meeting::{Meeting, MeetingId};
use crate::model::user::UserId;
use crate::service::scheduling_service::SchedulingError;

/// Operation gated by the guard, reported back in authorization errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingAction {
    View,
    Update,
    Delete,
    Respond,
}

impl MeetingAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Respond => "respond to",
        }
    }
}

/// Only the organizer may update or delete.
pub fn can_modify(meeting: &Meeting, actor: UserId) -> bool {
    meeting.is_organizer(actor)
}

/// Organizer and every invited attendee, whatever their status.
pub fn can_view(meeting: &Meeting, actor: UserId) -> bool {
    meeting.is_organizer(actor) || meeting.is_attendee(actor)
}

/// Any listed attendee; the organizer is never in the roster.
pub fn can_respond(meeting: &Meeting, actor: UserId) -> bool {
    meeting.is_attendee(actor)
}

/// Maps a denied predicate to an authorization error that names only the
/// action and meeting id.
pub fn require(
    allowed: bool,
    action: MeetingAction,
    meeting_id: MeetingId,
) -> Result<(), SchedulingError> {
    if allowed {
        Ok(())
    } else {
        Err(SchedulingError::Unauthorized { action, meeting_id })
    }
}

//! Caller-correctable validation failures shared by model and service layers.

use crate::model::user::UserId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input or invariant violation that the caller can fix and resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is blank after trim.
    EmptyTitle,
    /// `end` is not strictly after `start`.
    InvalidTimeRange { start: i64, end: i64 },
    /// Attendee email does not look like an address.
    MalformedEmail(String),
    /// One or more attendee emails could not be resolved to users.
    UnknownAttendees(Vec<String>),
    /// Organizer appears in their own attendee roster.
    OrganizerIsAttendee,
    /// Same user listed twice in one roster.
    DuplicateAttendee(UserId),
    /// Response value outside `accepted|declined`.
    InvalidResponse(String),
    /// User search query is blank after trim.
    EmptySearchQuery,
    /// Nil UUID used as a meeting or user identifier.
    NilId,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "meeting title must not be blank"),
            Self::InvalidTimeRange { start, end } => {
                write!(f, "end time ({end}) must be after start time ({start})")
            }
            Self::MalformedEmail(value) => write!(f, "malformed attendee email: `{value}`"),
            Self::UnknownAttendees(emails) => {
                write!(f, "attendees do not exist: {}", emails.join(", "))
            }
            Self::OrganizerIsAttendee => {
                write!(f, "organizer cannot be invited as an attendee")
            }
            Self::DuplicateAttendee(user_id) => write!(f, "attendee listed twice: {user_id}"),
            Self::InvalidResponse(value) => write!(
                f,
                "response must be either accepted or declined, got `{value}`"
            ),
            Self::EmptySearchQuery => write!(f, "search query must not be blank"),
            Self::NilId => write!(f, "identifier must not be the nil uuid"),
        }
    }
}

impl Error for ValidationError {}

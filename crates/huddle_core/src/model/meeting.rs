//! Meeting domain model.
//!
//! # Responsibility
//! - Define the canonical meeting record and its attendee roster.
//! - Validate structural invariants before persistence and after decode.
//!
//! # Invariants
//! - `id` is a non-nil UUID and never reused for another meeting.
//! - `end_at > start_at`.
//! - Attendee user ids are unique and never equal the organizer.
//! - Attendee status is a closed enum; unknown states are unrepresentable.

use crate::model::interval::Interval;
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Stable meeting identifier.
pub type MeetingId = Uuid;

/// Attendee response state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeStatus {
    /// Invited, no response yet. Assigned on every new invite.
    Pending,
    /// Attendee committed to the slot; counts toward their conflicts.
    Accepted,
    /// Attendee turned the invite down.
    Declined,
}

impl AttendeeStatus {
    /// Stable storage/wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// One invited user and their response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeEntry {
    pub user_id: UserId,
    pub status: AttendeeStatus,
}

impl AttendeeEntry {
    /// Fresh invite in `Pending` state.
    pub fn invited(user_id: UserId) -> Self {
        Self {
            user_id,
            status: AttendeeStatus::Pending,
        }
    }
}

/// Canonical meeting record.
///
/// Deserialization runs `validate()`, so decoded meetings always satisfy the
/// model invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MeetingWire")]
pub struct Meeting {
    pub id: MeetingId,
    /// Trimmed, non-empty.
    pub title: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds, inclusive.
    pub start_at: i64,
    /// Unix epoch milliseconds, exclusive. Must be > `start_at`.
    pub end_at: i64,
    pub location: Option<String>,
    pub organizer: UserId,
    /// Ordered roster; order is preserved through storage.
    pub attendees: Vec<AttendeeEntry>,
    /// Assigned by storage; `None` until first persisted.
    pub created_at: Option<i64>,
    /// Assigned by storage; `None` until first persisted.
    pub updated_at: Option<i64>,
}

#[derive(Deserialize)]
struct MeetingWire {
    id: MeetingId,
    title: String,
    description: Option<String>,
    start_at: i64,
    end_at: i64,
    location: Option<String>,
    organizer: UserId,
    #[serde(default)]
    attendees: Vec<AttendeeEntry>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    updated_at: Option<i64>,
}

impl TryFrom<MeetingWire> for Meeting {
    type Error = ValidationError;

    fn try_from(wire: MeetingWire) -> Result<Self, Self::Error> {
        let meeting = Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            start_at: wire.start_at,
            end_at: wire.end_at,
            location: wire.location,
            organizer: wire.organizer,
            attendees: wire.attendees,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        };
        meeting.validate()?;
        Ok(meeting)
    }
}

impl Meeting {
    /// Creates an unsaved meeting with a generated id and empty roster.
    pub fn new(
        organizer: UserId,
        title: impl Into<String>,
        start_at: i64,
        end_at: i64,
    ) -> Result<Self, ValidationError> {
        let meeting = Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            start_at,
            end_at,
            location: None,
            organizer,
            attendees: Vec::new(),
            created_at: None,
            updated_at: None,
        };
        meeting.validate()?;
        Ok(meeting)
    }

    /// Checks every structural invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.organizer.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Interval::new(self.start_at, self.end_at)?;

        let mut seen = HashSet::with_capacity(self.attendees.len());
        for entry in &self.attendees {
            if entry.user_id.is_nil() {
                return Err(ValidationError::NilId);
            }
            if entry.user_id == self.organizer {
                return Err(ValidationError::OrganizerIsAttendee);
            }
            if !seen.insert(entry.user_id) {
                return Err(ValidationError::DuplicateAttendee(entry.user_id));
            }
        }
        Ok(())
    }

    /// Time slot occupied by this meeting.
    pub fn interval(&self) -> Result<Interval, ValidationError> {
        Interval::new(self.start_at, self.end_at)
    }

    pub fn is_organizer(&self, user_id: UserId) -> bool {
        self.organizer == user_id
    }

    pub fn attendee(&self, user_id: UserId) -> Option<&AttendeeEntry> {
        self.attendees.iter().find(|entry| entry.user_id == user_id)
    }

    pub fn attendee_mut(&mut self, user_id: UserId) -> Option<&mut AttendeeEntry> {
        self.attendees
            .iter_mut()
            .find(|entry| entry.user_id == user_id)
    }

    pub fn is_attendee(&self, user_id: UserId) -> bool {
        self.attendee(user_id).is_some()
    }

    /// Whether this meeting occupies `user_id`'s calendar: organized by
    /// them, or accepted by them.
    pub fn commits(&self, user_id: UserId) -> bool {
        self.is_organizer(user_id)
            || self
                .attendee(user_id)
                .is_some_and(|entry| entry.status == AttendeeStatus::Accepted)
    }
}

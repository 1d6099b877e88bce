//! Attendee invitation state machine.
//!
//! # Invariants
//! - Every state may move to `Declined` unconditionally.
//! - Every state may move to `Accepted` only when the attendee has no
//!   conflicting commitment; a rejected transition leaves state unchanged.
//! - There is no terminal state and no transition back to `Pending`.

use crate::model::meeting::AttendeeStatus;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Response an attendee may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    #[serde(rename = "accepted")]
    Accept,
    #[serde(rename = "declined")]
    Decline,
}

impl Response {
    /// Parses a boundary-layer status string.
    ///
    /// Only `accepted` and `declined` are valid; `pending` cannot be chosen.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(Self::Accept),
            "declined" => Ok(Self::Decline),
            _ => Err(ValidationError::InvalidResponse(value.to_string())),
        }
    }

    /// State this response moves the attendee into.
    pub fn target(self) -> AttendeeStatus {
        match self {
            Self::Accept => AttendeeStatus::Accepted,
            Self::Decline => AttendeeStatus::Declined,
        }
    }

    /// Whether the caller must evaluate conflicts before transitioning.
    pub fn requires_conflict_check(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Transition refused because the target slot collides with the attendee's
/// committed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRejected {
    pub from: AttendeeStatus,
    pub to: AttendeeStatus,
}

impl Display for TransitionRejected {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot move invitation from {} to {}: schedule conflict",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl Error for TransitionRejected {}

/// Computes the next attendee state.
///
/// `conflicting` is only consulted for `Response::Accept`.
pub fn transition(
    current: AttendeeStatus,
    response: Response,
    conflicting: bool,
) -> Result<AttendeeStatus, TransitionRejected> {
    let target = response.target();
    if response.requires_conflict_check() && conflicting {
        return Err(TransitionRejected {
            from: current,
            to: target,
        });
    }
    Ok(target)
}

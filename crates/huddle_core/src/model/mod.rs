//! Domain model for meetings, attendees and user references.
//!
//! # Responsibility
//! - Define canonical data structures used by the scheduling core.
//! - Keep invariants checkable without storage access.
//!
//! # Invariants
//! - Every meeting is identified by a stable `MeetingId`.
//! - Meetings are hard-deleted by their organizer; there are no tombstones.

pub mod interval;
pub mod meeting;
pub mod user;
pub mod validation;

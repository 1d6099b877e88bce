//! Scheduling core for Huddle.
//! This crate is the single source of truth for meeting, invitation and
//! double-booking invariants.

pub mod authz;
pub mod conflict;
pub mod db;
pub mod directory;
pub mod invitation;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use authz::{can_modify, can_respond, can_view, MeetingAction};
pub use conflict::{committed_intervals, conflicts, first_conflict};
pub use directory::user_directory::{
    DirectoryError, DirectoryResult, SqliteUserDirectory, UserDirectory,
};
pub use invitation::{transition, Response, TransitionRejected};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::interval::Interval;
pub use model::meeting::{AttendeeEntry, AttendeeStatus, Meeting, MeetingId};
pub use model::user::{User, UserId};
pub use model::validation::ValidationError;
pub use repo::meeting_repo::{MeetingRepository, RepoError, RepoResult, SqliteMeetingRepository};
pub use service::scheduling_service::{
    MeetingDraft, MeetingPatch, ParticipantRole, SchedulerOptions, SchedulingError,
    SchedulingResult, SchedulingService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

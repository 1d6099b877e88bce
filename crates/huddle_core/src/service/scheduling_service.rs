//! Meeting scheduling use-case service.
//!
//! # Responsibility
//! - Orchestrate create/update/respond/delete/get/list over the repository
//!   and directory contracts.
//! - Enforce authorization and double-booking rules before any write.
//!
//! # Invariants
//! - Every command runs its read-check-write inside one repository unit of
//!   work; nothing is retried automatically.
//! - A participant's committed intervals never overlap a meeting they
//!   organize, and never overlap one they accept.
//! - Attendee status is only changed by that attendee through `respond`;
//!   `update` merely keeps, drops or adds roster entries.

use crate::authz::{self, MeetingAction};
use crate::conflict::{committed_intervals, first_conflict};
use crate::directory::user_directory::{DirectoryError, UserDirectory};
use crate::directory::{normalize_emails, normalize_search_limit};
use crate::invitation::{self, Response};
use crate::model::interval::Interval;
use crate::model::meeting::{AttendeeEntry, AttendeeStatus, Meeting, MeetingId};
use crate::model::user::{User, UserId};
use crate::model::validation::ValidationError;
use crate::repo::meeting_repo::{MeetingRepository, RepoError};
use log::{info, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Which side of a meeting hit a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Organizer,
    Attendee,
}

impl ParticipantRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Attendee => "attendee",
        }
    }
}

/// Errors surfaced by scheduling operations.
#[derive(Debug)]
pub enum SchedulingError {
    /// Caller-correctable input problem, surfaced verbatim.
    Validation(ValidationError),
    /// Candidate slot overlaps a committed interval of `user_id`.
    Conflict {
        role: ParticipantRole,
        user_id: UserId,
    },
    /// Actor lacks the role required for `action`.
    Unauthorized {
        action: MeetingAction,
        meeting_id: MeetingId,
    },
    NotFound(MeetingId),
    Repo(RepoError),
    Directory(DirectoryError),
}

impl SchedulingError {
    /// Stable category code for boundary layers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Repo(_) => "storage",
            Self::Directory(_) => "directory",
        }
    }
}

impl Display for SchedulingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict {
                role: ParticipantRole::Organizer,
                user_id,
            } => write!(
                f,
                "meeting conflicts with the organizer's existing schedule ({user_id})"
            ),
            Self::Conflict {
                role: ParticipantRole::Attendee,
                user_id,
            } => write!(
                f,
                "meeting conflicts with attendee {user_id}'s existing schedule"
            ),
            Self::Unauthorized { action, meeting_id } => write!(
                f,
                "not authorized to {} meeting {meeting_id}",
                action.as_str()
            ),
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Directory(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SchedulingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Directory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SchedulingError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for SchedulingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<DirectoryError> for SchedulingError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::UnknownUsers(emails) => {
                Self::Validation(ValidationError::UnknownAttendees(emails))
            }
            other => Self::Directory(other),
        }
    }
}

/// Behaviour switches for the scheduling service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerOptions {
    /// Re-run conflict detection for every `accepted` attendee when an
    /// update changes the roster or time window. Off by default: only the
    /// organizer is re-checked.
    pub revalidate_accepted_on_update: bool,
}

/// Input for `create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeetingDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_at: i64,
    pub end_at: i64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendee_emails: Vec<String>,
}

/// Partial update for `update`; `None` leaves a field untouched.
///
/// Every `Some` is applied literally so callers can clear fields: a blank
/// `description`/`location` removes it, and `attendee_emails` replaces the
/// whole roster, so `Some(vec![])` removes every attendee. Boundary layers
/// that treat empty form inputs as "unchanged" must send `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub location: Option<String>,
    pub attendee_emails: Option<Vec<String>>,
}

/// Scheduling facade over repository and directory implementations.
pub struct SchedulingService<R: MeetingRepository, D: UserDirectory> {
    repo: R,
    directory: D,
    options: SchedulerOptions,
}

impl<R: MeetingRepository, D: UserDirectory> SchedulingService<R, D> {
    pub fn new(repo: R, directory: D) -> Self {
        Self::with_options(repo, directory, SchedulerOptions::default())
    }

    pub fn with_options(repo: R, directory: D, options: SchedulerOptions) -> Self {
        Self {
            repo,
            directory,
            options,
        }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Proposes a new meeting organized by `actor`.
    ///
    /// # Contract
    /// - All attendees start `pending`.
    /// - Organizer is checked first, then attendees in roster order; the
    ///   first collision fails the whole call.
    pub fn create(&self, draft: &MeetingDraft, actor: UserId) -> SchedulingResult<Meeting> {
        let outcome = self.create_inner(draft, actor);
        log_outcome("meeting_create", None, &outcome);
        outcome
    }

    fn create_inner(&self, draft: &MeetingDraft, actor: UserId) -> SchedulingResult<Meeting> {
        let title = normalize_title(&draft.title)?;
        let candidate = Interval::new(draft.start_at, draft.end_at)?;
        let roster = self.resolve_roster(actor, &draft.attendee_emails)?;

        let mut meeting = Meeting::new(actor, title, draft.start_at, draft.end_at)?;
        meeting.description = normalize_optional_text(draft.description.as_deref());
        meeting.location = normalize_optional_text(draft.location.as_deref());
        meeting.attendees = roster.into_iter().map(AttendeeEntry::invited).collect();

        self.repo.in_unit_of_work(|| -> SchedulingResult<Meeting> {
            self.ensure_free(actor, ParticipantRole::Organizer, candidate, meeting.id)?;
            for entry in &meeting.attendees {
                self.ensure_free(
                    entry.user_id,
                    ParticipantRole::Attendee,
                    candidate,
                    meeting.id,
                )?;
            }
            Ok(self.repo.save(&meeting)?)
        })
    }

    /// Applies an organizer's edit.
    ///
    /// # Contract
    /// - Only the organizer may update.
    /// - Attendees kept in the roster retain their status; dropped ones lose
    ///   their entry; new ones enter `pending`.
    /// - Organizer is always re-checked for conflicts; accepted attendees
    ///   only when `SchedulerOptions::revalidate_accepted_on_update` is set.
    pub fn update(
        &self,
        id: MeetingId,
        patch: &MeetingPatch,
        actor: UserId,
    ) -> SchedulingResult<Meeting> {
        let outcome = self.repo.in_unit_of_work(|| -> SchedulingResult<Meeting> {
            let mut meeting = self.load(id)?;
            authz::require(
                authz::can_modify(&meeting, actor),
                MeetingAction::Update,
                id,
            )?;

            self.apply_patch(&mut meeting, patch)?;
            let candidate = meeting.interval()?;

            self.ensure_free(actor, ParticipantRole::Organizer, candidate, id)?;
            if self.options.revalidate_accepted_on_update {
                for entry in &meeting.attendees {
                    if entry.status == AttendeeStatus::Accepted {
                        self.ensure_free(
                            entry.user_id,
                            ParticipantRole::Attendee,
                            candidate,
                            id,
                        )?;
                    }
                }
            }

            Ok(self.repo.save(&meeting)?)
        });
        log_outcome("meeting_update", Some(id), &outcome);
        outcome
    }

    /// Records an attendee's response.
    ///
    /// Accepting re-runs conflict detection for the attendee; declining
    /// never fails on conflict.
    pub fn respond(
        &self,
        id: MeetingId,
        actor: UserId,
        response: Response,
    ) -> SchedulingResult<Meeting> {
        let outcome = self.repo.in_unit_of_work(|| -> SchedulingResult<Meeting> {
            let mut meeting = self.load(id)?;
            authz::require(
                authz::can_respond(&meeting, actor),
                MeetingAction::Respond,
                id,
            )?;

            let conflicting = if response.requires_conflict_check() {
                let candidate = meeting.interval()?;
                self.committed_conflict(actor, candidate, id)?.is_some()
            } else {
                false
            };

            let entry = meeting
                .attendee_mut(actor)
                .ok_or(SchedulingError::Unauthorized {
                    action: MeetingAction::Respond,
                    meeting_id: id,
                })?;
            entry.status =
                invitation::transition(entry.status, response, conflicting).map_err(|_| {
                    SchedulingError::Conflict {
                        role: ParticipantRole::Attendee,
                        user_id: actor,
                    }
                })?;

            Ok(self.repo.save(&meeting)?)
        });
        log_outcome("meeting_respond", Some(id), &outcome);
        outcome
    }

    /// Boundary helper: parses a raw status string before responding.
    pub fn respond_with_status(
        &self,
        id: MeetingId,
        actor: UserId,
        status: &str,
    ) -> SchedulingResult<Meeting> {
        let response = Response::parse(status)?;
        self.respond(id, actor, response)
    }

    /// Deletes a meeting; organizer only.
    pub fn delete(&self, id: MeetingId, actor: UserId) -> SchedulingResult<()> {
        let outcome = self.repo.in_unit_of_work(|| -> SchedulingResult<()> {
            let meeting = self.load(id)?;
            authz::require(
                authz::can_modify(&meeting, actor),
                MeetingAction::Delete,
                id,
            )?;
            Ok(self.repo.delete_by_id(id)?)
        });
        log_outcome("meeting_delete", Some(id), &outcome);
        outcome
    }

    /// Reads one meeting visible to `actor`.
    pub fn get(&self, id: MeetingId, actor: UserId) -> SchedulingResult<Meeting> {
        let meeting = self.load(id)?;
        authz::require(authz::can_view(&meeting, actor), MeetingAction::View, id)?;
        Ok(meeting)
    }

    /// Every meeting `actor` organizes or is invited to, earliest first.
    pub fn list(&self, actor: UserId) -> SchedulingResult<Vec<Meeting>> {
        let mut meetings = self.repo.find_for_participant(actor)?;
        meetings.sort_by_key(|meeting| (meeting.start_at, meeting.id));
        Ok(meetings)
    }

    /// Attendee lookup for invite pickers; never returns `actor`.
    pub fn search_users(
        &self,
        actor: UserId,
        query: &str,
        limit: Option<u32>,
    ) -> SchedulingResult<Vec<User>> {
        if query.trim().is_empty() {
            return Err(ValidationError::EmptySearchQuery.into());
        }
        let limit = normalize_search_limit(limit);
        Ok(self.directory.search_users(query, Some(actor), limit)?)
    }

    fn load(&self, id: MeetingId) -> SchedulingResult<Meeting> {
        self.repo
            .find_by_id(id)?
            .ok_or(SchedulingError::NotFound(id))
    }

    fn apply_patch(&self, meeting: &mut Meeting, patch: &MeetingPatch) -> SchedulingResult<()> {
        if let Some(title) = &patch.title {
            meeting.title = normalize_title(title)?;
        }
        if let Some(description) = &patch.description {
            meeting.description = normalize_optional_text(Some(description.as_str()));
        }
        if let Some(start_at) = patch.start_at {
            meeting.start_at = start_at;
        }
        if let Some(end_at) = patch.end_at {
            meeting.end_at = end_at;
        }
        if let Some(location) = &patch.location {
            meeting.location = normalize_optional_text(Some(location.as_str()));
        }
        if let Some(emails) = &patch.attendee_emails {
            let roster = self.resolve_roster(meeting.organizer, emails)?;
            meeting.attendees = merge_roster(&meeting.attendees, &roster);
        }

        meeting.validate()?;
        Ok(())
    }

    /// Resolves invite emails to user ids, rejecting the organizer.
    fn resolve_roster(
        &self,
        organizer: UserId,
        emails: &[String],
    ) -> SchedulingResult<Vec<UserId>> {
        let emails = normalize_emails(emails)?;
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let users = self.directory.resolve_by_emails(&emails)?;
        let mut roster: Vec<UserId> = Vec::with_capacity(users.len());
        for user in users {
            if user.id == organizer {
                return Err(ValidationError::OrganizerIsAttendee.into());
            }
            if !roster.contains(&user.id) {
                roster.push(user.id);
            }
        }
        Ok(roster)
    }

    fn committed_conflict(
        &self,
        participant: UserId,
        candidate: Interval,
        meeting_id: MeetingId,
    ) -> SchedulingResult<Option<Interval>> {
        let committed = self.repo.find_committed(participant, Some(meeting_id))?;
        let intervals = committed_intervals(participant, &committed, Some(meeting_id));
        Ok(first_conflict(candidate, &intervals))
    }

    fn ensure_free(
        &self,
        participant: UserId,
        role: ParticipantRole,
        candidate: Interval,
        meeting_id: MeetingId,
    ) -> SchedulingResult<()> {
        match self.committed_conflict(participant, candidate, meeting_id)? {
            None => Ok(()),
            Some(hit) => {
                warn!(
                    "event=conflict_detected module=scheduling status=rejected meeting_id={meeting_id} role={} user_id={participant} conflict_start={} conflict_end={}",
                    role.as_str(),
                    hit.start(),
                    hit.end()
                );
                Err(SchedulingError::Conflict {
                    role,
                    user_id: participant,
                })
            }
        }
    }
}

/// Rebuilds a roster from `roster` order, carrying over the status of users
/// already present in `previous`. Users absent from `roster` are dropped.
pub fn merge_roster(previous: &[AttendeeEntry], roster: &[UserId]) -> Vec<AttendeeEntry> {
    roster
        .iter()
        .map(|user_id| {
            previous
                .iter()
                .find(|entry| entry.user_id == *user_id)
                .cloned()
                .unwrap_or_else(|| AttendeeEntry::invited(*user_id))
        })
        .collect()
}

fn normalize_title(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

fn log_outcome<T: LoggedOutcome>(
    event: &str,
    meeting_id: Option<MeetingId>,
    outcome: &SchedulingResult<T>,
) {
    let meeting_id = outcome
        .as_ref()
        .ok()
        .and_then(LoggedOutcome::meeting_id)
        .or(meeting_id)
        .map_or_else(|| "-".to_string(), |id| id.to_string());

    match outcome {
        Ok(_) => info!("event={event} module=scheduling status=ok meeting_id={meeting_id}"),
        Err(err) => warn!(
            "event={event} module=scheduling status=error meeting_id={meeting_id} error_code={}",
            err.kind()
        ),
    }
}

trait LoggedOutcome {
    fn meeting_id(&self) -> Option<MeetingId>;
}

impl LoggedOutcome for Meeting {
    fn meeting_id(&self) -> Option<MeetingId> {
        Some(self.id)
    }
}

impl LoggedOutcome for () {
    fn meeting_id(&self) -> Option<MeetingId> {
        None
    }
}

//! Meeting repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the persistence operations the scheduling service consumes.
//! - Keep SQL and roster storage layout inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Meeting::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Attendee order is preserved through the `position` column.
//! - `in_unit_of_work` holds the SQLite writer lock for the whole closure.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{parse_stored_uuid, DbError};
use crate::model::meeting::{AttendeeEntry, AttendeeStatus, Meeting, MeetingId};
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MEETING_SELECT_SQL: &str = "SELECT
    m.uuid AS uuid,
    m.title AS title,
    m.description AS description,
    m.start_at AS start_at,
    m.end_at AS end_at,
    m.location AS location,
    m.organizer_uuid AS organizer_uuid,
    m.created_at AS created_at,
    m.updated_at AS updated_at
FROM meetings m";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for meeting persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Meeting handed to a write path violates model invariants.
    Validation(ValidationError),
    Db(DbError),
    NotFound(MeetingId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Stored row cannot be turned into a valid meeting.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "meeting repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted meeting data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract consumed by `SchedulingService`.
pub trait MeetingRepository {
    /// Meetings occupying `participant`'s calendar: organized by them or
    /// accepted by them, minus `exclude`.
    fn find_committed(
        &self,
        participant: UserId,
        exclude: Option<MeetingId>,
    ) -> RepoResult<Vec<Meeting>>;
    /// Meetings `participant` organizes or is invited to in any status,
    /// ordered by `start_at ASC, id ASC`.
    fn find_for_participant(&self, participant: UserId) -> RepoResult<Vec<Meeting>>;
    fn find_by_id(&self, id: MeetingId) -> RepoResult<Option<Meeting>>;
    /// Inserts or replaces one meeting and returns the stored read-back.
    fn save(&self, meeting: &Meeting) -> RepoResult<Meeting>;
    /// Hard-deletes one meeting and its roster.
    fn delete_by_id(&self, id: MeetingId) -> RepoResult<()>;
    /// Runs `work` as one exclusive read-check-write unit.
    ///
    /// Any `Err` from `work` discards every write made inside it.
    fn in_unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed meeting repository.
pub struct SqliteMeetingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeetingRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn query_meetings(
        &self,
        sql: &str,
        participant: UserId,
        exclude: Option<MeetingId>,
    ) -> RepoResult<Vec<Meeting>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params![
            participant.to_string(),
            exclude.map(|id| id.to_string())
        ])?;

        let mut meetings = Vec::new();
        while let Some(row) = rows.next()? {
            meetings.push(parse_meeting_row(row)?);
        }
        drop(rows);

        for meeting in &mut meetings {
            meeting.attendees = load_attendees(self.conn, meeting.id)?;
            ensure_valid(meeting)?;
        }
        Ok(meetings)
    }
}

impl MeetingRepository for SqliteMeetingRepository<'_> {
    fn find_committed(
        &self,
        participant: UserId,
        exclude: Option<MeetingId>,
    ) -> RepoResult<Vec<Meeting>> {
        let sql = format!(
            "{MEETING_SELECT_SQL}
             WHERE (?2 IS NULL OR m.uuid <> ?2)
               AND (
                 m.organizer_uuid = ?1
                 OR EXISTS (
                   SELECT 1
                   FROM meeting_attendees a
                   WHERE a.meeting_uuid = m.uuid
                     AND a.user_uuid = ?1
                     AND a.status = 'accepted'
                 )
               )
             ORDER BY m.start_at ASC, m.uuid ASC;"
        );
        self.query_meetings(&sql, participant, exclude)
    }

    fn find_for_participant(&self, participant: UserId) -> RepoResult<Vec<Meeting>> {
        let sql = format!(
            "{MEETING_SELECT_SQL}
             WHERE (?2 IS NULL OR m.uuid <> ?2)
               AND (
                 m.organizer_uuid = ?1
                 OR EXISTS (
                   SELECT 1
                   FROM meeting_attendees a
                   WHERE a.meeting_uuid = m.uuid
                     AND a.user_uuid = ?1
                 )
               )
             ORDER BY m.start_at ASC, m.uuid ASC;"
        );
        self.query_meetings(&sql, participant, None)
    }

    fn find_by_id(&self, id: MeetingId) -> RepoResult<Option<Meeting>> {
        load_meeting(self.conn, id)
    }

    fn save(&self, meeting: &Meeting) -> RepoResult<Meeting> {
        meeting.validate()?;

        // Joins the caller's unit of work when one is open.
        let tx = if self.conn.is_autocommit() {
            Some(Transaction::new_unchecked(
                self.conn,
                TransactionBehavior::Immediate,
            )?)
        } else {
            None
        };

        write_meeting(self.conn, meeting)?;

        if let Some(tx) = tx {
            tx.commit()?;
        }

        load_meeting(self.conn, meeting.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("meeting {} missing after save", meeting.id))
        })
    }

    fn delete_by_id(&self, id: MeetingId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM meetings WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn in_unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return work();
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        // Dropping `tx` on the error path rolls back.
        let outcome = work()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(outcome)
    }
}

fn write_meeting(conn: &Connection, meeting: &Meeting) -> RepoResult<()> {
    // organizer_uuid is fixed at insert; ownership never moves.
    conn.execute(
        "INSERT INTO meetings (
            uuid,
            title,
            description,
            start_at,
            end_at,
            location,
            organizer_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (uuid) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            start_at = excluded.start_at,
            end_at = excluded.end_at,
            location = excluded.location,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            meeting.id.to_string(),
            meeting.title.as_str(),
            meeting.description.as_deref(),
            meeting.start_at,
            meeting.end_at,
            meeting.location.as_deref(),
            meeting.organizer.to_string(),
        ],
    )?;

    conn.execute(
        "DELETE FROM meeting_attendees WHERE meeting_uuid = ?1;",
        [meeting.id.to_string()],
    )?;

    let mut insert = conn.prepare(
        "INSERT INTO meeting_attendees (meeting_uuid, user_uuid, status, position)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (position, entry) in meeting.attendees.iter().enumerate() {
        insert.execute(params![
            meeting.id.to_string(),
            entry.user_id.to_string(),
            entry.status.as_str(),
            position as i64,
        ])?;
    }

    Ok(())
}

fn load_meeting(conn: &Connection, id: MeetingId) -> RepoResult<Option<Meeting>> {
    let mut stmt = conn.prepare(&format!("{MEETING_SELECT_SQL} WHERE m.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut meeting = parse_meeting_row(row)?;
    meeting.attendees = load_attendees(conn, meeting.id)?;
    ensure_valid(&meeting)?;
    Ok(Some(meeting))
}

fn load_attendees(conn: &Connection, meeting_id: MeetingId) -> RepoResult<Vec<AttendeeEntry>> {
    let mut stmt = conn.prepare(
        "SELECT user_uuid, status
         FROM meeting_attendees
         WHERE meeting_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([meeting_id.to_string()])?;

    let mut attendees = Vec::new();
    while let Some(row) = rows.next()? {
        let user_text: String = row.get("user_uuid")?;
        let user_id = parse_stored_uuid(&user_text, "meeting_attendees.user_uuid")
            .map_err(RepoError::InvalidData)?;

        let status_text: String = row.get("status")?;
        let status = AttendeeStatus::parse(&status_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid attendee status `{status_text}` in meeting_attendees.status"
            ))
        })?;

        attendees.push(AttendeeEntry { user_id, status });
    }
    Ok(attendees)
}

/// Parses meeting columns; the roster is loaded separately.
fn parse_meeting_row(row: &Row<'_>) -> RepoResult<Meeting> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_stored_uuid(&uuid_text, "meetings.uuid").map_err(RepoError::InvalidData)?;

    let organizer_text: String = row.get("organizer_uuid")?;
    let organizer = parse_stored_uuid(&organizer_text, "meetings.organizer_uuid")
        .map_err(RepoError::InvalidData)?;

    Ok(Meeting {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        start_at: row.get("start_at")?,
        end_at: row.get("end_at")?,
        location: row.get("location")?,
        organizer,
        attendees: Vec::new(),
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
    })
}

fn ensure_valid(meeting: &Meeting) -> RepoResult<()> {
    meeting
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("meeting {}: {err}", meeting.id)))
}

//! User directory contract and SQLite implementation.

use crate::db::{parse_stored_uuid, DbError};
use crate::directory::normalize_email;
use crate::model::user::{User, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory lookup or registration failure.
#[derive(Debug)]
pub enum DirectoryError {
    /// Every email that matched no user, in request order.
    UnknownUsers(Vec<String>),
    /// Registration attempted with an email that already exists.
    DuplicateEmail(String),
    /// Registration input rejected before touching storage.
    InvalidInput(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUsers(emails) => write!(f, "unknown users: {}", emails.join(", ")),
            Self::DuplicateEmail(email) => write!(f, "user already registered: {email}"),
            Self::InvalidInput(message) => write!(f, "invalid user input: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for DirectoryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DirectoryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Identity lookups consumed by `SchedulingService`.
pub trait UserDirectory {
    /// Resolves normalized emails to users in input order.
    ///
    /// Fails with `UnknownUsers` listing every unresolved email; partial
    /// results are never returned.
    fn resolve_by_emails(&self, emails: &[String]) -> DirectoryResult<Vec<User>>;
    /// Case-insensitive substring match on email or name.
    fn search_users(
        &self,
        query: &str,
        exclude: Option<UserId>,
        limit: u32,
    ) -> DirectoryResult<Vec<User>>;
}

/// SQLite-backed directory over the `users` table.
pub struct SqliteUserDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers one user. Seeding/administration path, not used by the
    /// scheduling core.
    pub fn register_user(&self, email: &str, name: &str) -> DirectoryResult<User> {
        let email =
            normalize_email(email).map_err(|err| DirectoryError::InvalidInput(err.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::InvalidInput(
                "name must not be blank".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
        };
        // `users.email` is UNIQUE; the insert is the only duplicate check.
        let inserted = self.conn.execute(
            "INSERT INTO users (uuid, email, name) VALUES (?1, ?2, ?3);",
            params![user.id.to_string(), user.email.as_str(), user.name.as_str()],
        );
        match inserted {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => {
                Err(DirectoryError::DuplicateEmail(user.email))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let found = self
            .conn
            .query_row(
                "SELECT uuid, email, name FROM users WHERE email = ?1;",
                [email],
                |row| Ok(read_user_columns(row)),
            )
            .optional()?;
        found.transpose()
    }
}

impl UserDirectory for SqliteUserDirectory<'_> {
    fn resolve_by_emails(&self, emails: &[String]) -> DirectoryResult<Vec<User>> {
        let mut users = Vec::with_capacity(emails.len());
        let mut unknown = Vec::new();

        for email in emails {
            match self.find_by_email(email)? {
                Some(user) => users.push(user),
                None => unknown.push(email.clone()),
            }
        }

        if !unknown.is_empty() {
            return Err(DirectoryError::UnknownUsers(unknown));
        }
        Ok(users)
    }

    fn search_users(
        &self,
        query: &str,
        exclude: Option<UserId>,
        limit: u32,
    ) -> DirectoryResult<Vec<User>> {
        let needle = fold_case(query.trim());
        let matches = |value: &str| fold_case(value).contains(&needle);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        // SQLite `lower()` folds ASCII only, so matching happens here.
        let mut stmt = self.conn.prepare(
            "SELECT uuid, email, name
             FROM users
             WHERE (?1 IS NULL OR uuid <> ?1)
             ORDER BY name ASC, email ASC;",
        )?;
        let mut rows = stmt.query([exclude.map(|id| id.to_string())])?;

        let mut users = Vec::new();
        while users.len() < limit {
            let Some(row) = rows.next()? else {
                break;
            };
            let user = read_user_columns(row)?;
            if matches(&user.email) || matches(&user.name) {
                users.push(user);
            }
        }
        Ok(users)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

fn read_user_columns(row: &Row<'_>) -> DirectoryResult<User> {
    let uuid_text: String = row.get(0)?;
    let id = parse_stored_uuid(&uuid_text, "users.uuid").map_err(DirectoryError::InvalidData)?;
    Ok(User {
        id,
        email: row.get(1)?,
        name: row.get(2)?,
    })
}

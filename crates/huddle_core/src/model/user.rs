//! User reference owned by the external identity directory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, already-verified user identity.
pub type UserId = Uuid;

/// Directory record resolved for attendee lookup.
///
/// Core never creates or mutates users; it only reads them through
/// `UserDirectory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lowercase, trimmed address.
    pub email: String,
    pub name: String,
}

//! Identity directory contract and reference adapter.
//!
//! # Responsibility
//! - Resolve attendee emails to user identities for the scheduling core.
//! - Offer attendee lookup for invite pickers.
//!
//! # Invariants
//! - Emails are compared in normalized form (trimmed, lowercase).
//! - Core never mutates users through the trait; seeding goes through the
//!   adapter's inherent API.

pub mod user_directory;

use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const MAX_SEARCH_LIMIT: u32 = 50;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Normalizes one email for lookup and storage.
pub fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ValidationError::MalformedEmail(value.to_string()));
    }
    Ok(normalized)
}

/// Normalizes a roster: each email normalized, duplicates dropped, first
/// occurrence order kept.
pub fn normalize_emails(values: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut normalized: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let email = normalize_email(value)?;
        if !normalized.contains(&email) {
            normalized.push(email);
        }
    }
    Ok(normalized)
}

/// Clamps search page size into `1..=MAX_SEARCH_LIMIT`.
pub fn normalize_search_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT)
}

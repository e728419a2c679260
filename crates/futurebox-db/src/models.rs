//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the futurebox-types models so the DB layer stays independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use futurebox_types::models::{Capsule, User};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

pub struct CapsuleRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub open_at: String,
    pub created_at: String,
    pub is_opened: bool,
    pub opened_at: Option<String>,
}

/// A capsule row joined with its owner's email, for the public feed.
pub struct PublicCapsuleRow {
    pub capsule: CapsuleRow,
    pub owner_email: Option<String>,
}

/// Insert payload. `content` must already be sealed.
pub struct NewCapsule<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: &'a str,
    pub content: &'a str,
    pub open_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Timestamps are stored as fixed-width RFC 3339 UTC so that string order
/// in SQL is time order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Corrupt timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("Corrupt id '{}'", raw))
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            created_at: parse_ts(&self.created_at)?,
            email: self.email,
        })
    }
}

impl CapsuleRow {
    pub fn into_capsule(self) -> Result<Capsule> {
        let opened_at = self.opened_at.as_deref().map(parse_ts).transpose()?;

        Ok(Capsule {
            id: parse_id(&self.id)?,
            owner_id: parse_id(&self.user_id)?,
            open_at: parse_ts(&self.open_at)?,
            created_at: parse_ts(&self.created_at)?,
            is_opened: self.is_opened,
            opened_at,
            title: self.title,
            content_ciphertext: self.content,
        })
    }
}

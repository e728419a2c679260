use crate::Database;
use crate::models::{CapsuleRow, NewCapsule, PublicCapsuleRow, UserRow, format_ts};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

const CAPSULE_COLUMNS: &str =
    "c.id, c.user_id, c.title, c.content, c.open_at, c.created_at, c.is_opened, c.opened_at";

impl Database {
    // -- Users --

    /// Single atomic insert. Returns `false` when the email is already
    /// registered, so two racing signups cannot both succeed.
    pub fn create_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), email, password_hash, format_ts(created_at)),
            );

            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    // -- Capsules --

    pub fn insert_capsule(&self, capsule: &NewCapsule<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO capsules (id, user_id, title, content, open_at, created_at, is_opened)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                rusqlite::params![
                    capsule.id.to_string(),
                    capsule.owner_id.to_string(),
                    capsule.title,
                    capsule.content,
                    format_ts(capsule.open_at),
                    format_ts(capsule.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_capsule(&self, id: Uuid) -> Result<Option<CapsuleRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM capsules c WHERE c.id = ?1", CAPSULE_COLUMNS);
            conn.query_row(&sql, [id.to_string()], capsule_from_row)
                .optional()
        })
    }

    /// All of one owner's capsules, newest first.
    pub fn list_capsules_by_owner(&self, owner_id: Uuid) -> Result<Vec<CapsuleRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM capsules c
                 WHERE c.user_id = ?1
                 ORDER BY c.created_at DESC, c.rowid DESC",
                CAPSULE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id.to_string()], capsule_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One page of everyone else's capsules, newest first, with the total
    /// count taken under the same lock. `exclude_owner = None` lists all.
    pub fn list_public_capsules(
        &self,
        exclude_owner: Option<Uuid>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<PublicCapsuleRow>, u64)> {
        let exclude = exclude_owner.map(|id| id.to_string());

        self.with_conn(|conn| {
            // JOIN users to fetch the owner's email in a single query
            let sql = format!(
                "SELECT {}, u.email
                 FROM capsules c
                 LEFT JOIN users u ON c.user_id = u.id
                 WHERE (?1 IS NULL OR c.user_id != ?1)
                 ORDER BY c.created_at DESC, c.rowid DESC
                 LIMIT ?2 OFFSET ?3",
                CAPSULE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let offset = i64::try_from(offset)?;
            let rows = stmt
                .query_map(rusqlite::params![exclude, limit, offset], |row| {
                    Ok(PublicCapsuleRow {
                        capsule: capsule_from_row(row)?,
                        owner_email: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM capsules WHERE (?1 IS NULL OR user_id != ?1)",
                [&exclude],
                |row| row.get(0),
            )?;

            Ok((rows, u64::try_from(total)?))
        })
    }

    /// Conditional sealed -> opened transition. Only one caller can win:
    /// the row must belong to `owner_id`, still be sealed, and be due.
    /// Returns whether this call performed the transition.
    pub fn mark_capsule_opened(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let now = format_ts(now);
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE capsules SET is_opened = 1, opened_at = ?3
                 WHERE id = ?1 AND user_id = ?2 AND is_opened = 0 AND open_at <= ?3",
                (id.to_string(), owner_id.to_string(), now),
            )?;
            Ok(changed == 1)
        })
    }

    /// Hard delete scoped to the owner. Returns whether a row was removed.
    pub fn delete_capsule(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM capsules WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), owner_id.to_string()),
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, email, password_hash, created_at FROM users WHERE email = ?1")?;

    stmt.query_row([email], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    })
    .optional()
}

fn capsule_from_row(row: &Row<'_>) -> rusqlite::Result<CapsuleRow> {
    Ok(CapsuleRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        open_at: row.get(4)?,
        created_at: row.get(5)?,
        is_opened: row.get(6)?,
        opened_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

//! Capsule lifecycle and visibility.
//!
//! A capsule is created sealed, may be opened exactly once by its owner
//! after `open_at`, and may be deleted by its owner at any time. Everyone
//! else only ever sees a [`PublicProjection`]. Plaintext is produced in
//! [`CapsuleService::open`] and [`CapsuleService::reveal`] and nowhere else.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use futurebox_crypto::ContentSealer;
use futurebox_db::{Database, NewCapsule};
use futurebox_types::api::OpenedCapsule;
use futurebox_types::models::Capsule;
use futurebox_types::visibility::{
    OwnerProjection, PUBLIC_PAGE_SIZE, Page, PublicProjection, page_offset,
};

use crate::error::AppError;
use crate::identity::{Identity, Viewer};

#[derive(Clone)]
pub struct CapsuleService {
    db: Arc<Database>,
    sealer: ContentSealer,
}

impl CapsuleService {
    pub fn new(db: Arc<Database>, sealer: ContentSealer) -> Self {
        Self { db, sealer }
    }

    pub fn create(
        &self,
        owner: &Identity,
        title: &str,
        content: &str,
        open_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<OwnerProjection, AppError> {
        let now = stored_precision(now);
        let open_at = stored_precision(open_at);

        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::validation("Title and message are both required"));
        }
        if open_at <= now {
            return Err(AppError::validation("The opening time must be in the future"));
        }

        let sealed = self
            .sealer
            .seal(owner.user_id, content)
            .map_err(AppError::Crypto)?;

        let capsule = Capsule {
            id: Uuid::new_v4(),
            owner_id: owner.user_id,
            title: title.to_string(),
            content_ciphertext: sealed,
            created_at: now,
            open_at,
            is_opened: false,
            opened_at: None,
        };

        self.db.insert_capsule(&NewCapsule {
            id: capsule.id,
            owner_id: capsule.owner_id,
            title: &capsule.title,
            content: &capsule.content_ciphertext,
            open_at: capsule.open_at,
            created_at: capsule.created_at,
        })?;

        info!(capsule_id = %capsule.id, owner_id = %owner.user_id, %open_at, "Capsule sealed");
        Ok(OwnerProjection::new(&capsule, now))
    }

    /// Owner-only, once, and not before `open_at`.
    pub fn open(
        &self,
        owner: &Identity,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OpenedCapsule, AppError> {
        let now = stored_precision(now);
        let capsule = self.load_owned(owner, id)?;

        if capsule.is_opened {
            return Err(AppError::AlreadyOpened);
        }
        if !capsule.is_unlock_eligible(now) {
            return Err(AppError::NotYetUnlockable(capsule.open_at));
        }

        // Unseal before the transition so a capsule never ends up opened
        // with unreadable content.
        let content = self.unseal(&capsule)?;

        if !self.db.mark_capsule_opened(id, owner.user_id, now)? {
            // Lost a race with another session of the same owner, or the
            // row changed underneath us.
            return Err(match self.db.get_capsule(id)? {
                None => AppError::NotFound,
                Some(row) if row.is_opened => AppError::AlreadyOpened,
                Some(_) => AppError::NotYetUnlockable(capsule.open_at),
            });
        }

        info!(capsule_id = %id, owner_id = %owner.user_id, "Capsule opened");
        Ok(OpenedCapsule {
            id,
            title: capsule.title,
            content,
            created_at: capsule.created_at,
            open_at: capsule.open_at,
            opened_at: now,
        })
    }

    /// Re-read an already opened capsule. Never opens anything.
    pub fn reveal(
        &self,
        owner: &Identity,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OpenedCapsule, AppError> {
        let capsule = self.load_owned(owner, id)?;

        let Some(opened_at) = capsule.opened_at.filter(|_| capsule.is_opened) else {
            return Err(if capsule.is_unlock_eligible(now) {
                AppError::NotOpened
            } else {
                AppError::NotYetUnlockable(capsule.open_at)
            });
        };

        let content = self.unseal(&capsule)?;
        Ok(OpenedCapsule {
            id,
            title: capsule.title,
            content,
            created_at: capsule.created_at,
            open_at: capsule.open_at,
            opened_at,
        })
    }

    /// Permanent. There is no soft delete.
    pub fn delete(&self, owner: &Identity, id: Uuid) -> Result<(), AppError> {
        if self.db.delete_capsule(id, owner.user_id)? {
            info!(capsule_id = %id, owner_id = %owner.user_id, "Capsule deleted");
            return Ok(());
        }

        match self.db.get_capsule(id)? {
            None => Err(AppError::NotFound),
            Some(_) => {
                warn!(capsule_id = %id, caller = %owner.user_id, "Delete refused: not the owner");
                Err(AppError::Authorization)
            }
        }
    }

    /// "My capsules": every capsule the owner has, newest first.
    pub fn list_mine(
        &self,
        owner: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Vec<OwnerProjection>, AppError> {
        self.db
            .list_capsules_by_owner(owner.user_id)?
            .into_iter()
            .map(|row| -> Result<OwnerProjection, AppError> {
                Ok(OwnerProjection::new(&row.into_capsule()?, now))
            })
            .collect()
    }

    /// "Others' capsules": everything not owned by the viewer, newest
    /// first, one page at a time. Anonymous viewers see every capsule.
    pub fn list_others(
        &self,
        viewer: &Viewer,
        page: u32,
    ) -> Result<Page<PublicProjection>, AppError> {
        let offset = page_offset(page, PUBLIC_PAGE_SIZE)
            .ok_or_else(|| AppError::validation("Page numbers start at 1"))?;

        let (rows, total) =
            self.db
                .list_public_capsules(viewer.user_id(), PUBLIC_PAGE_SIZE, offset)?;

        let items = rows
            .into_iter()
            .map(|row| -> Result<PublicProjection, AppError> {
                let capsule = row.capsule.into_capsule()?;
                Ok(PublicProjection::new(&capsule, row.owner_email.as_deref()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, page, PUBLIC_PAGE_SIZE, total))
    }

    fn load_owned(&self, owner: &Identity, id: Uuid) -> Result<Capsule, AppError> {
        let capsule = self
            .db
            .get_capsule(id)?
            .ok_or(AppError::NotFound)?
            .into_capsule()?;

        if !capsule.is_owned_by(owner.user_id) {
            warn!(capsule_id = %id, caller = %owner.user_id, "Refused: not the owner");
            return Err(AppError::Authorization);
        }
        Ok(capsule)
    }

    fn unseal(&self, capsule: &Capsule) -> Result<String, AppError> {
        self.sealer
            .unseal(capsule.owner_id, &capsule.content_ciphertext)
            .map_err(AppError::Crypto)
    }
}

/// Timestamps are persisted with microsecond precision; work at that
/// precision throughout so returned values match stored ones.
fn stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

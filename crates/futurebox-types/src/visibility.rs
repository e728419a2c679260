use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Capsule, CapsuleStatus};

/// Page size of the public "others' capsules" feed.
pub const PUBLIC_PAGE_SIZE: u32 = 6;

/// Shown in place of an owner whose email is unknown.
pub const ANONYMOUS_OWNER: &str = "anonymous";

const MASK_CHAR: char = '*';

/// Redact an email for display to non-owners.
///
/// Keeps the first two characters of the local part and masks the rest.
/// A local part of two characters or fewer is returned unmasked; this is
/// a display nicety, not a privacy guarantee.
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return ANONYMOUS_OWNER.to_string();
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (email, None),
    };

    let local_len = local.chars().count();
    if local_len <= 2 {
        return email.to_string();
    }

    let mut masked: String = local.chars().take(2).collect();
    masked.extend(std::iter::repeat_n(MASK_CHAR, local_len - 2));
    if let Some(domain) = domain {
        masked.push('@');
        masked.push_str(domain);
    }
    masked
}

/// What the owner sees of their own capsule in a listing.
/// Content is only reachable through the open path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProjection {
    pub id: Uuid,
    pub title: String,
    pub open_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub status: CapsuleStatus,
}

impl OwnerProjection {
    pub fn new(capsule: &Capsule, now: DateTime<Utc>) -> Self {
        Self {
            id: capsule.id,
            title: capsule.title.clone(),
            open_at: capsule.open_at,
            created_at: capsule.created_at,
            is_opened: capsule.is_opened,
            opened_at: capsule.opened_at,
            status: capsule.status(now),
        }
    }
}

/// What everyone else sees: existence, timing and a masked owner.
/// Never the title or content, opened or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProjection {
    pub id: Uuid,
    pub open_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_opened: bool,
    pub owner: String,
}

impl PublicProjection {
    pub fn new(capsule: &Capsule, owner_email: Option<&str>) -> Self {
        Self {
            id: capsule.id,
            open_at: capsule.open_at,
            created_at: capsule.created_at,
            is_opened: capsule.is_opened,
            owner: owner_email.map_or_else(|| ANONYMOUS_OWNER.to_string(), mask_email),
        }
    }
}

/// One page of a listing plus what a client needs to draw the pager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub page_count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
            page_count: page_count(total, page_size),
        }
    }
}

/// `ceil(total / page_size)`; zero when there is nothing to page.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

/// Row offset of a 1-indexed page, or `None` for page 0.
pub fn page_offset(page: u32, page_size: u32) -> Option<u64> {
    page.checked_sub(1)
        .map(|p| u64::from(p) * u64::from(page_size))
}

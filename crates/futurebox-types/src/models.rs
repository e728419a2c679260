use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A sealed message as held by the store.
///
/// Not `Serialize`: the ciphertext never leaves the server. Listings go
/// through the projections in [`crate::visibility`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capsule {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content_ciphertext: String,
    pub created_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
}

/// Where a capsule sits in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleStatus {
    /// `open_at` has not been reached yet.
    Sealed,
    /// Unlock time has passed; the owner may open it.
    Openable,
    /// Opened by the owner. Terminal.
    Opened,
}

impl Capsule {
    /// The single rule governing "can be opened": not yet opened and the
    /// unlock instant has been reached.
    pub fn is_unlock_eligible(&self, now: DateTime<Utc>) -> bool {
        !self.is_opened && self.open_at <= now
    }

    pub fn status(&self, now: DateTime<Utc>) -> CapsuleStatus {
        if self.is_opened {
            CapsuleStatus::Opened
        } else if self.is_unlock_eligible(now) {
            CapsuleStatus::Openable
        } else {
            CapsuleStatus::Sealed
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sealed_capsule(open_at: DateTime<Utc>) -> Capsule {
        Capsule {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "letter".into(),
            content_ciphertext: "opaque".into(),
            created_at: open_at - Duration::days(30),
            open_at,
            is_opened: false,
            opened_at: None,
        }
    }

    #[test]
    fn eligibility_boundaries() {
        let open_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let capsule = sealed_capsule(open_at);

        assert!(!capsule.is_unlock_eligible(open_at - Duration::seconds(1)));
        assert!(capsule.is_unlock_eligible(open_at));
        assert!(capsule.is_unlock_eligible(open_at + Duration::seconds(1)));
    }

    #[test]
    fn opened_capsule_is_never_eligible() {
        let open_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut capsule = sealed_capsule(open_at);
        capsule.is_opened = true;
        capsule.opened_at = Some(open_at);

        assert!(!capsule.is_unlock_eligible(open_at));
        assert!(!capsule.is_unlock_eligible(open_at + Duration::days(365)));
    }

    #[test]
    fn status_follows_lifecycle() {
        let open_at = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let mut capsule = sealed_capsule(open_at);

        assert_eq!(capsule.status(open_at - Duration::minutes(1)), CapsuleStatus::Sealed);
        assert_eq!(capsule.status(open_at), CapsuleStatus::Openable);

        capsule.is_opened = true;
        capsule.opened_at = Some(open_at + Duration::hours(1));
        assert_eq!(capsule.status(open_at + Duration::hours(2)), CapsuleStatus::Opened);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Session token claims. The token replaces a client-side session store:
/// whoever presents it is the identity passed into every capsule operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Capsules --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCapsuleRequest {
    pub title: String,
    pub content: String,
    pub open_at: DateTime<Utc>,
}

/// Plaintext view of a capsule, produced only for its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenedCapsule {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub open_at: DateTime<Utc>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

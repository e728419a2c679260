use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::error;

use futurebox_types::api::ErrorBody;

/// Everything a FutureBox operation can fail with. Each variant renders as
/// a user-facing message; none of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Only the owner of this capsule can do that")]
    Authorization,

    #[error("Capsule not found")]
    NotFound,

    #[error("This capsule stays sealed until {0}")]
    NotYetUnlockable(DateTime<Utc>),

    #[error("This capsule has already been opened")]
    AlreadyOpened,

    #[error("This capsule is ready but has not been opened yet")]
    NotOpened,

    #[error("This email is already in use")]
    DuplicateEmail,

    /// Same message for unknown email and wrong password.
    #[error("Email or password does not match")]
    InvalidCredentials,

    #[error("Capsule content could not be processed")]
    Crypto(#[source] anyhow::Error),

    #[error("The service is temporarily unavailable, please try again")]
    BackendUnavailable(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyOpened | Self::NotOpened | Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::NotYetUnlockable(_) => StatusCode::LOCKED,
            Self::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// Extractor rejections render as `Validation` with the JSON error body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Crypto(e) => error!("Capsule crypto failure: {:#}", e),
            Self::BackendUnavailable(e) => error!("Backend failure: {:#}", e),
            _ => {}
        }

        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

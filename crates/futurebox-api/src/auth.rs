use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use futurebox_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::accounts::AccountService;
use crate::error::AppError;
use crate::identity::{Clock, Identity};
use crate::lifecycle::CapsuleService;
use crate::session::SessionKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub accounts: AccountService,
    pub capsules: CapsuleService,
    pub sessions: SessionKeys,
    pub clock: Arc<dyn Clock>,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let now = state.clock.now();

    // Argon2 and SQLite both block; keep them off the async runtime
    let accounts = state.accounts.clone();
    let identity =
        blocking(move || accounts.sign_up(&req.email, &req.password, now)).await?;

    let token = issue_token(&state, &identity)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: identity.user_id,
            email: identity.email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let accounts = state.accounts.clone();
    let identity = blocking(move || accounts.sign_in(&req.email, &req.password)).await?;

    let token = issue_token(&state, &identity)?;
    Ok(Json(AuthResponse {
        user_id: identity.user_id,
        email: identity.email,
        token,
    }))
}

fn issue_token(state: &AppState, identity: &Identity) -> Result<String, AppError> {
    state
        .sessions
        .issue(identity, state.clock.now())
        .map_err(AppError::BackendUnavailable)
}

/// Run blocking work on the blocking pool and flatten the join error.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::BackendUnavailable(e.into())
    })?
}

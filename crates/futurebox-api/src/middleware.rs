use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::identity::{Identity, Viewer};

/// Extract and validate the session token from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    let identity = verify(&state, token)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Like [`require_auth`] but lets anonymous callers through as
/// [`Viewer::Anonymous`]. A token that is present but invalid is still
/// rejected.
pub async fn identify_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let viewer = match bearer_token(req.headers()) {
        Some(token) => Viewer::User(verify(&state, token)?),
        None if req.headers().contains_key(header::AUTHORIZATION) => {
            return Err(StatusCode::UNAUTHORIZED);
        }
        None => Viewer::Anonymous,
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn verify(state: &AppState, token: &str) -> Result<Identity, StatusCode> {
    state
        .sessions
        .verify(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

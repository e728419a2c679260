use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use futurebox_types::api::{CreateCapsuleRequest, PageQuery};

use crate::auth::{AppState, blocking};
use crate::error::AppError;
use crate::identity::{Identity, Viewer};

/// POST /capsules
pub async fn create_capsule(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateCapsuleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let now = state.clock.now();
    let capsules = state.capsules.clone();

    let created = blocking(move || {
        capsules.create(&identity, &req.title, &req.content, req.open_at, now)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /capsules/mine
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.now();
    let capsules = state.capsules.clone();

    let mine = blocking(move || capsules.list_mine(&identity, now)).await?;
    Ok(Json(mine))
}

/// GET /capsules/public?page=N
pub async fn list_public(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let capsules = state.capsules.clone();

    let page = blocking(move || capsules.list_others(&viewer, query.page)).await?;
    Ok(Json(page))
}

/// POST /capsules/{id}/open
pub async fn open_capsule(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let now = state.clock.now();
    let capsules = state.capsules.clone();

    let opened = blocking(move || capsules.open(&identity, id, now)).await?;
    Ok(Json(opened))
}

/// GET /capsules/{id}/content
pub async fn reveal_capsule(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let now = state.clock.now();
    let capsules = state.capsules.clone();

    let opened = blocking(move || capsules.reveal(&identity, id, now)).await?;
    Ok(Json(opened))
}

/// DELETE /capsules/{id}
pub async fn delete_capsule(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let capsules = state.capsules.clone();

    blocking(move || capsules.delete(&identity, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

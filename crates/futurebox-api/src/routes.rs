use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::capsules;
use crate::middleware::{identify_viewer, require_auth};

/// The whole HTTP surface, ready to serve.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let feed_routes = Router::new()
        .route("/capsules/public", get(capsules::list_public))
        .route_layer(middleware::from_fn_with_state(state.clone(), identify_viewer));

    let protected_routes = Router::new()
        .route("/capsules", post(capsules::create_capsule))
        .route("/capsules/mine", get(capsules::list_mine))
        .route("/capsules/{id}", delete(capsules::delete_capsule))
        .route("/capsules/{id}/open", post(capsules::open_capsule))
        .route("/capsules/{id}/content", get(capsules::reveal_capsule))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(feed_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

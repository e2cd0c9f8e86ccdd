// Thin namespace wrapper for API-layer components
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod handlers {
    pub use crate::handlers::*;
}

use crate::handlers::AppState;

/// Decision endpoints, without state or protection layers.
///
/// `main` wraps these in body-size and rate limits before passing them to [`router`].
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/snapshot", get(handlers::snapshot))
        .route("/api/v1/profile/options", get(handlers::profile_options))
}

/// Full application: health check (never rate limited) plus `api`.
pub fn router(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

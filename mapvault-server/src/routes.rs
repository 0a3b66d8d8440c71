//! Route configuration.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.ingestor.max_bytes().saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        .route("/upload", post(handlers::upload_file))
        .route("/upload/{file_name}", get(handlers::get_file))
        .route("/files", get(handlers::list_files))
        .route("/profile", get(handlers::get_profile))
        .route(
            "/markers",
            get(handlers::list_markers).post(handlers::create_marker),
        )
        .route(
            "/markers/{id}",
            get(handlers::get_marker)
                .put(handlers::update_marker)
                .delete(handlers::delete_marker),
        )
        .route(
            "/shapes",
            get(handlers::list_shapes).post(handlers::create_shape),
        )
        .route(
            "/shapes/{id}",
            get(handlers::get_shape)
                .put(handlers::update_shape)
                .delete(handlers::delete_shape),
        )
        // Every /api request is authenticated before routing reaches a handler.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

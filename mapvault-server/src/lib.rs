//! HTTP API server for mapvault.
//!
//! This crate provides the HTTP surface:
//! - Multipart upload, retrieval and listing of geospatial files
//! - Owner-scoped marker and shape CRUD
//! - Profile summary
//! - Bearer-token authentication for everything under `/api`
//!
//! Store, blob and parse work is blocking and runs on Tokio's blocking pool.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{AuthenticatedOwner, hash_token, issue_token};
pub use bootstrap::{BootstrapError, OpenedStores, open_state, open_stores};
pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;

/// Serve `state` on `config.bind` until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir,
        policy = %config.retrieval_policy,
        "mapvault listening"
    );
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

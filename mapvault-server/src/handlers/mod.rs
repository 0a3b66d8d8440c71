//! HTTP request handlers.

pub mod files;
pub mod health;
pub mod markers;
pub mod profile;
pub mod shapes;

pub use files::*;
pub use health::*;
pub use markers::*;
pub use profile::*;
pub use shapes::*;

use crate::error::{ApiError, ApiResult};

/// Run blocking store, blob or parse work on the blocking pool.
pub async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(format!("background task failed: {err}")))?
}

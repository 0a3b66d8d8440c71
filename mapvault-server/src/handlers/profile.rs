//! Per-owner summary.

use axum::Json;
use axum::extract::{Extension, State};
use mapvault_core::OwnerId;
use serde::Serialize;

use super::blocking;
use crate::auth::AuthenticatedOwner;
use crate::error::ApiResult;
use crate::state::AppState;

/// Counts of everything the caller owns.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// The caller.
    pub user_id: OwnerId,
    /// Uploaded files.
    pub files_count: u64,
    /// Stored shapes.
    pub shapes_count: u64,
    /// Stored markers.
    pub markers_count: u64,
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = blocking(move || {
        Ok(ProfileResponse {
            files_count: state.files.count_files(&owner)?,
            shapes_count: state.annotations.count_shapes(&owner)?,
            markers_count: state.annotations.count_markers(&owner)?,
            user_id: owner,
        })
    })
    .await?;
    Ok(Json(profile))
}

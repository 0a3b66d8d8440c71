//! Owner-scoped marker CRUD.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use mapvault_core::{
    AnnotationError, Marker, MarkerDraft, MarkerPatch, MarkerPosition, Properties, RecordId,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::blocking;
use crate::auth::AuthenticatedOwner;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MARKER_NOT_FOUND: &str = "Marker not found";

/// Marker create/update payload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarkerRequest {
    /// `[lat, lng]`.
    pub coordinates: Option<Vec<f64>>,
    /// Free-form properties.
    pub properties: Option<Properties>,
}

/// Response to a marker deletion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDeleted {
    /// Fixed confirmation text.
    pub message: &'static str,
    /// Identifier of the removed marker.
    pub marker_id: RecordId,
}

fn position(ordinates: Option<&[f64]>) -> Result<Option<MarkerPosition>, AnnotationError> {
    ordinates.map(MarkerPosition::from_ordinates).transpose()
}

fn marker_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::parse(raw).ok_or(ApiError::NotFound(MARKER_NOT_FOUND))
}

/// GET /api/markers
pub async fn list_markers(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
) -> ApiResult<Json<Vec<Marker>>> {
    let markers = blocking(move || Ok(state.annotations.markers_for_owner(&owner)?)).await?;
    Ok(Json(markers))
}

/// POST /api/markers
pub async fn create_marker(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    payload: Result<Json<MarkerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Marker>)> {
    let Json(request) = payload?;
    let coordinates = position(request.coordinates.as_deref())?.ok_or(
        AnnotationError::MissingField {
            field: "coordinates",
        },
    )?;
    let draft = MarkerDraft {
        coordinates,
        properties: request.properties.unwrap_or_default(),
    };
    let marker = Marker::create(owner, draft, OffsetDateTime::now_utc());
    let stored = marker.clone();
    blocking(move || Ok(state.annotations.insert_marker(&stored)?)).await?;
    Ok((StatusCode::CREATED, Json(marker)))
}

/// GET /api/markers/{id}
pub async fn get_marker(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
) -> ApiResult<Json<Marker>> {
    let id = marker_id(&id)?;
    blocking(move || Ok(state.annotations.find_marker(&owner, id)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(MARKER_NOT_FOUND))
}

/// PUT /api/markers/{id}
pub async fn update_marker(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
    payload: Result<Json<MarkerRequest>, JsonRejection>,
) -> ApiResult<Json<Marker>> {
    let id = marker_id(&id)?;
    let Json(request) = payload?;
    let patch = MarkerPatch {
        coordinates: position(request.coordinates.as_deref())?,
        properties: request.properties,
    };
    let now = OffsetDateTime::now_utc();
    blocking(move || Ok(state.annotations.update_marker(&owner, id, patch, now)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(MARKER_NOT_FOUND))
}

/// DELETE /api/markers/{id}
pub async fn delete_marker(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
) -> ApiResult<Json<MarkerDeleted>> {
    let id = marker_id(&id)?;
    let deleted = blocking(move || Ok(state.annotations.delete_marker(&owner, id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound(MARKER_NOT_FOUND));
    }
    Ok(Json(MarkerDeleted {
        message: "Marker deleted successfully",
        marker_id: id,
    }))
}

//! Owner-scoped shape CRUD.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use mapvault_core::{Properties, RecordId, Shape, ShapeDraft, ShapePatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::blocking;
use crate::auth::AuthenticatedOwner;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const SHAPE_NOT_FOUND: &str = "Shape not found";

/// Shape create/update payload. `type` is ignored on update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShapeRequest {
    /// Shape kind, such as `polygon` or `line`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Coordinate payload, stored verbatim.
    pub coordinates: Option<Vec<Value>>,
    /// Free-form properties.
    pub properties: Option<Properties>,
}

/// Response to a shape deletion.
#[derive(Debug, Serialize)]
pub struct ShapeDeleted {
    /// Fixed confirmation text.
    pub message: &'static str,
}

fn shape_id(raw: &str) -> ApiResult<RecordId> {
    RecordId::parse(raw).ok_or(ApiError::NotFound(SHAPE_NOT_FOUND))
}

/// GET /api/shapes
pub async fn list_shapes(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
) -> ApiResult<Json<Vec<Shape>>> {
    let shapes = blocking(move || Ok(state.annotations.shapes_for_owner(&owner)?)).await?;
    Ok(Json(shapes))
}

/// POST /api/shapes
pub async fn create_shape(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    payload: Result<Json<ShapeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Shape>)> {
    let Json(request) = payload?;
    let draft = ShapeDraft::new(request.kind, request.coordinates, request.properties)?;
    let shape = Shape::create(owner, draft, OffsetDateTime::now_utc());
    let stored = shape.clone();
    blocking(move || Ok(state.annotations.insert_shape(&stored)?)).await?;
    Ok((StatusCode::CREATED, Json(shape)))
}

/// GET /api/shapes/{id}
pub async fn get_shape(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
) -> ApiResult<Json<Shape>> {
    let id = shape_id(&id)?;
    blocking(move || Ok(state.annotations.find_shape(&owner, id)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(SHAPE_NOT_FOUND))
}

/// PUT /api/shapes/{id}
pub async fn update_shape(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
    payload: Result<Json<ShapeRequest>, JsonRejection>,
) -> ApiResult<Json<Shape>> {
    let id = shape_id(&id)?;
    let Json(request) = payload?;
    let patch = ShapePatch {
        coordinates: request.coordinates,
        properties: request.properties,
    };
    blocking(move || Ok(state.annotations.update_shape(&owner, id, patch)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(SHAPE_NOT_FOUND))
}

/// DELETE /api/shapes/{id}
pub async fn delete_shape(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShapeDeleted>> {
    let id = shape_id(&id)?;
    let deleted = blocking(move || Ok(state.annotations.delete_shape(&owner, id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound(SHAPE_NOT_FOUND));
    }
    Ok(Json(ShapeDeleted {
        message: "Shape deleted successfully",
    }))
}

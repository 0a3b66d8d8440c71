//! Upload, retrieval and listing of geospatial files.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Extension, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mapvault_core::UploadedFile;
use mapvault_data::{IngestError, Upload};
use serde::Serialize;

use super::blocking;
use crate::auth::AuthenticatedOwner;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

/// Response to a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Fixed confirmation text.
    pub message: &'static str,
    /// The stored record.
    pub file: UploadedFile,
}

/// POST /api/upload
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let limit = state.ingestor.max_bytes();
    let (original_name, bytes) = read_upload_field(&mut multipart, limit).await?;

    let upload = Upload {
        bytes,
        original_name,
        owner,
    };
    let ingestor = state.ingestor.clone();
    let file = blocking(move || Ok(ingestor.ingest(upload)?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "File uploaded successfully",
            file,
        }),
    ))
}

/// Read the `file` field chunk by chunk, stopping as soon as it passes
/// `limit` so that oversized uploads are never buffered whole.
async fn read_upload_field(
    multipart: &mut Multipart,
    limit: usize,
) -> ApiResult<(String, Vec<u8>)> {
    let mut received = 0_usize;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(move |err| oversize_or(err, received, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_owned).unwrap_or_default();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(move |err| oversize_or(err, received, limit))?
        {
            received += chunk.len();
            if received > limit {
                return Err(IngestError::SizeExceeded {
                    size: received,
                    limit,
                }
                .into());
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok((original_name, bytes));
    }
    Err(IngestError::NoFileProvided.into())
}

/// The request body limit surfaces as a 413 multipart error; report it as
/// the same size rejection the ingestor gives.
fn oversize_or(err: MultipartError, received: usize, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::SizeExceeded {
            size: received.max(limit.saturating_add(1)),
            limit,
        }
        .into()
    } else {
        err.into()
    }
}

/// GET /api/upload/{file_name}
pub async fn get_file(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let retriever = state.retriever.clone();
    let file = blocking(move || Ok(retriever.retrieve(&file_name, &owner)?)).await?;
    Ok(([(header::CONTENT_TYPE, file.designation.mime())], file.bytes).into_response())
}

/// GET /api/files
pub async fn list_files(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner)): Extension<AuthenticatedOwner>,
) -> ApiResult<Json<Vec<UploadedFile>>> {
    let files = state.files.clone();
    let listed = blocking(move || Ok(files.files_for_owner(&owner)?)).await?;
    Ok(Json(listed))
}

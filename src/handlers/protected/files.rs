// handlers/protected/files.rs - file metadata for a portal, checked against the owner's storage limit

use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::PortalFile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, ValidatedJson};
use crate::services::file_service::NewFile;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFileRequest {
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    #[validate(range(min = 0, message = "File size must be zero or more bytes"))]
    pub file_size: i64,
    #[validate(length(max = 255))]
    pub mime_type: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub storage_key: Option<String>,
}

/// GET /api/portals/:id/files
pub async fn list(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(portal_id): Path<Uuid>,
) -> ApiResult<Vec<PortalFile>> {
    let files = state.file_service().list(user.id, portal_id).await?;
    Ok(ApiResponse::success(files))
}

/// POST /api/portals/:id/files - Register an uploaded file's metadata.
/// Either member may upload; storage counts against the owner's plan.
pub async fn create(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(portal_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<RegisterFileRequest>,
) -> ApiResult<PortalFile> {
    let file_size = u64::try_from(body.file_size)
        .map_err(|_| ApiError::field_error("fileSize", "File size must be zero or more bytes"))?;

    let file = state
        .file_service()
        .register(
            user.id,
            portal_id,
            NewFile {
                file_name: body.file_name,
                file_size,
                mime_type: body.mime_type,
                storage_key: body.storage_key,
            },
        )
        .await?;

    Ok(ApiResponse::created(file))
}

/// DELETE /api/files/:id
pub async fn delete(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(file_id): Path<Uuid>,
) -> ApiResult<()> {
    state.file_service().delete(user.id, file_id).await?;
    Ok(ApiResponse::<()>::no_content())
}

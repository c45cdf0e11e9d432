// handlers/protected/updates.rs - portal update posts

use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::PortalUpdate;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, FreelancerRole, ValidatedJson};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdateRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 20000, message = "Content is required"))]
    pub content: String,
}

/// GET /api/portals/:id/updates - Newest first
pub async fn list(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(portal_id): Path<Uuid>,
) -> ApiResult<Vec<PortalUpdate>> {
    let updates = state.feed_service().list_updates(user.id, portal_id).await?;
    Ok(ApiResponse::success(updates))
}

/// POST /api/portals/:id/updates - Owner posts, client is notified
pub async fn create(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    Path(portal_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<PostUpdateRequest>,
) -> ApiResult<PortalUpdate> {
    let update = state
        .feed_service()
        .post_update(user.id, portal_id, &body.title, &body.content)
        .await?;
    Ok(ApiResponse::created(update))
}

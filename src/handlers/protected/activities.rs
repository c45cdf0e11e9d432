// handlers/protected/activities.rs - portal activity feed

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Activity;
use crate::middleware::{ApiResponse, ApiResult, Authenticated};

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/portals/:id/activities?limit= - Newest first, at most 100
pub async fn list(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(portal_id): Path<Uuid>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<Activity>> {
    let activities = state
        .feed_service()
        .list_activities(user.id, portal_id, query.limit)
        .await?;
    Ok(ApiResponse::success(activities))
}

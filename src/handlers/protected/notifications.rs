// handlers/protected/notifications.rs - per-user notifications

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Notification;
use crate::middleware::{ApiResponse, ApiResult, Authenticated};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/notifications?unread=true
pub async fn list(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let notifications = state.feed_service().notifications(user.id, query.unread).await?;
    Ok(ApiResponse::success(notifications))
}

/// POST /api/notifications/:id/read
pub async fn read(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    let notification = state.feed_service().mark_read(user.id, id).await?;
    Ok(ApiResponse::success(notification))
}

/// POST /api/notifications/read-all
pub async fn read_all(State(state): State<AppState>, Authenticated(user, _): Authenticated) -> ApiResult<MarkedRead> {
    let updated = state.feed_service().mark_all_read(user.id).await?;
    Ok(ApiResponse::success(MarkedRead { updated }))
}

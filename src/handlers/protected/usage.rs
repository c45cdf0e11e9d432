// handlers/protected/usage.rs - plan usage, admission checks and upgrade advice

use axum::extract::{Query, State};
use serde::Deserialize;
use validator::Validate;

use crate::app::AppState;
use crate::database::{users, PgUsageStore};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, FreelancerRole, ValidatedJson};
use crate::services::UsageService;
use crate::types::Role;
use crate::usage::{AdmissionDecision, OverLimitReport, UpgradeRecommendation, UsageReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPortalQuery {
    pub client_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckUploadRequest {
    #[validate(range(min = 0, message = "File size must be zero or more bytes"))]
    pub file_size: i64,
}

/// GET /api/usage - Resolved plan plus clients, storage and team usage
pub async fn report(State(state): State<AppState>, Authenticated(user, _): Authenticated<FreelancerRole>) -> ApiResult<UsageReport> {
    let mut conn = state.db.acquire().await?;
    let report = UsageService::new(PgUsageStore::new(&mut conn), state.config.plans.clone())
        .usage_report(user.id)
        .await?;

    Ok(ApiResponse::success(report))
}

/// GET /api/usage/check-portal?clientEmail= - Could a portal be created now?
///
/// A client the freelancer already works with does not take another slot.
pub async fn check_portal(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    Query(query): Query<CheckPortalQuery>,
) -> ApiResult<AdmissionDecision> {
    let mut conn = state.db.acquire().await?;

    let client_id = match query.client_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => users::find_by_email(&mut *conn, email)
            .await?
            .filter(|u| u.role == Role::Client)
            .map(|u| u.id),
        None => None,
    };

    let decision = UsageService::new(PgUsageStore::new(&mut conn), state.config.plans.clone())
        .can_create_portal(user.id, client_id)
        .await;
    Ok(ApiResponse::success(decision))
}

/// POST /api/usage/check-upload - Would a file of `fileSize` bytes fit?
pub async fn check_upload(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    ValidatedJson(body): ValidatedJson<CheckUploadRequest>,
) -> ApiResult<AdmissionDecision> {
    let file_size = u64::try_from(body.file_size).map_err(|_| ApiError::field_error("fileSize", "File size must be zero or more bytes"))?;

    let mut conn = state.db.acquire().await?;
    let decision = UsageService::new(PgUsageStore::new(&mut conn), state.config.plans.clone())
        .can_upload_file(user.id, file_size)
        .await;
    Ok(ApiResponse::success(decision))
}

/// GET /api/usage/over-limit - Over-limit summary; always empty for clients
pub async fn over_limit(State(state): State<AppState>, Authenticated(user, _): Authenticated) -> ApiResult<OverLimitReport> {
    if user.role == Role::Client {
        return Ok(ApiResponse::success(OverLimitReport::none()));
    }

    let mut conn = state.db.acquire().await?;
    let report = UsageService::new(PgUsageStore::new(&mut conn), state.config.plans.clone())
        .over_limit(user.id)
        .await?;
    Ok(ApiResponse::success(report))
}

/// GET /api/usage/upgrade - Cheapest tier covering current usage
pub async fn upgrade(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
) -> ApiResult<UpgradeRecommendation> {
    let mut conn = state.db.acquire().await?;
    let recommendation = UsageService::new(PgUsageStore::new(&mut conn), state.config.plans.clone())
        .upgrade_recommendation(user.id)
        .await?;
    Ok(ApiResponse::success(recommendation))
}

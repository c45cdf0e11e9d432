// handlers/protected/portals.rs - portal CRUD

use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::Portal;
use crate::middleware::{ApiResponse, ApiResult, Authenticated, FreelancerRole, ValidatedJson};
use crate::services::portal_service::{NewPortal, PortalChanges};
use crate::types::PortalStatus;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortalRequest {
    #[validate(length(min = 1, max = 200, message = "Portal name is required"))]
    pub name: String,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    pub status: Option<PortalStatus>,
    #[validate(email(message = "Enter a valid client email"))]
    pub client_email: Option<String>,
    #[validate(length(min = 1, max = 120, message = "Client name cannot be empty"))]
    pub client_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortalRequest {
    #[validate(length(min = 1, max = 200, message = "Portal name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    pub status: Option<PortalStatus>,
}

/// GET /api/portals - Portals the caller owns or is the client of
pub async fn list(State(state): State<AppState>, Authenticated(user, _): Authenticated) -> ApiResult<Vec<Portal>> {
    let portals = state.portal_service().list(user.id).await?;
    Ok(ApiResponse::success(portals))
}

/// POST /api/portals - Create a portal, optionally inviting a client
///
/// ```json
/// { "name": "Website redesign", "clientEmail": "pat@example.com" }
/// ```
///
/// Rejected with 403 `PLAN_LIMIT_EXCEEDED` when the plan has no room for
/// another client.
pub async fn create(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    ValidatedJson(body): ValidatedJson<CreatePortalRequest>,
) -> ApiResult<Portal> {
    let portal = state
        .portal_service()
        .create(
            user.id,
            NewPortal {
                name: body.name,
                description: body.description,
                status: body.status,
                client_email: body.client_email,
                client_name: body.client_name,
            },
        )
        .await?;

    Ok(ApiResponse::created(portal))
}

/// GET /api/portals/:id
pub async fn show(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Portal> {
    let portal = state.portal_service().get(user.id, id).await?;
    Ok(ApiResponse::success(portal))
}

/// PATCH /api/portals/:id - Owner only. The client cannot be changed here.
pub async fn update(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdatePortalRequest>,
) -> ApiResult<Portal> {
    let changes = PortalChanges {
        name: body.name,
        description: body.description,
        status: body.status,
    };
    let portal = state.portal_service().update(user.id, id, changes).await?;
    Ok(ApiResponse::success(portal))
}

/// DELETE /api/portals/:id - Owner only; files, updates and activities go with it
pub async fn delete(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<FreelancerRole>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.portal_service().delete(user.id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}

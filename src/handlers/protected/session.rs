// handlers/protected/session.rs - the signed-in user

use axum::extract::State;

use crate::app::AppState;
use crate::database::{models::User, users};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Authenticated};

/// GET /api/auth/whoami - Current user, fresh from the database
///
/// ```json
/// {
///   "success": true,
///   "data": { "id": "...", "email": "sam@example.com", "name": "Sam", "role": "freelancer", ... }
/// }
/// ```
pub async fn whoami(State(state): State<AppState>, Authenticated(user, _): Authenticated) -> ApiResult<User> {
    let record = users::find_by_id(state.db.pool(), user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(ApiResponse::success(record))
}

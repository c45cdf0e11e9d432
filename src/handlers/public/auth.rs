// handlers/public/auth.rs - session acquisition endpoints (no authentication)

use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, ValidatedJson};
use crate::services::Session;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Enter the 6-digit code"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Response for the "we sent you something" endpoints. Identical whether or
/// not the email has an account.
#[derive(Debug, Serialize)]
pub struct Accepted {
    pub message: &'static str,
}

/// POST /auth/register - Freelancer sign-up
///
/// ```json
/// { "email": "sam@example.com", "name": "Sam", "password": "..." }
/// ```
///
/// Returns a session (`{token, expiresIn, user}`) with 201, or 409 when the
/// email is taken.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<Session> {
    let session = state.auth_service().register(&body.email, &body.name, &body.password).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/login - Password login
pub async fn login(State(state): State<AppState>, ValidatedJson(body): ValidatedJson<LoginRequest>) -> ApiResult<Session> {
    let session = state.auth_service().login(&body.email, &body.password).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/otp/request - Email a one-time sign-in code
pub async fn otp_request(State(state): State<AppState>, ValidatedJson(body): ValidatedJson<EmailRequest>) -> ApiResult<Accepted> {
    state.auth_service().request_otp(&body.email).await?;
    Ok(ApiResponse::success(Accepted {
        message: "If an account exists for this email, a sign-in code has been sent.",
    }))
}

/// POST /auth/otp/verify - Exchange email and code for a session
pub async fn otp_verify(State(state): State<AppState>, ValidatedJson(body): ValidatedJson<OtpVerifyRequest>) -> ApiResult<Session> {
    let session = state.auth_service().verify_otp(&body.email, &body.code).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/magic-link/request
pub async fn magic_link_request(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> ApiResult<Accepted> {
    state.auth_service().request_magic_link(&body.email).await?;
    Ok(ApiResponse::success(Accepted {
        message: "If an account exists for this email, a sign-in link has been sent.",
    }))
}

/// POST /auth/magic-link/verify
pub async fn magic_link_verify(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<TokenRequest>,
) -> ApiResult<Session> {
    let session = state.auth_service().verify_magic_link(&body.token).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/password-reset/request
pub async fn password_reset_request(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EmailRequest>,
) -> ApiResult<Accepted> {
    state.auth_service().request_password_reset(&body.email).await?;
    Ok(ApiResponse::success(Accepted {
        message: "If an account exists for this email, a reset link has been sent.",
    }))
}

/// POST /auth/password-reset/confirm
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<PasswordResetConfirmRequest>,
) -> ApiResult<Accepted> {
    state.auth_service().confirm_password_reset(&body.token, &body.password).await?;
    Ok(ApiResponse::success(Accepted {
        message: "Your password has been updated.",
    }))
}

// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::password::PasswordError;
use crate::auth::JwtError;
use crate::database::manager::DatabaseError;
use crate::services::auth_service::AuthError;
use crate::services::portal_service::PortalError;
use crate::services::usage_service::UsageError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    PlanLimitExceeded(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::PlanLimitExceeded(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::PlanLimitExceeded(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["fieldErrors"] = json!(field_errors);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::PlanLimitExceeded(_) => "PLAN_LIMIT_EXCEEDED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn field_error(field: &str, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.into());
        ApiError::validation_error("Invalid request", Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn plan_limit_exceeded(message: impl Into<String>) -> Self {
        ApiError::PlanLimitExceeded(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_unavailable() {
            tracing::error!("Database unavailable: {}", err);
            return ApiError::service_unavailable("Database temporarily unavailable");
        }
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(format!("{} not found", msg)),
            DatabaseError::MigrationError(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<UsageError> for ApiError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::UserNotFound(_) => ApiError::not_found("User not found"),
            UsageError::NotFreelancer => ApiError::forbidden("Usage is only available to freelancers"),
            UsageError::Database(e) => e.into(),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(msg) => ApiError::unauthorized(format!("Invalid or expired token: {}", msg)),
            other => {
                tracing::error!("Token signing failed: {}", other);
                ApiError::internal_server_error("Unable to issue session")
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::InvalidToken => ApiError::unauthorized(err.to_string()),
            AuthError::EmailTaken => ApiError::conflict(err.to_string()),
            AuthError::PublicUrl(e) => {
                tracing::error!("Public URL misconfigured: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Password(e) => e.into(),
            AuthError::Jwt(e) => e.into(),
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::NotFound(_) => ApiError::not_found(err.to_string()),
            PortalError::Forbidden(msg) => ApiError::forbidden(msg),
            PortalError::LimitExceeded(reason) => ApiError::plan_limit_exceeded(reason),
            PortalError::InvalidField { field, message } => ApiError::field_error(field, message),
            PortalError::Database(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let message = errors
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (camel_case(field), message)
            })
            .collect();
        ApiError::validation_error("Invalid request", Some(field_errors))
    }
}

/// Request bodies are camelCase on the wire; validator reports Rust field names
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Enter a valid email"))]
        email: String,
    }

    #[test]
    fn error_envelope_shape() {
        let json = ApiError::plan_limit_exceeded("Upgrade to add clients").to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "PLAN_LIMIT_EXCEEDED");
        assert_eq!(json["error"], "Upgrade to add clients");
        assert!(json.get("fieldErrors").is_none());
    }

    #[test]
    fn validation_errors_become_field_errors() {
        let errors = Signup { email: "nope".to_string() }.validate().unwrap_err();
        let api_error = ApiError::from(errors);
        assert_eq!(api_error.status_code(), 400);
        let json = api_error.to_json();
        assert_eq!(json["fieldErrors"]["email"], "Enter a valid email");
    }

    #[test]
    fn field_names_are_reported_in_camel_case() {
        assert_eq!(camel_case("file_size"), "fileSize");
        assert_eq!(camel_case("client_email"), "clientEmail");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn missing_records_are_404_and_limits_are_403() {
        assert_eq!(ApiError::from(PortalError::NotFound("Portal")).status_code(), 404);
        assert_eq!(ApiError::from(PortalError::Forbidden("no")).status_code(), 403);
        let limit = ApiError::from(PortalError::LimitExceeded("full".to_string()));
        assert_eq!(limit.status_code(), 403);
        assert_eq!(limit.error_code(), "PLAN_LIMIT_EXCEEDED");
    }

    #[test]
    fn pool_timeouts_are_503() {
        let err = ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn duplicate_email_is_conflict() {
        assert_eq!(ApiError::from(AuthError::EmailTaken).status_code(), 409);
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status_code(), 401);
    }
}

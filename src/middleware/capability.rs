//! Role capabilities.
//!
//! Handlers state the role they need in their signature:
//!
//! ```ignore
//! async fn create(Authenticated(user, ..): Authenticated<FreelancerRole>) -> ApiResult<Portal>
//! ```
//!
//! The extractor reads the [`AuthUser`] placed by the JWT middleware and
//! rejects with 401 when it is missing, 403 when the role does not qualify.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::types::Role;

pub trait RoleRequirement: Send + Sync + 'static {
    /// Used in the 403 message
    const LABEL: &'static str;

    fn permits(role: Role) -> bool;
}

/// Any authenticated user
pub struct AnyRole;

impl RoleRequirement for AnyRole {
    const LABEL: &'static str = "authenticated users";

    fn permits(_role: Role) -> bool {
        true
    }
}

pub struct FreelancerRole;

impl RoleRequirement for FreelancerRole {
    const LABEL: &'static str = "freelancers";

    fn permits(role: Role) -> bool {
        role == Role::Freelancer
    }
}

pub struct Authenticated<R: RoleRequirement = AnyRole>(pub AuthUser, pub PhantomData<R>);

impl<R: RoleRequirement> Authenticated<R> {
    pub fn user(&self) -> &AuthUser {
        &self.0
    }

    fn check(user: Option<&AuthUser>) -> Result<Self, ApiError> {
        let user = user.ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        if !R::permits(user.role) {
            tracing::warn!("{} ({}) denied: route is limited to {}", user.id, user.role, R::LABEL);
            return Err(ApiError::forbidden(format!("This action is only available to {}", R::LABEL)));
        }
        Ok(Self(user.clone(), PhantomData))
    }
}

#[axum::async_trait]
impl<S, R> FromRequestParts<S> for Authenticated<R>
where
    S: Send + Sync,
    R: RoleRequirement,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::check(parts.extensions.get::<AuthUser>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "x@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn missing_user_is_unauthorized() {
        let err = Authenticated::<AnyRole>::check(None).err().unwrap();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn client_cannot_pass_freelancer_gate() {
        let client = user(Role::Client);
        let err = Authenticated::<FreelancerRole>::check(Some(&client)).err().unwrap();
        assert_eq!(err.status_code(), 403);
        assert!(Authenticated::<AnyRole>::check(Some(&client)).is_ok());
    }

    #[test]
    fn freelancer_passes_both_gates() {
        let freelancer = user(Role::Freelancer);
        assert!(Authenticated::<FreelancerRole>::check(Some(&freelancer)).is_ok());
        assert!(Authenticated::<AnyRole>::check(Some(&freelancer)).is_ok());
    }
}

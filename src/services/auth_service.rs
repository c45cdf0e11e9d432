use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::token::{generate_link_token, generate_otp_code, hash_token};
use crate::auth::{generate_jwt, Claims, JwtError};
use crate::config::AppConfig;
use crate::database::manager::{Database, DatabaseError};
use crate::database::models::User;
use crate::database::{auth_tokens, users};
use crate::services::mailer::{send_logged, Mailer, OutgoingEmail};
use crate::types::{Role, TokenPurpose};

/// Wrong codes allowed against one OTP before it is revoked
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// Verified against when there is no stored hash, so unknown accounts cost the same argon2 work
static DUMMY_PASSWORD_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("dummy-password-for-timing").ok());

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("This code or link is invalid or has expired")]
    InvalidToken,
    #[error("Invalid public URL: {0}")]
    PublicUrl(#[from] url::ParseError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    /// Seconds
    pub expires_in: u64,
    pub user: SessionUser,
}

/// Password, OTP, magic-link and password-reset flows
pub struct AuthService {
    db: Database,
    config: Arc<AppConfig>,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    pub fn new(db: Database, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, config, mailer }
    }

    fn issue_session(&self, user: &User) -> Result<Session, AuthError> {
        let expiry_hours = self.config.security.jwt_expiry_hours;
        let claims = Claims::new(user.id, user.email.clone(), user.role, expiry_hours);
        let token = generate_jwt(&self.config.security, &claims)?;

        Ok(Session {
            token,
            expires_in: expiry_hours * 3600,
            user: SessionUser::from(user),
        })
    }

    /// Freelancer sign-up
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<Session, AuthError> {
        let password_hash = hash_password(password)?;
        let user = users::insert(self.db.pool(), email, name, Role::Freelancer, Some(&password_hash))
            .await
            .map_err(|e| if e.is_unique_violation() { AuthError::EmailTaken } else { AuthError::Database(e) })?;

        info!("Registered freelancer {}", user.id);
        self.issue_session(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = users::find_by_email(self.db.pool(), email).await?;

        let Some((user, stored)) = user.as_ref().and_then(|u| u.password_hash.as_deref().map(|h| (u, h))) else {
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, stored)? {
            warn!("Failed password login for {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        users::touch_last_seen(self.db.pool(), user.id).await?;
        self.issue_session(&user)
    }

    /// Store a fresh one-time secret for `user`, revoking older ones of the same purpose
    async fn store_token(&self, user: &User, purpose: TokenPurpose, secret: &str, ttl_minutes: i64) -> Result<(), AuthError> {
        let mut tx = self.db.pool().begin().await.map_err(DatabaseError::from)?;
        auth_tokens::revoke_outstanding(&mut *tx, user.id, purpose).await?;
        auth_tokens::insert(
            &mut *tx,
            user.id,
            purpose,
            &hash_token(secret),
            Utc::now() + Duration::minutes(ttl_minutes),
        )
        .await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    fn link(&self, path: &str, token: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.config.api.public_url)?.join(path)?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.to_string())
    }

    /// Email a 6-digit sign-in code. Unknown emails succeed silently.
    pub async fn request_otp(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = users::find_by_email(self.db.pool(), email).await? else {
            debug!("OTP requested for unknown email");
            return Ok(());
        };

        let code = generate_otp_code();
        let ttl = self.config.security.otp_ttl_minutes;
        self.store_token(&user, TokenPurpose::Otp, &code, ttl).await?;

        send_logged(
            self.mailer.as_ref(),
            OutgoingEmail {
                to: user.email.clone(),
                subject: "Your sign-in code".to_string(),
                body: format!("Your sign-in code is {}. It expires in {} minutes.", code, ttl),
            },
        )
        .await;
        Ok(())
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        let user = users::find_by_email(self.db.pool(), email).await?.ok_or(AuthError::InvalidToken)?;

        let now = Utc::now();
        let consumed = auth_tokens::consume(self.db.pool(), TokenPurpose::Otp, &hash_token(code.trim()), Some(user.id), now).await?;
        if consumed.is_none() {
            let revoked =
                auth_tokens::record_failed_attempt(self.db.pool(), user.id, TokenPurpose::Otp, MAX_OTP_ATTEMPTS, now).await?;
            if revoked > 0 {
                warn!("Revoked OTP for {} after {} wrong codes", user.id, MAX_OTP_ATTEMPTS);
            } else {
                warn!("Rejected OTP for {}", user.id);
            }
            return Err(AuthError::InvalidToken);
        }

        users::touch_last_seen(self.db.pool(), user.id).await?;
        self.issue_session(&user)
    }

    /// Email a sign-in link. Unknown emails succeed silently.
    pub async fn request_magic_link(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = users::find_by_email(self.db.pool(), email).await? else {
            debug!("Magic link requested for unknown email");
            return Ok(());
        };

        let token = generate_link_token();
        let link = self.link("/auth/magic-link", &token)?;
        self.store_token(&user, TokenPurpose::MagicLink, &token, self.config.security.magic_link_ttl_minutes)
            .await?;

        send_logged(
            self.mailer.as_ref(),
            OutgoingEmail {
                to: user.email.clone(),
                subject: "Your sign-in link".to_string(),
                body: format!("Sign in with this link: {}", link),
            },
        )
        .await;
        Ok(())
    }

    pub async fn verify_magic_link(&self, token: &str) -> Result<Session, AuthError> {
        let user_id = auth_tokens::consume(self.db.pool(), TokenPurpose::MagicLink, &hash_token(token), None, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;
        let user = users::find_by_id(self.db.pool(), user_id).await?.ok_or(AuthError::InvalidToken)?;

        users::touch_last_seen(self.db.pool(), user.id).await?;
        self.issue_session(&user)
    }

    /// Email a password reset link. Unknown emails succeed silently.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = users::find_by_email(self.db.pool(), email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_link_token();
        let link = self.link("/auth/reset-password", &token)?;
        self.store_token(&user, TokenPurpose::PasswordReset, &token, self.config.security.password_reset_ttl_minutes)
            .await?;

        send_logged(
            self.mailer.as_ref(),
            OutgoingEmail {
                to: user.email.clone(),
                subject: "Reset your password".to_string(),
                body: format!("Choose a new password here: {}", link),
            },
        )
        .await;
        Ok(())
    }

    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let password_hash = hash_password(new_password)?;

        let mut tx = self.db.pool().begin().await.map_err(DatabaseError::from)?;
        let user_id = auth_tokens::consume(&mut *tx, TokenPurpose::PasswordReset, &hash_token(token), None, Utc::now())
            .await?
            .ok_or(AuthError::InvalidToken)?;
        users::set_password(&mut *tx, user_id, &password_hash).await?;
        // A reset also invalidates any sign-in codes that were outstanding
        auth_tokens::revoke_outstanding(&mut *tx, user_id, TokenPurpose::Otp).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("Password reset for {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::LogMailer;

    fn service() -> AuthService {
        let config = AppConfig::for_tests();
        let db = Database::connect_lazy(&config.database).unwrap();
        AuthService::new(db, Arc::new(config), Arc::new(LogMailer))
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            name: "Sam".to_string(),
            role,
            password_hash: None,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn session_carries_user_and_expiry() {
        let service = service();
        let user = user(Role::Client);

        let session = service.issue_session(&user).unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.user.role, Role::Client);
        assert_eq!(session.expires_in, service.config.security.jwt_expiry_hours * 3600);

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("expiresIn").is_some());
        assert_eq!(json["user"]["role"], "client");
    }

    #[test]
    fn unknown_accounts_still_pay_for_a_hash_check() {
        let dummy = DUMMY_PASSWORD_HASH.as_deref().expect("dummy hash");
        assert!(dummy.starts_with("$argon2"));
        assert!(!verify_password("hunter22", dummy).unwrap());
    }

    #[tokio::test]
    async fn links_point_at_the_public_url() {
        let service = service();
        let link = service.link("/auth/magic-link", "abc123").unwrap();
        assert_eq!(link, "http://localhost:5173/auth/magic-link?token=abc123");
    }
}

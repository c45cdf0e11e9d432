pub mod password;
pub mod token;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(security: &SecurityConfig, claims: &Claims) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the claims
pub fn decode_jwt(security: &SecurityConfig, token: &str) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn issued_tokens_decode_with_the_same_secret() {
        let security = AppConfig::for_tests().security;
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "a@example.com".to_string(), Role::Freelancer, 1);

        let token = generate_jwt(&security, &claims).unwrap();
        let decoded = decode_jwt(&security, &token).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.role, Role::Freelancer);
    }

    #[test]
    fn other_secret_is_rejected() {
        let security = AppConfig::for_tests().security;
        let claims = Claims::new(Uuid::new_v4(), "a@example.com".to_string(), Role::Client, 1);
        let token = generate_jwt(&security, &claims).unwrap();

        let mut other = security.clone();
        other.jwt_secret = "another-secret".to_string();
        assert!(matches!(decode_jwt(&other, &token), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = AppConfig::for_tests().security;
        let mut claims = Claims::new(Uuid::new_v4(), "a@example.com".to_string(), Role::Client, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&security, &claims).unwrap();
        assert!(decode_jwt(&security, &token).is_err());
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let mut security = AppConfig::for_tests().security;
        security.jwt_secret.clear();
        let claims = Claims::new(Uuid::new_v4(), "a@example.com".to_string(), Role::Client, 1);
        assert!(matches!(generate_jwt(&security, &claims), Err(JwtError::InvalidSecret)));
    }
}

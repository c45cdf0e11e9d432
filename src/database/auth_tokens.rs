use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::types::TokenPurpose;

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    purpose: TokenPurpose,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at) VALUES ($1, $2, $3, $4)")
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(token_hash)
        .bind(expires_at)
        .execute(executor)
        .await?;

    Ok(())
}

/// Expire every outstanding token of `purpose` for the user
pub async fn revoke_outstanding<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    purpose: TokenPurpose,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE auth_tokens SET consumed_at = now()
         WHERE user_id = $1 AND purpose = $2 AND consumed_at IS NULL",
    )
    .bind(user_id)
    .bind(purpose.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

/// Atomically consume a live token and return its user. A token can be consumed once.
pub async fn consume<'e, E: PgExecutor<'e>>(
    executor: E,
    purpose: TokenPurpose,
    token_hash: &str,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Option<Uuid>, DatabaseError> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        "UPDATE auth_tokens SET consumed_at = $4
         WHERE purpose = $1 AND token_hash = $2
           AND ($3::UUID IS NULL OR user_id = $3)
           AND consumed_at IS NULL AND expires_at > $4
         RETURNING user_id",
    )
    .bind(purpose.as_str())
    .bind(token_hash)
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    Ok(user_id)
}

/// Count a wrong guess against the user's outstanding tokens of `purpose`.
/// A token is revoked once it reaches `max_attempts`. Returns how many were revoked.
pub async fn record_failed_attempt<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    purpose: TokenPurpose,
    max_attempts: i32,
    now: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    let revoked = sqlx::query_scalar::<_, i64>(
        "WITH bumped AS (
             UPDATE auth_tokens
             SET attempts = attempts + 1,
                 consumed_at = CASE WHEN attempts + 1 >= $3 THEN $4 ELSE consumed_at END
             WHERE user_id = $1 AND purpose = $2 AND consumed_at IS NULL AND expires_at > $4
             RETURNING consumed_at
         )
         SELECT COUNT(*) FROM bumped WHERE consumed_at IS NOT NULL",
    )
    .bind(user_id)
    .bind(purpose.as_str())
    .bind(max_attempts)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(revoked.max(0) as u64)
}

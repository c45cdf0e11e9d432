use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::User;
use crate::types::Role;

const USER_COLUMNS: &str = "id, email, name, role, password_hash, last_seen_at, created_at, updated_at";

/// Emails are stored trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

pub async fn find_by_email<'e, E: PgExecutor<'e>>(executor: E, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

pub async fn find_role<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Role>, DatabaseError> {
    let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(role)
}

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    email: &str,
    name: &str,
    role: Role,
    password_hash: Option<&str>,
) -> Result<User, DatabaseError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, role, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(normalize_email(email))
    .bind(name.trim())
    .bind(role.as_str())
    .bind(password_hash)
    .fetch_one(executor)
    .await?;

    Ok(user)
}

/// Insert the user unless the email is taken, then return whichever row holds
/// the email. A concurrent insert of the same email waits for the other
/// transaction instead of failing on the unique index.
pub async fn insert_or_find(conn: &mut PgConnection, email: &str, name: &str, role: Role) -> Result<User, DatabaseError> {
    let inserted = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, name, role) VALUES ($1, $2, $3)
         ON CONFLICT (email) DO NOTHING
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(normalize_email(email))
    .bind(name.trim())
    .bind(role.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(user) => Ok(user),
        None => find_by_email(&mut *conn, email)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", normalize_email(email)))),
    }
}

pub async fn touch_last_seen<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE users SET last_seen_at = now() WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn set_password<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;

    Ok(())
}

/// Take a row lock on the user for the rest of the transaction. Admission
/// checks for the same freelancer queue up behind it.
pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<(), DatabaseError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)))?;

    Ok(())
}

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Portal;
use crate::types::PortalStatus;

const PORTAL_COLUMNS: &str = "id, name, description, status, created_by, client_id, created_at, updated_at";

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Portal>, DatabaseError> {
    let portal = sqlx::query_as::<_, Portal>(&format!("SELECT {} FROM portals WHERE id = $1", PORTAL_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(portal)
}

/// Portals the user owns or is the client of, newest first
pub async fn list_for_member<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<Vec<Portal>, DatabaseError> {
    let portals = sqlx::query_as::<_, Portal>(&format!(
        "SELECT {} FROM portals WHERE created_by = $1 OR client_id = $1 ORDER BY created_at DESC",
        PORTAL_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(portals)
}

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
    description: Option<&str>,
    status: PortalStatus,
    created_by: Uuid,
    client_id: Option<Uuid>,
) -> Result<Portal, DatabaseError> {
    let portal = sqlx::query_as::<_, Portal>(&format!(
        "INSERT INTO portals (name, description, status, created_by, client_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        PORTAL_COLUMNS
    ))
    .bind(name)
    .bind(description)
    .bind(status.as_str())
    .bind(created_by)
    .bind(client_id)
    .fetch_one(executor)
    .await?;

    Ok(portal)
}

/// Partial update; `None` leaves a column unchanged
pub async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    status: Option<PortalStatus>,
) -> Result<Portal, DatabaseError> {
    let portal = sqlx::query_as::<_, Portal>(&format!(
        "UPDATE portals SET
             name = COALESCE($2, name),
             description = COALESCE($3, description),
             status = COALESCE($4, status),
             updated_at = now()
         WHERE id = $1
         RETURNING {}",
        PORTAL_COLUMNS
    ))
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(status.map(|s| s.as_str()))
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("Portal {}", id)))?;

    Ok(portal)
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM portals WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Portal {}", id)));
    }
    Ok(())
}

/// Distinct clients across the freelancer's portals, whatever their status
pub async fn count_clients<'e, E: PgExecutor<'e>>(executor: E, freelancer_id: Uuid) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT client_id) FROM portals WHERE created_by = $1 AND client_id IS NOT NULL",
    )
    .bind(freelancer_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

pub async fn has_client<'e, E: PgExecutor<'e>>(
    executor: E,
    freelancer_id: Uuid,
    client_id: Uuid,
) -> Result<bool, DatabaseError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM portals WHERE created_by = $1 AND client_id = $2)",
    )
    .bind(freelancer_id)
    .bind(client_id)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}

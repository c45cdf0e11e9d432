use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::PortalFile;

const FILE_COLUMNS: &str = "id, portal_id, uploaded_by, file_name, file_size, mime_type, storage_key, created_at";

pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<PortalFile>, DatabaseError> {
    let file = sqlx::query_as::<_, PortalFile>(&format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(file)
}

pub async fn list_for_portal<'e, E: PgExecutor<'e>>(executor: E, portal_id: Uuid) -> Result<Vec<PortalFile>, DatabaseError> {
    let files = sqlx::query_as::<_, PortalFile>(&format!(
        "SELECT {} FROM files WHERE portal_id = $1 ORDER BY created_at DESC",
        FILE_COLUMNS
    ))
    .bind(portal_id)
    .fetch_all(executor)
    .await?;

    Ok(files)
}

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    portal_id: Uuid,
    uploaded_by: Uuid,
    file_name: &str,
    file_size: i64,
    mime_type: Option<&str>,
    storage_key: &str,
) -> Result<PortalFile, DatabaseError> {
    let file = sqlx::query_as::<_, PortalFile>(&format!(
        "INSERT INTO files (portal_id, uploaded_by, file_name, file_size, mime_type, storage_key)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        FILE_COLUMNS
    ))
    .bind(portal_id)
    .bind(uploaded_by)
    .bind(file_name)
    .bind(file_size)
    .bind(mime_type)
    .bind(storage_key)
    .fetch_one(executor)
    .await?;

    Ok(file)
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("File {}", id)));
    }
    Ok(())
}

/// Bytes stored across every portal the freelancer owns
pub async fn storage_bytes<'e, E: PgExecutor<'e>>(executor: E, freelancer_id: Uuid) -> Result<i64, DatabaseError> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(f.file_size), 0)::BIGINT
         FROM files f
         JOIN portals p ON p.id = f.portal_id
         WHERE p.created_by = $1",
    )
    .bind(freelancer_id)
    .fetch_one(executor)
    .await?;

    Ok(total)
}

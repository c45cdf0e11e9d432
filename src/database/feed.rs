//! Updates, activities and notifications: the per-portal feed tables

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Activity, Notification, PortalUpdate};

pub async fn list_updates<'e, E: PgExecutor<'e>>(executor: E, portal_id: Uuid) -> Result<Vec<PortalUpdate>, DatabaseError> {
    let updates = sqlx::query_as::<_, PortalUpdate>(
        "SELECT id, portal_id, author_id, title, content, created_at
         FROM updates WHERE portal_id = $1 ORDER BY created_at DESC",
    )
    .bind(portal_id)
    .fetch_all(executor)
    .await?;

    Ok(updates)
}

pub async fn insert_update<'e, E: PgExecutor<'e>>(
    executor: E,
    portal_id: Uuid,
    author_id: Uuid,
    title: &str,
    content: &str,
) -> Result<PortalUpdate, DatabaseError> {
    let update = sqlx::query_as::<_, PortalUpdate>(
        "INSERT INTO updates (portal_id, author_id, title, content) VALUES ($1, $2, $3, $4)
         RETURNING id, portal_id, author_id, title, content, created_at",
    )
    .bind(portal_id)
    .bind(author_id)
    .bind(title)
    .bind(content)
    .fetch_one(executor)
    .await?;

    Ok(update)
}

/// Newest first
pub async fn list_activities<'e, E: PgExecutor<'e>>(
    executor: E,
    portal_id: Uuid,
    limit: i64,
) -> Result<Vec<Activity>, DatabaseError> {
    let activities = sqlx::query_as::<_, Activity>(
        "SELECT id, portal_id, user_id, kind, description, created_at
         FROM activities WHERE portal_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(portal_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(activities)
}

pub async fn record_activity<'e, E: PgExecutor<'e>>(
    executor: E,
    portal_id: Uuid,
    user_id: Uuid,
    kind: &str,
    description: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO activities (portal_id, user_id, kind, description) VALUES ($1, $2, $3, $4)")
        .bind(portal_id)
        .bind(user_id)
        .bind(kind)
        .bind(description)
        .execute(executor)
        .await?;

    Ok(())
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, portal_id, type, message, link, is_read, created_at";

pub async fn list_notifications<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    unread_only: bool,
) -> Result<Vec<Notification>, DatabaseError> {
    let notifications = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
         ORDER BY created_at DESC",
        NOTIFICATION_COLUMNS
    ))
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(executor)
    .await?;

    Ok(notifications)
}

pub async fn notify<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    portal_id: Option<Uuid>,
    kind: &str,
    message: &str,
    link: Option<&str>,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO notifications (user_id, portal_id, type, message, link) VALUES ($1, $2, $3, $4, $5)")
        .bind(user_id)
        .bind(portal_id)
        .bind(kind)
        .bind(message)
        .bind(link)
        .execute(executor)
        .await?;

    Ok(())
}

/// Marks one of the user's notifications read. Someone else's id is reported as missing.
pub async fn mark_read<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid, id: Uuid) -> Result<Notification, DatabaseError> {
    sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2 RETURNING {}",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("Notification {}", id)))
}

pub async fn mark_all_read<'e, E: PgExecutor<'e>>(executor: E, user_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE notifications SET is_read = true WHERE user_id = $1 AND NOT is_read")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

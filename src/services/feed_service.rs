use uuid::Uuid;

use crate::database::manager::Database;
use crate::database::models::{Activity, Notification, PortalUpdate};
use crate::database::feed;
use crate::services::portal_service::{load_portal, Access, PortalError};

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 20;
pub const MAX_ACTIVITY_LIMIT: i64 = 100;

/// Requested page size clamped to `1..=100`
pub fn activity_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, MAX_ACTIVITY_LIMIT)
}

/// Updates, activity feeds and notifications
pub struct FeedService {
    db: Database,
}

impl FeedService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list_updates(&self, user_id: Uuid, portal_id: Uuid) -> Result<Vec<PortalUpdate>, PortalError> {
        load_portal(self.db.pool(), user_id, portal_id, Access::Member).await?;
        Ok(feed::list_updates(self.db.pool(), portal_id).await?)
    }

    /// Owner posts; the client is notified
    pub async fn post_update(&self, user_id: Uuid, portal_id: Uuid, title: &str, content: &str) -> Result<PortalUpdate, PortalError> {
        let mut tx = self.db.pool().begin().await?;
        let portal = load_portal(&mut *tx, user_id, portal_id, Access::Owner).await?;

        let update = feed::insert_update(&mut *tx, portal_id, user_id, title.trim(), content).await?;
        feed::record_activity(&mut *tx, portal_id, user_id, "update_posted", &format!("Posted \"{}\"", update.title)).await?;
        if let Some(client_id) = portal.client_id {
            feed::notify(
                &mut *tx,
                client_id,
                Some(portal_id),
                "update_posted",
                &format!("New update in {}: {}", portal.name, update.title),
                Some(&format!("/portals/{}/updates", portal_id)),
            )
            .await?;
        }
        tx.commit().await?;

        Ok(update)
    }

    pub async fn list_activities(&self, user_id: Uuid, portal_id: Uuid, limit: Option<i64>) -> Result<Vec<Activity>, PortalError> {
        load_portal(self.db.pool(), user_id, portal_id, Access::Member).await?;
        Ok(feed::list_activities(self.db.pool(), portal_id, activity_limit(limit)).await?)
    }

    pub async fn notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, PortalError> {
        Ok(feed::list_notifications(self.db.pool(), user_id, unread_only).await?)
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification, PortalError> {
        feed::mark_read(self.db.pool(), user_id, notification_id).await.map_err(|e| match e {
            crate::database::DatabaseError::NotFound(_) => PortalError::NotFound("Notification"),
            other => PortalError::Database(other),
        })
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, PortalError> {
        Ok(feed::mark_all_read(self.db.pool(), user_id).await?)
    }
}

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::database::manager::Database;
use crate::database::models::{Portal, PortalFile};
use crate::database::{feed, files, portals, users, PgUsageStore};
use crate::services::portal_service::{load_portal, Access, PortalError};
use crate::services::usage_service::UsageService;

#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: Option<String>,
    /// Blob-storage location; generated when the uploader has none yet
    pub storage_key: Option<String>,
}

/// The other side of the portal, who gets notified about the change
fn counterpart(portal: &Portal, actor: Uuid) -> Option<Uuid> {
    if portal.is_owned_by(actor) {
        portal.client_id
    } else {
        Some(portal.created_by)
    }
}

pub struct FileService {
    db: Database,
    config: Arc<AppConfig>,
}

impl FileService {
    pub fn new(db: Database, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    pub async fn list(&self, user_id: Uuid, portal_id: Uuid) -> Result<Vec<PortalFile>, PortalError> {
        load_portal(self.db.pool(), user_id, portal_id, Access::Member).await?;
        Ok(files::list_for_portal(self.db.pool(), portal_id).await?)
    }

    /// Register file metadata. Storage counts against the portal owner's plan,
    /// whoever uploads.
    pub async fn register(&self, user_id: Uuid, portal_id: Uuid, new: NewFile) -> Result<PortalFile, PortalError> {
        let file_size = i64::try_from(new.file_size).map_err(|_| PortalError::InvalidField {
            field: "fileSize",
            message: "File is too large".to_string(),
        })?;

        let mut tx = self.db.pool().begin().await?;
        let portal = load_portal(&mut *tx, user_id, portal_id, Access::Member).await?;
        users::lock_for_update(&mut tx, portal.created_by).await?;

        let decision = UsageService::new(PgUsageStore::new(&mut tx), self.config.plans.clone())
            .can_upload_file(portal.created_by, new.file_size)
            .await;
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_default();
            warn!("Upload to portal {} denied: {}", portal_id, reason);
            return Err(PortalError::LimitExceeded(reason));
        }

        let storage_key = new
            .storage_key
            .clone()
            .unwrap_or_else(|| format!("portals/{}/{}", portal_id, Uuid::new_v4()));
        let file = files::insert(
            &mut *tx,
            portal_id,
            user_id,
            new.file_name.trim(),
            file_size,
            new.mime_type.as_deref(),
            &storage_key,
        )
        .await?;

        feed::record_activity(&mut *tx, portal_id, user_id, "file_uploaded", &format!("Uploaded {}", file.file_name)).await?;
        if let Some(recipient) = counterpart(&portal, user_id) {
            feed::notify(
                &mut *tx,
                recipient,
                Some(portal_id),
                "file_uploaded",
                &format!("New file \"{}\" in {}", file.file_name, portal.name),
                Some(&format!("/portals/{}/files", portal_id)),
            )
            .await?;
        }
        tx.commit().await?;

        info!("Registered file {} ({} bytes) in portal {}", file.id, file.file_size, portal_id);
        Ok(file)
    }

    /// Uploader or portal owner only
    pub async fn delete(&self, user_id: Uuid, file_id: Uuid) -> Result<(), PortalError> {
        let file = files::find_by_id(self.db.pool(), file_id)
            .await?
            .ok_or(PortalError::NotFound("File"))?;
        let portal = portals::find_by_id(self.db.pool(), file.portal_id)
            .await?
            .ok_or(PortalError::NotFound("Portal"))?;

        if file.uploaded_by != user_id && !portal.is_owned_by(user_id) {
            return Err(PortalError::Forbidden("Only the uploader or the portal owner can delete this file"));
        }

        let mut tx = self.db.pool().begin().await?;
        files::delete(&mut *tx, file_id).await?;
        feed::record_activity(&mut *tx, portal.id, user_id, "file_deleted", &format!("Deleted {}", file.file_name)).await?;
        tx.commit().await?;
        Ok(())
    }
}

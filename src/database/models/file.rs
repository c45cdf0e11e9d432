use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// File metadata. The bytes live in blob storage under `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortalFile {
    pub id: Uuid,
    pub portal_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

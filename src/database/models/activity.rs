use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub portal_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

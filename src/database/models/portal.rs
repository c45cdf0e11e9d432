use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::PortalStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Portal {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: PortalStatus,
    pub created_by: Uuid,
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portal {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Owner or assigned client
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.created_by == user_id || self.client_id == Some(user_id)
    }
}

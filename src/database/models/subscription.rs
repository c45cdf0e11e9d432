use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub is_active: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub provider_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet ended. `ends_at == now` counts as expired.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.ends_at > now
    }
}

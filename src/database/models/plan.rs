use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::usage::{Limit, PlanLimits};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub max_clients: Option<i32>,
    pub max_storage_mb: Option<i32>,
    pub max_team: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn limits(&self) -> PlanLimits {
        PlanLimits {
            clients: Limit::from_column(self.max_clients),
            storage_mb: Limit::from_column(self.max_storage_mb),
            team: Limit::from_column(self.max_team),
        }
    }
}

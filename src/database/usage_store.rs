use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Plan, Subscription};
use crate::database::{files, plans, portals, users};
use crate::services::usage_service::UsageStore;
use crate::types::Role;

/// Usage reads over one connection. Pass `&mut *tx` to read inside a transaction.
pub struct PgUsageStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgUsageStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

#[async_trait]
impl<'c> UsageStore for PgUsageStore<'c> {
    async fn find_user_role(&mut self, user_id: Uuid) -> Result<Option<Role>, DatabaseError> {
        users::find_role(&mut *self.conn, user_id).await
    }

    async fn current_subscription(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(Subscription, Plan)>, DatabaseError> {
        plans::current_subscription(&mut *self.conn, user_id, now).await
    }

    async fn find_plan_by_name(&mut self, name: &str) -> Result<Option<Plan>, DatabaseError> {
        plans::find_by_name(&mut *self.conn, name).await
    }

    async fn list_plans(&mut self) -> Result<Vec<Plan>, DatabaseError> {
        plans::list(&mut *self.conn).await
    }

    async fn count_clients(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        Ok(non_negative(portals::count_clients(&mut *self.conn, freelancer_id).await?))
    }

    async fn has_client(&mut self, freelancer_id: Uuid, client_id: Uuid) -> Result<bool, DatabaseError> {
        portals::has_client(&mut *self.conn, freelancer_id, client_id).await
    }

    async fn storage_bytes(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        Ok(non_negative(files::storage_bytes(&mut *self.conn, freelancer_id).await?))
    }

    async fn team_size(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team_members WHERE owner_id = $1")
            .bind(freelancer_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(non_negative(count))
    }
}

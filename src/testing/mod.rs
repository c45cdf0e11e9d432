use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Plan, Subscription};
use crate::services::usage_service::UsageStore;
use crate::types::Role;

/// In-memory usage store for service tests
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    users: HashMap<Uuid, Role>,
    plans: Vec<Plan>,
    subscriptions: Vec<Subscription>,
    /// (freelancer, client)
    portals: Vec<(Uuid, Option<Uuid>)>,
    /// (owner, bytes)
    files: Vec<(Uuid, u64)>,
    team: HashMap<Uuid, u64>,
    failing: bool,
}

impl MemoryUsageStore {
    /// Free, Pro and Business, matching the seeded catalog
    pub fn with_default_plans() -> Self {
        let mut store = Self::default();
        store.add_plan("Free", 0, Some(1), Some(500), Some(1));
        store.add_plan("Pro", 19, Some(10), Some(10_240), Some(3));
        store.add_plan("Business", 49, None, Some(102_400), Some(10));
        store
    }

    pub fn add_plan(
        &mut self,
        name: &str,
        price: i64,
        max_clients: Option<i32>,
        max_storage_mb: Option<i32>,
        max_team: Option<i32>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.plans.push(Plan {
            id,
            name: name.to_string(),
            price: Decimal::from(price),
            max_clients,
            max_storage_mb,
            max_team,
            created_at: Utc::now(),
        });
        id
    }

    pub fn add_freelancer(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.users.insert(id, Role::Freelancer);
        id
    }

    pub fn add_client(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.users.insert(id, Role::Client);
        id
    }

    pub fn subscribe(
        &mut self,
        user_id: Uuid,
        plan_name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        is_active: bool,
    ) {
        let plan_id = self
            .plans
            .iter()
            .find(|p| p.name == plan_name)
            .map(|p| p.id)
            .unwrap_or_else(|| panic!("no plan named {}", plan_name));
        self.subscriptions.push(Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            is_active,
            starts_at,
            ends_at,
            provider_subscription_id: None,
            created_at: starts_at + Duration::seconds(1),
        });
    }

    pub fn add_portal(&mut self, freelancer_id: Uuid, client_id: Option<Uuid>) {
        self.portals.push((freelancer_id, client_id));
    }

    pub fn add_file(&mut self, owner_id: Uuid, bytes: u64) {
        self.files.push((owner_id, bytes));
    }

    pub fn set_team_size(&mut self, owner_id: Uuid, size: u64) {
        self.team.insert(owner_id, size);
    }

    /// Every query after this returns a connection error
    pub fn fail_queries(&mut self) {
        self.failing = true;
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.failing {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn find_user_role(&mut self, user_id: Uuid) -> Result<Option<Role>, DatabaseError> {
        self.check()?;
        Ok(self.users.get(&user_id).copied())
    }

    async fn current_subscription(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(Subscription, Plan)>, DatabaseError> {
        self.check()?;
        let latest = self
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_current(now))
            .max_by_key(|s| (s.starts_at, s.created_at));

        Ok(latest.and_then(|s| {
            self.plans
                .iter()
                .find(|p| p.id == s.plan_id)
                .map(|p| (s.clone(), p.clone()))
        }))
    }

    async fn find_plan_by_name(&mut self, name: &str) -> Result<Option<Plan>, DatabaseError> {
        self.check()?;
        Ok(self.plans.iter().find(|p| p.name == name).cloned())
    }

    async fn list_plans(&mut self) -> Result<Vec<Plan>, DatabaseError> {
        self.check()?;
        let mut plans = self.plans.clone();
        plans.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn count_clients(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        self.check()?;
        let clients: HashSet<Uuid> = self
            .portals
            .iter()
            .filter(|(owner, _)| *owner == freelancer_id)
            .filter_map(|(_, client)| *client)
            .collect();
        Ok(clients.len() as u64)
    }

    async fn has_client(&mut self, freelancer_id: Uuid, client_id: Uuid) -> Result<bool, DatabaseError> {
        self.check()?;
        Ok(self
            .portals
            .iter()
            .any(|(owner, client)| *owner == freelancer_id && *client == Some(client_id)))
    }

    async fn storage_bytes(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        self.check()?;
        Ok(self
            .files
            .iter()
            .filter(|(owner, _)| *owner == freelancer_id)
            .map(|(_, bytes)| bytes)
            .sum())
    }

    async fn team_size(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError> {
        self.check()?;
        Ok(self.team.get(&freelancer_id).copied().unwrap_or(0))
    }
}

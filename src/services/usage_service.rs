use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::PlanConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Plan, Subscription};
use crate::types::Role;
use crate::usage::{
    self, recommend_upgrade, AdmissionDecision, Limit, OverLimitReport, PlanLimits, PlanTier, ResolvedPlan,
    UpgradeRecommendation, Usage, UsageCounts, UsageReport,
};

/// Reason given when a limit check cannot be completed
pub const UNVERIFIED_REASON: &str = "Unable to verify your plan limits right now. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),
    #[error("Usage accounting is only available to freelancers")]
    NotFreelancer,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Read side of usage accounting. Implemented over a Postgres connection or
/// transaction in `database::usage_store`, and in memory for tests.
#[async_trait]
pub trait UsageStore: Send {
    async fn find_user_role(&mut self, user_id: Uuid) -> Result<Option<Role>, DatabaseError>;

    /// The current subscription (`is_active` and `ends_at > now`) with its plan,
    /// latest `starts_at` first when more than one matches
    async fn current_subscription(
        &mut self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<(Subscription, Plan)>, DatabaseError>;

    async fn find_plan_by_name(&mut self, name: &str) -> Result<Option<Plan>, DatabaseError>;

    async fn list_plans(&mut self) -> Result<Vec<Plan>, DatabaseError>;

    /// Distinct clients assigned to the freelancer's portals
    async fn count_clients(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError>;

    async fn has_client(&mut self, freelancer_id: Uuid, client_id: Uuid) -> Result<bool, DatabaseError>;

    async fn storage_bytes(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError>;

    async fn team_size(&mut self, freelancer_id: Uuid) -> Result<u64, DatabaseError>;
}

/// Plan resolution, usage computation and admission checks for one freelancer at a time
pub struct UsageService<S> {
    store: S,
    plans: PlanConfig,
}

impl<S: UsageStore> UsageService<S> {
    pub fn new(store: S, plans: PlanConfig) -> Self {
        Self { store, plans }
    }

    /// The plan in effect now
    pub async fn resolve_plan(&mut self, user_id: Uuid) -> Result<ResolvedPlan, UsageError> {
        self.resolve_plan_at(user_id, Utc::now()).await
    }

    pub async fn resolve_plan_at(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<ResolvedPlan, UsageError> {
        if let Some((subscription, plan)) = self.store.current_subscription(user_id, now).await? {
            // The store filters already; re-check so a lax store can never extend a plan
            if subscription.is_current(now) {
                return Ok(ResolvedPlan {
                    id: Some(plan.id),
                    is_free_plan: self.is_free_plan_name(&plan.name),
                    name: plan.name.clone(),
                    price: plan.price,
                    is_active: true,
                    ends_at: Some(subscription.ends_at),
                    limits: plan.limits(),
                });
            }
        }

        let free = match self.store.find_plan_by_name(&self.plans.free_plan_name).await? {
            Some(plan) => ResolvedPlan {
                id: Some(plan.id),
                name: plan.name.clone(),
                price: plan.price,
                is_active: false,
                is_free_plan: true,
                ends_at: None,
                limits: plan.limits(),
            },
            None => {
                tracing::warn!("Free plan '{}' missing from plans table, using built-in limits", self.plans.free_plan_name);
                self.builtin_free_plan()
            }
        };
        Ok(free)
    }

    fn builtin_free_plan(&self) -> ResolvedPlan {
        ResolvedPlan {
            id: None,
            name: self.plans.free_plan_name.clone(),
            price: Decimal::ZERO,
            is_active: false,
            is_free_plan: true,
            ends_at: None,
            limits: PlanLimits {
                clients: Limit::from_config(self.plans.free_max_clients),
                storage_mb: Limit::from_config(self.plans.free_max_storage_mb),
                team: Limit::from_config(self.plans.free_max_team),
            },
        }
    }

    fn is_free_plan_name(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.plans.free_plan_name)
    }

    pub async fn usage_counts(&mut self, freelancer_id: Uuid) -> Result<UsageCounts, UsageError> {
        Ok(UsageCounts {
            clients: self.store.count_clients(freelancer_id).await?,
            storage_bytes: self.store.storage_bytes(freelancer_id).await?,
            team: self.store.team_size(freelancer_id).await?,
        })
    }

    async fn require_freelancer(&mut self, user_id: Uuid) -> Result<(), UsageError> {
        match self.store.find_user_role(user_id).await? {
            Some(Role::Freelancer) => Ok(()),
            Some(Role::Client) => Err(UsageError::NotFreelancer),
            None => Err(UsageError::UserNotFound(user_id)),
        }
    }

    /// Plan plus per-dimension usage
    pub async fn usage_report(&mut self, user_id: Uuid) -> Result<UsageReport, UsageError> {
        self.require_freelancer(user_id).await?;
        let plan = self.resolve_plan(user_id).await?;
        let counts = self.usage_counts(user_id).await?;
        let usage = Usage::evaluate(&counts, &plan.limits);
        Ok(UsageReport { plan, usage })
    }

    /// Admission check for a new portal. `client_id` is the client the portal
    /// would be shared with, when already known.
    pub async fn check_portal_admission(
        &mut self,
        user_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<AdmissionDecision, UsageError> {
        self.require_freelancer(user_id).await?;
        let plan = self.resolve_plan(user_id).await?;
        let counts = self.usage_counts(user_id).await?;
        let already_counted = match client_id {
            Some(client_id) => self.store.has_client(user_id, client_id).await?,
            None => false,
        };
        Ok(usage::admit_portal(&plan, &counts, already_counted))
    }

    /// Admission check for storing `file_size` more bytes against `owner_id`'s plan
    pub async fn check_upload_admission(&mut self, owner_id: Uuid, file_size: u64) -> Result<AdmissionDecision, UsageError> {
        self.require_freelancer(owner_id).await?;
        let plan = self.resolve_plan(owner_id).await?;
        let counts = self.usage_counts(owner_id).await?;
        Ok(usage::admit_upload(&plan, &counts, file_size))
    }

    /// Fail-closed variant of [`Self::check_portal_admission`]
    pub async fn can_create_portal(&mut self, user_id: Uuid, client_id: Option<Uuid>) -> AdmissionDecision {
        match self.check_portal_admission(user_id, client_id).await {
            Ok(decision) => decision,
            Err(UsageError::NotFreelancer) => AdmissionDecision::deny("Only freelancers can create portals."),
            Err(e) => {
                tracing::error!("Portal admission check failed for {}: {}", user_id, e);
                AdmissionDecision::deny(UNVERIFIED_REASON)
            }
        }
    }

    /// Fail-closed variant of [`Self::check_upload_admission`]
    pub async fn can_upload_file(&mut self, owner_id: Uuid, file_size: u64) -> AdmissionDecision {
        match self.check_upload_admission(owner_id, file_size).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Upload admission check failed for {}: {}", owner_id, e);
                AdmissionDecision::deny(UNVERIFIED_REASON)
            }
        }
    }

    /// Over-limit summary. Clients never see one.
    pub async fn over_limit(&mut self, user_id: Uuid) -> Result<OverLimitReport, UsageError> {
        match self.store.find_user_role(user_id).await? {
            Some(Role::Freelancer) => {}
            Some(Role::Client) => return Ok(OverLimitReport::none()),
            None => return Err(UsageError::UserNotFound(user_id)),
        }
        let plan = self.resolve_plan(user_id).await?;
        let counts = self.usage_counts(user_id).await?;
        Ok(OverLimitReport::from_usage(&Usage::evaluate(&counts, &plan.limits)))
    }

    pub async fn upgrade_recommendation(&mut self, user_id: Uuid) -> Result<UpgradeRecommendation, UsageError> {
        self.require_freelancer(user_id).await?;
        let plan = self.resolve_plan(user_id).await?;
        let counts = self.usage_counts(user_id).await?;
        let catalog: Vec<PlanTier> = self.store.list_plans().await?.iter().map(PlanTier::from).collect();
        Ok(recommend_upgrade(&PlanTier::from(&plan), &catalog, &counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryUsageStore;
    use crate::usage::{UpgradeStatus, UsageDimension, BYTES_PER_MB};
    use chrono::Duration;

    fn service(store: MemoryUsageStore) -> UsageService<MemoryUsageStore> {
        UsageService::new(store, PlanConfig::default())
    }

    #[tokio::test]
    async fn no_subscription_falls_back_to_free_plan() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();

        let plan = service(store).resolve_plan(freelancer).await.unwrap();
        assert_eq!(plan.name, "Free");
        assert!(plan.is_free_plan);
        assert!(!plan.is_active);
        assert_eq!(plan.limits.clients, Limit::Finite(1));
    }

    #[tokio::test]
    async fn missing_free_plan_row_uses_builtin_limits() {
        let mut store = MemoryUsageStore::default();
        let freelancer = store.add_freelancer();

        let plan = service(store).resolve_plan(freelancer).await.unwrap();
        assert!(plan.id.is_none());
        assert_eq!(plan.limits.storage_mb, Limit::Finite(500));
    }

    #[tokio::test]
    async fn subscription_ending_now_is_expired() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let now = Utc::now();
        store.subscribe(freelancer, "Pro", now - Duration::days(30), now, true);

        let plan = service(store).resolve_plan_at(freelancer, now).await.unwrap();
        assert_eq!(plan.name, "Free");
    }

    #[tokio::test]
    async fn active_subscription_wins() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let now = Utc::now();
        store.subscribe(freelancer, "Pro", now - Duration::days(1), now + Duration::days(29), true);

        let plan = service(store).resolve_plan_at(freelancer, now).await.unwrap();
        assert_eq!(plan.name, "Pro");
        assert!(plan.is_active);
        assert!(!plan.is_free_plan);
        assert_eq!(plan.ends_at, Some(now + Duration::days(29)));
    }

    #[tokio::test]
    async fn overlapping_subscriptions_pick_latest_start() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let now = Utc::now();
        store.subscribe(freelancer, "Business", now - Duration::days(20), now + Duration::days(10), true);
        store.subscribe(freelancer, "Pro", now - Duration::days(2), now + Duration::days(28), true);

        let plan = service(store).resolve_plan_at(freelancer, now).await.unwrap();
        assert_eq!(plan.name, "Pro");
    }

    #[tokio::test]
    async fn free_plan_with_one_client_blocks_new_portal() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let client = store.add_client();
        store.add_portal(freelancer, Some(client));

        let mut service = service(store);
        let decision = service.can_create_portal(freelancer, None).await;
        assert!(!decision.allowed);
        assert!(decision.reason.is_some());

        // A new client would need a second slot
        let other = Uuid::new_v4();
        assert!(!service.can_create_portal(freelancer, Some(other)).await.allowed);
    }

    #[tokio::test]
    async fn repeat_client_does_not_consume_a_slot() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let client = store.add_client();
        store.add_portal(freelancer, Some(client));
        store.add_portal(freelancer, Some(client));

        let mut service = service(store);
        let report = service.usage_report(freelancer).await.unwrap();
        assert_eq!(report.usage.clients.current, 1);
        assert!(!report.usage.clients.is_over_limit);
        assert!(service.can_create_portal(freelancer, Some(client)).await.allowed);
    }

    #[tokio::test]
    async fn portals_without_clients_do_not_count() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        store.add_portal(freelancer, None);

        assert!(service(store).can_create_portal(freelancer, None).await.allowed);
    }

    #[tokio::test]
    async fn upload_projected_over_limit_is_denied() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        store.add_file(freelancer, 490 * BYTES_PER_MB);

        let mut service = service(store);
        assert!(!service.can_upload_file(freelancer, 20 * BYTES_PER_MB).await.allowed);
        assert!(service.can_upload_file(freelancer, 10 * BYTES_PER_MB).await.allowed);
    }

    #[tokio::test]
    async fn admission_fails_closed_on_store_errors() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        store.fail_queries();

        let mut service = service(store);
        let portal = service.can_create_portal(freelancer, None).await;
        assert!(!portal.allowed);
        assert_eq!(portal.reason.as_deref(), Some(UNVERIFIED_REASON));
        assert!(!service.can_upload_file(freelancer, 1).await.allowed);
    }

    #[tokio::test]
    async fn unknown_user_is_denied() {
        let store = MemoryUsageStore::with_default_plans();
        let mut service = service(store);
        assert!(!service.can_create_portal(Uuid::new_v4(), None).await.allowed);
        assert!(matches!(
            service.usage_report(Uuid::new_v4()).await,
            Err(UsageError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn clients_never_see_over_limit() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        let client = store.add_client();
        let second = store.add_client();
        store.add_portal(freelancer, Some(client));
        store.add_portal(freelancer, Some(second));

        let mut service = service(store);
        assert!(service.over_limit(freelancer).await.unwrap().is_over_limit);

        let report = service.over_limit(client).await.unwrap();
        assert!(!report.is_over_limit);
        assert!(report.over_limit_types.is_empty());
    }

    #[tokio::test]
    async fn clients_cannot_read_usage_or_create_portals() {
        let mut store = MemoryUsageStore::with_default_plans();
        let client = store.add_client();

        let mut service = service(store);
        assert!(matches!(service.usage_report(client).await, Err(UsageError::NotFreelancer)));
        assert!(!service.can_create_portal(client, None).await.allowed);
    }

    #[tokio::test]
    async fn over_limit_after_downgrade_lists_dimensions() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        store.add_file(freelancer, 600 * BYTES_PER_MB);
        store.set_team_size(freelancer, 3);

        let report = service(store).over_limit(freelancer).await.unwrap();
        assert_eq!(report.over_limit_types, vec![UsageDimension::Storage, UsageDimension::Team]);
        assert!(report.message.contains("storage and team members"));
    }

    #[tokio::test]
    async fn upgrade_recommends_pro_for_moderate_usage() {
        let mut store = MemoryUsageStore::with_default_plans();
        let freelancer = store.add_freelancer();
        store.add_file(freelancer, 600 * BYTES_PER_MB);

        let rec = service(store).upgrade_recommendation(freelancer).await.unwrap();
        assert_eq!(rec.status, UpgradeStatus::Upgrade);
        assert_eq!(rec.current_plan, "Free");
        assert_eq!(rec.recommended_plan.unwrap().name, "Pro");
    }
}

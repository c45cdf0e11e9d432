//! Plan-limit accounting.
//!
//! Everything in this module is pure: callers load the resolved plan and the
//! raw usage counts (see [`crate::services::usage_service`]) and the functions
//! here derive per-dimension state, admission decisions and the over-limit
//! summary from them.

pub mod upgrade;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

pub use upgrade::{recommend_upgrade, PlanTier, UpgradeRecommendation, UpgradeStatus};

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// A plan limit for one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Finite(u64),
    Unlimited,
}

impl Limit {
    /// Plan columns store NULL or a negative sentinel for unlimited
    pub fn from_column(value: Option<i32>) -> Self {
        match value {
            Some(v) if v >= 0 => Limit::Finite(v as u64),
            _ => Limit::Unlimited,
        }
    }

    pub fn from_config(value: Option<u64>) -> Self {
        value.map_or(Limit::Unlimited, Limit::Finite)
    }

    /// Room for at least one more unit: `current < limit`
    pub fn has_room(&self, current: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Finite(max) => current < *max,
        }
    }

    /// `amount <= limit`
    pub fn fits(&self, amount: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Finite(max) => amount <= *max,
        }
    }

    /// Strictly over: `current > limit`. Being exactly at the limit is not over.
    pub fn is_exceeded_by(&self, current: u64) -> bool {
        match self {
            Limit::Unlimited => false,
            Limit::Finite(max) => current > *max,
        }
    }

    /// `min(100, round(current / limit * 100))`, 0 when unlimited
    pub fn percentage(&self, current: u64) -> u8 {
        match self {
            Limit::Unlimited => 0,
            Limit::Finite(0) => {
                if current > 0 {
                    100
                } else {
                    0
                }
            }
            Limit::Finite(max) => {
                let pct = (current as f64 / *max as f64 * 100.0).round();
                pct.min(100.0) as u8
            }
        }
    }

    pub fn scale(self, factor: u64) -> Limit {
        match self {
            Limit::Finite(v) => Limit::Finite(v.saturating_mul(factor)),
            Limit::Unlimited => Limit::Unlimited,
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Finite(v) => serializer.serialize_u64(*v),
            Limit::Unlimited => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(v) => write!(f, "{}", v),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub clients: Limit,
    #[serde(rename = "storageMB")]
    pub storage_mb: Limit,
    pub team: Limit,
}

impl PlanLimits {
    pub fn storage_bytes(&self) -> Limit {
        self.storage_mb.scale(BYTES_PER_MB)
    }
}

/// Raw usage figures for one freelancer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    /// Distinct clients across the freelancer's portals
    pub clients: u64,
    pub storage_bytes: u64,
    pub team: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageDimension {
    Clients,
    Storage,
    Team,
}

impl UsageDimension {
    pub fn label(&self) -> &'static str {
        match self {
            UsageDimension::Clients => "clients",
            UsageDimension::Storage => "storage",
            UsageDimension::Team => "team members",
        }
    }
}

/// The plan in effect for a freelancer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlan {
    /// None when the built-in Free limits apply because no plan row exists
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(skip)]
    pub price: Decimal,
    pub is_active: bool,
    pub is_free_plan: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub limits: PlanLimits,
}

struct MetricState {
    has_room: bool,
    is_over_limit: bool,
    usage_percentage: u8,
}

fn evaluate(current: u64, limit: Limit) -> MetricState {
    MetricState {
        has_room: limit.has_room(current),
        is_over_limit: limit.is_exceeded_by(current),
        usage_percentage: limit.percentage(current),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUsage {
    pub current: u64,
    pub limit: Limit,
    pub can_create: bool,
    pub is_over_limit: bool,
    pub usage_percentage: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    /// Megabytes, two decimals
    pub current: f64,
    pub current_bytes: u64,
    /// Megabytes
    pub limit: Limit,
    pub can_upload: bool,
    pub is_over_limit: bool,
    pub usage_percentage: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamUsage {
    pub current: u64,
    pub limit: Limit,
    pub can_invite: bool,
    pub is_over_limit: bool,
    pub usage_percentage: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    pub clients: ClientUsage,
    pub storage: StorageUsage,
    pub team: TeamUsage,
}

impl Usage {
    pub fn evaluate(counts: &UsageCounts, limits: &PlanLimits) -> Self {
        let clients = evaluate(counts.clients, limits.clients);
        // Storage is compared in bytes; only the display values are megabytes
        let storage = evaluate(counts.storage_bytes, limits.storage_bytes());
        let team = evaluate(counts.team, limits.team);

        Self {
            clients: ClientUsage {
                current: counts.clients,
                limit: limits.clients,
                can_create: clients.has_room,
                is_over_limit: clients.is_over_limit,
                usage_percentage: clients.usage_percentage,
            },
            storage: StorageUsage {
                current: bytes_to_mb(counts.storage_bytes),
                current_bytes: counts.storage_bytes,
                limit: limits.storage_mb,
                can_upload: storage.has_room,
                is_over_limit: storage.is_over_limit,
                usage_percentage: storage.usage_percentage,
            },
            team: TeamUsage {
                current: counts.team,
                limit: limits.team,
                can_invite: team.has_room,
                is_over_limit: team.is_over_limit,
                usage_percentage: team.usage_percentage,
            },
        }
    }

    pub fn over_limit_types(&self) -> Vec<UsageDimension> {
        [
            (UsageDimension::Clients, self.clients.is_over_limit),
            (UsageDimension::Storage, self.storage.is_over_limit),
            (UsageDimension::Team, self.team.is_over_limit),
        ]
        .into_iter()
        .filter_map(|(dimension, over)| over.then_some(dimension))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub plan: ResolvedPlan,
    pub usage: Usage,
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB as f64 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AdmissionDecision {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}

/// May the freelancer create another portal? A portal for a client they
/// already work with does not grow the distinct-client count.
pub fn admit_portal(plan: &ResolvedPlan, counts: &UsageCounts, client_already_counted: bool) -> AdmissionDecision {
    if client_already_counted || plan.limits.clients.has_room(counts.clients) {
        return AdmissionDecision::allow();
    }

    let plural = if plan.limits.clients == Limit::Finite(1) { "" } else { "s" };
    AdmissionDecision::deny(format!(
        "You have reached the {} plan limit of {} client{}. Upgrade your plan to add more clients.",
        plan.name, plan.limits.clients, plural
    ))
}

/// May a file of `file_size` bytes be stored? Projected usage must not exceed the limit.
pub fn admit_upload(plan: &ResolvedPlan, counts: &UsageCounts, file_size: u64) -> AdmissionDecision {
    let projected = counts.storage_bytes.saturating_add(file_size);
    if plan.limits.storage_bytes().fits(projected) {
        return AdmissionDecision::allow();
    }

    AdmissionDecision::deny(format!(
        "Uploading this file would exceed the {} plan storage limit of {} MB ({} MB used, {} MB requested).",
        plan.name,
        plan.limits.storage_mb,
        bytes_to_mb(counts.storage_bytes),
        bytes_to_mb(file_size)
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverLimitReport {
    pub is_over_limit: bool,
    pub over_limit_types: Vec<UsageDimension>,
    pub message: String,
}

impl OverLimitReport {
    /// What clients, and freelancers within their limits, receive
    pub fn none() -> Self {
        Self {
            is_over_limit: false,
            over_limit_types: Vec::new(),
            message: String::new(),
        }
    }

    pub fn from_usage(usage: &Usage) -> Self {
        let over_limit_types = usage.over_limit_types();
        if over_limit_types.is_empty() {
            return Self::none();
        }

        let message = format!(
            "Your account is over its plan limit for {}. Upgrade your plan or reduce usage to keep adding content.",
            join_labels(&over_limit_types)
        );
        Self {
            is_over_limit: true,
            over_limit_types,
            message,
        }
    }
}

fn join_labels(dimensions: &[UsageDimension]) -> String {
    let labels: Vec<&str> = dimensions.iter().map(UsageDimension::label).collect();
    match labels.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(clients: Limit, storage_mb: Limit, team: Limit) -> ResolvedPlan {
        ResolvedPlan {
            id: None,
            name: "Free".to_string(),
            price: Decimal::ZERO,
            is_active: false,
            is_free_plan: true,
            ends_at: None,
            limits: PlanLimits { clients, storage_mb, team },
        }
    }

    #[test]
    fn column_sentinels_mean_unlimited() {
        assert_eq!(Limit::from_column(None), Limit::Unlimited);
        assert_eq!(Limit::from_column(Some(-1)), Limit::Unlimited);
        assert_eq!(Limit::from_column(Some(0)), Limit::Finite(0));
        assert_eq!(Limit::from_column(Some(5)), Limit::Finite(5));
    }

    #[test]
    fn percentage_stays_within_bounds() {
        let limit = Limit::Finite(3);
        for current in 0..20 {
            assert!(limit.percentage(current) <= 100);
        }
        assert_eq!(limit.percentage(1), 33);
        assert_eq!(limit.percentage(2), 67);
        assert_eq!(limit.percentage(9), 100);
        assert_eq!(Limit::Finite(0).percentage(0), 0);
        assert_eq!(Limit::Finite(0).percentage(4), 100);
    }

    #[test]
    fn unlimited_percentage_is_zero() {
        assert_eq!(Limit::Unlimited.percentage(0), 0);
        assert_eq!(Limit::Unlimited.percentage(u64::MAX), 0);
    }

    #[test]
    fn at_limit_blocks_creation_but_is_not_over() {
        let usage = Usage::evaluate(
            &UsageCounts { clients: 1, storage_bytes: 0, team: 1 },
            &PlanLimits { clients: Limit::Finite(1), storage_mb: Limit::Finite(500), team: Limit::Finite(1) },
        );
        assert!(!usage.clients.can_create);
        assert!(!usage.clients.is_over_limit);
        assert_eq!(usage.clients.usage_percentage, 100);
        assert!(!usage.team.can_invite);
        assert!(!usage.team.is_over_limit);
    }

    #[test]
    fn over_limit_is_strict() {
        let usage = Usage::evaluate(
            &UsageCounts { clients: 2, storage_bytes: 0, team: 0 },
            &PlanLimits { clients: Limit::Finite(1), storage_mb: Limit::Unlimited, team: Limit::Unlimited },
        );
        assert!(usage.clients.is_over_limit);
        assert_eq!(usage.over_limit_types(), vec![UsageDimension::Clients]);
    }

    #[test]
    fn storage_is_compared_in_bytes_and_shown_in_megabytes() {
        let limits = PlanLimits { clients: Limit::Unlimited, storage_mb: Limit::Finite(1), team: Limit::Unlimited };

        let exactly_full = Usage::evaluate(&UsageCounts { storage_bytes: BYTES_PER_MB, ..Default::default() }, &limits);
        assert!(!exactly_full.storage.is_over_limit);
        assert!(!exactly_full.storage.can_upload);
        assert_eq!(exactly_full.storage.current, 1.0);

        let one_byte_over =
            Usage::evaluate(&UsageCounts { storage_bytes: BYTES_PER_MB + 1, ..Default::default() }, &limits);
        assert!(one_byte_over.storage.is_over_limit);
        assert_eq!(one_byte_over.storage.current_bytes, BYTES_PER_MB + 1);
    }

    #[test]
    fn usage_serializes_with_wire_names() {
        let usage = Usage::evaluate(
            &UsageCounts { clients: 0, storage_bytes: 0, team: 0 },
            &PlanLimits { clients: Limit::Unlimited, storage_mb: Limit::Finite(500), team: Limit::Finite(2) },
        );
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["clients"]["limit"], serde_json::Value::Null);
        assert_eq!(json["clients"]["canCreate"], true);
        assert_eq!(json["storage"]["limit"], 500);
        assert_eq!(json["storage"]["canUpload"], true);
        assert_eq!(json["team"]["canInvite"], true);
        assert_eq!(json["team"]["usagePercentage"], 0);
    }

    #[test]
    fn portal_admission_denied_at_limit_with_reason() {
        let plan = plan(Limit::Finite(1), Limit::Finite(500), Limit::Finite(1));
        let counts = UsageCounts { clients: 1, ..Default::default() };

        let decision = admit_portal(&plan, &counts, false);
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("limit of 1 client."));
    }

    #[test]
    fn portal_admission_allows_existing_client() {
        let plan = plan(Limit::Finite(1), Limit::Finite(500), Limit::Finite(1));
        let counts = UsageCounts { clients: 1, ..Default::default() };
        assert!(admit_portal(&plan, &counts, true).allowed);
    }

    #[test]
    fn upload_denied_when_projection_exceeds_limit() {
        let plan = plan(Limit::Finite(1), Limit::Finite(500), Limit::Finite(1));
        let counts = UsageCounts { storage_bytes: 490 * BYTES_PER_MB, ..Default::default() };

        let denied = admit_upload(&plan, &counts, 20 * BYTES_PER_MB);
        assert!(!denied.allowed);
        assert!(denied.reason.unwrap().contains("500 MB"));

        assert!(admit_upload(&plan, &counts, 10 * BYTES_PER_MB).allowed);
    }

    #[test]
    fn unlimited_storage_always_admits() {
        let plan = plan(Limit::Unlimited, Limit::Unlimited, Limit::Unlimited);
        let counts = UsageCounts { storage_bytes: u64::MAX - 1, ..Default::default() };
        assert!(admit_upload(&plan, &counts, u64::MAX).allowed);
    }

    #[test]
    fn over_limit_message_names_each_dimension() {
        let usage = Usage::evaluate(
            &UsageCounts { clients: 3, storage_bytes: 2 * BYTES_PER_MB, team: 5 },
            &PlanLimits { clients: Limit::Finite(1), storage_mb: Limit::Finite(1), team: Limit::Finite(2) },
        );
        let report = OverLimitReport::from_usage(&usage);
        assert!(report.is_over_limit);
        assert_eq!(
            report.over_limit_types,
            vec![UsageDimension::Clients, UsageDimension::Storage, UsageDimension::Team]
        );
        assert!(report.message.contains("clients, storage and team members"));
    }

    #[test]
    fn within_limits_reports_nothing() {
        let usage = Usage::evaluate(
            &UsageCounts { clients: 1, storage_bytes: 0, team: 0 },
            &PlanLimits { clients: Limit::Finite(1), storage_mb: Limit::Finite(1), team: Limit::Finite(1) },
        );
        assert_eq!(OverLimitReport::from_usage(&usage), OverLimitReport::none());
    }
}

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{PlanLimits, ResolvedPlan, UsageCounts};
use crate::database::models::Plan;

/// A plan as a candidate in the upgrade ladder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTier {
    pub id: Option<Uuid>,
    pub name: String,
    pub price: Decimal,
    pub limits: PlanLimits,
}

impl PlanTier {
    /// Current usage fits on every dimension (`current <= limit`)
    pub fn accommodates(&self, counts: &UsageCounts) -> bool {
        self.limits.clients.fits(counts.clients)
            && self.limits.storage_bytes().fits(counts.storage_bytes)
            && self.limits.team.fits(counts.team)
    }
}

impl From<&Plan> for PlanTier {
    fn from(plan: &Plan) -> Self {
        Self {
            id: Some(plan.id),
            name: plan.name.clone(),
            price: plan.price,
            limits: plan.limits(),
        }
    }
}

impl From<&ResolvedPlan> for PlanTier {
    fn from(plan: &ResolvedPlan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            price: plan.price,
            limits: plan.limits,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStatus {
    NoUpgradeNeeded,
    TopTier,
    Upgrade,
    ContactSupport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRecommendation {
    pub status: UpgradeStatus,
    pub current_plan: String,
    pub recommended_plan: Option<PlanTier>,
    /// Usage exceeds even the largest tier; needs manual follow-up
    pub requires_contact: bool,
    pub message: String,
}

/// Pick the cheapest tier above `current` that fits all three dimensions at once.
/// Tiers are ranked by price, then name.
pub fn recommend_upgrade(current: &PlanTier, catalog: &[PlanTier], counts: &UsageCounts) -> UpgradeRecommendation {
    let mut higher: Vec<&PlanTier> = catalog
        .iter()
        .filter(|tier| tier.price > current.price && tier.name != current.name)
        .collect();
    higher.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));

    if current.accommodates(counts) {
        let (status, message) = if higher.is_empty() {
            (UpgradeStatus::TopTier, format!("You are on the top tier ({}).", current.name))
        } else {
            (
                UpgradeStatus::NoUpgradeNeeded,
                format!("Your usage fits within the {} plan.", current.name),
            )
        };
        return UpgradeRecommendation {
            status,
            current_plan: current.name.clone(),
            recommended_plan: None,
            requires_contact: false,
            message,
        };
    }

    if let Some(tier) = higher.iter().find(|tier| tier.accommodates(counts)) {
        return UpgradeRecommendation {
            status: UpgradeStatus::Upgrade,
            current_plan: current.name.clone(),
            recommended_plan: Some((*tier).clone()),
            requires_contact: false,
            message: format!("Upgrade to {} to cover your current usage.", tier.name),
        };
    }

    let top = higher.last().copied().unwrap_or(current);
    UpgradeRecommendation {
        status: UpgradeStatus::ContactSupport,
        current_plan: current.name.clone(),
        recommended_plan: Some(top.clone()),
        requires_contact: true,
        message: format!(
            "Your usage exceeds every available plan. Upgrade to {} and contact support for a custom limit.",
            top.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{Limit, BYTES_PER_MB};

    fn tier(name: &str, price: i64, clients: Limit, storage_mb: Limit, team: Limit) -> PlanTier {
        PlanTier {
            id: None,
            name: name.to_string(),
            price: Decimal::from(price),
            limits: PlanLimits { clients, storage_mb, team },
        }
    }

    fn catalog() -> Vec<PlanTier> {
        vec![
            tier("Business", 49, Limit::Unlimited, Limit::Finite(102_400), Limit::Finite(10)),
            tier("Free", 0, Limit::Finite(1), Limit::Finite(500), Limit::Finite(1)),
            tier("Pro", 19, Limit::Finite(10), Limit::Finite(10_240), Limit::Finite(3)),
        ]
    }

    #[test]
    fn within_limits_needs_no_upgrade() {
        let plans = catalog();
        let counts = UsageCounts { clients: 1, storage_bytes: 0, team: 1 };
        let rec = recommend_upgrade(&plans[1], &plans, &counts);
        assert_eq!(rec.status, UpgradeStatus::NoUpgradeNeeded);
        assert!(rec.recommended_plan.is_none());
    }

    #[test]
    fn picks_cheapest_tier_covering_all_dimensions() {
        let plans = catalog();
        let counts = UsageCounts { clients: 4, storage_bytes: 600 * BYTES_PER_MB, team: 1 };
        let rec = recommend_upgrade(&plans[1], &plans, &counts);
        assert_eq!(rec.status, UpgradeStatus::Upgrade);
        assert_eq!(rec.recommended_plan.unwrap().name, "Pro");
    }

    #[test]
    fn skips_tiers_that_miss_one_dimension() {
        let plans = catalog();
        // Pro covers clients and storage but not a team of 5
        let counts = UsageCounts { clients: 4, storage_bytes: 0, team: 5 };
        let rec = recommend_upgrade(&plans[1], &plans, &counts);
        assert_eq!(rec.recommended_plan.unwrap().name, "Business");
    }

    #[test]
    fn beyond_every_tier_recommends_top_and_flags_contact() {
        let plans = catalog();
        let counts = UsageCounts { clients: 4, storage_bytes: 0, team: 50 };
        let rec = recommend_upgrade(&plans[1], &plans, &counts);
        assert_eq!(rec.status, UpgradeStatus::ContactSupport);
        assert!(rec.requires_contact);
        assert_eq!(rec.recommended_plan.unwrap().name, "Business");
    }

    #[test]
    fn top_tier_within_limits() {
        let plans = catalog();
        let counts = UsageCounts { clients: 40, storage_bytes: 0, team: 2 };
        let rec = recommend_upgrade(&plans[0], &plans, &counts);
        assert_eq!(rec.status, UpgradeStatus::TopTier);
        assert!(!rec.requires_contact);
    }

    #[test]
    fn top_tier_over_limits_needs_contact() {
        let plans = catalog();
        let counts = UsageCounts { clients: 40, storage_bytes: 0, team: 20 };
        let rec = recommend_upgrade(&plans[0], &plans, &counts);
        assert_eq!(rec.status, UpgradeStatus::ContactSupport);
        assert_eq!(rec.recommended_plan.unwrap().name, "Business");
    }
}

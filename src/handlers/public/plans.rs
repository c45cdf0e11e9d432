// handlers/public/plans.rs - plan catalog (no authentication)

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::plans;
use crate::middleware::{ApiResponse, ApiResult};
use crate::usage::PlanLimits;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub limits: PlanLimits,
}

/// GET /plans - Plan catalog, cheapest first. Unlimited limits are `null`.
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<PlanSummary>> {
    let catalog = plans::list(state.db.pool()).await?;
    let summaries = catalog
        .iter()
        .map(|plan| PlanSummary {
            id: plan.id,
            name: plan.name.clone(),
            price: plan.price,
            limits: plan.limits(),
        })
        .collect();

    Ok(ApiResponse::success(summaries))
}

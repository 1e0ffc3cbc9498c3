use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, OrgContext};
use crate::services::billing_service::{BillingSummary, Plan, PlanSwitchInput};
use crate::state::AppState;
use crate::validation::ValidatedJson;

/// GET /api/v1/billing/plans
pub async fn plans(State(state): State<AppState>, _org: OrgContext) -> ApiResult<Vec<Plan>> {
    Ok(ApiResponse::success(state.billing.plans().to_vec()))
}

/// GET /api/v1/billing/summary - current plan and usage
pub async fn summary(State(state): State<AppState>, org: OrgContext) -> ApiResult<BillingSummary> {
    Ok(ApiResponse::success(state.billing.summary(org.org_id).await?))
}

/// POST /api/v1/billing/plan-switch
///
/// Usage above the target plan's limits comes back as 422 `UPGRADE_REQUIRED`.
pub async fn plan_switch(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedJson(input): ValidatedJson<PlanSwitchInput>,
) -> ApiResult<BillingSummary> {
    let summary = state.billing.switch_plan(org.org_id, input).await?;
    Ok(ApiResponse::success(summary))
}

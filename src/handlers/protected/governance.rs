use axum::extract::State;

use super::IdPath;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult, OrgContext};
use crate::services::governance_service::{Policy, PolicyPatch};
use crate::state::AppState;
use crate::validation::{ValidatedJson, ValidatedPath};

/// GET /api/v1/governance/policies
pub async fn list(State(state): State<AppState>, org: OrgContext) -> ApiResult<Vec<Stored<Policy>>> {
    Ok(ApiResponse::success(state.governance.list(org.org_id).await?))
}

/// POST /api/v1/governance/policies
pub async fn create(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedJson(policy): ValidatedJson<Policy>,
) -> ApiResult<Stored<Policy>> {
    let created = state.governance.create(org.org_id, policy).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/v1/governance/policies/:id
pub async fn get(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<Stored<Policy>> {
    Ok(ApiResponse::success(state.governance.get(org.org_id, path.id).await?))
}

/// PATCH /api/v1/governance/policies/:id
pub async fn update(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
    ValidatedJson(patch): ValidatedJson<PolicyPatch>,
) -> ApiResult<Stored<Policy>> {
    let updated = state.governance.update(org.org_id, path.id, patch).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/governance/policies/:id - another org's policy is a 404
pub async fn delete(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<()> {
    state.governance.delete(org.org_id, path.id).await?;
    Ok(ApiResponse::no_content())
}

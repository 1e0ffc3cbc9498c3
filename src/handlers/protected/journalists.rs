use axum::extract::State;

use super::IdPath;
use crate::database::Stored;
use crate::middleware::{ApiResponse, ApiResult, OrgContext};
use crate::services::journalist_service::{JournalistProfile, ProfileListQuery, ProfilePatch};
use crate::state::AppState;
use crate::validation::{ValidatedJson, ValidatedPath, ValidatedQuery};

/// GET /api/v1/journalists/profiles - list profiles, optionally by beat
pub async fn list(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedQuery(query): ValidatedQuery<ProfileListQuery>,
) -> ApiResult<Vec<Stored<JournalistProfile>>> {
    let profiles = state.journalists.list(org.org_id, &query).await?;
    Ok(ApiResponse::success(profiles))
}

/// POST /api/v1/journalists/profiles
pub async fn create(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedJson(profile): ValidatedJson<JournalistProfile>,
) -> ApiResult<Stored<JournalistProfile>> {
    let created = state.journalists.create(org.org_id, profile).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/v1/journalists/profiles/:id
pub async fn get(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<Stored<JournalistProfile>> {
    Ok(ApiResponse::success(state.journalists.get(org.org_id, path.id).await?))
}

/// PATCH /api/v1/journalists/profiles/:id - null fields are left untouched
pub async fn update(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
    ValidatedJson(patch): ValidatedJson<ProfilePatch>,
) -> ApiResult<Stored<JournalistProfile>> {
    let updated = state.journalists.update(org.org_id, path.id, patch).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/journalists/profiles/:id
pub async fn delete(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<()> {
    state.journalists.delete(org.org_id, path.id).await?;
    Ok(ApiResponse::no_content())
}

use axum::{body::Bytes, extract::State};
use serde_json::Value;

use super::IdPath;
use crate::database::Stored;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, OrgContext};
use crate::services::outreach_service::{
    Run, RunListQuery, Sequence, SequencePatch, StartRunInput, StopRunInput,
};
use crate::state::AppState;
use crate::validation::{FieldError, RequestSchema, ValidatedJson, ValidatedPath, ValidatedQuery, ROOT_PATH};

/// GET /api/v1/outreach/sequences
pub async fn list_sequences(State(state): State<AppState>, org: OrgContext) -> ApiResult<Vec<Stored<Sequence>>> {
    Ok(ApiResponse::success(state.outreach.list_sequences(org.org_id).await?))
}

/// POST /api/v1/outreach/sequences
pub async fn create_sequence(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedJson(sequence): ValidatedJson<Sequence>,
) -> ApiResult<Stored<Sequence>> {
    let created = state.outreach.create_sequence(org.org_id, sequence).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/v1/outreach/sequences/:id
pub async fn get_sequence(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<Stored<Sequence>> {
    Ok(ApiResponse::success(state.outreach.get_sequence(org.org_id, path.id).await?))
}

/// PATCH /api/v1/outreach/sequences/:id
pub async fn update_sequence(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
    ValidatedJson(patch): ValidatedJson<SequencePatch>,
) -> ApiResult<Stored<Sequence>> {
    let updated = state.outreach.update_sequence(org.org_id, path.id, patch).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/outreach/sequences/:id - active runs are stopped first
pub async fn delete_sequence(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<()> {
    state.outreach.delete_sequence(org.org_id, path.id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/v1/outreach/sequences/:id/runs - enroll a journalist
pub async fn start_run(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
    ValidatedJson(input): ValidatedJson<StartRunInput>,
) -> ApiResult<Stored<Run>> {
    let run = state.outreach.start_run(org.org_id, path.id, input).await?;
    Ok(ApiResponse::created(run))
}

/// GET /api/v1/outreach/runs
pub async fn list_runs(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedQuery(query): ValidatedQuery<RunListQuery>,
) -> ApiResult<Vec<Stored<Run>>> {
    Ok(ApiResponse::success(state.outreach.list_runs(org.org_id, &query).await?))
}

/// GET /api/v1/outreach/runs/:id
pub async fn get_run(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<Stored<Run>> {
    Ok(ApiResponse::success(state.outreach.get_run(org.org_id, path.id).await?))
}

/// POST /api/v1/outreach/runs/:id/advance
pub async fn advance_run(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
) -> ApiResult<Stored<Run>> {
    Ok(ApiResponse::success(state.outreach.advance_run(org.org_id, path.id).await?))
}

/// POST /api/v1/outreach/runs/:id/stop - body `{reason?}` is optional
pub async fn stop_run(
    State(state): State<AppState>,
    org: OrgContext,
    ValidatedPath(path): ValidatedPath<IdPath>,
    body: Bytes,
) -> ApiResult<Stored<Run>> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        StopRunInput::default()
    } else {
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            ApiError::validation_error("Validation failed", vec![FieldError::new(ROOT_PATH, e.to_string())])
        })?;
        StopRunInput::schema().parse(&value)?
    };

    Ok(ApiResponse::success(state.outreach.stop_run(org.org_id, path.id, input).await?))
}

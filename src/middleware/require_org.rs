use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::OrgLookup;
use crate::state::AppState;

/// Tenant scope for a request. Present on every route behind `require_org`,
/// so handlers never deal with a missing org.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrgContext {
    pub org_id: Uuid,
    pub user_id: Uuid,
}

/// Resolve the caller's organization and inject `OrgContext`.
///
/// Must run after `require_user`. Users without a membership get 403 `NO_ORG`.
pub async fn require_org(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let org_id = match state.org_resolver.resolve(user.id).await? {
        OrgLookup::Found(org_id) => org_id,
        OrgLookup::NotFound => {
            tracing::warn!(user_id = %user.id, "authenticated user has no organization");
            return Err(ApiError::no_org());
        }
    };

    tracing::debug!(user_id = %user.id, org_id = %org_id, "organization resolved");
    request.extensions_mut().insert(OrgContext {
        org_id,
        user_id: user.id,
    });

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrgContext>()
            .copied()
            .ok_or_else(ApiError::no_org)
    }
}

use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, OrgContext};

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: Uuid,
    pub org_id: Uuid,
}

/// GET /api/v1/me - caller identity and resolved organization
pub async fn whoami(org: OrgContext) -> ApiResult<WhoAmI> {
    Ok(ApiResponse::success(WhoAmI {
        user_id: org.user_id,
        org_id: org.org_id,
    }))
}

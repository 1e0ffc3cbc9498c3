// Routes behind require_user + require_org. Every handler receives a
// resolved OrgContext and passes its org_id to the service layer.
pub mod billing;
pub mod governance;
pub mod journalists;
pub mod me;
pub mod outreach;

use serde::Deserialize;
use uuid::Uuid;

use crate::validation::{Field, RequestSchema, Schema};

/// `:id` path segment
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdPath {
    pub id: Uuid,
}

impl RequestSchema for IdPath {
    fn schema() -> Schema {
        Schema::new(vec![Field::uuid("id")])
    }
}

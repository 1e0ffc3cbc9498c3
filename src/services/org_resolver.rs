use std::sync::Arc;

use uuid::Uuid;

use crate::database::{MembershipStore, StoreError};

/// Outcome of mapping a user to their organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgLookup {
    Found(Uuid),
    NotFound,
}

/// Resolves the tenant scope for an authenticated user.
///
/// Looked up fresh on every request; membership changes take effect
/// immediately.
#[derive(Clone)]
pub struct OrgResolver {
    memberships: Arc<dyn MembershipStore>,
}

impl OrgResolver {
    pub fn new(memberships: Arc<dyn MembershipStore>) -> Self {
        Self { memberships }
    }

    pub async fn resolve(&self, user_id: Uuid) -> Result<OrgLookup, StoreError> {
        let org = self.memberships.first_org_for_user(user_id).await?;
        Ok(match org {
            Some(org_id) => OrgLookup::Found(org_id),
            None => OrgLookup::NotFound,
        })
    }
}

use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{MembershipStore, RecordStore};
use crate::services::{
    BillingService, GovernanceService, JournalistService, OrgResolver, OutreachService, PlanCatalogue,
};

/// Shared handles every request can reach through `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub org_resolver: OrgResolver,
    pub journalists: JournalistService,
    pub outreach: OutreachService,
    pub governance: GovernanceService,
    pub billing: BillingService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        memberships: Arc<dyn MembershipStore>,
        catalogue: PlanCatalogue,
    ) -> Self {
        let journalists = JournalistService::new(Arc::clone(&store));
        let outreach = OutreachService::new(Arc::clone(&store), journalists.clone());
        let governance = GovernanceService::new(Arc::clone(&store));
        let billing = BillingService::new(Arc::clone(&store), catalogue, config.billing.self_serve);

        Self {
            config: Arc::new(config),
            store,
            org_resolver: OrgResolver::new(memberships),
            journalists,
            outreach,
            governance,
            billing,
        }
    }
}

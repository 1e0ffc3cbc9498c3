pub mod billing_service;
pub mod error;
pub mod governance_service;
pub mod journalist_service;
pub mod org_resolver;
pub mod outreach_service;
pub mod repository;

pub use billing_service::{BillingService, PlanCatalogue};
pub use error::DomainError;
pub use governance_service::GovernanceService;
pub use journalist_service::JournalistService;
pub use org_resolver::{OrgLookup, OrgResolver};
pub use outreach_service::OutreachService;

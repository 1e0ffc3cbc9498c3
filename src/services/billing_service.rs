use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{governance_service, journalist_service, outreach_service, DomainError};
use crate::database::{to_data, RecordStore};
use crate::validation::{Field, RequestSchema, Schema};

pub const SUBSCRIPTIONS: &str = "billing_subscriptions";
pub const DEFAULT_PLAN: &str = "free";

const BUILTIN_PLANS: &str = include_str!("../../config/plans.yaml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read plan catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid plan catalogue: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("plan catalogue must define the '{0}' plan")]
    MissingDefault(&'static str),
}

/// Per-plan ceilings. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    #[serde(default)]
    pub journalist_profiles: Option<u64>,
    #[serde(default)]
    pub sequences: Option<u64>,
    #[serde(default)]
    pub policies: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price_monthly: Decimal,
    #[serde(default)]
    pub limits: PlanLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCatalogue {
    pub plans: Vec<Plan>,
}

impl PlanCatalogue {
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_yaml(BUILTIN_PLANS)
    }

    /// Built-in catalogue unless `path` names a replacement file
    pub fn load(path: Option<&str>) -> Result<Self, CatalogueError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
                    path: path.to_string(),
                    source,
                })?;
                Self::from_yaml(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self, CatalogueError> {
        let catalogue: PlanCatalogue = serde_yaml::from_str(raw)?;
        if catalogue.find(DEFAULT_PLAN).is_none() {
            return Err(CatalogueError::MissingDefault(DEFAULT_PLAN));
        }
        Ok(catalogue)
    }

    pub fn find(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub journalist_profiles: u64,
    pub sequences: u64,
    pub policies: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingSummary {
    pub plan: Plan,
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSwitchInput {
    pub plan_id: String,
}

impl RequestSchema for PlanSwitchInput {
    fn schema() -> Schema {
        Schema::new(vec![Field::string("planId").min(1).max(64)])
    }
}

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn RecordStore>,
    catalogue: Arc<PlanCatalogue>,
    self_serve: bool,
}

impl BillingService {
    pub fn new(store: Arc<dyn RecordStore>, catalogue: PlanCatalogue, self_serve: bool) -> Self {
        Self {
            store,
            catalogue: Arc::new(catalogue),
            self_serve,
        }
    }

    pub fn plans(&self) -> &[Plan] {
        &self.catalogue.plans
    }

    pub async fn summary(&self, org_id: Uuid) -> Result<BillingSummary, DomainError> {
        Ok(BillingSummary {
            plan: self.current_plan(org_id).await?,
            usage: self.usage(org_id).await?,
        })
    }

    /// Move the org to `plan_id`. Fails with `BillingQuota` when current
    /// usage does not fit the target plan.
    pub async fn switch_plan(&self, org_id: Uuid, input: PlanSwitchInput) -> Result<BillingSummary, DomainError> {
        if !self.self_serve {
            return Err(DomainError::FeatureDisabled("Self-serve plan switching"));
        }

        let plan = self
            .catalogue
            .find(&input.plan_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("plan"))?;

        let usage = self.usage(org_id).await?;
        check_limit(&plan, "journalist_profiles", usage.journalist_profiles, plan.limits.journalist_profiles)?;
        check_limit(&plan, "sequences", usage.sequences, plan.limits.sequences)?;
        check_limit(&plan, "policies", usage.policies, plan.limits.policies)?;

        let subscription = to_data(&json!({
            "plan_id": plan.id,
            "switched_at": Utc::now(),
        }))?;

        match self.store.select_all(org_id, SUBSCRIPTIONS).await?.into_iter().next() {
            Some(existing) => {
                self.store.update(org_id, SUBSCRIPTIONS, existing.id, subscription).await?;
            }
            None => {
                self.store.insert(org_id, SUBSCRIPTIONS, subscription).await?;
            }
        }

        tracing::info!(org_id = %org_id, plan = %plan.id, "plan switched");
        Ok(BillingSummary { plan, usage })
    }

    async fn current_plan(&self, org_id: Uuid) -> Result<Plan, DomainError> {
        let subscription = self.store.select_all(org_id, SUBSCRIPTIONS).await?.into_iter().next();
        let plan_id = subscription
            .as_ref()
            .and_then(|s| s.data.get("plan_id"))
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_PLAN);

        self.catalogue
            .find(plan_id)
            .or_else(|| {
                tracing::warn!(org_id = %org_id, plan_id, "subscription references unknown plan, using default");
                self.catalogue.find(DEFAULT_PLAN)
            })
            .cloned()
            .ok_or_else(|| DomainError::not_found("plan"))
    }

    async fn usage(&self, org_id: Uuid) -> Result<Usage, DomainError> {
        Ok(Usage {
            journalist_profiles: self.store.count(org_id, journalist_service::COLLECTION).await?,
            sequences: self.store.count(org_id, outreach_service::SEQUENCES).await?,
            policies: self.store.count(org_id, governance_service::COLLECTION).await?,
        })
    }
}

fn check_limit(plan: &Plan, resource: &'static str, used: u64, limit: Option<u64>) -> Result<(), DomainError> {
    match limit {
        Some(limit) if used > limit => Err(DomainError::BillingQuota {
            plan: plan.id.clone(),
            resource,
            used,
            limit,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::Map;

    fn service(store: Arc<MemoryStore>, self_serve: bool) -> BillingService {
        BillingService::new(store, PlanCatalogue::builtin().unwrap(), self_serve)
    }

    #[test]
    fn builtin_catalogue_parses() {
        let catalogue = PlanCatalogue::builtin().unwrap();
        let free = catalogue.find("free").unwrap();
        assert_eq!(free.limits.sequences, Some(3));
        assert_eq!(catalogue.find("enterprise").unwrap().limits, PlanLimits::default());
        assert_eq!(catalogue.find("starter").unwrap().price_monthly, Decimal::new(4900, 2));
    }

    #[test]
    fn catalogue_without_default_plan_is_rejected() {
        let raw = "plans:\n  - id: gold\n    name: Gold\n    price_monthly: \"10\"\n";
        assert!(matches!(PlanCatalogue::from_yaml(raw), Err(CatalogueError::MissingDefault("free"))));
    }

    #[tokio::test]
    async fn new_org_is_on_free_plan() {
        let svc = service(Arc::new(MemoryStore::new()), true);
        let summary = svc.summary(Uuid::new_v4()).await.unwrap();
        assert_eq!(summary.plan.id, "free");
        assert_eq!(summary.usage.sequences, 0);
    }

    #[tokio::test]
    async fn downgrade_over_quota_is_billing_quota_error() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store), true);
        let org = Uuid::new_v4();

        svc.switch_plan(org, PlanSwitchInput { plan_id: "starter".into() }).await.unwrap();
        for _ in 0..4 {
            store.insert(org, outreach_service::SEQUENCES, Map::new()).await.unwrap();
        }

        let err = svc
            .switch_plan(org, PlanSwitchInput { plan_id: "free".into() })
            .await
            .unwrap_err();
        match err {
            DomainError::BillingQuota { resource, used, limit, .. } => {
                assert_eq!((resource, used, limit), ("sequences", 4, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(svc.summary(org).await.unwrap().plan.id, "starter");
    }

    #[tokio::test]
    async fn unknown_plan_and_disabled_switching() {
        let store = Arc::new(MemoryStore::new());
        let err = service(Arc::clone(&store), true)
            .switch_plan(Uuid::new_v4(), PlanSwitchInput { plan_id: "platinum".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "plan" }));

        let err = service(store, false)
            .switch_plan(Uuid::new_v4(), PlanSwitchInput { plan_id: "pro".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::FeatureDisabled(_)));
    }
}

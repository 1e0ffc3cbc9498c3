use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::repository::Repository;
use super::DomainError;
use crate::database::{RecordStore, Stored};
use crate::validation::{strip_nulls, Field, RequestSchema, Schema};

pub const COLLECTION: &str = "governance_policies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Flag,
    Block,
    RequireReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Phrase or pattern the rule matches in outgoing content
    pub pattern: String,
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn policy_schema() -> Schema {
    Schema::new(vec![
        Field::string("name").min(1).max(200),
        Field::string("description").max(2000).optional().nullable(),
        Field::string("category").min(1).max(100),
        Field::one_of("severity", &["low", "medium", "high", "critical"]),
        Field::array(
            "rules",
            Schema::new(vec![
                Field::string("pattern").min(1).max(500),
                Field::one_of("action", &["flag", "block", "require_review"]),
            ]),
        )
        .max(100)
        .optional(),
        Field::boolean("enabled").optional(),
    ])
}

impl RequestSchema for Policy {
    fn schema() -> Schema {
        policy_schema()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PolicyPatch {
    pub fields: Map<String, Value>,
}

impl RequestSchema for PolicyPatch {
    fn schema() -> Schema {
        policy_schema().partial()
    }
}

#[derive(Clone)]
pub struct GovernanceService {
    policies: Repository<Policy>,
}

impl GovernanceService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            policies: Repository::new(store, COLLECTION, "policy"),
        }
    }

    pub async fn list(&self, org_id: Uuid) -> Result<Vec<Stored<Policy>>, DomainError> {
        self.policies.select_all(org_id).await
    }

    pub async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Stored<Policy>, DomainError> {
        self.policies.select_one(org_id, id).await
    }

    pub async fn create(&self, org_id: Uuid, policy: Policy) -> Result<Stored<Policy>, DomainError> {
        self.policies.create(org_id, &policy).await
    }

    pub async fn update(&self, org_id: Uuid, id: Uuid, patch: PolicyPatch) -> Result<Stored<Policy>, DomainError> {
        self.policies.update(org_id, id, strip_nulls(patch.fields)).await
    }

    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.policies.delete(org_id, id).await?;
        tracing::info!(org_id = %org_id, policy_id = %id, "policy deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    #[test]
    fn policy_schema_reports_nested_rule_errors() {
        let err = Policy::schema()
            .validate(&json!({
                "name": "No embargo leaks",
                "category": "compliance",
                "severity": "high",
                "rules": [{"pattern": "embargo", "action": "shred"}]
            }))
            .unwrap_err();
        assert!(err.has_path("rules.0.action"));
    }

    #[tokio::test]
    async fn delete_in_other_org_is_not_found_and_keeps_policy() {
        let svc = GovernanceService::new(Arc::new(MemoryStore::new()));
        let owner = Uuid::new_v4();
        let policy: Policy = Policy::schema()
            .parse(&json!({"name": "P", "category": "brand", "severity": "low"}))
            .unwrap();
        let created = svc.create(owner, policy).await.unwrap();
        assert!(created.attributes.enabled);

        let err = svc.delete(Uuid::new_v4(), created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "policy" }));
        assert!(svc.get(owner, created.id).await.is_ok());
    }
}

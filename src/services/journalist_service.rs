use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::repository::Repository;
use super::DomainError;
use crate::database::{RecordStore, Stored};
use crate::validation::{strip_nulls, Field, RequestSchema, Schema};

pub const COLLECTION: &str = "journalist_profiles";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalistProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<String>,
    #[serde(default)]
    pub beats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn profile_schema() -> Schema {
    Schema::new(vec![
        Field::string("name").min(1).max(200),
        Field::email("email").optional().nullable(),
        Field::string("outlet").max(200).optional().nullable(),
        Field::string_array("beats").max(50).optional(),
        Field::url("website").optional().nullable(),
        Field::string("notes").max(5000).optional().nullable(),
    ])
}

impl RequestSchema for JournalistProfile {
    fn schema() -> Schema {
        profile_schema()
    }
}

/// Partial update body. Keys set to `null` are treated as absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ProfilePatch {
    pub fields: Map<String, Value>,
}

impl RequestSchema for ProfilePatch {
    fn schema() -> Schema {
        profile_schema().partial()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileListQuery {
    pub beat: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RequestSchema for ProfileListQuery {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::string("beat").min(1).optional(),
            Field::integer("limit").min(1).max(500).optional(),
            Field::integer("offset").min(0).optional(),
        ])
    }
}

#[derive(Clone)]
pub struct JournalistService {
    profiles: Repository<JournalistProfile>,
}

impl JournalistService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            profiles: Repository::new(store, COLLECTION, "journalist_profile"),
        }
    }

    pub async fn list(&self, org_id: Uuid, query: &ProfileListQuery) -> Result<Vec<Stored<JournalistProfile>>, DomainError> {
        let profiles = self.profiles.select_all(org_id).await?;

        let filtered = profiles.into_iter().filter(|p| match &query.beat {
            Some(beat) => p.attributes.beats.iter().any(|b| b.eq_ignore_ascii_case(beat)),
            None => true,
        });

        Ok(filtered
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Stored<JournalistProfile>, DomainError> {
        self.profiles.select_one(org_id, id).await
    }

    pub async fn exists(&self, org_id: Uuid, id: Uuid) -> Result<bool, DomainError> {
        self.profiles.exists(org_id, id).await
    }

    pub async fn create(&self, org_id: Uuid, profile: JournalistProfile) -> Result<Stored<JournalistProfile>, DomainError> {
        let created = self.profiles.create(org_id, &profile).await?;
        tracing::info!(org_id = %org_id, profile_id = %created.id, "journalist profile created");
        Ok(created)
    }

    pub async fn update(&self, org_id: Uuid, id: Uuid, patch: ProfilePatch) -> Result<Stored<JournalistProfile>, DomainError> {
        self.profiles.update(org_id, id, strip_nulls(patch.fields)).await
    }

    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.profiles.delete(org_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn service() -> JournalistService {
        JournalistService::new(Arc::new(MemoryStore::new()))
    }

    fn profile(name: &str, beats: &[&str]) -> JournalistProfile {
        JournalistProfile {
            name: name.to_string(),
            email: None,
            outlet: Some("Wire".to_string()),
            beats: beats.iter().map(|b| b.to_string()).collect(),
            website: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn list_filters_by_beat_and_paginates() {
        let svc = service();
        let org = Uuid::new_v4();
        svc.create(org, profile("A", &["tech"])).await.unwrap();
        svc.create(org, profile("B", &["Tech", "ai"])).await.unwrap();
        svc.create(org, profile("C", &["health"])).await.unwrap();

        let query = ProfileListQuery { beat: Some("tech".into()), ..Default::default() };
        let names: Vec<_> = svc.list(org, &query).await.unwrap().into_iter().map(|p| p.attributes.name).collect();
        assert_eq!(names, vec!["A", "B"]);

        let page = ProfileListQuery { limit: Some(1), offset: Some(1), ..Default::default() };
        let names: Vec<_> = svc.list(org, &page).await.unwrap().into_iter().map(|p| p.attributes.name).collect();
        assert_eq!(names, vec!["B"]);
    }

    #[tokio::test]
    async fn patch_with_null_leaves_field_untouched() {
        let svc = service();
        let org = Uuid::new_v4();
        let created = svc.create(org, profile("A", &[])).await.unwrap();

        let patch: ProfilePatch = ProfilePatch::schema()
            .parse(&json!({"outlet": null, "notes": "met at CES"}))
            .unwrap();
        let updated = svc.update(org, created.id, patch).await.unwrap();

        assert_eq!(updated.attributes.outlet.as_deref(), Some("Wire"));
        assert_eq!(updated.attributes.notes.as_deref(), Some("met at CES"));
    }

    #[tokio::test]
    async fn other_org_sees_not_found() {
        let svc = service();
        let created = svc.create(Uuid::new_v4(), profile("A", &[])).await.unwrap();
        let err = svc.get(Uuid::new_v4(), created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "journalist_profile" }));
    }
}

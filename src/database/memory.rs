use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{unique_key, MembershipStore, Record, RecordStore, StoreError};

#[derive(Debug, Clone)]
struct Membership {
    user_id: Uuid,
    org_id: Uuid,
    created_at: DateTime<Utc>,
}

/// Process-local store used in development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
    memberships: RwLock<Vec<Membership>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, org_id: Uuid, user_id: Uuid) {
        self.memberships.write().await.push(Membership {
            user_id,
            org_id,
            created_at: Utc::now(),
        });
    }
}

fn new_record(org_id: Uuid, collection: &str, data: Map<String, Value>) -> Record {
    let now = Utc::now();
    Record {
        id: Uuid::new_v4(),
        org_id,
        collection: collection.to_string(),
        data,
        created_at: now,
        updated_at: now,
    }
}

fn matches(record: &Record, org_id: Uuid, collection: &str) -> bool {
    record.org_id == org_id && record.collection == collection
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select_all(&self, org_id: Uuid, collection: &str) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| matches(r, org_id, collection)).cloned().collect())
    }

    async fn select_where(
        &self,
        org_id: Uuid,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| matches(r, org_id, collection) && r.data.get(field) == Some(value))
            .cloned()
            .collect())
    }

    async fn select_one(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id && matches(r, org_id, collection)).cloned())
    }

    async fn insert(&self, org_id: Uuid, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError> {
        let record = new_record(org_id, collection, data);
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn insert_unique(
        &self,
        org_id: Uuid,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        let value = Value::from(unique_key(&data, key)?);
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| matches(r, org_id, collection) && r.data.get(key) == Some(&value))
        {
            return Ok(None);
        }
        let record = new_record(org_id, collection, data);
        records.push(record.clone());
        Ok(Some(record))
    }

    async fn update(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id && matches(r, org_id, collection)) else {
            return Ok(None);
        };
        record.data.extend(patch);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn update_if(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        expected: &Map<String, Value>,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id && matches(r, org_id, collection)) else {
            return Ok(None);
        };
        if !expected.iter().all(|(k, v)| record.data.get(k) == Some(v)) {
            return Ok(None);
        }
        record.data.extend(patch);
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(r.id == id && matches(r, org_id, collection)));
        Ok(records.len() < before)
    }

    async fn count(&self, org_id: Uuid, collection: &str) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| matches(r, org_id, collection)).count() as u64)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn first_org_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .min_by_key(|m| (m.created_at, m.org_id))
            .map(|m| m.org_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn records_are_invisible_to_other_orgs() {
        let store = MemoryStore::new();
        let (org_a, org_b) = (Uuid::new_v4(), Uuid::new_v4());
        let rec = store.insert(org_a, "policies", data(json!({"name": "A"}))).await.unwrap();

        assert!(store.select_one(org_b, "policies", rec.id).await.unwrap().is_none());
        assert!(store.update(org_b, "policies", rec.id, Map::new()).await.unwrap().is_none());
        assert!(!store.delete(org_b, "policies", rec.id).await.unwrap());
        assert_eq!(store.count(org_b, "policies").await.unwrap(), 0);

        assert!(store.select_one(org_a, "policies", rec.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_merges_top_level_keys() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let rec = store.insert(org, "c", data(json!({"a": 1, "b": 2}))).await.unwrap();
        let updated = store
            .update(org, "c", rec.id, data(json!({"b": 3, "c": 4})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Value::Object(updated.data), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn update_if_skips_records_that_changed() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let rec = store.insert(org, "runs", data(json!({"status": "active"}))).await.unwrap();
        let expected = data(json!({"status": "active"}));

        let first = store
            .update_if(org, "runs", rec.id, &expected, data(json!({"status": "stopped"})))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .update_if(org, "runs", rec.id, &expected, data(json!({"status": "completed"})))
            .await
            .unwrap();
        assert!(second.is_none());
        let stored = store.select_one(org, "runs", rec.id).await.unwrap().unwrap();
        assert_eq!(stored.data["status"], "stopped");
    }

    #[tokio::test]
    async fn insert_unique_is_per_org() {
        let store = MemoryStore::new();
        let (org_a, org_b) = (Uuid::new_v4(), Uuid::new_v4());
        let event = || data(json!({"event_id": "evt_1"}));

        assert!(store.insert_unique(org_a, "events", "event_id", event()).await.unwrap().is_some());
        assert!(store.insert_unique(org_a, "events", "event_id", event()).await.unwrap().is_none());
        assert!(store.insert_unique(org_b, "events", "event_id", event()).await.unwrap().is_some());
        assert_eq!(store.count(org_a, "events").await.unwrap(), 1);

        let err = store
            .insert_unique(org_a, "events", "event_id", data(json!({"event_id": 7})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn select_where_filters_on_field() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        store.insert(org, "runs", data(json!({"status": "active"}))).await.unwrap();
        store.insert(org, "runs", data(json!({"status": "stopped"}))).await.unwrap();
        let active = store.select_where(org, "runs", "status", &json!("active")).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn first_org_is_earliest_membership() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        store.add_member(first, user).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.add_member(second, user).await;

        assert_eq!(store.first_org_for_user(user).await.unwrap(), Some(first));
        assert_eq!(store.first_org_for_user(Uuid::new_v4()).await.unwrap(), None);
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid record data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// An org-owned JSON document in a named collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub org_id: Uuid,
    pub collection: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Decode `data` into a typed entity, keeping the record's identity.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Stored<T>, StoreError> {
        let attributes = serde_json::from_value(Value::Object(self.data))?;
        Ok(Stored {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            attributes,
        })
    }
}

/// Typed view of a [`Record`], serialized flat: `{id, created_at, updated_at, ...attributes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: T,
}

/// String value of `key` in `data`, as required by `insert_unique`
pub(crate) fn unique_key<'a>(data: &'a Map<String, Value>, key: &str) -> Result<&'a str, StoreError> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidData(format!("unique key '{}' must be a string", key)))
}

/// Serialize an entity into the map stored in `Record::data`
pub fn to_data<T: Serialize>(entity: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidData(format!("expected object, got {}", other))),
    }
}

/// Org-scoped document storage.
///
/// Every method takes the caller's org id and never returns or touches a
/// record owned by another org. A record in a different org is reported
/// exactly like a missing one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select_all(&self, org_id: Uuid, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Records whose top-level `field` equals `value`
    async fn select_where(
        &self,
        org_id: Uuid,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError>;

    async fn select_one(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError>;

    async fn insert(&self, org_id: Uuid, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError>;

    /// Shallow merge of `patch` into the stored data
    async fn update(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError>;

    /// Like [`update`](Self::update), but only while every entry of
    /// `expected` equals the stored top-level value. The check and the write
    /// are one atomic step. `None` when the record is missing or no longer
    /// matches.
    async fn update_if(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        expected: &Map<String, Value>,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError>;

    /// Insert unless another record in the collection carries the same
    /// string under `key`. `None` when the key is already taken.
    async fn insert_unique(
        &self,
        org_id: Uuid,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError>;

    /// Returns false when nothing matched
    async fn delete(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<bool, StoreError>;

    async fn count(&self, org_id: Uuid, collection: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Membership relation between users and organizations
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// First org the user belongs to, earliest membership first
    async fn first_org_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;
}

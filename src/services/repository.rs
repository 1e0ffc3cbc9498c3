use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::DomainError;
use crate::database::{to_data, RecordStore, Stored};

/// Typed CRUD over one org-scoped collection
pub struct Repository<T> {
    store: Arc<dyn RecordStore>,
    collection: &'static str,
    entity: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection,
            entity: self.entity,
            _entity: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    /// `entity` names the record in errors, e.g. `sequence` -> `SEQUENCE_NOT_FOUND`
    pub fn new(store: Arc<dyn RecordStore>, collection: &'static str, entity: &'static str) -> Self {
        Self {
            store,
            collection,
            entity,
            _entity: PhantomData,
        }
    }

    pub async fn select_all(&self, org_id: Uuid) -> Result<Vec<Stored<T>>, DomainError> {
        let records = self.store.select_all(org_id, self.collection).await?;
        records.into_iter().map(|r| r.decode().map_err(DomainError::from)).collect()
    }

    pub async fn select_where(&self, org_id: Uuid, field: &str, value: &Value) -> Result<Vec<Stored<T>>, DomainError> {
        let records = self.store.select_where(org_id, self.collection, field, value).await?;
        records.into_iter().map(|r| r.decode().map_err(DomainError::from)).collect()
    }

    pub async fn select_one(&self, org_id: Uuid, id: Uuid) -> Result<Stored<T>, DomainError> {
        match self.store.select_one(org_id, self.collection, id).await? {
            Some(record) => Ok(record.decode()?),
            None => Err(DomainError::not_found(self.entity)),
        }
    }

    pub async fn exists(&self, org_id: Uuid, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.store.select_one(org_id, self.collection, id).await?.is_some())
    }

    pub async fn create(&self, org_id: Uuid, entity: &T) -> Result<Stored<T>, DomainError> {
        let record = self.store.insert(org_id, self.collection, to_data(entity)?).await?;
        Ok(record.decode()?)
    }

    /// Merge `patch` into the stored entity. The merged result must still
    /// decode as `T`.
    pub async fn update(&self, org_id: Uuid, id: Uuid, patch: Map<String, Value>) -> Result<Stored<T>, DomainError> {
        match self.store.update(org_id, self.collection, id, patch).await? {
            Some(record) => Ok(record.decode()?),
            None => Err(DomainError::not_found(self.entity)),
        }
    }

    /// Conditional merge, see [`RecordStore::update_if`]. `None` when the
    /// entity is gone or no longer matches `expected`.
    pub async fn update_if(
        &self,
        org_id: Uuid,
        id: Uuid,
        expected: &Map<String, Value>,
        patch: Map<String, Value>,
    ) -> Result<Option<Stored<T>>, DomainError> {
        let record = self.store.update_if(org_id, self.collection, id, expected, patch).await?;
        Ok(record.map(|r| r.decode()).transpose()?)
    }

    pub async fn delete(&self, org_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        if self.store.delete(org_id, self.collection, id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(self.entity))
        }
    }
}

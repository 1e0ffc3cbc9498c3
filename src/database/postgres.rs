use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, types::Json, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use super::store::{unique_key, MembershipStore, Record, RecordStore, StoreError};
use crate::config::DatabaseConfig;

const RECORD_COLUMNS: &str = "id, org_id, collection, data, created_at, updated_at";

/// Postgres-backed store. Tables are described in `sql/schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }
}

fn record_from_row(row: &PgRow) -> Result<Record, StoreError> {
    let Json(data): Json<Value> = row.try_get("data")?;
    let data = match data {
        Value::Object(map) => map,
        other => return Err(StoreError::InvalidData(format!("record data is not an object: {}", other))),
    };

    Ok(Record {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        collection: row.try_get("collection")?,
        data,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    async fn select_all(&self, org_id: Uuid, collection: &str) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE org_id = $1 AND collection = $2 ORDER BY created_at, id",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(org_id).bind(collection).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn select_where(
        &self,
        org_id: Uuid,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE org_id = $1 AND collection = $2 AND data -> $3 = $4 ORDER BY created_at, id",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(org_id)
            .bind(collection)
            .bind(field)
            .bind(Json(value.clone()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn select_one(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE org_id = $1 AND collection = $2 AND id = $3",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(org_id)
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert(&self, org_id: Uuid, collection: &str, data: Map<String, Value>) -> Result<Record, StoreError> {
        let sql = format!(
            "INSERT INTO records (id, org_id, collection, data) VALUES ($1, $2, $3, $4) RETURNING {}",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(org_id)
            .bind(collection)
            .bind(Json(Value::Object(data)))
            .fetch_one(&self.pool)
            .await?;
        record_from_row(&row)
    }

    async fn insert_unique(
        &self,
        org_id: Uuid,
        collection: &str,
        key: &str,
        data: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        let unique = unique_key(&data, key)?.to_string();
        let sql = format!(
            "INSERT INTO records (id, org_id, collection, data, unique_key) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (org_id, collection, unique_key) DO NOTHING RETURNING {}",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(org_id)
            .bind(collection)
            .bind(Json(Value::Object(data)))
            .bind(unique)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn update(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        // jsonb || merges top-level keys, matching MemoryStore::update
        let sql = format!(
            "UPDATE records SET data = data || $4, updated_at = now() \
             WHERE org_id = $1 AND collection = $2 AND id = $3 RETURNING {}",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(org_id)
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(patch)))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn update_if(
        &self,
        org_id: Uuid,
        collection: &str,
        id: Uuid,
        expected: &Map<String, Value>,
        patch: Map<String, Value>,
    ) -> Result<Option<Record>, StoreError> {
        // @> on top-level scalars is equality per key; the row lock makes it a compare-and-set
        let sql = format!(
            "UPDATE records SET data = data || $4, updated_at = now() \
             WHERE org_id = $1 AND collection = $2 AND id = $3 AND data @> $5 RETURNING {}",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(org_id)
            .bind(collection)
            .bind(id)
            .bind(Json(Value::Object(patch)))
            .bind(Json(Value::Object(expected.clone())))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete(&self, org_id: Uuid, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE org_id = $1 AND collection = $2 AND id = $3")
            .bind(org_id)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, org_id: Uuid, collection: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE org_id = $1 AND collection = $2")
            .bind(org_id)
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn first_org_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let org_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT org_id FROM org_members WHERE user_id = $1 ORDER BY created_at ASC, org_id ASC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org_id)
    }
}

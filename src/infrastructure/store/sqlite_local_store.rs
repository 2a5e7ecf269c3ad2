use super::queries::{
    CONFIRM_UNCHANGED_RECORD, COUNT_DIRTY_RECORDS, COUNT_PENDING_MUTATIONS, COUNT_RECORDS,
    DELETE_COLLECTION_RECORDS, DELETE_KV, DELETE_PENDING_MUTATION, DELETE_RECORD,
    INSERT_PENDING_MUTATION, LOCK_COLLECTION, REGISTER_COLLECTION, SELECT_KV,
    SELECT_PENDING_MUTATIONS, SELECT_PENDING_RECORD_IDS, SELECT_RECORD_BY_ID, SELECT_RECORDS,
    SET_SERVER_ID, UPSERT_KV, UPSERT_RECORD,
};
use crate::application::ports::{KeyValueStore, LocalStore, PendingMutationQueue};
use crate::domain::entities::{PendingMutation, Record, RecordPayload};
use crate::domain::value_objects::{Collection, MutationAction, RecordId, SyncState};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// SQLite-backed implementation of every local persistence port.
pub struct SqliteLocalStore {
    pool: ConnectionPool,
    opened: RwLock<HashSet<Collection>>,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            opened: RwLock::new(HashSet::new()),
        }
    }

    pub async fn initialize(&self) -> Result<(), AppError> {
        self.pool.migrate().await?;
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await
            .is_ok()
    }

    /// Registers the collection on first use so its store exists before any
    /// read or write touches it.
    async fn ensure_collection(&self, collection: Collection) -> Result<(), AppError> {
        if self.opened.read().await.contains(&collection) {
            return Ok(());
        }

        let mut opened = self.opened.write().await;
        if opened.contains(&collection) {
            return Ok(());
        }

        sqlx::query(REGISTER_COLLECTION)
            .bind(collection.store_name())
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        opened.insert(collection);

        tracing::debug!(
            target: "store::local",
            collection = collection.store_name(),
            "opened collection store"
        );
        Ok(())
    }
}

fn bind_record<'q>(
    collection: Collection,
    record: &'q Record,
    payload: String,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    sqlx::query(UPSERT_RECORD)
        .bind(collection.store_name())
        .bind(record.id.as_str())
        .bind(record.server_id.as_deref())
        .bind(record.sync_state.as_str())
        .bind(payload)
        .bind(record.updated_at.timestamp_millis())
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(row.try_get::<i64, _>(column)?)
        .ok_or_else(|| AppError::Internal(format!("Invalid {column} timestamp")))
}

fn map_record(row: &SqliteRow) -> Result<Record, AppError> {
    let id: String = row.try_get("record_id")?;
    let sync_state: String = row.try_get("sync_state")?;
    let payload: String = row.try_get("payload")?;

    Ok(Record::new(
        RecordId::new(id).map_err(AppError::Database)?,
        row.try_get::<Option<String>, _>("server_id")?,
        SyncState::from_value(&sync_state).map_err(AppError::Database)?,
        serde_json::from_str::<RecordPayload>(&payload)
            .map_err(|e| AppError::DeserializationError(e.to_string()))?,
        timestamp(row, "updated_at")?,
    ))
}

fn map_pending_mutation(row: &SqliteRow) -> Result<PendingMutation, AppError> {
    let collection: String = row.try_get("collection")?;
    let record_id: String = row.try_get("record_id")?;
    let action: String = row.try_get("action")?;
    let payload: String = row.try_get("payload")?;

    Ok(PendingMutation {
        id: row.try_get("mutation_id")?,
        queue: row.try_get("queue")?,
        collection: collection.parse().map_err(AppError::Database)?,
        record_id: RecordId::new(record_id).map_err(AppError::Database)?,
        action: MutationAction::from_value(&action).map_err(AppError::Database)?,
        payload: serde_json::from_str::<RecordPayload>(&payload)
            .map_err(|e| AppError::DeserializationError(e.to_string()))?,
        created_at: timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn read_all(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        self.ensure_collection(collection).await?;
        let rows = sqlx::query(SELECT_RECORDS)
            .bind(collection.store_name())
            .fetch_all(self.pool.get_pool())
            .await?;

        rows.iter().map(map_record).collect()
    }

    async fn upsert_many(
        &self,
        collection: Collection,
        records: &[Record],
    ) -> Result<(), AppError> {
        self.ensure_collection(collection).await?;
        for record in records {
            let payload = serde_json::to_string(&record.payload)?;
            bind_record(collection, record, payload)
                .execute(self.pool.get_pool())
                .await?;
        }
        Ok(())
    }

    async fn upsert_one(&self, collection: Collection, record: &Record) -> Result<(), AppError> {
        self.upsert_many(collection, std::slice::from_ref(record))
            .await
    }

    async fn replace_all(
        &self,
        collection: Collection,
        records: &[Record],
    ) -> Result<(), AppError> {
        self.ensure_collection(collection).await?;

        // Serialize up front so a bad payload never leaves a half-open transaction.
        let payloads = records
            .iter()
            .map(|record| serde_json::to_string(&record.payload))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.get_pool().begin().await?;
        sqlx::query(DELETE_COLLECTION_RECORDS)
            .bind(collection.store_name())
            .execute(&mut *tx)
            .await?;
        for (record, payload) in records.iter().zip(payloads) {
            bind_record(collection, record, payload)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            target: "store::local",
            collection = collection.store_name(),
            count = records.len(),
            "replaced collection contents"
        );
        Ok(())
    }

    async fn fill_if_empty(
        &self,
        collection: Collection,
        records: &[Record],
    ) -> Result<bool, AppError> {
        self.ensure_collection(collection).await?;

        let payloads = records
            .iter()
            .map(|record| serde_json::to_string(&record.payload))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.get_pool().begin().await?;
        // Take the write lock first so the emptiness check cannot go stale
        // before the inserts land.
        sqlx::query(LOCK_COLLECTION)
            .bind(collection.store_name())
            .execute(&mut *tx)
            .await?;
        let existing: i64 = sqlx::query_scalar(COUNT_RECORDS)
            .bind(collection.store_name())
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tx.rollback().await?;
            tracing::debug!(
                target: "store::local",
                collection = collection.store_name(),
                existing,
                "collection no longer empty, fill skipped"
            );
            return Ok(false);
        }

        for (record, payload) in records.iter().zip(payloads) {
            bind_record(collection, record, payload)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn confirm_if_unchanged(
        &self,
        collection: Collection,
        record: &Record,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.ensure_collection(collection).await?;
        let payload = serde_json::to_string(&record.payload)?;
        let result = sqlx::query(CONFIRM_UNCHANGED_RECORD)
            .bind(collection.store_name())
            .bind(record.id.as_str())
            .bind(record.server_id.as_deref())
            .bind(record.sync_state.as_str())
            .bind(payload)
            .bind(record.updated_at.timestamp_millis())
            .bind(expected_updated_at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_server_id(
        &self,
        collection: Collection,
        id: &RecordId,
        server_id: &str,
    ) -> Result<(), AppError> {
        self.ensure_collection(collection).await?;
        sqlx::query(SET_SERVER_ID)
            .bind(collection.store_name())
            .bind(id.as_str())
            .bind(server_id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn get_by_key(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<Record>, AppError> {
        self.ensure_collection(collection).await?;
        let row = sqlx::query(SELECT_RECORD_BY_ID)
            .bind(collection.store_name())
            .bind(id.as_str())
            .fetch_optional(self.pool.get_pool())
            .await?;

        match row {
            Some(row) => map_record(&row).map(Some),
            None => Ok(None),
        }
    }

    async fn delete_by_key(&self, collection: Collection, id: &RecordId) -> Result<(), AppError> {
        self.ensure_collection(collection).await?;
        sqlx::query(DELETE_RECORD)
            .bind(collection.store_name())
            .bind(id.as_str())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn clear(&self, collection: Collection) -> Result<(), AppError> {
        self.ensure_collection(collection).await?;
        sqlx::query(DELETE_COLLECTION_RECORDS)
            .bind(collection.store_name())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn count_dirty(&self, collection: Collection) -> Result<u64, AppError> {
        self.ensure_collection(collection).await?;
        let count: i64 = sqlx::query_scalar(COUNT_DIRTY_RECORDS)
            .bind(collection.store_name())
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl KeyValueStore for SqliteLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>(SELECT_KV)
            .bind(key)
            .fetch_optional(self.pool.get_pool())
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(UPSERT_KV)
            .bind(key)
            .bind(value)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        sqlx::query(DELETE_KV)
            .bind(key)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PendingMutationQueue for SqliteLocalStore {
    async fn enqueue(&self, mutation: &PendingMutation) -> Result<(), AppError> {
        sqlx::query(INSERT_PENDING_MUTATION)
            .bind(&mutation.id)
            .bind(&mutation.queue)
            .bind(mutation.collection.store_name())
            .bind(mutation.record_id.as_str())
            .bind(mutation.action.as_str())
            .bind(serde_json::to_string(&mutation.payload)?)
            .bind(mutation.created_at.timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;

        tracing::debug!(
            target: "sync::queue",
            queue = %mutation.queue,
            mutation_id = %mutation.id,
            record_id = %mutation.record_id,
            action = mutation.action.as_str(),
            "queued offline mutation"
        );
        Ok(())
    }

    async fn list(&self, queue: &str) -> Result<Vec<PendingMutation>, AppError> {
        let rows = sqlx::query(SELECT_PENDING_MUTATIONS)
            .bind(queue)
            .fetch_all(self.pool.get_pool())
            .await?;

        rows.iter().map(map_pending_mutation).collect()
    }

    async fn remove(&self, mutation_id: &str) -> Result<(), AppError> {
        sqlx::query(DELETE_PENDING_MUTATION)
            .bind(mutation_id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn len(&self, queue: &str) -> Result<u64, AppError> {
        let count: i64 = sqlx::query_scalar(COUNT_PENDING_MUTATIONS)
            .bind(queue)
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn record_ids(
        &self,
        queue: &str,
        collection: Collection,
    ) -> Result<Vec<RecordId>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(SELECT_PENDING_RECORD_IDS)
            .bind(queue)
            .bind(collection.store_name())
            .fetch_all(self.pool.get_pool())
            .await?;

        ids.into_iter()
            .map(|id| RecordId::new(id).map_err(AppError::Database))
            .collect()
    }
}

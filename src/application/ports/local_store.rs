use crate::domain::entities::{PendingMutation, Record};
use crate::domain::value_objects::{Collection, RecordId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable, collection-scoped record storage.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn read_all(&self, collection: Collection) -> Result<Vec<Record>, AppError>;
    /// Overwrites by id without deleting absent records. Not transactional: the
    /// first failing write aborts the remaining ones.
    async fn upsert_many(&self, collection: Collection, records: &[Record])
    -> Result<(), AppError>;
    async fn upsert_one(&self, collection: Collection, record: &Record) -> Result<(), AppError>;
    /// Clears the collection and writes `records` as one atomic unit.
    async fn replace_all(&self, collection: Collection, records: &[Record])
    -> Result<(), AppError>;
    /// Writes `records` only if the collection is still empty when the write
    /// starts. Returns whether anything was written.
    async fn fill_if_empty(&self, collection: Collection, records: &[Record])
    -> Result<bool, AppError>;
    /// Stores `record` only if the stored copy still carries `expected_updated_at`.
    /// A known server id is never cleared.
    async fn confirm_if_unchanged(
        &self,
        collection: Collection,
        record: &Record,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
    async fn set_server_id(
        &self,
        collection: Collection,
        id: &RecordId,
        server_id: &str,
    ) -> Result<(), AppError>;
    async fn get_by_key(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<Option<Record>, AppError>;
    async fn delete_by_key(&self, collection: Collection, id: &RecordId) -> Result<(), AppError>;
    async fn clear(&self, collection: Collection) -> Result<(), AppError>;
    async fn count_dirty(&self, collection: Collection) -> Result<u64, AppError>;
}

/// Small key/value area for blobs such as the persisted session.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PendingMutationQueue: Send + Sync {
    async fn enqueue(&self, mutation: &PendingMutation) -> Result<(), AppError>;
    /// Oldest first.
    async fn list(&self, queue: &str) -> Result<Vec<PendingMutation>, AppError>;
    async fn remove(&self, mutation_id: &str) -> Result<(), AppError>;
    async fn len(&self, queue: &str) -> Result<u64, AppError>;
    async fn record_ids(
        &self,
        queue: &str,
        collection: Collection,
    ) -> Result<Vec<RecordId>, AppError>;
}

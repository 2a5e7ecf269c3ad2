use crate::domain::entities::record::RecordPayload;
use crate::domain::value_objects::{Collection, MutationAction, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An offline write waiting to be replayed against the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub id: String,
    pub queue: String,
    pub collection: Collection,
    pub record_id: RecordId,
    pub action: MutationAction,
    pub payload: RecordPayload,
    pub created_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(
        queue: &str,
        collection: Collection,
        record_id: RecordId,
        action: MutationAction,
        payload: RecordPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            collection,
            record_id,
            action,
            payload,
            created_at: Utc::now(),
        }
    }
}

use crate::domain::value_objects::{Collection, RecordId, SyncState};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type RecordPayload = Map<String, Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{collection} payload must be a JSON object")]
    NotAnObject { collection: &'static str },

    #[error("{collection} payload has no server id (expected `{field}`)")]
    MissingServerId {
        collection: &'static str,
        field: &'static str,
    },
}

/// One cached domain entity. Only `id`, `server_id` and `sync_state` are managed
/// here; `payload` is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub server_id: Option<String>,
    pub sync_state: SyncState,
    pub payload: RecordPayload,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(
        id: RecordId,
        server_id: Option<String>,
        sync_state: SyncState,
        payload: RecordPayload,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            server_id,
            sync_state,
            payload,
            updated_at,
        }
    }

    /// A record created on this device that the server has never seen.
    pub fn local(payload: RecordPayload, sync_state: SyncState) -> Self {
        Self::new(RecordId::placeholder(), None, sync_state, payload, Utc::now())
    }

    /// A record as returned by the server, keyed by its server id.
    pub fn from_remote(collection: Collection, value: Value) -> Result<Self, PayloadError> {
        let Value::Object(payload) = value else {
            return Err(PayloadError::NotAnObject {
                collection: collection.store_name(),
            });
        };
        let server_id =
            extract_server_id(collection, &payload).ok_or(PayloadError::MissingServerId {
                collection: collection.store_name(),
                field: collection.server_id_field(),
            })?;
        let id = RecordId::new(server_id.clone()).map_err(|_| PayloadError::MissingServerId {
            collection: collection.store_name(),
            field: collection.server_id_field(),
        })?;

        Ok(Self::new(
            id,
            Some(server_id),
            SyncState::Synced,
            payload,
            Utc::now(),
        ))
    }

    /// Id to use when addressing this entity on the server.
    pub fn remote_id(&self) -> &str {
        self.server_id.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Also bumps `updated_at`, strictly past its previous value even at
    /// millisecond resolution.
    pub fn with_sync_state(mut self, sync_state: SyncState) -> Self {
        self.sync_state = sync_state;
        self.updated_at = Utc::now().max(self.updated_at + TimeDelta::milliseconds(1));
        self
    }

    /// Applies a confirmed server response: the server's fields win, the local key
    /// is kept and the canonical id is remembered.
    pub fn confirm(mut self, collection: Collection, response: &Value) -> Self {
        if let Value::Object(fields) = response {
            if let Some(server_id) = extract_server_id(collection, fields) {
                self.server_id = Some(server_id);
            }
            self.merge_payload(fields.clone());
        }
        self.with_sync_state(SyncState::Synced)
    }

    pub fn merge_payload(&mut self, patch: RecordPayload) {
        for (key, value) in patch {
            self.payload.insert(key, value);
        }
    }

    pub fn owner_id(&self, collection: Collection) -> Option<String> {
        let field = collection.owner_field()?;
        self.payload.get(field).and_then(id_to_string)
    }
}

pub fn extract_server_id(collection: Collection, payload: &RecordPayload) -> Option<String> {
    [collection.server_id_field(), "id", "_id"]
        .into_iter()
        .find_map(|field| payload.get(field).and_then(id_to_string))
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

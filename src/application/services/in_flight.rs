use crate::domain::value_objects::{Collection, RecordId};
use std::collections::HashSet;
use std::sync::Mutex;

/// Records that currently have a write outstanding against the server. Shared by
/// the sync coordinator and the mutation service so one record is never sent
/// by both at once.
#[derive(Debug, Default)]
pub struct InFlightRecords {
    ids: Mutex<HashSet<(Collection, RecordId)>>,
}

impl InFlightRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the record as being sent. `None` if someone else is sending it.
    pub fn try_claim(&self, collection: Collection, id: &RecordId) -> Option<InFlightClaim<'_>> {
        let key = (collection, id.clone());
        let inserted = self
            .ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.clone());
        inserted.then(|| InFlightClaim {
            registry: self,
            key,
        })
    }

    pub fn contains(&self, collection: Collection, id: &RecordId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&(collection, id.clone()))
    }
}

/// Releases the record when dropped.
#[derive(Debug)]
pub struct InFlightClaim<'a> {
    registry: &'a InFlightRecords,
    key: (Collection, RecordId),
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.registry
            .ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

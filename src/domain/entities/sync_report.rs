use crate::domain::value_objects::{Collection, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// Local cache was empty and has been filled from the server.
    Pulled { count: usize },
    /// Dirty records were pushed; failures stay dirty for the next tick.
    Pushed {
        synced: Vec<RecordId>,
        failed: Vec<RecordId>,
    },
    /// Nothing to do, or not visible to the current role.
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub collection: Collection,
    pub outcome: CollectionOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub replayed: Vec<String>,
    pub failed: Option<String>,
    pub remaining: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub skipped_no_session: bool,
    pub drain: Option<DrainReport>,
    pub collections: Vec<CollectionReport>,
    pub started_at: i64,
    pub finished_at: i64,
}

impl TickReport {
    pub fn outcome(&self, collection: Collection) -> Option<&CollectionOutcome> {
        self.collections
            .iter()
            .find(|report| report.collection == collection)
            .map(|report| &report.outcome)
    }

    pub fn synced_count(&self) -> usize {
        self.collections
            .iter()
            .map(|report| match &report.outcome {
                CollectionOutcome::Pulled { count } => *count,
                CollectionOutcome::Pushed { synced, .. } => synced.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn error_count(&self) -> usize {
        let collection_errors: usize = self
            .collections
            .iter()
            .map(|report| match &report.outcome {
                CollectionOutcome::Pushed { failed, .. } => failed.len(),
                CollectionOutcome::Failed { .. } => 1,
                _ => 0,
            })
            .sum();
        let drain_errors = self
            .drain
            .as_ref()
            .map_or(0, |drain| usize::from(drain.failed.is_some()));
        collection_errors + drain_errors
    }
}

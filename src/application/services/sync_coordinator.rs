use crate::application::ports::{LocalStore, Notifier, PendingMutationQueue, RemoteGateway};
use crate::application::services::SessionContext;
use crate::application::services::in_flight::InFlightRecords;
use crate::domain::entities::{
    CollectionOutcome, CollectionReport, DrainReport, Notice, PendingMutation, Record, Session,
    TickReport, extract_server_id,
};
use crate::domain::value_objects::{Collection, MutationAction, RecordId, SyncState};
use crate::shared::error::AppError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_sync: Option<i64>,
    pub last_synced: usize,
    pub last_errors: usize,
    pub pending_mutations: u64,
    pub sync_errors: u64,
    /// Local records per collection the server has not confirmed yet.
    pub dirty_records: HashMap<Collection, u64>,
}

/// How a collection is pulled for the current role, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PullScope {
    All,
    Owner(String),
}

fn pull_scope(collection: Collection, session: &Session) -> Option<PullScope> {
    if session.role.is_privileged() {
        return Some(PullScope::All);
    }
    match collection {
        Collection::Users => None,
        _ if collection.owner_field().is_some() => Some(PullScope::Owner(session.user_id.clone())),
        _ => Some(PullScope::All),
    }
}

/// Clears an in-progress flag when the holder goes out of scope.
struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic reconciliation between the local store and the server.
pub struct SyncCoordinator {
    store: Arc<dyn LocalStore>,
    queue: Arc<dyn PendingMutationQueue>,
    gateway: Arc<dyn RemoteGateway>,
    session: Arc<SessionContext>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<InFlightRecords>,
    disabled: HashSet<Collection>,
    push_concurrency: usize,
    gate: Mutex<()>,
    draining: AtomicBool,
    status: RwLock<SyncStatus>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn PendingMutationQueue>,
        gateway: Arc<dyn RemoteGateway>,
        session: Arc<SessionContext>,
        notifier: Arc<dyn Notifier>,
        in_flight: Arc<InFlightRecords>,
        push_concurrency: usize,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            session,
            notifier,
            in_flight,
            disabled: HashSet::new(),
            push_concurrency: push_concurrency.max(1),
            gate: Mutex::new(()),
            draining: AtomicBool::new(false),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    /// Leaves `collection` out of every pass, for features switched off in config.
    pub fn without_collection(mut self, collection: Collection) -> Self {
        self.disabled.insert(collection);
        self
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// One reconciliation pass. Returns `None` when another pass is still running.
    pub async fn run_once(&self) -> Option<TickReport> {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!(target: "sync::coordinator", "sync pass already running");
            return None;
        };

        self.status.write().await.is_syncing = true;
        let report = self.tick().await;
        let pending = self.pending_mutation_count().await;
        let dirty = self.dirty_record_counts().await;

        let mut status = self.status.write().await;
        status.is_syncing = false;
        status.pending_mutations = pending;
        status.dirty_records = dirty;
        if !report.skipped_no_session {
            status.last_sync = Some(report.finished_at);
            status.last_synced = report.synced_count();
            status.last_errors = report.error_count();
            status.sync_errors += report.error_count() as u64;
        }
        drop(status);

        tracing::info!(
            target: "sync::coordinator",
            synced = report.synced_count(),
            errors = report.error_count(),
            skipped = report.skipped_no_session,
            "sync pass finished"
        );
        Some(report)
    }

    async fn tick(&self) -> TickReport {
        let started_at = Utc::now().timestamp_millis();
        let Some(session) = self.session.current().await else {
            tracing::debug!(target: "sync::coordinator", "no active session, skipping sync pass");
            return TickReport {
                skipped_no_session: true,
                started_at,
                finished_at: Utc::now().timestamp_millis(),
                ..TickReport::default()
            };
        };

        let drain = self.drain_pending().await;

        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let outcome = self.sync_collection(collection, &session).await;
            collections.push(CollectionReport {
                collection,
                outcome,
            });
        }

        TickReport {
            skipped_no_session: false,
            drain,
            collections,
            started_at,
            finished_at: Utc::now().timestamp_millis(),
        }
    }

    async fn sync_collection(&self, collection: Collection, session: &Session) -> CollectionOutcome {
        if self.disabled.contains(&collection) {
            return CollectionOutcome::Skipped {
                reason: "disabled".to_string(),
            };
        }
        let Some(scope) = pull_scope(collection, session) else {
            return CollectionOutcome::Skipped {
                reason: format!("not visible to {}", session.role),
            };
        };

        let records = match self.store.read_all(collection).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    target: "sync::coordinator",
                    collection = collection.store_name(),
                    error = %err,
                    "failed to read local collection"
                );
                return CollectionOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        if records.is_empty() {
            self.pull(collection, scope).await
        } else {
            self.push_dirty(collection, records).await
        }
    }

    async fn pull(&self, collection: Collection, scope: PullScope) -> CollectionOutcome {
        let fetched = match &scope {
            PullScope::All => self.gateway.fetch_all(collection).await,
            PullScope::Owner(owner_id) => self.gateway.fetch_by_owner(collection, owner_id).await,
        };

        let items = match fetched {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(
                    target: "sync::coordinator",
                    collection = collection.store_name(),
                    error = %err,
                    "failed to fetch collection"
                );
                return CollectionOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| match Record::from_remote(collection, item) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(
                        target: "sync::coordinator",
                        collection = collection.store_name(),
                        error = %err,
                        "skipping fetched record"
                    );
                    None
                }
            })
            .collect();

        // Local writes made during the fetch win; the next pass pushes them.
        match self.store.fill_if_empty(collection, &records).await {
            Ok(true) => {}
            Ok(false) => {
                return CollectionOutcome::Skipped {
                    reason: "local records written during fetch".to_string(),
                };
            }
            Err(err) => {
                tracing::warn!(
                    target: "sync::coordinator",
                    collection = collection.store_name(),
                    error = %err,
                    "failed to store fetched collection"
                );
                return CollectionOutcome::Failed {
                    error: err.to_string(),
                };
            }
        }

        tracing::debug!(
            target: "sync::coordinator",
            collection = collection.store_name(),
            count = records.len(),
            "pulled collection"
        );
        CollectionOutcome::Pulled {
            count: records.len(),
        }
    }

    async fn push_dirty(&self, collection: Collection, records: Vec<Record>) -> CollectionOutcome {
        // Queue-backed writes are replayed by the drain; pushing them here too would
        // send them twice.
        let queued: HashSet<RecordId> = match collection.mutation_queue() {
            Some(queue) => match self.queue.record_ids(queue, collection).await {
                Ok(ids) => ids.into_iter().collect(),
                Err(err) => {
                    return CollectionOutcome::Failed {
                        error: err.to_string(),
                    };
                }
            },
            None => HashSet::new(),
        };

        let dirty: Vec<Record> = records
            .into_iter()
            .filter(|record| record.sync_state.is_dirty() && !queued.contains(&record.id))
            .collect();
        if dirty.is_empty() {
            return CollectionOutcome::Skipped {
                reason: "nothing to push".to_string(),
            };
        }

        let results: Vec<(RecordId, Option<Result<Record, AppError>>)> = stream::iter(dirty)
            .map(|record| async move {
                let id = record.id.clone();
                // Already being sent by a user edit; the next pass picks it up.
                let Some(_claim) = self.in_flight.try_claim(collection, &id) else {
                    return (id, None);
                };
                (id, Some(self.push_record(collection, record).await))
            })
            .buffer_unordered(self.push_concurrency)
            .collect()
            .await;

        let mut synced = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                None => {
                    tracing::debug!(
                        target: "sync::coordinator",
                        collection = collection.store_name(),
                        record_id = %id,
                        "record already in flight, skipping push"
                    );
                }
                Some(Ok(_)) => synced.push(id),
                Some(Err(err)) => {
                    tracing::warn!(
                        target: "sync::coordinator",
                        collection = collection.store_name(),
                        record_id = %id,
                        error = %err,
                        "failed to push record"
                    );
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            self.notifier.notify(Notice::warning(format!(
                "Could not sync {} {} record(s), will retry",
                failed.len(),
                collection.label()
            )));
        }

        CollectionOutcome::Pushed { synced, failed }
    }

    async fn push_record(&self, collection: Collection, record: Record) -> Result<Record, AppError> {
        let payload = Value::Object(record.payload.clone());
        let response = match record.server_id.as_deref() {
            Some(server_id) => self.gateway.update(collection, server_id, &payload).await?,
            None => self.gateway.create(collection, &payload).await?,
        };

        let pushed_at = record.updated_at;
        let confirmed = record.confirm(collection, &response);

        // A local edit made while the push was in flight stays dirty; only the
        // server id is carried over.
        if !self
            .store
            .confirm_if_unchanged(collection, &confirmed, pushed_at)
            .await?
        {
            if let Some(server_id) = confirmed.server_id.as_deref() {
                self.store
                    .set_server_id(collection, &confirmed.id, server_id)
                    .await?;
            }
            tracing::debug!(
                target: "sync::coordinator",
                collection = collection.store_name(),
                record_id = %confirmed.id,
                "record edited during push, left dirty"
            );
        }
        Ok(confirmed)
    }

    /// Replays queued offline mutations oldest first. Returns `None` if a drain is
    /// already in progress.
    pub async fn drain_pending(&self) -> Option<DrainReport> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(target: "sync::queue", "drain already in progress");
            return None;
        }
        let _flag = FlagGuard(&self.draining);

        let queues: HashSet<&'static str> = Collection::ALL
            .into_iter()
            .filter_map(|collection| collection.mutation_queue())
            .collect();

        let mut report = DrainReport::default();
        for queue in queues {
            self.drain_queue(queue, &mut report).await;
            if report.failed.is_some() {
                break;
            }
        }
        Some(report)
    }

    async fn drain_queue(&self, queue: &str, report: &mut DrainReport) {
        let mutations = match self.queue.list(queue).await {
            Ok(mutations) => mutations,
            Err(err) => {
                tracing::warn!(target: "sync::queue", queue, error = %err, "failed to read queue");
                report.failed = Some(err.to_string());
                return;
            }
        };

        for (index, mutation) in mutations.iter().enumerate() {
            let has_followups = mutations[index + 1..]
                .iter()
                .any(|later| later.record_id == mutation.record_id);

            match self.replay(mutation, has_followups).await {
                Ok(()) => {
                    tracing::info!(
                        target: "sync::queue",
                        queue,
                        mutation_id = %mutation.id,
                        record_id = %mutation.record_id,
                        "replayed offline mutation"
                    );
                    report.replayed.push(mutation.id.clone());
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sync::queue",
                        queue,
                        mutation_id = %mutation.id,
                        error = %err,
                        "replay failed, leaving remaining mutations queued"
                    );
                    report.failed = Some(format!("{}: {err}", mutation.id));
                    report.remaining += mutations.len() - index;
                    return;
                }
            }
        }
    }

    async fn replay(&self, mutation: &PendingMutation, has_followups: bool) -> Result<(), AppError> {
        let collection = mutation.collection;
        let payload = Value::Object(mutation.payload.clone());
        let local = self.store.get_by_key(collection, &mutation.record_id).await?;
        let known_server_id = local.as_ref().and_then(|record| record.server_id.clone());

        let response = match (mutation.action, known_server_id) {
            (_, Some(server_id)) => self.gateway.update(collection, &server_id, &payload).await?,
            (MutationAction::Update, None) if !mutation.record_id.is_placeholder() => {
                self.gateway
                    .update(collection, mutation.record_id.as_str(), &payload)
                    .await?
            }
            _ => self.gateway.create(collection, &payload).await?,
        };

        let record = local.unwrap_or_else(|| {
            Record::new(
                mutation.record_id.clone(),
                None,
                SyncState::PendingOffline,
                mutation.payload.clone(),
                mutation.created_at,
            )
        });
        let record = if has_followups {
            let mut record = record;
            if let Value::Object(fields) = &response {
                if let Some(server_id) = extract_server_id(collection, fields) {
                    record.server_id = Some(server_id);
                }
            }
            record
        } else {
            record.confirm(collection, &response)
        };

        self.store.upsert_one(collection, &record).await?;
        self.queue.remove(&mutation.id).await?;
        Ok(())
    }

    /// Drains the queue when the device comes back online.
    pub async fn handle_connectivity_change(&self, online: bool) -> Option<DrainReport> {
        tracing::info!(target: "sync::coordinator", online, "connectivity changed");
        if !online {
            return None;
        }
        self.drain_pending().await
    }

    async fn dirty_record_counts(&self) -> HashMap<Collection, u64> {
        let mut counts = HashMap::new();
        for collection in Collection::ALL {
            match self.store.count_dirty(collection).await {
                Ok(count) => {
                    counts.insert(collection, count);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "sync::coordinator",
                        collection = collection.store_name(),
                        error = %err,
                        "failed to count dirty records"
                    );
                }
            }
        }
        counts
    }

    async fn pending_mutation_count(&self) -> u64 {
        let mut total = 0;
        for queue in Collection::ALL
            .into_iter()
            .filter_map(|collection| collection.mutation_queue())
            .collect::<HashSet<_>>()
        {
            total += self.queue.len(queue).await.unwrap_or(0);
        }
        total
    }

    /// Starts the periodic timer. The first pass runs immediately.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> SyncHandle {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());
        let coordinator = Arc::clone(self);
        let wake = Arc::clone(&trigger);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }

                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move {
                    coordinator.run_once().await;
                });
            }
            tracing::debug!(target: "sync::coordinator", "sync timer stopped");
        });

        SyncHandle {
            cancel: cancel_tx,
            trigger,
            task,
        }
    }
}

/// Control handle for a spawned sync timer. Dropping it stops the timer.
pub struct SyncHandle {
    cancel: watch::Sender<bool>,
    trigger: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stops further ticks; a pass already in flight runs to completion.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

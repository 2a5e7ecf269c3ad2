use crate::application::ports::{
    ConnectivityProbe, LocalStore, Notifier, PendingMutationQueue, RemoteGateway,
};
use crate::application::services::in_flight::InFlightRecords;
use crate::domain::entities::{Notice, PendingMutation, Record, RecordPayload};
use crate::domain::value_objects::{Collection, MutationAction, RecordId, SyncState};
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The server accepted the write.
    Synced(Record),
    /// The write is stored locally and will be sent by a later sync pass.
    SavedOffline(Record),
}

impl MutationOutcome {
    pub fn record(&self) -> &Record {
        match self {
            MutationOutcome::Synced(record) | MutationOutcome::SavedOffline(record) => record,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            MutationOutcome::Synced(record) | MutationOutcome::SavedOffline(record) => record,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, MutationOutcome::SavedOffline(_))
    }
}

/// User-initiated writes. Offline-writable collections fall back to a local
/// pending write when the server cannot be reached.
pub struct MutationService {
    store: Arc<dyn LocalStore>,
    queue: Arc<dyn PendingMutationQueue>,
    gateway: Arc<dyn RemoteGateway>,
    connectivity: Arc<dyn ConnectivityProbe>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<InFlightRecords>,
}

impl MutationService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        queue: Arc<dyn PendingMutationQueue>,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivityProbe>,
        notifier: Arc<dyn Notifier>,
        in_flight: Arc<InFlightRecords>,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            connectivity,
            notifier,
            in_flight,
        }
    }

    pub async fn place_order(&self, payload: RecordPayload) -> Result<MutationOutcome, AppError> {
        self.create(Collection::Orders, payload).await
    }

    pub async fn update_order(
        &self,
        id: &RecordId,
        payload: RecordPayload,
    ) -> Result<MutationOutcome, AppError> {
        self.update(Collection::Orders, id, payload).await
    }

    pub async fn add_staff(&self, payload: RecordPayload) -> Result<MutationOutcome, AppError> {
        self.create(Collection::Users, payload).await
    }

    pub async fn update_staff(
        &self,
        id: &RecordId,
        payload: RecordPayload,
    ) -> Result<MutationOutcome, AppError> {
        self.update(Collection::Users, id, payload).await
    }

    pub async fn create(
        &self,
        collection: Collection,
        payload: RecordPayload,
    ) -> Result<MutationOutcome, AppError> {
        let record = Record::local(payload, SyncState::Unsynced);
        if self.should_write_offline(collection).await {
            return self
                .save_offline(collection, record, MutationAction::Create)
                .await;
        }

        let body = Value::Object(record.payload.clone());
        match self.gateway.create(collection, &body).await {
            Ok(response) => {
                let mut confirmed = record.confirm(collection, &response);
                if let Some(server_id) = confirmed.server_id.clone() {
                    if let Ok(id) = RecordId::new(server_id) {
                        confirmed.id = id;
                    }
                }
                self.store_confirmed(collection, confirmed).await
            }
            Err(err) => {
                self.fall_back_or_fail(collection, record, MutationAction::Create, err)
                    .await
            }
        }
    }

    /// Applies `patch` on top of the cached record; fields not in `patch` are kept.
    pub async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        patch: RecordPayload,
    ) -> Result<MutationOutcome, AppError> {
        let mut record = self
            .store
            .get_by_key(collection, id)
            .await?
            .unwrap_or_else(|| {
                Record::new(
                    id.clone(),
                    None,
                    SyncState::Unsynced,
                    RecordPayload::new(),
                    Utc::now(),
                )
            });
        record.merge_payload(patch);
        let record = record.with_sync_state(SyncState::Unsynced);

        // Later edits of a record with queued writes must queue behind them.
        let has_queued_writes = match collection.mutation_queue() {
            Some(queue) => self
                .queue
                .record_ids(queue, collection)
                .await?
                .contains(id),
            None => false,
        };

        if has_queued_writes || self.should_write_offline(collection).await {
            return self
                .save_offline(collection, record, MutationAction::Update)
                .await;
        }

        // A sync pass is sending this record right now. Keep the edit local and
        // leave it to the next pass, which will know the server id.
        let Some(_claim) = self.in_flight.try_claim(collection, &record.id) else {
            tracing::debug!(
                target: "offline::fallback",
                collection = collection.store_name(),
                record_id = %record.id,
                "record is being synced, deferring edit"
            );
            if let Err(err) = self.store.upsert_one(collection, &record).await {
                return Err(self.report_failure(collection, "save", err));
            }
            return Ok(MutationOutcome::SavedOffline(record));
        };

        let body = Value::Object(record.payload.clone());
        let sent = if record.server_id.is_none() && record.id.is_placeholder() {
            // Never reached the server; there is nothing to update yet.
            self.gateway.create(collection, &body).await
        } else {
            self.gateway
                .update(collection, record.remote_id(), &body)
                .await
        };

        match sent {
            Ok(response) => {
                let confirmed = record.confirm(collection, &response);
                self.store_confirmed(collection, confirmed).await
            }
            Err(err) => {
                self.fall_back_or_fail(collection, record, MutationAction::Update, err)
                    .await
            }
        }
    }

    /// Deletes on the server first; records the server never saw are removed
    /// locally only.
    pub async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), AppError> {
        let existing = self.store.get_by_key(collection, id).await?;
        let remote_id = match &existing {
            Some(record) => record.server_id.clone(),
            None if !id.is_placeholder() => Some(id.to_string()),
            None => None,
        };

        if let Some(remote_id) = remote_id {
            let payload = existing
                .as_ref()
                .map(|record| Value::Object(record.payload.clone()))
                .unwrap_or(Value::Null);
            if let Err(err) = self.gateway.delete(collection, &remote_id, &payload).await {
                return Err(self.report_failure(collection, "delete", err));
            }
        }

        if let Some(queue) = collection.mutation_queue() {
            for mutation in self.queue.list(queue).await? {
                if &mutation.record_id == id {
                    self.queue.remove(&mutation.id).await?;
                }
            }
        }
        self.store.delete_by_key(collection, id).await
    }

    /// Online only. The cached order is rewritten with the server's answer.
    pub async fn update_order_status(
        &self,
        id: &RecordId,
        status: &str,
    ) -> Result<Record, AppError> {
        let collection = Collection::Orders;
        let mut record = self
            .store
            .get_by_key(collection, id)
            .await?
            .unwrap_or_else(|| {
                Record::new(
                    id.clone(),
                    Some(id.to_string()),
                    SyncState::Synced,
                    RecordPayload::new(),
                    Utc::now(),
                )
            });

        let response = match self
            .gateway
            .update_order_status(record.remote_id(), status)
            .await
        {
            Ok(response) => response,
            Err(err) => return Err(self.report_failure(collection, "update", err)),
        };

        record
            .payload
            .insert("status".to_string(), Value::String(status.to_string()));
        let record = record.confirm(collection, &response);
        self.store.upsert_one(collection, &record).await?;
        Ok(record)
    }

    async fn should_write_offline(&self, collection: Collection) -> bool {
        collection.offline_writable() && !self.connectivity.is_online().await
    }

    async fn store_confirmed(
        &self,
        collection: Collection,
        record: Record,
    ) -> Result<MutationOutcome, AppError> {
        if let Err(err) = self.store.upsert_one(collection, &record).await {
            return Err(self.report_failure(collection, "store", err));
        }
        Ok(MutationOutcome::Synced(record))
    }

    async fn fall_back_or_fail(
        &self,
        collection: Collection,
        record: Record,
        action: MutationAction,
        err: AppError,
    ) -> Result<MutationOutcome, AppError> {
        if err.is_network_failure() && collection.offline_writable() {
            tracing::info!(
                target: "offline::fallback",
                collection = collection.store_name(),
                error = %err,
                "server unreachable, writing locally"
            );
            return self.save_offline(collection, record, action).await;
        }
        Err(self.report_failure(collection, "save", err))
    }

    async fn save_offline(
        &self,
        collection: Collection,
        record: Record,
        action: MutationAction,
    ) -> Result<MutationOutcome, AppError> {
        let record = record.with_sync_state(SyncState::PendingOffline);
        if let Err(err) = self.store.upsert_one(collection, &record).await {
            return Err(self.report_failure(collection, "save", err));
        }

        if let Some(queue) = collection.mutation_queue() {
            let mutation = PendingMutation::new(
                queue,
                collection,
                record.id.clone(),
                action,
                record.payload.clone(),
            );
            // Without a queue entry the push phase still sends the record.
            if let Err(err) = self.queue.enqueue(&mutation).await {
                tracing::warn!(
                    target: "offline::fallback",
                    record_id = %record.id,
                    error = %err,
                    "failed to queue offline mutation"
                );
            }
        }

        tracing::info!(
            target: "offline::fallback",
            collection = collection.store_name(),
            record_id = %record.id,
            action = action.as_str(),
            "saved offline"
        );
        self.notifier.notify(Notice::info(format!(
            "{} saved offline, will sync later",
            capitalize(collection.label())
        )));
        Ok(MutationOutcome::SavedOffline(record))
    }

    fn report_failure(&self, collection: Collection, verb: &str, err: AppError) -> AppError {
        tracing::warn!(
            target: "offline::fallback",
            collection = collection.store_name(),
            error = %err,
            "mutation failed"
        );
        self.notifier.notify(Notice::error(format!(
            "Could not {verb} {}: {err}",
            collection.label()
        )));
        err
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{
        MockGateway, RecordingNotifier, memory_store,
    };
    use crate::domain::entities::NoticeLevel;
    use crate::domain::value_objects::PENDING_STAFF_QUEUE;
    use crate::infrastructure::{ManualConnectivity, SqliteLocalStore};
    use serde_json::json;

    struct Harness {
        store: Arc<SqliteLocalStore>,
        notifier: Arc<RecordingNotifier>,
        connectivity: Arc<ManualConnectivity>,
        in_flight: Arc<InFlightRecords>,
        service: MutationService,
    }

    async fn harness(gateway: MockGateway) -> Harness {
        let store = memory_store().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let connectivity = Arc::new(ManualConnectivity::default());
        let in_flight = Arc::new(InFlightRecords::new());
        let service = MutationService::new(
            store.clone(),
            store.clone(),
            Arc::new(gateway),
            connectivity.clone(),
            notifier.clone(),
            Arc::clone(&in_flight),
        );
        Harness {
            store,
            notifier,
            connectivity,
            in_flight,
            service,
        }
    }

    fn payload(value: Value) -> RecordPayload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn offline_order_is_stored_without_calling_server() {
        let mut gateway = MockGateway::new();
        gateway.expect_create().never();
        let h = harness(gateway).await;
        h.connectivity.set_online(false);

        let outcome = h
            .service
            .place_order(payload(json!({"table": 4, "total": 18.5})))
            .await
            .unwrap();

        assert!(outcome.is_offline());
        let record = outcome.record();
        assert!(record.id.is_placeholder());
        assert_eq!(record.sync_state, SyncState::PendingOffline);

        let stored = h.store.read_all(Collection::Orders).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sync_state, SyncState::PendingOffline);
        // Orders are pushed by the coordinator, not queued.
        assert_eq!(h.store.len(PENDING_STAFF_QUEUE).await.unwrap(), 0);

        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert!(notices[0].message.contains("saved offline, will sync later"));
    }

    #[tokio::test]
    async fn edit_of_record_being_synced_stays_local() {
        let mut gateway = MockGateway::new();
        gateway.expect_create().never();
        gateway.expect_update().never();
        let h = harness(gateway).await;

        let order = Record::local(payload(json!({"table": 2, "total": 10})), SyncState::PendingOffline);
        h.store.upsert_one(Collection::Orders, &order).await.unwrap();
        let claim = h.in_flight.try_claim(Collection::Orders, &order.id);
        assert!(claim.is_some());

        let outcome = h
            .service
            .update_order(&order.id, payload(json!({"total": 11})))
            .await
            .unwrap();

        assert!(outcome.is_offline());
        let stored = h
            .store
            .get_by_key(Collection::Orders, &order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sync_state, SyncState::Unsynced);
        assert_eq!(stored.payload["total"], 11);
        assert_eq!(stored.payload["table"], 2);
        assert!(h.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn network_failure_during_update_falls_back() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_update()
            .withf(|c, id, _| *c == Collection::Orders && id == "42")
            .times(1)
            .returning(|_, _, _| Err(AppError::network("connection reset")));
        let h = harness(gateway).await;
        let order = Record::from_remote(
            Collection::Orders,
            json!({"orderId": 42, "table": 3, "total": 10}),
        )
        .unwrap();
        h.store.upsert_one(Collection::Orders, &order).await.unwrap();

        let outcome = h
            .service
            .update_order(&order.id, payload(json!({"total": 25})))
            .await
            .unwrap();

        assert!(outcome.is_offline());
        let stored = h
            .store
            .get_by_key(Collection::Orders, &order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload["total"], 25);
        assert_eq!(stored.payload["table"], 3);
        assert_eq!(stored.sync_state, SyncState::PendingOffline);
        assert_eq!(stored.server_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn http_error_is_surfaced_and_local_state_untouched() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .returning(|_, _| Err(AppError::transport(422, "invalid order")));
        let h = harness(gateway).await;

        let err = h
            .service
            .place_order(payload(json!({"total": -1})))
            .await
            .unwrap_err();

        assert_eq!(err.transport_status(), Some(422));
        assert!(h.store.read_all(Collection::Orders).await.unwrap().is_empty());
        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn non_offline_collections_fail_on_network_error() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .returning(|_, _| Err(AppError::network("dns failure")));
        let h = harness(gateway).await;

        let err = h
            .service
            .create(Collection::Products, payload(json!({"name": "Soup"})))
            .await
            .unwrap_err();

        assert!(err.is_network_failure());
        assert!(h.store.read_all(Collection::Products).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn online_create_is_keyed_by_server_id() {
        let mut gateway = MockGateway::new();
        gateway.expect_create().times(1).returning(|_, body| {
            let mut response = body.clone();
            response["productId"] = json!(7);
            Ok(response)
        });
        let h = harness(gateway).await;

        let outcome = h
            .service
            .create(Collection::Products, payload(json!({"name": "Soup"})))
            .await
            .unwrap();

        let record = outcome.into_record();
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.server_id.as_deref(), Some("7"));
        assert_eq!(record.sync_state, SyncState::Synced);
        assert!(
            h.store
                .get_by_key(Collection::Products, &record.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn offline_staff_write_is_queued() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::network("timeout")));
        let h = harness(gateway).await;

        let outcome = h
            .service
            .add_staff(payload(json!({"name": "Ana", "role": "waiter"})))
            .await
            .unwrap();

        let queued = h.store.list(PENDING_STAFF_QUEUE).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].record_id, outcome.record().id);
        assert_eq!(queued[0].action, MutationAction::Create);
        assert_eq!(queued[0].payload["name"], "Ana");
    }

    #[tokio::test]
    async fn updating_unsent_record_creates_it() {
        let mut gateway = MockGateway::new();
        gateway.expect_update().never();
        gateway
            .expect_create()
            .times(1)
            .returning(|_, _| Ok(json!({"orderId": 88})));
        let h = harness(gateway).await;
        let local = Record::local(payload(json!({"total": 5})), SyncState::PendingOffline);
        h.store.upsert_one(Collection::Orders, &local).await.unwrap();

        let outcome = h
            .service
            .update_order(&local.id, payload(json!({"total": 6})))
            .await
            .unwrap();

        let record = outcome.record();
        assert_eq!(record.id, local.id);
        assert_eq!(record.server_id.as_deref(), Some("88"));
        assert_eq!(record.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn delete_of_unsent_staff_drops_queue_entry_without_server_call() {
        let mut gateway = MockGateway::new();
        gateway.expect_delete().never();
        let h = harness(gateway).await;
        h.connectivity.set_online(false);

        let outcome = h
            .service
            .add_staff(payload(json!({"name": "Bo", "role": "manager"})))
            .await
            .unwrap();
        let id = outcome.record().id.clone();

        h.service.delete(Collection::Users, &id).await.unwrap();

        assert_eq!(h.store.len(PENDING_STAFF_QUEUE).await.unwrap(), 0);
        assert!(
            h.store
                .get_by_key(Collection::Users, &id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_uses_server_id_and_role_payload() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_delete()
            .withf(|c, id, body| *c == Collection::Users && id == "s-1" && body["role"] == "manager")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let h = harness(gateway).await;
        let staff = Record::from_remote(
            Collection::Users,
            json!({"_id": "s-1", "name": "Bo", "role": "manager"}),
        )
        .unwrap();
        h.store.upsert_one(Collection::Users, &staff).await.unwrap();

        h.service.delete(Collection::Users, &staff.id).await.unwrap();
        assert!(h.store.read_all(Collection::Users).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_status_requires_server() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_update_order_status()
            .withf(|id, status| id == "42" && status == "ready")
            .times(1)
            .returning(|_, _| Ok(json!({"orderId": 42, "status": "ready"})));
        let h = harness(gateway).await;
        let order = Record::from_remote(
            Collection::Orders,
            json!({"orderId": 42, "status": "pending"}),
        )
        .unwrap();
        h.store.upsert_one(Collection::Orders, &order).await.unwrap();

        let updated = h
            .service
            .update_order_status(&order.id, "ready")
            .await
            .unwrap();
        assert_eq!(updated.payload["status"], "ready");
        assert_eq!(updated.sync_state, SyncState::Synced);
    }
}

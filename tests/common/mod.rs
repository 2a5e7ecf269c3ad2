#![allow(dead_code)]

use async_trait::async_trait;
use pos_sync_lib::{
    AppConfig, AppError, AppState, Collection, ConnectionPool, Credentials, ManualConnectivity,
    Notice, Notifier, RemoteGateway, Role, Session,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub op: &'static str,
    pub collection: Option<Collection>,
    pub id: Option<String>,
    pub payload: Value,
}

/// In-process stand-in for the POS backend with scripted data and failures.
pub struct ScriptedGateway {
    role: Role,
    data: Mutex<HashMap<Collection, Vec<Value>>>,
    failure_status: Mutex<Option<u16>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<GatewayCall>>,
    next_id: AtomicU64,
}

impl ScriptedGateway {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            data: Mutex::new(HashMap::new()),
            failure_status: Mutex::new(None),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
        }
    }

    pub fn with_collection(self, collection: Collection, items: Vec<Value>) -> Self {
        self.data.lock().unwrap().insert(collection, items);
        self
    }

    /// `Some(0)` simulates a network failure, any other status an HTTP error.
    pub fn fail_with(&self, status: Option<u16>) {
        *self.failure_status.lock().unwrap() = status;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits until `op` has been issued for `collection` at least `times` times.
    pub async fn wait_for(&self, op: &str, collection: Collection, times: usize) {
        for _ in 0..200 {
            if self.count(op, collection) >= times {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{op} on {collection} was not issued {times} time(s)");
    }

    pub fn count(&self, op: &str, collection: Collection) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.op == op && call.collection == Some(collection))
            .count()
    }

    async fn enter(
        &self,
        op: &'static str,
        collection: Option<Collection>,
        id: Option<&str>,
        payload: &Value,
    ) -> Result<(), AppError> {
        // Recorded before the delay so tests can see a request while it is in flight.
        self.calls.lock().unwrap().push(GatewayCall {
            op,
            collection,
            id: id.map(str::to_string),
            payload: payload.clone(),
        });
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match *self.failure_status.lock().unwrap() {
            Some(0) => Err(AppError::network("connection refused")),
            Some(status) => Err(AppError::transport(status, "scripted failure")),
            None => Ok(()),
        }
    }

    fn with_id(collection: Collection, payload: &Value, id: String) -> Value {
        let mut response = payload.as_object().cloned().unwrap_or_default();
        response.insert(collection.server_id_field().to_string(), Value::String(id));
        Value::Object(response)
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    fn set_token(&self, _token: Option<String>) {}

    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        self.enter("login", None, None, &json!({"email": credentials.email}))
            .await?;
        Ok(Session::new(
            "w1".into(),
            "Test User".into(),
            self.role,
            "token-1".into(),
        ))
    }

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, AppError> {
        self.enter("fetch_all", Some(collection), None, &Value::Null)
            .await?;
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_by_owner(
        &self,
        collection: Collection,
        owner_id: &str,
    ) -> Result<Vec<Value>, AppError> {
        self.enter("fetch_by_owner", Some(collection), Some(owner_id), &Value::Null)
            .await?;
        let field = collection.owner_field().unwrap_or("waiterId");
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|item| item.get(field).and_then(Value::as_str) == Some(owner_id))
            .collect())
    }

    async fn create(&self, collection: Collection, payload: &Value) -> Result<Value, AppError> {
        self.enter("create", Some(collection), None, payload).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        Ok(Self::with_id(collection, payload, id))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        payload: &Value,
    ) -> Result<Value, AppError> {
        self.enter("update", Some(collection), Some(id), payload)
            .await?;
        Ok(Self::with_id(collection, payload, id.to_string()))
    }

    async fn delete(
        &self,
        collection: Collection,
        id: &str,
        payload: &Value,
    ) -> Result<(), AppError> {
        self.enter("delete", Some(collection), Some(id), payload)
            .await
    }

    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<Value, AppError> {
        let body = json!({"orderId": order_id, "status": status});
        self.enter("update_order_status", Some(Collection::Orders), Some(order_id), &body)
            .await?;
        Ok(body)
    }

    async fn fetch_finance(&self) -> Result<Value, AppError> {
        self.enter("fetch_finance", None, None, &Value::Null).await?;
        Ok(json!({"revenue": 0}))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub connectivity: Arc<ManualConnectivity>,
}

/// App state over an in-memory database and the scripted gateway, optionally
/// signed in.
pub async fn test_app(gateway: ScriptedGateway, signed_in: bool) -> TestApp {
    test_app_with_config(AppConfig::default(), gateway, signed_in).await
}

pub async fn test_app_with_config(
    config: AppConfig,
    gateway: ScriptedGateway,
    signed_in: bool,
) -> TestApp {
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(RecordingNotifier::default());
    let connectivity = Arc::new(ManualConnectivity::default());
    let pool = ConnectionPool::from_memory().await.unwrap();

    let state = AppState::from_parts(
        config,
        pool,
        gateway.clone(),
        connectivity.clone(),
        notifier.clone(),
    )
    .await
    .unwrap();

    if signed_in {
        state
            .session
            .login(&Credentials {
                email: "staff@pos.test".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();
    }

    TestApp {
        state,
        gateway,
        notifier,
        connectivity,
    }
}

pub fn object(value: Value) -> pos_sync_lib::RecordPayload {
    value.as_object().cloned().unwrap()
}

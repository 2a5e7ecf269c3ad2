use crate::application::ports::{Notifier, RemoteGateway};
use crate::domain::entities::{Credentials, Notice, Session};
use crate::domain::value_objects::Collection;
use crate::infrastructure::{ConnectionPool, SqliteLocalStore};
use crate::shared::error::AppError;
use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use std::sync::{Arc, Mutex};

mock! {
    pub Gateway {}

    #[async_trait]
    impl RemoteGateway for Gateway {
        fn set_token(&self, token: Option<String>);
        async fn login(&self, credentials: &Credentials) -> Result<Session, AppError>;
        async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, AppError>;
        async fn fetch_by_owner(&self, collection: Collection, owner_id: &str) -> Result<Vec<Value>, AppError>;
        async fn create(&self, collection: Collection, payload: &Value) -> Result<Value, AppError>;
        async fn update(&self, collection: Collection, id: &str, payload: &Value) -> Result<Value, AppError>;
        async fn delete(&self, collection: Collection, id: &str, payload: &Value) -> Result<(), AppError>;
        async fn update_order_status(&self, order_id: &str, status: &str) -> Result<Value, AppError>;
        async fn fetch_finance(&self) -> Result<Value, AppError>;
    }
}

pub async fn memory_store() -> Arc<SqliteLocalStore> {
    let pool = ConnectionPool::from_memory().await.unwrap();
    let store = SqliteLocalStore::new(pool);
    store.initialize().await.unwrap();
    Arc::new(store)
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

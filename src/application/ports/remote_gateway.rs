use crate::domain::entities::{Credentials, Session};
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Request/response adapter for the POS backend. No retries and no caching;
/// failures surface as `AppError::Transport`.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Bearer token attached to every subsequent request.
    fn set_token(&self, token: Option<String>);
    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError>;
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, AppError>;
    async fn fetch_by_owner(
        &self,
        collection: Collection,
        owner_id: &str,
    ) -> Result<Vec<Value>, AppError>;
    async fn create(&self, collection: Collection, payload: &Value) -> Result<Value, AppError>;
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        payload: &Value,
    ) -> Result<Value, AppError>;
    /// `payload` is the last known state of the entity; staff routes are picked from it.
    async fn delete(&self, collection: Collection, id: &str, payload: &Value)
    -> Result<(), AppError>;
    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<Value, AppError>;
    async fn fetch_finance(&self) -> Result<Value, AppError>;
}

use crate::application::ports::{KeyValueStore, RemoteGateway};
use crate::domain::entities::{Credentials, Session};
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SESSION_KEY: &str = "session";

/// Owns the authenticated session and mirrors it into the key/value store so it
/// survives restarts.
pub struct SessionContext {
    gateway: Arc<dyn RemoteGateway>,
    kv: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn RemoteGateway>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            gateway,
            kv,
            current: RwLock::new(None),
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let session = self.gateway.login(credentials).await?;
        let blob = serde_json::to_string(&session)?;
        self.kv.put(SESSION_KEY, &blob).await?;
        self.activate(session.clone()).await;

        tracing::info!(
            target: "sync::coordinator",
            user_id = %session.user_id,
            role = %session.role,
            "session started"
        );
        Ok(session)
    }

    /// Loads a previously persisted session. Unreadable blobs are discarded.
    pub async fn restore(&self) -> Result<Option<Session>, AppError> {
        let Some(blob) = self.kv.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Session>(&blob) {
            Ok(session) => {
                self.activate(session.clone()).await;
                Ok(Some(session))
            }
            Err(err) => {
                tracing::warn!(
                    target: "sync::coordinator",
                    error = %err,
                    "discarding unreadable persisted session"
                );
                self.kv.delete(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        *self.current.write().await = None;
        self.gateway.set_token(None);
        self.kv.delete(SESSION_KEY).await
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    async fn activate(&self, session: Session) {
        self.gateway.set_token(Some(session.token.clone()));
        *self.current.write().await = Some(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{MockGateway, memory_store};
    use crate::domain::value_objects::Role;
    use mockall::predicate::eq;

    fn credentials() -> Credentials {
        Credentials {
            email: "ana@pos.test".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn login_persists_and_restore_reloads() {
        let store = memory_store().await;
        let mut gateway = MockGateway::new();
        gateway.expect_login().times(1).returning(|_| {
            Ok(Session::new(
                "u1".into(),
                "Ana".into(),
                Role::Waiter,
                "tok".into(),
            ))
        });
        gateway
            .expect_set_token()
            .with(eq(Some("tok".to_string())))
            .times(2)
            .return_const(());

        let gateway: Arc<dyn RemoteGateway> = Arc::new(gateway);
        let context = SessionContext::new(Arc::clone(&gateway), store.clone());
        let session = context.login(&credentials()).await.unwrap();
        assert_eq!(context.token().await.as_deref(), Some("tok"));

        let restarted = SessionContext::new(gateway, store);
        assert_eq!(restarted.current().await, None);
        assert_eq!(restarted.restore().await.unwrap(), Some(session));
        assert_eq!(restarted.current().await.unwrap().role, Role::Waiter);
    }

    #[tokio::test]
    async fn failed_login_keeps_no_session() {
        let store = memory_store().await;
        let mut gateway = MockGateway::new();
        gateway
            .expect_login()
            .returning(|_| Err(AppError::transport(401, "bad credentials")));
        gateway.expect_set_token().never();

        let context = SessionContext::new(Arc::new(gateway), store.clone());
        let err = context.login(&credentials()).await.unwrap_err();
        assert_eq!(err.transport_status(), Some(401));
        assert!(context.current().await.is_none());
        assert!(store.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_blob_is_discarded() {
        let store = memory_store().await;
        store.put(SESSION_KEY, "{not json").await.unwrap();
        let mut gateway = MockGateway::new();
        gateway.expect_set_token().never();

        let context = SessionContext::new(Arc::new(gateway), store.clone());
        assert_eq!(context.restore().await.unwrap(), None);
        assert!(store.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_clears_memory_and_storage() {
        let store = memory_store().await;
        let session = Session::new("u1".into(), "Ana".into(), Role::Admin, "tok".into());
        store
            .put(SESSION_KEY, &serde_json::to_string(&session).unwrap())
            .await
            .unwrap();
        let mut gateway = MockGateway::new();
        gateway.expect_set_token().return_const(());

        let context = SessionContext::new(Arc::new(gateway), store.clone());
        context.restore().await.unwrap();
        context.logout().await.unwrap();

        assert!(context.current().await.is_none());
        assert!(store.get(SESSION_KEY).await.unwrap().is_none());
    }
}

use crate::application::ports::{ConnectivityProbe, Notifier, RemoteGateway};
use crate::application::services::{
    InFlightRecords, MutationService, SessionContext, SyncCoordinator, SyncHandle,
};
use crate::domain::entities::DrainReport;
use crate::domain::value_objects::Collection;
use crate::infrastructure::{
    ConnectionPool, HttpConnectivityProbe, HttpRemoteGateway, SqliteLocalStore, TracingNotifier,
};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Wires the store, gateway and services together.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub store: Arc<SqliteLocalStore>,
    pub gateway: Arc<dyn RemoteGateway>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
    pub notifier: Arc<dyn Notifier>,
    pub session: Arc<SessionContext>,
    pub sync: Arc<SyncCoordinator>,
    pub mutations: Arc<MutationService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        ensure_database_dir(&config.database.url)?;

        let pool = ConnectionPool::from_config(&config.database).await?;
        let gateway: Arc<dyn RemoteGateway> = Arc::new(HttpRemoteGateway::new(&config.api)?);
        let connectivity: Arc<dyn ConnectivityProbe> = Arc::new(HttpConnectivityProbe::new(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.request_timeout_secs.min(5)),
        ));

        Self::from_parts(config, pool, gateway, connectivity, Arc::new(TracingNotifier)).await
    }

    /// Builds the state around caller-supplied adapters; the pool is migrated here.
    pub async fn from_parts(
        config: AppConfig,
        pool: ConnectionPool,
        gateway: Arc<dyn RemoteGateway>,
        connectivity: Arc<dyn ConnectivityProbe>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let store = Arc::new(SqliteLocalStore::new(pool.clone()));
        store.initialize().await?;

        let session = Arc::new(SessionContext::new(Arc::clone(&gateway), store.clone()));
        let in_flight = Arc::new(InFlightRecords::new());
        let mut sync = SyncCoordinator::new(
            store.clone(),
            store.clone(),
            Arc::clone(&gateway),
            Arc::clone(&session),
            Arc::clone(&notifier),
            Arc::clone(&in_flight),
            config.sync.push_concurrency,
        );
        if !config.features.show_deals {
            sync = sync.without_collection(Collection::Deals);
        }
        let sync = Arc::new(sync);
        let mutations = Arc::new(MutationService::new(
            store.clone(),
            store.clone(),
            Arc::clone(&gateway),
            Arc::clone(&connectivity),
            Arc::clone(&notifier),
            in_flight,
        ));

        tracing::info!(
            target: "sync::coordinator",
            api = %config.api.base_url,
            auto_sync = config.sync.auto_sync,
            "application state initialized"
        );

        Ok(Self {
            config,
            pool,
            store,
            gateway,
            connectivity,
            notifier,
            session,
            sync,
            mutations,
        })
    }

    /// Starts the periodic sync timer unless auto sync is disabled.
    pub fn start_sync(&self) -> Option<SyncHandle> {
        if !self.config.sync.auto_sync {
            tracing::info!(target: "sync::coordinator", "auto sync disabled");
            return None;
        }
        Some(
            self.sync
                .spawn(Duration::from_secs(self.config.sync.interval_secs)),
        )
    }

    /// Entry point for the platform's online/offline events. Coming back online
    /// replays queued offline writes right away instead of waiting for the timer.
    pub async fn set_online(&self, online: bool) -> Option<DrainReport> {
        self.connectivity.observe(online);
        self.sync.handle_connectivity_change(online).await
    }

    /// Finance reporting is always fetched live.
    pub async fn fetch_finance(&self) -> Result<Value, AppError> {
        if !self.config.features.show_finance {
            return Err(AppError::InvalidInput(
                "Finance view is disabled".to_string(),
            ));
        }
        self.gateway.fetch_finance().await
    }

    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

/// SQLite creates the file but not its parent directory.
fn ensure_database_dir(url: &str) -> Result<(), AppError> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| {
            AppError::StorageUnavailable(format!(
                "Failed to create {}: {err}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_dir_is_created_for_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let url = format!("sqlite://{}/pos.db?mode=rwc", nested.display());

        ensure_database_dir(&url).unwrap();
        assert!(nested.is_dir());
        ensure_database_dir("sqlite::memory:").unwrap();
        ensure_database_dir("sqlite://:memory:").unwrap();
    }

    #[tokio::test]
    async fn new_opens_file_database_and_honours_flags() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}/data/pos.db?mode=rwc", dir.path().display());
        config.sync.auto_sync = false;
        config.features.show_finance = false;

        let state = AppState::new(config).await.unwrap();
        assert!(state.start_sync().is_none());
        assert!(matches!(
            state.fetch_finance().await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(state.session.current().await.is_none());
        state.shutdown().await;
    }
}

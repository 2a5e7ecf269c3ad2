pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{
    ConnectivityProbe, KeyValueStore, LocalStore, Notifier, PendingMutationQueue, RemoteGateway,
};
pub use application::services::{
    InFlightRecords, MutationOutcome, MutationService, SessionContext, SyncCoordinator,
    SyncHandle, SyncStatus,
};
pub use domain::entities::{
    CollectionOutcome, Credentials, DrainReport, Notice, NoticeLevel, PendingMutation, Record,
    RecordPayload, Session, TickReport,
};
pub use domain::value_objects::{Collection, MutationAction, RecordId, Role, SyncState};
pub use infrastructure::{
    BroadcastNotifier, ConnectionPool, HttpConnectivityProbe, HttpRemoteGateway,
    ManualConnectivity, SqliteLocalStore, TracingNotifier,
};
pub use shared::{AppConfig, AppError, logging::init_logging};
pub use state::AppState;

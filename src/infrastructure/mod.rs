pub mod connectivity;
pub mod database;
pub mod gateway;
pub mod notifier;
pub mod store;

pub use connectivity::{HttpConnectivityProbe, ManualConnectivity};
pub use database::ConnectionPool;
pub use gateway::HttpRemoteGateway;
pub use notifier::{BroadcastNotifier, TracingNotifier};
pub use store::SqliteLocalStore;

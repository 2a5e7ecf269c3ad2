pub mod connectivity;
pub mod local_store;
pub mod notifier;
pub mod remote_gateway;

pub use connectivity::ConnectivityProbe;
pub use local_store::{KeyValueStore, LocalStore, PendingMutationQueue};
pub use notifier::Notifier;
pub use remote_gateway::RemoteGateway;

pub mod in_flight;
pub mod mutation_service;
pub mod session_service;
pub mod sync_coordinator;

#[cfg(test)]
pub(crate) mod test_support;

pub use in_flight::{InFlightClaim, InFlightRecords};
pub use mutation_service::{MutationOutcome, MutationService};
pub use session_service::{SESSION_KEY, SessionContext};
pub use sync_coordinator::{SyncCoordinator, SyncHandle, SyncStatus};

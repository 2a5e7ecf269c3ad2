pub mod collection;
pub mod mutation_action;
pub mod record_id;
pub mod role;
pub mod sync_state;

pub use collection::{Collection, PENDING_STAFF_QUEUE};
pub use mutation_action::MutationAction;
pub use record_id::RecordId;
pub use role::Role;
pub use sync_state::SyncState;

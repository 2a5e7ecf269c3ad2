pub mod notice;
pub mod pending_mutation;
pub mod record;
pub mod session;
pub mod sync_report;

pub use notice::{Notice, NoticeLevel};
pub use pending_mutation::PendingMutation;
pub use record::{PayloadError, Record, RecordPayload, extract_server_id};
pub use session::{Credentials, Session};
pub use sync_report::{CollectionOutcome, CollectionReport, DrainReport, TickReport};

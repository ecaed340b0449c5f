//! Domain model (IDs, remote task states, status snapshots, outcomes, records).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod records;
pub mod state;
pub mod status;

pub use self::errors::{ConfigError, ErrorKind, HubError};
pub use self::ids::{ArchiveId, BuildId, BuildRef, EventId, TagId, TagRef, TaskId};
pub use self::outcome::{OutcomeKind, WatchOutcome};
pub use self::records::{ArchiveInfo, BuildInfo, RpmInfo, TagChange, TagInfo};
pub use self::state::RemoteTaskState;
pub use self::status::{TaskInfo, TaskStatus};

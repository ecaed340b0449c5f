//! App - watch loops and query helpers built on the ports.
//!
//! # Components
//! - **retry**: bounded retry of transient hub errors, `RetryingHub` decorator
//! - **budget**: consecutive-failure counting shared by the watchers
//! - **snapshot**: last observed status per task
//! - **tag_cache**: per-process cache of the newest event of each tag
//! - **task_watcher** / **multi_watcher**: poll tasks to an outcome, cancel on failure
//! - **batch**: grouped (multicall) lookups with positional results
//! - **embargo**: embargoed-build detection on top of the batch helpers

pub mod batch;
pub mod budget;
pub mod embargo;
pub mod multi_watcher;
pub mod retry;
pub mod shutdown;
pub mod snapshot;
pub mod tag_cache;
pub mod task_watcher;

pub use self::batch::{CallHandle, Multicall, MulticallResults};
pub use self::budget::{BudgetState, FailureBudget};
pub use self::embargo::EmbargoDetector;
pub use self::retry::{RetryPolicy, RetryingHub, retry_call};
pub use self::shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
pub use self::snapshot::TaskSnapshotStore;
pub use self::tag_cache::TagChangeCache;
pub use self::task_watcher::TaskWatcher;

//! Error types for the `colony-tasks` crate.

use colony_ledger::LedgerError;
use colony_types::{TaskId, WorkerId};

/// Errors surfaced synchronously by the [`TaskManager`](crate::TaskManager).
///
/// Execution-time problems (unreachable cells, stale targets) are not
/// errors; workers report them as a [`PartOutcome`](crate::PartOutcome).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The request's region contains no cells.
    #[error("task {0} has an empty region")]
    EmptyRegion(TaskId),

    /// The target covers more cells than one task may hold.
    #[error("task {task_id} targets {volume} cells, limit is {max}")]
    RegionTooLarge {
        /// The rejected task.
        task_id: TaskId,
        /// Cells the target covers.
        volume: u64,
        /// Configured limit.
        max: u64,
    },

    /// A task with this id is already registered.
    #[error("task {0} already exists")]
    DuplicateTask(TaskId),

    /// No task is registered under this id.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// The worker was never registered.
    #[error("unknown worker: {0}")]
    UnknownWorker(WorkerId),

    /// The worker reported an outcome without holding a part.
    #[error("worker {0} holds no part")]
    NoHeldPart(WorkerId),

    /// The ledger rejected a reservation or consumption.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

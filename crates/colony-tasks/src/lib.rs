//! Task decomposition and pull-based scheduling for the colony task engine.
//!
//! A [`TaskRequest`] names a target (a box or a coordinate list) and a
//! [`MaterialPlan`]. The [`TaskManager`] reserves the plan's materials,
//! splits the target into bounded [`PartRegion`]s and binds workers, which
//! then pull [`TaskPart`]s one at a time.
//!
//! # Modules
//!
//! - [`request`] -- Targets, material plans, requests, part outcomes.
//! - [`part`] -- Part regions, part splitting, materialised parts.
//! - [`task`] -- [`Task`]: part queue, deferred flush, finish listeners.
//! - [`manager`] -- [`TaskManager`]: registry, bindings, reconciliation.
//! - [`error`] -- [`TaskError`].

pub mod error;
pub mod manager;
pub mod part;
pub mod request;
pub mod task;

pub use error::TaskError;
pub use manager::{TaskEvent, TaskManager, WorkerBinding};
pub use part::{PartRegion, TaskPart, split_positions, split_region};
pub use request::{MaterialPlan, PartOutcome, TaskRequest, TaskSettings, TaskTarget};
pub use task::{FinishListener, Task, TaskCompletion};

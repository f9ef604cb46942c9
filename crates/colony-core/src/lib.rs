//! Session context, tick cycle and orchestration for the colony task engine.
//!
//! This crate ties the scheduler, the workers, the stock ledger and the
//! world together into a [`ColonySession`] and steps it once per tick.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and periodic schedules.
//! - [`config`] -- Configuration loading from `colony-config.yaml` into
//!   strongly-typed structs.
//! - [`session`] -- [`ColonySession`], the single owner of engine state.
//! - [`submission`] -- JSON task and road submissions.
//! - [`tick`] -- The per-tick engine loop step.
//! - [`runner`] -- Async run loop with stop control and tick callbacks.
//! - [`persist`] -- Versioned save file with migration.
//! - [`error`] -- [`CoreError`].

pub mod clock;
pub mod config;
pub mod error;
pub mod persist;
pub mod runner;
pub mod session;
pub mod submission;
pub mod tick;

// Re-export primary types at crate root.
pub use clock::{ClockError, ColonyClock};
pub use config::{ColonyConfig, ConfigError};
pub use error::CoreError;
pub use persist::{PersistError, SAVE_VERSION, SaveFile, SavedBlueprint};
pub use runner::{
    NoOpCallback, RunControl, RunEndReason, RunResult, TickCallback, log_run_end, run_simulation,
};
pub use session::ColonySession;
pub use submission::{NamedBlueprint, RoadsSubmission, SubmissionResponse, TaskSubmission};
pub use tick::{TickSummary, run_tick};

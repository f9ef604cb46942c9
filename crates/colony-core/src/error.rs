//! Error types for the `colony-core` crate.

use colony_types::BuildingId;

use crate::clock::ClockError;
use crate::persist::PersistError;

/// Errors surfaced by the colony session.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The scheduler rejected a request.
    #[error("task error: {source}")]
    Task {
        /// The underlying task error.
        #[from]
        source: colony_tasks::TaskError,
    },

    /// A blueprint could not be decoded or built.
    #[error("blueprint error: {source}")]
    Blueprint {
        /// The underlying blueprint error.
        #[from]
        source: colony_blueprint::BlueprintError,
    },

    /// The save file could not be read or written.
    #[error("persistence error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A submission payload is not valid JSON.
    #[error("malformed submission: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A submission is well-formed but cannot describe a task.
    #[error("invalid submission: {reason}")]
    InvalidSubmission {
        /// What is missing or contradictory.
        reason: String,
    },

    /// No tracked building has this id.
    #[error("unknown building: {0}")]
    UnknownBuilding(BuildingId),
}

//! Error types for the colony engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the run loop and
//! shutdown so `main` can propagate with `?`.

/// Top-level error for the colony engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colony_core::ConfigError,
    },

    /// The session or the run loop failed.
    #[error("core error: {source}")]
    Core {
        /// The underlying core error.
        #[from]
        source: colony_core::CoreError,
    },

    /// A built-in blueprint was rejected.
    #[error("blueprint error: {source}")]
    Blueprint {
        /// The underlying blueprint error.
        #[from]
        source: colony_blueprint::BlueprintError,
    },

    /// The task queue file could not be read or decoded.
    #[error("task queue error: {message}")]
    TaskQueue {
        /// Description of the failure.
        message: String,
    },

    /// Worker placement failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}

//! Tunables for worker execution.
//!
//! The engine builds a [`WorkerConfig`] from the `workers` section of
//! `colony-config.yaml` and hands a copy to every worker it spawns.

/// Configuration shared by all workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Ticks spent digging one cell (default: 6).
    pub dig_ticks: u32,

    /// Ticks spent placing one cell (default: 4).
    pub place_ticks: u32,

    /// Chebyshev distance from which a worker can act on a cell (default: 2).
    pub reach: u32,

    /// Cells a worker moves per tick (default: 1).
    pub speed: u32,

    /// Whether dug blocks are added to the colony stock (default: true).
    pub credit_dug_items: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dig_ticks: 6,
            place_ticks: 4,
            reach: 2,
            speed: 1,
            credit_dug_items: true,
        }
    }
}

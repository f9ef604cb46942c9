//! Enumeration types shared between the scheduler, workers and observers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What a task does to the cells of its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// Place materials.
    Build,
    /// Dig out whatever occupies the cells.
    Remove,
}

/// Lifecycle status of a task.
///
/// `Completed`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Registered, no part pulled yet.
    Created,
    /// At least one part has been pulled.
    InProgress,
    /// Every part finished and deferred layers were applied.
    Completed,
    /// Removed by request before completion.
    Cancelled,
    /// Abandoned after the last bound worker failed.
    Failed,
}

impl TaskStatus {
    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Phase of a worker's task execution state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerPhase {
    /// Not bound to a task.
    #[default]
    Idle,
    /// Bound, looking for the next usable cell.
    SeekingPart,
    /// Walking towards the goal cell.
    Moving,
    /// Digging or placing at the goal cell.
    Acting,
    /// The path to the goal could not be found.
    Failed,
    /// The bound task ran out of parts.
    Success,
}

/// Rotation applied to a structure template before layering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rotation {
    /// As authored.
    #[default]
    None,
    /// A quarter turn clockwise seen from above.
    Clockwise90,
    /// A half turn.
    Clockwise180,
    /// A quarter turn counter-clockwise seen from above.
    Counterclockwise90,
}

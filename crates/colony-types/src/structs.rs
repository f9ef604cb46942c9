//! Core data structs: resource stacks, work items and observer payloads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::coord::Coordinate;
use crate::enums::{TaskKind, TaskStatus};
use crate::ids::TaskId;
use crate::material::{Item, Material};

/// An item type with a non-negative amount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceStack {
    /// The item type.
    pub item: Item,
    /// How many units.
    pub amount: u32,
}

impl ResourceStack {
    /// Create a stack.
    pub fn new(item: impl Into<String>, amount: u32) -> Self {
        Self {
            item: Item::new(item),
            amount,
        }
    }
}

/// Extra information needed to place an item rather than a block state.
///
/// Used when the placed result is produced by using an item against a
/// neighbouring cell (e.g. laying a path with a shovel against the ground).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlacementContext {
    /// The neighbouring cell the item is used against.
    pub against: Coordinate,
}

/// One concrete per-cell unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkItem {
    /// The target cell.
    pub pos: Coordinate,
    /// Material to place, or [`Material::empty`] for a dig.
    pub material: Material,
    /// Item consumed by a placement, `None` for digs.
    pub item: Option<Item>,
    /// Optional placement context.
    pub context: Option<PlacementContext>,
}

impl WorkItem {
    /// A placement of `material` at `pos`, consuming the material's item.
    pub fn place(pos: Coordinate, material: Material) -> Self {
        let item = material.item();
        Self {
            pos,
            material,
            item,
            context: None,
        }
    }

    /// A dig at `pos`.
    pub fn dig(pos: Coordinate) -> Self {
        Self {
            pos,
            material: Material::empty(),
            item: None,
            context: None,
        }
    }
}

/// Buffered resource update flushed to observers once per sync interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSync {
    /// Observers must drop their copy before applying `items`.
    pub reset: bool,
    /// Latest pool amount per changed item.
    pub items: Vec<ResourceStack>,
}

/// Observer-facing progress view of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TaskProgress {
    /// The task.
    pub task_id: TaskId,
    /// Build or remove.
    pub kind: TaskKind,
    /// Current status.
    pub status: TaskStatus,
    /// Parts the region was split into.
    pub total_parts: u32,
    /// Parts finished so far.
    pub completed_parts: u32,
}

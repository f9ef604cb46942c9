//! What a caller asks for: targets, material plans and task requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use colony_blueprint::BlueprintBlockData;
use colony_types::{Coordinate, Material, Region, TaskId, TaskKind, WorkerId};

/// Cells a task covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTarget {
    /// Every cell of a box.
    Region(Region),
    /// An explicit list of cells (paths, roads, repairs).
    Coordinates(Vec<Coordinate>),
}

impl TaskTarget {
    /// The smallest box containing every cell, `None` if there are none.
    pub fn bounding_region(&self) -> Option<Region> {
        match self {
            Self::Region(region) => Some(*region),
            Self::Coordinates(coords) => {
                let first = *coords.first()?;
                let (min, max) = coords.iter().fold((first, first), |(lo, hi), c| {
                    (
                        Coordinate::new(lo.x.min(c.x), lo.y.min(c.y), lo.z.min(c.z)),
                        Coordinate::new(hi.x.max(c.x), hi.y.max(c.y), hi.z.max(c.z)),
                    )
                });
                Some(Region::new(min, max))
            }
        }
    }
}

/// Where the material of each cell comes from.
#[derive(Debug, Clone)]
pub enum MaterialPlan {
    /// Look cells up in layered blueprint data, relative to `origin`.
    Blueprint {
        /// World position of the template origin.
        origin: Coordinate,
        /// The layered template.
        data: Arc<BlueprintBlockData>,
    },
    /// The same material everywhere, or nothing (digs).
    Uniform(Option<Material>),
    /// An explicit material per cell, keyed by world position.
    Cells(BTreeMap<Coordinate, Material>),
}

/// A request to create one task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Caller-chosen id; must be unique among live tasks.
    pub task_id: TaskId,
    /// Build or remove.
    pub kind: TaskKind,
    /// The cells to work on.
    pub target: TaskTarget,
    /// Material lookup for build tasks.
    pub plan: MaterialPlan,
    /// Workers to bind. Empty binds every idle registered worker.
    pub workers: Vec<WorkerId>,
}

impl TaskRequest {
    /// Dig every cell of `target`.
    pub const fn remove(task_id: TaskId, target: TaskTarget, workers: Vec<WorkerId>) -> Self {
        Self {
            task_id,
            kind: TaskKind::Remove,
            target,
            plan: MaterialPlan::Uniform(None),
            workers,
        }
    }

    /// Place `material` on every cell of `target`.
    pub const fn place(
        task_id: TaskId,
        target: TaskTarget,
        material: Material,
        workers: Vec<WorkerId>,
    ) -> Self {
        Self {
            task_id,
            kind: TaskKind::Build,
            target,
            plan: MaterialPlan::Uniform(Some(material)),
            workers,
        }
    }

    /// Build a layered blueprint with its origin at `origin`.
    pub fn blueprint(
        task_id: TaskId,
        origin: Coordinate,
        data: Arc<BlueprintBlockData>,
        workers: Vec<WorkerId>,
    ) -> Self {
        let size = data.size();
        let far = origin.plus(size).offset(-1, -1, -1);
        Self {
            task_id,
            kind: TaskKind::Build,
            target: TaskTarget::Region(Region::new(origin, far)),
            plan: MaterialPlan::Blueprint { origin, data },
            workers,
        }
    }

    /// Place an explicit material on each listed cell.
    pub fn cells(
        task_id: TaskId,
        cells: BTreeMap<Coordinate, Material>,
        workers: Vec<WorkerId>,
    ) -> Self {
        Self {
            task_id,
            kind: TaskKind::Build,
            target: TaskTarget::Coordinates(cells.keys().copied().collect()),
            plan: MaterialPlan::Cells(cells),
            workers,
        }
    }
}

/// How a worker's attempt at a part ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOutcome {
    /// Every usable cell of the part was handled.
    Success,
    /// The worker gave up (no route to a cell).
    Failed,
}

/// Tunables for task decomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    /// Maximum part size along each axis.
    pub part_extent: Coordinate,
    /// Material placed below the floor where a blueprint leaves a gap.
    pub fill_material: Material,
    /// Most cells one task may target.
    pub max_volume: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            part_extent: Coordinate::new(3, 3, 3),
            fill_material: Material::block("dirt"),
            max_volume: 32_768,
        }
    }
}

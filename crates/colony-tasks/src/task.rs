//! A task: one region of work split into FIFO parts.
//!
//! Parts are split eagerly when the task is created and materialised
//! lazily when pulled. A part that was pulled but not finished is put back
//! at the end of the queue, so no work item is ever dropped.
//!
//! When the last part is finished the blueprint's deferred cells (block
//! entities and fluids, then the automatic layer) are written in one pass,
//! the task becomes `Completed` and its finish listeners run exactly once.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, warn};

use colony_ledger::ResourceLedger;
use colony_types::{
    Coordinate, Item, Material, Region, ResourceStack, TaskId, TaskKind, TaskProgress, TaskStatus,
    WorkItem,
};
use colony_world::BlockWorld;

use crate::error::TaskError;
use crate::part::{PartRegion, TaskPart, split_positions, split_region};
use crate::request::{MaterialPlan, TaskRequest, TaskSettings, TaskTarget};

/// Callback run once when a task completes. It may return a follow-up
/// request for the manager to submit.
pub type FinishListener = Box<dyn FnOnce(&TaskCompletion) -> Option<TaskRequest> + Send>;

/// What a completed task leaves behind.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    /// The finished task.
    pub task_id: TaskId,
    /// Build or remove.
    pub kind: TaskKind,
    /// Bounding region of the task.
    pub region: Region,
    /// Every cell the build actually wrote, with its material. Cells that
    /// were skipped (already done, or out of reserved material) are left
    /// out.
    pub built: Vec<(Coordinate, Material)>,
    /// Requests returned by finish listeners.
    pub followups: Vec<TaskRequest>,
}

/// A unit of colony work.
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    region: Region,
    target: TaskTarget,
    plan: MaterialPlan,
    fill_material: Material,
    parts: VecDeque<PartRegion>,
    total_parts: u32,
    completed_parts: u32,
    status: TaskStatus,
    placed: Vec<(Coordinate, Material)>,
    listeners: Vec<FinishListener>,
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("region", &self.region)
            .field("pending_parts", &self.parts.len())
            .field("total_parts", &self.total_parts)
            .field("completed_parts", &self.completed_parts)
            .field("status", &self.status)
            .field("placed", &self.placed.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Create a task and split its target into parts.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::EmptyRegion`] if the target has no cells, or
    /// [`TaskError::RegionTooLarge`] if it has more than
    /// `settings.max_volume`.
    pub fn new(request: &TaskRequest, settings: &TaskSettings) -> Result<Self, TaskError> {
        let region = request
            .target
            .bounding_region()
            .ok_or(TaskError::EmptyRegion(request.task_id))?;
        let volume = match &request.target {
            TaskTarget::Region(region) => region.volume(),
            TaskTarget::Coordinates(coords) => u64::try_from(coords.len()).unwrap_or(u64::MAX),
        };
        if volume > settings.max_volume {
            return Err(TaskError::RegionTooLarge {
                task_id: request.task_id,
                volume,
                max: settings.max_volume,
            });
        }

        let parts: VecDeque<PartRegion> = match &request.target {
            TaskTarget::Region(region) => split_region(*region, settings.part_extent),
            TaskTarget::Coordinates(coords) => {
                let extent = settings.part_extent;
                let volume = [extent.x, extent.y, extent.z]
                    .into_iter()
                    .map(|axis| u64::from(axis.max(1).unsigned_abs()))
                    .fold(1_u64, u64::saturating_mul);
                split_positions(coords, usize::try_from(volume).unwrap_or(usize::MAX))
            }
        }
        .into();

        let total_parts = u32::try_from(parts.len()).unwrap_or(u32::MAX);
        Ok(Self {
            id: request.task_id,
            kind: request.kind,
            region,
            target: request.target.clone(),
            plan: request.plan.clone(),
            fill_material: settings.fill_material.clone(),
            parts,
            total_parts,
            completed_parts: 0,
            status: TaskStatus::Created,
            placed: Vec::new(),
            listeners: Vec::new(),
        })
    }

    /// The task id.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Build or remove.
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Bounding region.
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Current status.
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Parts the target was split into.
    pub const fn total_parts(&self) -> u32 {
        self.total_parts
    }

    /// Parts finished so far.
    pub const fn completed_parts(&self) -> u32 {
        self.completed_parts
    }

    /// Observer view.
    pub const fn progress(&self) -> TaskProgress {
        TaskProgress {
            task_id: self.id,
            kind: self.kind,
            status: self.status,
            total_parts: self.total_parts,
            completed_parts: self.completed_parts,
        }
    }

    pub(crate) const fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Register a callback for completion.
    pub fn add_finish_listener(&mut self, listener: FinishListener) {
        self.listeners.push(listener);
    }

    /// Whether any part is waiting to be pulled.
    pub fn has_available_parts(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Items the whole task will consume, summed per item.
    pub fn requirements(&self) -> Vec<ResourceStack> {
        if self.kind == TaskKind::Remove {
            return Vec::new();
        }
        let mut counts: BTreeMap<Item, u32> = BTreeMap::new();
        for (_, material) in self.planned_cells() {
            if let Some(item) = material.item() {
                let amount = counts.entry(item).or_insert(0);
                *amount = amount.saturating_add(1);
            }
        }
        counts
            .into_iter()
            .map(|(item, amount)| ResourceStack { item, amount })
            .collect()
    }

    /// Pop the next part and materialise its work items.
    pub fn get_next_part(&mut self) -> Option<TaskPart> {
        let region = self.parts.pop_front()?;
        let items = match self.kind {
            TaskKind::Remove => region.positions().into_iter().map(WorkItem::dig).collect(),
            TaskKind::Build => region
                .positions()
                .into_iter()
                .filter_map(|pos| self.material_for(pos).map(|m| WorkItem::place(pos, m)))
                .collect(),
        };
        if self.status == TaskStatus::Created {
            self.status = TaskStatus::InProgress;
        }
        Some(TaskPart {
            task_id: self.id,
            region,
            items,
        })
    }

    /// Note a cell a worker wrote for this task.
    pub fn record_placed(&mut self, pos: Coordinate, material: Material) {
        self.placed.push((pos, material));
    }

    /// Put an unfinished part back at the end of the queue.
    pub fn return_part(&mut self, region: PartRegion) {
        debug!(task_id = %self.id, cells = region.len(), "Part returned");
        self.parts.push_back(region);
    }

    /// Count a finished part. On the last one, flush deferred cells, mark
    /// the task completed and run its listeners.
    pub fn finish_part(
        &mut self,
        world: &mut dyn BlockWorld,
        ledger: &mut ResourceLedger,
    ) -> Option<TaskCompletion> {
        self.completed_parts = self.completed_parts.saturating_add(1);
        if self.has_available_parts()
            || self.completed_parts < self.total_parts
            || self.status.is_terminal()
        {
            return None;
        }

        self.flush_deferred(world, ledger);
        self.status = TaskStatus::Completed;

        let mut completion = TaskCompletion {
            task_id: self.id,
            kind: self.kind,
            region: self.region,
            built: std::mem::take(&mut self.placed),
            followups: Vec::new(),
        };
        let followups: Vec<TaskRequest> = self
            .listeners
            .drain(..)
            .filter_map(|listener| listener(&completion))
            .collect();
        completion.followups = followups;

        info!(
            task_id = %self.id,
            kind = ?self.kind,
            parts = self.total_parts,
            followups = completion.followups.len(),
            "Task completed"
        );
        Some(completion)
    }

    /// Material a worker places at `pos`, `None` when nothing is placed.
    fn material_for(&self, pos: Coordinate) -> Option<Material> {
        let material = match &self.plan {
            MaterialPlan::Blueprint { origin, data } => {
                let rel = pos.minus(*origin);
                let manual = data.layer(colony_blueprint::BlueprintLayer::Manual);
                match manual.get(&rel) {
                    Some(material) => material.clone(),
                    None if rel.y < data.floor_level() => self.fill_material.clone(),
                    None => return None,
                }
            }
            MaterialPlan::Uniform(material) => material.clone()?,
            MaterialPlan::Cells(cells) => cells.get(&pos)?.clone(),
        };
        (!material.is_empty()).then_some(material)
    }

    /// Cells written in one pass on completion, in world coordinates.
    fn deferred_cells(&self) -> Vec<(Coordinate, Material)> {
        match &self.plan {
            MaterialPlan::Blueprint { origin, data } => data
                .deferred_cells()
                .filter(|(_, material)| !material.is_empty())
                .map(|(rel, material)| (origin.plus(*rel), material.clone()))
                .collect(),
            MaterialPlan::Uniform(_) | MaterialPlan::Cells(_) => Vec::new(),
        }
    }

    /// Every cell a build places: hand-placed cells then deferred ones.
    fn planned_cells(&self) -> Vec<(Coordinate, Material)> {
        let positions: Vec<Coordinate> = match &self.target {
            TaskTarget::Region(region) => region.positions().collect(),
            TaskTarget::Coordinates(coords) => {
                let mut seen = std::collections::BTreeSet::new();
                coords.iter().copied().filter(|c| seen.insert(*c)).collect()
            }
        };
        let mut cells: Vec<(Coordinate, Material)> = positions
            .into_iter()
            .filter_map(|pos| self.material_for(pos).map(|m| (pos, m)))
            .collect();
        cells.extend(self.deferred_cells());
        cells
    }

    fn flush_deferred(&mut self, world: &mut dyn BlockWorld, ledger: &mut ResourceLedger) {
        let deferred = self.deferred_cells();
        if deferred.is_empty() {
            return;
        }
        let mut placed = 0_u32;
        for (pos, material) in deferred {
            if let Some(item) = material.item() {
                if let Err(e) = ledger.consume_one(self.id, &item) {
                    warn!(task_id = %self.id, %pos, error = %e, "Deferred cell skipped");
                    continue;
                }
            }
            match world.set_material(pos, material.clone()) {
                Ok(()) => {
                    placed = placed.saturating_add(1);
                    self.placed.push((pos, material));
                }
                Err(e) => warn!(task_id = %self.id, %pos, error = %e, "Deferred cell not written"),
            }
        }
        debug!(task_id = %self.id, placed, "Deferred layers flushed");
    }
}

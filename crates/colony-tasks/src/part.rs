//! Task parts: bounded chunks of a task's region and their work items.

use colony_types::{Coordinate, Region, TaskId, WorkItem};

/// The cells of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartRegion {
    /// A rectangular sub-box.
    Box(Region),
    /// A chunk of an explicit coordinate list.
    Positions(Vec<Coordinate>),
}

impl PartRegion {
    /// Cells in work order (bottom-up for boxes, list order otherwise).
    pub fn positions(&self) -> Vec<Coordinate> {
        match self {
            Self::Box(region) => region.positions().collect(),
            Self::Positions(coords) => coords.clone(),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> u64 {
        match self {
            Self::Box(region) => region.volume(),
            Self::Positions(coords) => u64::try_from(coords.len()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the part has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One pulled part with its materialised work items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPart {
    /// The owning task.
    pub task_id: TaskId,
    /// The cells this part covers.
    pub region: PartRegion,
    /// Work items in execution order. Empty cells are already skipped.
    pub items: Vec<WorkItem>,
}

/// Split a box into sub-boxes of at most `extent` cells per axis, ordered
/// bottom-up: y chunks outermost, then x, then z.
pub fn split_region(region: Region, extent: Coordinate) -> Vec<PartRegion> {
    let step_x = extent.x.max(1);
    let step_y = extent.y.max(1);
    let step_z = extent.z.max(1);
    let min = region.min_corner();
    let max = region.max_corner();

    let mut parts = Vec::new();
    for y in chunk_starts(min.y, max.y, step_y) {
        for x in chunk_starts(min.x, max.x, step_x) {
            for z in chunk_starts(min.z, max.z, step_z) {
                let start = Coordinate::new(x, y, z);
                let end = Coordinate::new(
                    x.saturating_add(step_x.saturating_sub(1)).min(max.x),
                    y.saturating_add(step_y.saturating_sub(1)).min(max.y),
                    z.saturating_add(step_z.saturating_sub(1)).min(max.z),
                );
                parts.push(PartRegion::Box(Region::new(start, end)));
            }
        }
    }
    parts
}

/// Split a coordinate list into chunks of at most `chunk` cells, dropping
/// repeated coordinates.
pub fn split_positions(coords: &[Coordinate], chunk: usize) -> Vec<PartRegion> {
    let mut seen = std::collections::BTreeSet::new();
    let unique: Vec<Coordinate> = coords.iter().copied().filter(|c| seen.insert(*c)).collect();
    unique
        .chunks(chunk.max(1))
        .map(|slice| PartRegion::Positions(slice.to_vec()))
        .collect()
}

fn chunk_starts(min: i32, max: i32, step: i32) -> impl Iterator<Item = i32> {
    std::iter::successors(Some(min), move |start| {
        start.checked_add(step).filter(|next| *next <= max)
    })
}

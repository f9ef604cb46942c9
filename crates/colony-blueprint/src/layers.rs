//! Build-order layering of structure templates.
//!
//! [`build_layers`] splits a template into four layers:
//!
//! | Layer | Contents | Placed |
//! |-------|----------|--------|
//! | `General` | every authored cell | never directly |
//! | `Manual` | structural cells of columns that are complete up to the floor | by workers, cell by cell |
//! | `Automatic` | the rest of a column after its first gap at or above the floor | in one pass on task completion |
//! | `Entity` | cells with attached sub-state or fluids | in one pass on task completion |
//!
//! `Manual` and `Automatic` are disjoint. Their union is `General` minus
//! `Entity` minus empty cells at or above the floor; the only extra keys are
//! entity positions below the floor, which `Manual` marks empty so the
//! foundation fill leaves room for them.

use std::collections::BTreeMap;

use colony_types::{Coordinate, Material};

use crate::template::StructureTemplate;

/// The four layers of a [`BlueprintBlockData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlueprintLayer {
    /// Every authored cell.
    General,
    /// Cells workers place by hand.
    Manual,
    /// Cells filled in after everything else is placed.
    Automatic,
    /// Block-entity and fluid cells applied when the task finishes.
    Entity,
}

/// Immutable, pre-computed layer maps for one rotated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintBlockData {
    size: Coordinate,
    floor_level: i32,
    general: BTreeMap<Coordinate, Material>,
    manual: BTreeMap<Coordinate, Material>,
    automatic: BTreeMap<Coordinate, Material>,
    entity: BTreeMap<Coordinate, Material>,
}

impl BlueprintBlockData {
    /// Size of the (rotated) template box.
    pub const fn size(&self) -> Coordinate {
        self.size
    }

    /// Template-relative floor level.
    pub const fn floor_level(&self) -> i32 {
        self.floor_level
    }

    /// Borrow one layer.
    pub const fn layer(&self, layer: BlueprintLayer) -> &BTreeMap<Coordinate, Material> {
        match layer {
            BlueprintLayer::General => &self.general,
            BlueprintLayer::Manual => &self.manual,
            BlueprintLayer::Automatic => &self.automatic,
            BlueprintLayer::Entity => &self.entity,
        }
    }

    /// Cells applied in one batch when the owning task completes: the
    /// entity layer first, then the automatic layer.
    pub fn deferred_cells(&self) -> impl Iterator<Item = (&Coordinate, &Material)> {
        self.entity.iter().chain(self.automatic.iter())
    }
}

/// Split a template into manual, automatic and entity layers.
///
/// Every `(x, z)` column is scanned from `y = 0` upwards. The column stays
/// manual while each cell at or above `floor_level` is present; the first
/// missing cell at or above the floor turns the remainder of the column
/// automatic. Below the floor a missing cell is skipped, unless an entity
/// sits there, in which case it is written to the manual layer as empty.
pub fn build_layers(template: &StructureTemplate, floor_level: i32) -> BlueprintBlockData {
    let general = template.to_map();

    let entity: BTreeMap<Coordinate, Material> = general
        .iter()
        .filter(|(_, material)| material.is_deferred())
        .map(|(pos, material)| (*pos, material.clone()))
        .collect();

    let candidates: BTreeMap<Coordinate, Material> = general
        .iter()
        .filter(|(pos, material)| {
            !material.is_deferred() && (pos.y < floor_level || !material.is_empty())
        })
        .map(|(pos, material)| (*pos, material.clone()))
        .collect();

    let size = template.size;
    let mut manual = BTreeMap::new();
    let mut automatic = BTreeMap::new();

    for x in 0..size.x {
        for z in 0..size.z {
            let mut manual_column = true;
            for y in 0..size.y {
                let pos = Coordinate::new(x, y, z);
                let candidate = candidates.get(&pos);

                if candidate.is_none() && y >= floor_level {
                    manual_column = false;
                    continue;
                }

                if manual_column {
                    if let Some(material) = candidate {
                        manual.insert(pos, material.clone());
                    } else if entity.contains_key(&pos) {
                        manual.insert(pos, Material::empty());
                    }
                } else if let Some(material) = candidate {
                    automatic.insert(pos, material.clone());
                }
            }
        }
    }

    tracing::debug!(
        general = general.len(),
        manual = manual.len(),
        automatic = automatic.len(),
        entity = entity.len(),
        floor_level,
        "Blueprint layers built"
    );

    BlueprintBlockData {
        size,
        floor_level,
        general,
        manual,
        automatic,
        entity,
    }
}

//! In-memory block world over a bounded box.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use colony_types::{Coordinate, Material, Region};

use crate::error::WorldError;
use crate::traits::BlockWorld;

/// Block names no worker can dig.
pub const DEFAULT_UNBREAKABLE: [&str; 1] = ["bedrock"];

/// A sparse grid of materials. Cells not stored are empty.
#[derive(Debug, Clone)]
pub struct GridWorld {
    bounds: Region,
    cells: BTreeMap<Coordinate, Material>,
    /// Cells that may never be dug (e.g. the colony center).
    protected: BTreeSet<Coordinate>,
    unbreakable: BTreeSet<String>,
}

impl GridWorld {
    /// An empty world covering `bounds`.
    pub fn new(bounds: Region) -> Self {
        Self {
            bounds,
            cells: BTreeMap::new(),
            protected: BTreeSet::new(),
            unbreakable: DEFAULT_UNBREAKABLE.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// The world bounds.
    pub const fn bounds(&self) -> Region {
        self.bounds
    }

    /// Mark `pos` as never removable.
    pub fn protect(&mut self, pos: Coordinate) {
        self.protected.insert(pos);
    }

    /// Fill every cell of `region` that lies inside the bounds.
    pub fn fill(&mut self, region: Region, material: &Material) {
        let bounds = self.bounds;
        for pos in region.positions().filter(|p| bounds.contains(*p)) {
            self.write(pos, material.clone());
        }
    }

    /// Number of non-empty cells.
    pub fn solid_count(&self) -> usize {
        self.cells.len()
    }

    fn write(&mut self, pos: Coordinate, material: Material) {
        if material.is_empty() {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, material);
        }
    }
}

impl BlockWorld for GridWorld {
    fn material_at(&self, pos: Coordinate) -> Material {
        self.cells.get(&pos).cloned().unwrap_or_else(Material::empty)
    }

    fn set_material(&mut self, pos: Coordinate, material: Material) -> Result<(), WorldError> {
        if !self.bounds.contains(pos) {
            return Err(WorldError::OutOfBounds(pos));
        }
        if material.is_empty() && self.protected.contains(&pos) {
            return Err(WorldError::Protected(pos));
        }
        debug!(%pos, %material, "Cell updated");
        self.write(pos, material);
        Ok(())
    }

    fn can_place_at(&self, pos: Coordinate, material: &Material) -> bool {
        if !self.bounds.contains(pos) || material.is_empty() {
            return false;
        }
        let current = self.material_at(pos);
        (current.is_empty() || current.fluid) && current != *material
    }

    fn can_remove_at(&self, pos: Coordinate) -> bool {
        if !self.bounds.contains(pos) || self.protected.contains(&pos) {
            return false;
        }
        let current = self.material_at(pos);
        !current.is_empty() && !self.unbreakable.contains(&current.block)
    }

    fn is_passable(&self, pos: Coordinate) -> bool {
        self.bounds.contains(pos) && self.material_at(pos).is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn world() -> GridWorld {
        GridWorld::new(Region::new(Coordinate::new(0, 0, 0), Coordinate::new(4, 4, 4)))
    }

    #[test]
    fn unknown_cells_are_empty() {
        assert!(world().material_at(Coordinate::new(1, 1, 1)).is_empty());
    }

    #[test]
    fn place_requires_empty_or_fluid_cell() {
        let mut w = world();
        let pos = Coordinate::new(1, 0, 1);
        let stone = Material::block("stone");
        assert!(w.can_place_at(pos, &stone));
        w.set_material(pos, stone.clone()).unwrap();
        assert!(!w.can_place_at(pos, &Material::block("dirt")));

        let wet = Coordinate::new(2, 0, 2);
        w.set_material(wet, Material::fluid("water")).unwrap();
        assert!(w.can_place_at(wet, &stone));
    }

    #[test]
    fn protected_and_unbreakable_cells_cannot_be_dug() {
        let mut w = world();
        let center = Coordinate::new(2, 0, 2);
        w.set_material(center, Material::block("beacon")).unwrap();
        w.protect(center);
        assert!(!w.can_remove_at(center));
        assert!(matches!(
            w.set_material(center, Material::empty()),
            Err(WorldError::Protected(_))
        ));

        let floor = Coordinate::new(0, 0, 0);
        w.set_material(floor, Material::block("bedrock")).unwrap();
        assert!(!w.can_remove_at(floor));
        assert!(!w.can_remove_at(Coordinate::new(3, 3, 3)));
    }

    #[test]
    fn writes_outside_bounds_fail() {
        let mut w = world();
        assert!(matches!(
            w.set_material(Coordinate::new(9, 0, 0), Material::block("stone")),
            Err(WorldError::OutOfBounds(_))
        ));
    }

    #[test]
    fn fill_and_clear() {
        let mut w = world();
        w.fill(
            Region::new(Coordinate::new(0, 0, 0), Coordinate::new(1, 0, 1)),
            &Material::block("dirt"),
        );
        assert_eq!(w.solid_count(), 4);
        w.set_material(Coordinate::new(0, 0, 0), Material::empty()).unwrap();
        assert_eq!(w.solid_count(), 3);
    }
}

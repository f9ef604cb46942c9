//! Integrity tracking for finished buildings.
//!
//! When a build task completes, the cells it placed become the building's
//! reference. Checking every cell every tick is wasteful, so each tick a
//! round-robin cursor checks a fixed number of cells against the world and
//! marks them preserved or destroyed. Health is derived from the preserved
//! share: at or below one half the building counts as ruined (0), intact is
//! 100, linear in between.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use colony_types::{BuildingId, Coordinate, Material};

use crate::traits::BlockWorld;

/// Cells checked per building per tick unless configured otherwise.
pub const DEFAULT_CHECKS_PER_TICK: usize = 20;

/// Observer-facing summary of one building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// The building.
    pub building_id: BuildingId,
    /// Health from 0 (ruined) to 100 (intact).
    pub health: u8,
    /// Reference cells currently not matching the world.
    pub destroyed: u32,
    /// Reference cells in total.
    pub total: u32,
}

/// Reference state and check cursor of one building.
#[derive(Debug, Clone)]
pub struct BuildingIntegrity {
    id: BuildingId,
    reference: Vec<(Coordinate, Material)>,
    destroyed: BTreeSet<Coordinate>,
    cursor: usize,
    checks_per_tick: usize,
}

impl BuildingIntegrity {
    /// Track the given placed cells. Empty materials are ignored.
    pub fn new(
        id: BuildingId,
        cells: impl IntoIterator<Item = (Coordinate, Material)>,
        checks_per_tick: usize,
    ) -> Self {
        let reference: Vec<(Coordinate, Material)> =
            cells.into_iter().filter(|(_, m)| !m.is_empty()).collect();
        Self {
            id,
            reference,
            destroyed: BTreeSet::new(),
            cursor: 0,
            checks_per_tick: checks_per_tick.max(1),
        }
    }

    /// The building id.
    pub const fn id(&self) -> BuildingId {
        self.id
    }

    /// Check the next batch of cells. Returns `true` if any cell changed
    /// status.
    pub fn check(&mut self, world: &dyn BlockWorld) -> bool {
        let total = self.reference.len();
        if total == 0 {
            return false;
        }

        let mut changed = false;
        for _ in 0..self.checks_per_tick.min(total) {
            let index = self.cursor;
            self.cursor = index.saturating_add(1).checked_rem(total).unwrap_or(0);
            let Some((pos, expected)) = self.reference.get(index) else {
                continue;
            };
            let preserved = world.material_at(*pos) == *expected;
            changed |= if preserved {
                self.destroyed.remove(pos)
            } else {
                self.destroyed.insert(*pos)
            };
        }

        if changed {
            debug!(building_id = %self.id, health = self.health(), "Building integrity changed");
        }
        changed
    }

    /// Health from 0 to 100.
    pub fn health(&self) -> u8 {
        let total = u64::try_from(self.reference.len()).unwrap_or(u64::MAX);
        if total == 0 {
            return 100;
        }
        let destroyed = u64::try_from(self.destroyed.len()).unwrap_or(u64::MAX);
        let preserved = total.saturating_sub(destroyed);
        // clamp((2p - n) / n, 0, 1) * 100
        let surplus = preserved.saturating_mul(2).saturating_sub(total);
        let health = surplus.saturating_mul(100).checked_div(total).unwrap_or(0);
        u8::try_from(health.min(100)).unwrap_or(100)
    }

    /// Destroyed cells with the material that belongs there.
    pub fn repair_plan(&self) -> BTreeMap<Coordinate, Material> {
        self.reference
            .iter()
            .filter(|(pos, _)| self.destroyed.contains(pos))
            .cloned()
            .collect()
    }

    /// Forget destroyed marks for cells that were repaired. They are
    /// re-checked on the next pass anyway.
    pub fn mark_repaired(&mut self, cells: impl IntoIterator<Item = Coordinate>) {
        let mut count = 0_u32;
        for pos in cells {
            if self.destroyed.remove(&pos) {
                count = count.saturating_add(1);
            }
        }
        if count > 0 {
            info!(building_id = %self.id, cells = count, "Building repaired");
        }
    }

    /// Summary for observers.
    pub fn report(&self) -> IntegrityReport {
        IntegrityReport {
            building_id: self.id,
            health: self.health(),
            destroyed: u32::try_from(self.destroyed.len()).unwrap_or(u32::MAX),
            total: u32::try_from(self.reference.len()).unwrap_or(u32::MAX),
        }
    }
}

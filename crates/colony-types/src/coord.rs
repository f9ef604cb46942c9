//! Integer coordinates and inclusive box regions.
//!
//! [`Coordinate`] is the map key for every per-cell structure in the
//! workspace. [`Region`] is an inclusive axis-aligned box; its iteration
//! order is bottom-up (y, then x, then z) so that supporting cells are
//! always visited before the cells resting on them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An integer position in the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl Coordinate {
    /// The origin.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// Create a coordinate from its components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum, saturating at the `i32` bounds.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_add(other.x),
            y: self.y.saturating_add(other.y),
            z: self.z.saturating_add(other.z),
        }
    }

    /// Component-wise difference, saturating at the `i32` bounds.
    #[must_use]
    pub const fn minus(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_sub(other.x),
            y: self.y.saturating_sub(other.y),
            z: self.z.saturating_sub(other.z),
        }
    }

    /// Shift by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        self.plus(Self::new(dx, dy, dz))
    }

    /// The cell directly below this one.
    #[must_use]
    pub const fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Chebyshev (king-move) distance between two coordinates.
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        let xy = if dx > dy { dx } else { dy };
        if xy > dz { xy } else { dz }
    }

    /// The six face-adjacent neighbours.
    pub const fn neighbors(self) -> [Self; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// An inclusive axis-aligned box between two corners.
///
/// The corners are normalised on construction and on deserialization, so
/// `min` is component-wise less than or equal to `max` regardless of the
/// order they were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Region {
    min: Coordinate,
    max: Coordinate,
}

/// Wire form of a [`Region`] before its corners are normalised.
#[derive(Deserialize)]
struct RawRegion {
    min: Coordinate,
    max: Coordinate,
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRegion::deserialize(deserializer)?;
        Ok(Self::new(raw.min, raw.max))
    }
}

impl Region {
    /// Create a region spanning both corners (inclusive).
    pub const fn new(a: Coordinate, b: Coordinate) -> Self {
        Self {
            min: Coordinate::new(min_i32(a.x, b.x), min_i32(a.y, b.y), min_i32(a.z, b.z)),
            max: Coordinate::new(max_i32(a.x, b.x), max_i32(a.y, b.y), max_i32(a.z, b.z)),
        }
    }

    /// A region covering exactly one cell.
    pub const fn single(pos: Coordinate) -> Self {
        Self { min: pos, max: pos }
    }

    /// The lowest corner.
    pub const fn min_corner(&self) -> Coordinate {
        self.min
    }

    /// The highest corner.
    pub const fn max_corner(&self) -> Coordinate {
        self.max
    }

    /// Number of cells along each axis.
    pub const fn extent(&self) -> (u32, u32, u32) {
        (
            self.max.x.abs_diff(self.min.x).saturating_add(1),
            self.max.y.abs_diff(self.min.y).saturating_add(1),
            self.max.z.abs_diff(self.min.z).saturating_add(1),
        )
    }

    /// Total number of cells in the region.
    pub fn volume(&self) -> u64 {
        let (x, y, z) = self.extent();
        u64::from(x)
            .saturating_mul(u64::from(y))
            .saturating_mul(u64::from(z))
    }

    /// Whether the region contains the given coordinate.
    pub const fn contains(&self, pos: Coordinate) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// The same region moved by `delta`.
    #[must_use]
    pub const fn translated(&self, delta: Coordinate) -> Self {
        Self {
            min: self.min.plus(delta),
            max: self.max.plus(delta),
        }
    }

    /// Iterate every cell, bottom-up: y outermost, then x, then z.
    pub const fn positions(&self) -> RegionIter {
        RegionIter {
            region: *self,
            next: Some(self.min),
        }
    }
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Iterator over the cells of a [`Region`].
#[derive(Debug, Clone)]
pub struct RegionIter {
    region: Region,
    next: Option<Coordinate>,
}

impl Iterator for RegionIter {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let min = self.region.min;
        let max = self.region.max;

        self.next = if current.z < max.z {
            Some(Coordinate::new(current.x, current.y, current.z.saturating_add(1)))
        } else if current.x < max.x {
            Some(Coordinate::new(current.x.saturating_add(1), current.y, min.z))
        } else if current.y < max.y {
            Some(Coordinate::new(min.x, current.y.saturating_add(1), min.z))
        } else {
            None
        };

        Some(current)
    }
}

const fn min_i32(a: i32, b: i32) -> i32 {
    if a < b { a } else { b }
}

const fn max_i32(a: i32, b: i32) -> i32 {
    if a > b { a } else { b }
}

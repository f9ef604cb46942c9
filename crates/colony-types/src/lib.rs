//! Shared type definitions for the colony task engine.
//!
//! Every crate in the workspace speaks in these types. Observer-facing
//! types derive `ts-rs` so a dashboard can consume them as `TypeScript`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for tasks, workers and buildings
//! - [`coord`] -- Integer coordinates and inclusive box regions
//! - [`material`] -- Materials occupying cells and the items that place them
//! - [`enums`] -- Task kind/status, worker phase, template rotation
//! - [`structs`] -- Resource stacks, work items, observer payloads

pub mod coord;
pub mod enums;
pub mod ids;
pub mod material;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use coord::{Coordinate, Region, RegionIter};
pub use enums::{Rotation, TaskKind, TaskStatus, WorkerPhase};
pub use ids::{BuildingId, TaskId, WorkerId};
pub use material::{EMPTY_BLOCK, Item, Material};
pub use structs::{PlacementContext, ResourceStack, ResourceSync, TaskProgress, WorkItem};

//! The world as seen by the colony task engine.
//!
//! The scheduler and workers only see the world through two traits:
//! [`BlockWorld`] for reading and writing cells and [`Navigator`] for moving
//! a worker towards a goal. This crate also ships in-memory implementations
//! used by the engine binary and the tests.
//!
//! # Modules
//!
//! - [`traits`] -- [`BlockWorld`] and [`Navigator`].
//! - [`grid`] -- [`GridWorld`], a sparse bounded block grid.
//! - [`navigator`] -- [`GridNavigator`], breadth-first pathing with reach.
//! - [`integrity`] -- [`BuildingIntegrity`], round-robin damage checks and
//!   repair plans for finished buildings.
//! - [`error`] -- Error types for world writes.

pub mod error;
pub mod grid;
pub mod integrity;
pub mod navigator;
pub mod traits;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::GridWorld;
pub use integrity::{BuildingIntegrity, DEFAULT_CHECKS_PER_TICK, IntegrityReport};
pub use navigator::GridNavigator;
pub use traits::{BlockWorld, Navigator};

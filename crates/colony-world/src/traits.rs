//! The seams between the scheduler and the game world.
//!
//! The engine never touches blocks or entities directly. Everything it
//! needs from the host world goes through [`BlockWorld`], and every worker
//! moves through its own [`Navigator`].

use colony_types::{Coordinate, Material};

use crate::error::WorldError;

/// Read and write access to the cells of the world.
pub trait BlockWorld {
    /// What currently occupies `pos`. Unknown cells are empty.
    fn material_at(&self, pos: Coordinate) -> Material;

    /// Replace the material at `pos`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] if the cell cannot be written.
    fn set_material(&mut self, pos: Coordinate, material: Material) -> Result<(), WorldError>;

    /// Whether `material` may be placed at `pos` right now.
    fn can_place_at(&self, pos: Coordinate, material: &Material) -> bool;

    /// Whether the block at `pos` may be dug right now.
    fn can_remove_at(&self, pos: Coordinate) -> bool;

    /// Whether a worker can stand in `pos`.
    fn is_passable(&self, pos: Coordinate) -> bool;
}

/// Per-worker movement towards a goal cell.
pub trait Navigator {
    /// Where the worker stands.
    fn position(&self) -> Coordinate;

    /// Plan a route to somewhere within reach of `goal`. A failed plan sets
    /// the unreachable flag instead of returning an error.
    fn try_set_goal(&mut self, world: &dyn BlockWorld, goal: Coordinate);

    /// Whether the worker is within reach of the current goal.
    fn has_reached_goal(&self) -> bool;

    /// Advance one tick along the planned route.
    fn tick(&mut self, world: &dyn BlockWorld);

    /// Whether the last plan (or re-plan) found no route.
    fn is_path_unreachable(&self) -> bool;

    /// Drop the goal, route and unreachable flag.
    fn reset(&mut self);
}

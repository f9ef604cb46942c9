//! Worker spawner for seeding the colony with its initial workforce.
//!
//! Workers are placed on random free cells of the ground layer (the lowest
//! layer of the world bounds), away from the colony center. Placement is
//! driven by a seeded RNG so a given `world.seed` always yields the same
//! layout.

use colony_core::ColonySession;
use colony_types::{Coordinate, WorkerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::error::EngineError;

/// Random draws allowed per worker before giving up.
const MAX_ATTEMPTS_PER_WORKER: u32 = 64;

/// Spawn `count` workers on free ground cells.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if no free cell is found for a worker.
pub fn spawn_initial_workers(
    session: &mut ColonySession,
    count: u32,
    seed: u64,
) -> Result<Vec<WorkerId>, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut spawned = Vec::new();

    for _ in 0..count {
        let position = pick_free_cell(session, &mut rng)?;
        let worker_id = session.spawn_worker(position);
        debug!(worker_id = %worker_id, x = position.x, z = position.z, "Worker placed");
        spawned.push(worker_id);
    }

    info!(workers = spawned.len(), seed, "Initial workers spawned");
    Ok(spawned)
}

fn pick_free_cell(session: &ColonySession, rng: &mut impl Rng) -> Result<Coordinate, EngineError> {
    let bounds = session.config().world.bounds();
    let center = session.config().world.center;
    let (min, max) = (bounds.min_corner(), bounds.max_corner());

    for _ in 0..MAX_ATTEMPTS_PER_WORKER {
        let pos = Coordinate::new(
            rng.random_range(min.x..=max.x),
            min.y,
            rng.random_range(min.z..=max.z),
        );
        if pos != center && is_free(session, pos) {
            return Ok(pos);
        }
    }

    Err(EngineError::Spawner {
        message: format!("no free ground cell found in {MAX_ATTEMPTS_PER_WORKER} attempts"),
    })
}

fn is_free(session: &ColonySession, pos: Coordinate) -> bool {
    session.world().is_passable(pos)
        && session
            .workers()
            .iter()
            .all(|worker| worker.position() != pos)
}

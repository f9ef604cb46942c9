//! Tick cycle: the engine loop step that drives the colony.
//!
//! Each tick runs through these phases:
//!
//! 1. **Clock** -- advance the tick counter.
//! 2. **Assignment** -- idle workers adopt tasks that have parts but no
//!    bound workers (orphaned by lost or failed workers).
//! 3. **Execution** -- every worker advances its behaviour once. The order
//!    rotates by one position each tick, so under contention each worker is
//!    first to pull within N ticks.
//! 4. **Reconciliation** -- terminal task events are drained; completed
//!    builds are tracked, repaired buildings are marked.
//! 5. **Integrity** -- a bounded number of cells per building is compared
//!    against the world.
//! 6. **Ledger** -- buffered stock changes are flushed to observers on the
//!    sync interval, and stock conservation is verified.
//!
//! All mutation happens synchronously inside [`run_tick`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use colony_ledger::{ConservationResult, LedgerAnomaly};
use colony_tasks::TaskEvent;
use colony_types::{ResourceSync, TaskProgress, WorkerId, WorkerPhase};
use colony_workers::WorkContext;
use colony_world::IntegrityReport;

use crate::error::CoreError;
use crate::session::ColonySession;

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Live tasks at end of tick.
    pub live_tasks: usize,
    /// Tasks that reached a terminal status this tick.
    pub events: Vec<TaskEvent>,
    /// Phase of every worker after its turn.
    pub worker_phases: BTreeMap<WorkerId, WorkerPhase>,
    /// Progress of every live task.
    pub progress: Vec<TaskProgress>,
    /// Stock changes due for observers, on sync ticks.
    pub resource_sync: Option<ResourceSync>,
    /// Buildings whose integrity changed this tick.
    pub integrity: Vec<IntegrityReport>,
    /// Conservation failure detected this tick.
    pub anomaly: Option<LedgerAnomaly>,
}

impl TickSummary {
    /// Whether no task is live and every worker is idle.
    pub fn is_quiescent(&self) -> bool {
        self.live_tasks == 0
            && self
                .worker_phases
                .values()
                .all(|phase| *phase == WorkerPhase::Idle)
    }
}

/// Execute one tick.
///
/// # Errors
///
/// Returns [`CoreError::Clock`] if the tick counter overflows. Everything
/// that goes wrong inside a tick is reported through the summary instead.
pub fn run_tick(session: &mut ColonySession) -> Result<TickSummary, CoreError> {
    let tick = session.clock.advance()?;

    // --- Assignment ---
    for worker in &session.workers {
        if worker.is_available() && session.manager.bound_task(worker.id()).is_none() {
            session.manager.claim_unassigned(worker.id());
        }
    }

    // --- Execution ---
    if !session.workers.is_empty() {
        session.workers.rotate_left(1);
    }
    let mut worker_phases = BTreeMap::new();
    {
        let mut ctx = WorkContext {
            manager: &mut session.manager,
            world: &mut *session.world,
            ledger: &mut session.ledger,
        };
        for worker in &mut session.workers {
            let phase = worker.tick(&mut ctx);
            worker_phases.insert(worker.id(), phase);
        }
    }

    // --- Reconciliation ---
    let events = session.manager.drain_events();
    for event in &events {
        session.handle_event(event);
    }

    // --- Integrity ---
    let mut integrity = Vec::new();
    for building in session.buildings.values_mut() {
        if building.check(&*session.world) {
            integrity.push(building.report());
        }
    }

    // --- Ledger ---
    let resource_sync = session.ledger.poll_sync(tick);
    let anomaly = if session.config.ledger.conservation_check {
        match session.ledger.verify_conservation(tick) {
            ConservationResult::Balanced => None,
            ConservationResult::Anomaly(anomaly) => {
                warn!(tick, anomaly = %anomaly, "Stock conservation violated");
                Some(anomaly)
            }
        }
    } else {
        None
    };

    let summary = TickSummary {
        tick,
        live_tasks: session.manager.task_count(),
        events,
        worker_phases,
        progress: session.manager.progress(),
        resource_sync,
        integrity,
        anomaly,
    };

    if !summary.events.is_empty() {
        info!(
            tick,
            ended = summary.events.len(),
            live_tasks = summary.live_tasks,
            "Tasks ended"
        );
    }
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_tasks::{TaskRequest, TaskTarget};
    use colony_types::{Coordinate, Item, Material, TaskId};

    use super::*;
    use crate::config::ColonyConfig;

    fn session() -> ColonySession {
        let mut config = ColonyConfig::default();
        config.workers.dig_ticks = 1;
        config.workers.place_ticks = 1;
        config.ledger.sync_interval_ticks = 1;
        ColonySession::new(config)
    }

    #[test]
    fn empty_session_ticks_quietly() {
        let mut session = session();
        let summary = run_tick(&mut session).unwrap();
        assert_eq!(summary.tick, 1);
        assert!(summary.is_quiescent());
        assert!(summary.anomaly.is_none());
    }

    #[test]
    fn worker_order_rotates_each_tick() {
        let mut session = session();
        let a = session.spawn_worker(Coordinate::new(1, 0, 1));
        let b = session.spawn_worker(Coordinate::new(2, 0, 1));
        let c = session.spawn_worker(Coordinate::new(3, 0, 1));

        let order = |s: &ColonySession| s.workers().iter().map(|w| w.id()).collect::<Vec<_>>();
        run_tick(&mut session).unwrap();
        assert_eq!(order(&session), vec![b, c, a]);
        run_tick(&mut session).unwrap();
        assert_eq!(order(&session), vec![c, a, b]);
    }

    #[test]
    fn idle_worker_adopts_orphaned_task() {
        let mut session = session();
        session.ledger_mut().credit(&Item::new("stone"), 1);
        let task_id = session
            .submit_request(TaskRequest::place(
                TaskId::new(),
                TaskTarget::Coordinates(vec![Coordinate::new(4, 0, 4)]),
                Material::block("stone"),
                Vec::new(),
            ))
            .unwrap();
        // Submitted before any worker existed, so nobody is bound.
        let worker = session.spawn_worker(Coordinate::new(1, 0, 1));
        assert_eq!(session.manager().bound_task(worker), None);

        run_tick(&mut session).unwrap();
        assert_eq!(session.manager().bound_task(worker), Some(task_id));
    }

    #[test]
    fn sync_is_flushed_after_credit() {
        let mut session = session();
        session.ledger_mut().credit(&Item::new("stone"), 3);
        let summary = run_tick(&mut session).unwrap();
        let sync = summary.resource_sync.unwrap();
        assert_eq!(sync.items.len(), 1);
        assert!(run_tick(&mut session).unwrap().resource_sync.is_none());
    }
}

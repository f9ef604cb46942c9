//! The per-worker task execution state machine.
//!
//! While [`Behaviour::ExecuteTask`] is in control a worker cycles through
//! its phases:
//!
//! ```text
//! Idle -> SeekingPart -> Moving -> Acting -> SeekingPart -> ... -> Success
//!                          |
//!                          +-- no route --> Failed
//! ```
//!
//! Cells are re-checked against the world when chosen and again on arrival,
//! so cells changed by someone else since the part was pulled are skipped.

use std::fmt;

use tracing::{debug, info, warn};

use colony_ledger::ResourceLedger;
use colony_tasks::{PartOutcome, TaskManager, TaskPart};
use colony_types::{Coordinate, Material, TaskId, WorkItem, WorkerId, WorkerPhase};
use colony_world::{BlockWorld, Navigator};

use crate::behaviour::{Behaviour, BehaviourSelector, Conditions};
use crate::config::WorkerConfig;
use crate::control::{ActionControl, ControlStatus};

/// Everything a worker touches during one tick.
pub struct WorkContext<'a> {
    /// Task registry and bindings.
    pub manager: &'a mut TaskManager,
    /// The block world.
    pub world: &'a mut dyn BlockWorld,
    /// Colony stock.
    pub ledger: &'a mut ResourceLedger,
}

/// One colonist able to execute task parts.
pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    phase: WorkerPhase,
    navigator: Box<dyn Navigator + Send>,
    part: Option<TaskPart>,
    /// Index of the next (or current goal) item within `part`.
    cursor: usize,
    goal: Option<WorkItem>,
    dig: ActionControl,
    place: ActionControl,
    conditions: Conditions,
    selector: BehaviourSelector,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("position", &self.navigator.position())
            .field("behaviour", &self.selector.running())
            .field("goal", &self.goal.as_ref().map(|g| g.pos))
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// A fresh idle worker moving with `navigator`.
    pub fn new(id: WorkerId, navigator: Box<dyn Navigator + Send>, config: WorkerConfig) -> Self {
        Self {
            id,
            phase: WorkerPhase::Idle,
            navigator,
            part: None,
            cursor: 0,
            goal: None,
            dig: ActionControl::new(config.dig_ticks),
            place: ActionControl::new(config.place_ticks),
            conditions: Conditions::default(),
            selector: BehaviourSelector::new(),
            config,
        }
    }

    /// This worker's id.
    pub const fn id(&self) -> WorkerId {
        self.id
    }

    /// Current execution phase.
    pub const fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Where the worker stands.
    pub fn position(&self) -> Coordinate {
        self.navigator.position()
    }

    /// The behaviour in control, if any.
    pub const fn active_behaviour(&self) -> Option<Behaviour> {
        self.selector.running()
    }

    /// The part being executed, if any.
    pub const fn held_part(&self) -> Option<&TaskPart> {
        self.part.as_ref()
    }

    /// The cell currently being approached or worked on.
    pub const fn goal(&self) -> Option<&WorkItem> {
        self.goal.as_ref()
    }

    /// Host-controlled condition flags.
    pub const fn conditions(&self) -> Conditions {
        self.conditions
    }

    /// Replace the condition flags. Takes effect on the next tick.
    pub const fn set_conditions(&mut self, conditions: Conditions) {
        self.conditions = conditions;
    }

    /// Whether the tick loop may offer this worker an unassigned task.
    pub const fn is_available(&self) -> bool {
        matches!(self.phase, WorkerPhase::Idle) && !self.conditions.blocks_task()
    }

    /// Run one tick: select a behaviour, then advance it.
    pub fn tick(&mut self, ctx: &mut WorkContext<'_>) -> WorkerPhase {
        let bound = ctx.manager.bound_task(self.id);
        let conditions = self.conditions;
        let keep = self
            .selector
            .running()
            .is_some_and(|b| self.should_continue(b, bound));

        let transition = self
            .selector
            .select(|b| can_start(conditions, b, bound), keep);
        if let Some(stopped) = transition.stopped {
            self.stop(stopped, ctx);
        }
        if let Some(started) = transition.started {
            self.start(started);
        }
        if transition.is_change() {
            debug!(
                worker_id = %self.id,
                stopped = ?transition.stopped,
                started = ?transition.started,
                "Behaviour changed"
            );
        }

        if self.selector.running() == Some(Behaviour::ExecuteTask) {
            self.execute_tick(ctx);
        }
        self.phase
    }

    // -------------------------------------------------------------------
    // Guards and handlers
    // -------------------------------------------------------------------

    const fn should_continue(&self, behaviour: Behaviour, bound: Option<TaskId>) -> bool {
        match behaviour {
            Behaviour::ExecuteTask => {
                can_start(self.conditions, behaviour, bound)
                    && !matches!(self.phase, WorkerPhase::Success | WorkerPhase::Failed)
            }
            other => self.conditions.wants(other),
        }
    }

    fn start(&mut self, behaviour: Behaviour) {
        if behaviour == Behaviour::ExecuteTask {
            // A suspended part keeps its cursor; the goal is re-validated.
            self.phase = WorkerPhase::SeekingPart;
        }
    }

    fn stop(&mut self, behaviour: Behaviour, ctx: &WorkContext<'_>) {
        if behaviour != Behaviour::ExecuteTask {
            return;
        }
        self.reset_controls();

        if self.holds_live_part(ctx.manager) {
            self.phase = WorkerPhase::SeekingPart;
            info!(worker_id = %self.id, "Task execution suspended");
        } else {
            self.drop_part();
            self.phase = WorkerPhase::Idle;
        }
    }

    // -------------------------------------------------------------------
    // Task execution
    // -------------------------------------------------------------------

    fn execute_tick(&mut self, ctx: &mut WorkContext<'_>) {
        if ctx.manager.bound_task(self.id).is_none() {
            self.reset_controls();
            self.drop_part();
            self.phase = WorkerPhase::Idle;
            return;
        }
        if self.part.is_some() && !self.holds_live_part(ctx.manager) {
            debug!(worker_id = %self.id, "Held part no longer valid, dropping it");
            self.reset_controls();
            self.drop_part();
            self.phase = WorkerPhase::SeekingPart;
        }

        match self.phase {
            WorkerPhase::Moving => self.move_tick(ctx),
            WorkerPhase::Acting => self.act_tick(ctx),
            WorkerPhase::Idle
            | WorkerPhase::SeekingPart
            | WorkerPhase::Success
            | WorkerPhase::Failed => self.seek(ctx),
        }
    }

    /// Find the next usable cell, pulling parts as needed.
    fn seek(&mut self, ctx: &mut WorkContext<'_>) {
        self.phase = WorkerPhase::SeekingPart;
        loop {
            if ctx.manager.bound_task(self.id).is_none() {
                self.phase = WorkerPhase::Success;
                return;
            }
            if self.part.is_none() {
                let Some(part) = ctx.manager.pull_part(self.id) else {
                    ctx.manager.release_worker(self.id);
                    self.phase = WorkerPhase::Success;
                    info!(worker_id = %self.id, "No parts left, worker released");
                    return;
                };
                self.part = Some(part);
                self.cursor = 0;
            }

            if let Some(item) = self.next_usable_item(&*ctx.world) {
                self.begin_goal(item, ctx);
                return;
            }
            self.report(PartOutcome::Success, ctx);
        }
    }

    fn move_tick(&mut self, ctx: &mut WorkContext<'_>) {
        if !self.navigator.has_reached_goal() {
            self.navigator.tick(&*ctx.world);
            if self.navigator.is_path_unreachable() {
                self.fail(ctx);
                return;
            }
            if !self.navigator.has_reached_goal() {
                return;
            }
        }

        let Some(goal) = self.goal.take() else {
            self.seek(ctx);
            return;
        };
        if !is_usable(&*ctx.world, &goal) {
            debug!(worker_id = %self.id, pos = %goal.pos, "Goal changed on arrival, skipping");
            self.advance();
            self.seek(ctx);
            return;
        }
        self.navigator.reset();
        if goal.material.is_empty() {
            self.dig.start(goal.clone());
        } else {
            self.place.start(goal.clone());
        }
        self.goal = Some(goal);
        self.phase = WorkerPhase::Acting;
    }

    fn act_tick(&mut self, ctx: &mut WorkContext<'_>) {
        let status = if self.dig.is_busy() {
            self.dig.tick()
        } else {
            self.place.tick()
        };
        match status {
            ControlStatus::Working => return,
            ControlStatus::Idle => {
                self.seek(ctx);
                return;
            }
            ControlStatus::Done => {}
        }

        let finished = self.dig.take_done().or_else(|| self.place.take_done());
        if let (Some(item), Some(task_id)) = (finished, self.part.as_ref().map(|p| p.task_id)) {
            self.apply(task_id, item, ctx);
        }
        self.advance();
        self.seek(ctx);
    }

    /// Perform a finished dig or placement on the world.
    fn apply(&self, task_id: TaskId, item: WorkItem, ctx: &mut WorkContext<'_>) {
        if !is_usable(&*ctx.world, &item) {
            debug!(worker_id = %self.id, pos = %item.pos, "Cell changed during action, skipping");
            return;
        }

        if item.material.is_empty() {
            let dug = ctx.world.material_at(item.pos);
            if let Err(e) = ctx.world.set_material(item.pos, Material::empty()) {
                warn!(worker_id = %self.id, pos = %item.pos, error = %e, "Dig failed");
                return;
            }
            if let Some(yielded) = dug.item().filter(|_| self.config.credit_dug_items) {
                ctx.ledger.credit(&yielded, 1);
            }
            return;
        }

        let consumed = item.item.as_ref().map_or(Ok(()), |needed| {
            ctx.manager.consume_for_cell(task_id, needed, ctx.ledger)
        });
        if let Err(e) = consumed {
            warn!(
                worker_id = %self.id,
                task_id = %task_id,
                pos = %item.pos,
                error = %e,
                "No reserved material left, cell skipped"
            );
            return;
        }
        let pos = item.pos;
        match ctx.world.set_material(pos, item.material.clone()) {
            Ok(()) => ctx.manager.record_placed(task_id, pos, item.material),
            Err(e) => warn!(worker_id = %self.id, pos = %pos, error = %e, "Placement failed"),
        }
    }

    fn begin_goal(&mut self, item: WorkItem, ctx: &mut WorkContext<'_>) {
        self.navigator.try_set_goal(&*ctx.world, item.pos);
        self.goal = Some(item);
        if self.navigator.is_path_unreachable() {
            self.fail(ctx);
            return;
        }
        self.phase = WorkerPhase::Moving;
    }

    /// Give up on the held part. The manager returns it to the task queue
    /// and unbinds this worker.
    fn fail(&mut self, ctx: &mut WorkContext<'_>) {
        warn!(
            worker_id = %self.id,
            goal = ?self.goal.as_ref().map(|g| g.pos),
            "Goal unreachable, part failed"
        );
        self.reset_controls();
        if self.part.is_some() {
            self.report(PartOutcome::Failed, ctx);
        }
        self.phase = WorkerPhase::Failed;
    }

    fn report(&mut self, outcome: PartOutcome, ctx: &mut WorkContext<'_>) {
        self.drop_part();
        if let Err(e) =
            ctx.manager
                .report_part_outcome(self.id, outcome, &mut *ctx.world, &mut *ctx.ledger)
        {
            debug!(worker_id = %self.id, error = %e, "Part outcome not recorded");
        }
    }

    fn next_usable_item(&mut self, world: &dyn BlockWorld) -> Option<WorkItem> {
        let part = self.part.as_ref()?;
        while let Some(item) = part.items.get(self.cursor) {
            if is_usable(world, item) {
                return Some(item.clone());
            }
            debug!(worker_id = %self.id, pos = %item.pos, "Stale cell skipped");
            self.cursor = self.cursor.saturating_add(1);
        }
        None
    }

    fn holds_live_part(&self, manager: &TaskManager) -> bool {
        let Some(part) = &self.part else {
            return false;
        };
        manager
            .binding(self.id)
            .is_some_and(|b| b.task_id == Some(part.task_id) && b.held.is_some())
    }

    const fn advance(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
    }

    fn drop_part(&mut self) {
        self.part = None;
        self.cursor = 0;
    }

    fn reset_controls(&mut self) {
        self.navigator.reset();
        self.dig.reset();
        self.place.reset();
        self.goal = None;
    }
}

/// Start guard of each behaviour.
const fn can_start(conditions: Conditions, behaviour: Behaviour, bound: Option<TaskId>) -> bool {
    match behaviour {
        Behaviour::ExecuteTask => bound.is_some() && !conditions.blocks_task(),
        other => conditions.wants(other),
    }
}

/// Whether the world still needs this item done.
fn is_usable(world: &dyn BlockWorld, item: &WorkItem) -> bool {
    if item.material.is_empty() {
        world.can_remove_at(item.pos)
    } else {
        world.can_place_at(item.pos, &item.material)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_ledger::ConservationResult;
    use colony_tasks::{TaskEvent, TaskRequest, TaskSettings, TaskTarget};
    use colony_types::{Item, Region};
    use colony_world::{GridNavigator, GridWorld};

    use super::*;

    struct Harness {
        manager: TaskManager,
        world: GridWorld,
        ledger: ResourceLedger,
        worker: Worker,
    }

    impl Harness {
        fn new(bounds: Region, start: Coordinate) -> Self {
            let config = WorkerConfig {
                dig_ticks: 1,
                place_ticks: 1,
                reach: 1,
                speed: 1,
                credit_dug_items: true,
            };
            let id = WorkerId::new();
            let mut manager = TaskManager::new(TaskSettings::default());
            manager.register_worker(id);
            let navigator = GridNavigator::new(start, config.reach, config.speed);
            Self {
                manager,
                world: GridWorld::new(bounds),
                ledger: ResourceLedger::with_default_tools(),
                worker: Worker::new(id, Box::new(navigator), config),
            }
        }

        fn open() -> Self {
            Self::new(
                Region::new(Coordinate::new(-8, 0, -8), Coordinate::new(8, 4, 8)),
                Coordinate::ZERO,
            )
        }

        fn tick(&mut self) -> WorkerPhase {
            let mut ctx = WorkContext {
                manager: &mut self.manager,
                world: &mut self.world,
                ledger: &mut self.ledger,
            };
            self.worker.tick(&mut ctx)
        }

        fn run_until_idle(&mut self, limit: usize) {
            for _ in 0..limit {
                let phase = self.tick();
                if self.manager.task_count() == 0 && phase == WorkerPhase::Idle {
                    return;
                }
            }
            panic!("worker did not finish within {limit} ticks");
        }
    }

    #[test]
    fn digs_region_and_credits_blocks() {
        let mut h = Harness::open();
        let region = Region::new(Coordinate::new(3, 0, 0), Coordinate::new(4, 1, 0));
        h.world.fill(region, &Material::block("stone"));
        let request = TaskRequest::remove(
            TaskId::new(),
            TaskTarget::Region(region),
            vec![h.worker.id()],
        );
        h.manager.submit(request, &mut h.ledger).unwrap();

        h.run_until_idle(200);

        assert_eq!(h.world.solid_count(), 0);
        assert_eq!(h.ledger.pool_amount(&Item::new("stone")), 4);
        assert!(matches!(
            h.manager.drain_events().as_slice(),
            [TaskEvent::Completed(_)]
        ));
        assert_eq!(h.worker.held_part(), None);
    }

    #[test]
    fn places_cells_and_consumes_reservation() {
        let mut h = Harness::open();
        let planks = Item::new("planks");
        h.ledger.credit(&planks, 5);
        let cells = vec![
            Coordinate::new(2, 0, 2),
            Coordinate::new(3, 0, 2),
            Coordinate::new(4, 0, 2),
        ];
        let request = TaskRequest::place(
            TaskId::new(),
            TaskTarget::Coordinates(cells.clone()),
            Material::block("planks"),
            Vec::new(),
        );
        let task_id = h.manager.submit(request, &mut h.ledger).unwrap();
        assert_eq!(h.ledger.pool_amount(&planks), 2);

        h.run_until_idle(200);

        for pos in cells {
            assert_eq!(h.world.material_at(pos), Material::block("planks"));
        }
        assert_eq!(h.ledger.pool_amount(&planks), 2);
        assert_eq!(h.ledger.reserved_amount(task_id, &planks), 0);
        assert!(h.ledger.verify_conservation(1).is_balanced());
    }

    #[test]
    fn stale_cells_are_skipped_and_surplus_returned() {
        let mut h = Harness::open();
        let planks = Item::new("planks");
        h.ledger.credit(&planks, 2);
        let done = Coordinate::new(2, 0, 0);
        h.world.set_material(done, Material::block("planks")).unwrap();
        let request = TaskRequest::place(
            TaskId::new(),
            TaskTarget::Coordinates(vec![done, Coordinate::new(3, 0, 0)]),
            Material::block("planks"),
            vec![h.worker.id()],
        );
        h.manager.submit(request, &mut h.ledger).unwrap();

        h.run_until_idle(200);

        assert_eq!(h.world.material_at(Coordinate::new(3, 0, 0)), Material::block("planks"));
        assert_eq!(h.ledger.pool_amount(&planks), 1);
        assert!(matches!(
            h.ledger.verify_conservation(2),
            ConservationResult::Balanced
        ));
        let events = h.manager.drain_events();
        let [TaskEvent::Completed(completion)] = events.as_slice() else {
            panic!("expected one completion, got {events:?}");
        };
        assert_eq!(
            completion.built,
            vec![(Coordinate::new(3, 0, 0), Material::block("planks"))]
        );
    }

    #[test]
    fn unreachable_goal_fails_task() {
        // A one-cell-wide corridor blocked by a wall.
        let mut h = Harness::new(
            Region::new(Coordinate::ZERO, Coordinate::new(6, 0, 0)),
            Coordinate::ZERO,
        );
        h.world
            .set_material(Coordinate::new(1, 0, 0), Material::block("bedrock"))
            .unwrap();
        let stone = Item::new("stone");
        h.ledger.credit(&stone, 1);
        let request = TaskRequest::place(
            TaskId::new(),
            TaskTarget::Coordinates(vec![Coordinate::new(5, 0, 0)]),
            Material::block("stone"),
            vec![h.worker.id()],
        );
        let task_id = h.manager.submit(request, &mut h.ledger).unwrap();

        assert_eq!(h.tick(), WorkerPhase::Failed);
        assert!(!h.manager.contains_task(task_id));
        assert_eq!(h.ledger.pool_amount(&stone), 1);
        assert!(matches!(
            h.manager.drain_events().as_slice(),
            [TaskEvent::Failed(id)] if *id == task_id
        ));
        assert_eq!(h.tick(), WorkerPhase::Idle);
        assert_eq!(h.worker.active_behaviour(), None);
    }

    #[test]
    fn cancelled_task_drops_part() {
        let mut h = Harness::open();
        h.ledger.credit(&Item::new("stone"), 4);
        let request = TaskRequest::place(
            TaskId::new(),
            TaskTarget::Region(Region::new(Coordinate::new(6, 0, 6), Coordinate::new(7, 0, 7))),
            Material::block("stone"),
            vec![h.worker.id()],
        );
        let task_id = h.manager.submit(request, &mut h.ledger).unwrap();

        assert_eq!(h.tick(), WorkerPhase::Moving);
        assert!(h.worker.held_part().is_some());
        h.manager.cancel(task_id, &mut h.ledger).unwrap();

        assert_eq!(h.tick(), WorkerPhase::Idle);
        assert_eq!(h.worker.held_part(), None);
        assert_eq!(h.world.solid_count(), 0);
        assert_eq!(h.ledger.pool_amount(&Item::new("stone")), 4);
    }

    #[test]
    fn starving_suspends_and_resumes_task() {
        let mut h = Harness::open();
        let planks = Item::new("planks");
        h.ledger.credit(&planks, 2);
        let request = TaskRequest::place(
            TaskId::new(),
            TaskTarget::Coordinates(vec![Coordinate::new(5, 0, 5), Coordinate::new(6, 0, 5)]),
            Material::block("planks"),
            vec![h.worker.id()],
        );
        let task_id = h.manager.submit(request, &mut h.ledger).unwrap();
        h.tick();
        assert_eq!(h.worker.active_behaviour(), Some(Behaviour::ExecuteTask));

        h.worker.set_conditions(Conditions {
            starving: true,
            ..Conditions::default()
        });
        h.tick();
        assert_eq!(h.worker.active_behaviour(), Some(Behaviour::Eat));
        assert!(h.worker.held_part().is_some());
        assert_eq!(h.worker.goal(), None);
        assert_eq!(h.manager.bound_task(h.worker.id()), Some(task_id));

        h.worker.set_conditions(Conditions::default());
        h.run_until_idle(200);
        assert_eq!(h.world.solid_count(), 2);
    }

    #[test]
    fn fleeing_preempts_task() {
        let mut h = Harness::open();
        let request = TaskRequest::remove(
            TaskId::new(),
            TaskTarget::Coordinates(vec![Coordinate::new(4, 0, 0)]),
            vec![h.worker.id()],
        );
        h.world
            .set_material(Coordinate::new(4, 0, 0), Material::block("stone"))
            .unwrap();
        h.manager.submit(request, &mut h.ledger).unwrap();
        h.tick();

        h.worker.set_conditions(Conditions {
            scared: true,
            ..Conditions::default()
        });
        h.tick();
        assert_eq!(h.worker.active_behaviour(), Some(Behaviour::Flee));
        assert!(!h.worker.is_available());
    }
}

//! The task manager: registry of live tasks and worker bindings.
//!
//! Assignment is pull-based. A submitted task is bound to a set of workers;
//! each bound worker pulls parts from it until none remain. The manager
//! reconciles the ledger on every terminal transition:
//!
//! | Transition | Ledger |
//! |------------|--------|
//! | `Completed` | surplus reservation returned |
//! | `Cancelled` | reservation returned, plus any pre-reserved follow-up |
//! | `Failed` | reservation returned, plus any pre-reserved follow-up |
//!
//! Terminal tasks leave the registry immediately. Workers bound to them see
//! an empty binding on their next tick.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use colony_ledger::ResourceLedger;
use colony_types::{
    Coordinate, Item, Material, TaskId, TaskKind, TaskProgress, TaskStatus, WorkerId,
};
use colony_world::BlockWorld;

use crate::error::TaskError;
use crate::part::{PartRegion, TaskPart};
use crate::request::{PartOutcome, TaskRequest, TaskSettings};
use crate::task::{FinishListener, Task, TaskCompletion};

/// A worker's current assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerBinding {
    /// The task the worker pulls from.
    pub task_id: Option<TaskId>,
    /// The part the worker is executing.
    pub held: Option<PartRegion>,
}

/// Something that happened to a task, drained by the tick loop.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Every part finished.
    Completed(TaskCompletion),
    /// The last bound worker failed.
    Failed(TaskId),
    /// Removed by request.
    Cancelled(TaskId),
}

/// Registry of live tasks and worker bindings.
#[derive(Debug, Default)]
pub struct TaskManager {
    settings: TaskSettings,
    tasks: BTreeMap<TaskId, Task>,
    workers: BTreeMap<WorkerId, WorkerBinding>,
    /// Parent task -> follow-up whose materials are already reserved.
    chained: BTreeMap<TaskId, TaskId>,
    events: Vec<TaskEvent>,
}

impl TaskManager {
    /// Create an empty manager.
    pub fn new(settings: TaskSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------
    // Workers
    // -------------------------------------------------------------------

    /// Register a worker. Registering twice keeps the existing binding.
    pub fn register_worker(&mut self, worker_id: WorkerId) {
        self.workers.entry(worker_id).or_default();
    }

    /// Remove a worker that left the colony. Its held part goes back to
    /// the task queue and is returned here.
    pub fn remove_worker(&mut self, worker_id: WorkerId) -> Option<PartRegion> {
        let binding = self.workers.remove(&worker_id)?;
        let (Some(task_id), Some(region)) = (binding.task_id, binding.held) else {
            return None;
        };
        let task = self.tasks.get_mut(&task_id)?;
        task.return_part(region.clone());
        warn!(worker_id = %worker_id, task_id = %task_id, "Worker lost, part returned");
        Some(region)
    }

    /// The worker's binding.
    pub fn binding(&self, worker_id: WorkerId) -> Option<&WorkerBinding> {
        self.workers.get(&worker_id)
    }

    /// The task the worker is bound to.
    pub fn bound_task(&self, worker_id: WorkerId) -> Option<TaskId> {
        self.workers.get(&worker_id).and_then(|b| b.task_id)
    }

    /// Registered workers, in id order.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.keys().copied().collect()
    }

    /// Bind an idle worker to the oldest task that has no bound workers.
    pub fn claim_unassigned(&mut self, worker_id: WorkerId) -> Option<TaskId> {
        if self.bound_task(worker_id).is_some() || !self.workers.contains_key(&worker_id) {
            return None;
        }
        let task_id = self
            .tasks
            .values()
            .filter(|task| task.has_available_parts())
            .map(Task::id)
            .find(|id| self.bound_workers(*id) == 0)?;
        self.bind(worker_id, task_id);
        info!(worker_id = %worker_id, task_id = %task_id, "Worker claimed unassigned task");
        Some(task_id)
    }

    /// Unbind a worker whose task ran out of parts.
    pub fn release_worker(&mut self, worker_id: WorkerId) {
        if let Some(binding) = self.workers.get_mut(&worker_id) {
            if binding.held.is_none() {
                binding.task_id = None;
            }
        }
    }

    // -------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------

    /// Validate a request, reserve its materials and register the task.
    ///
    /// Nothing changes when the request is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::DuplicateTask`], [`TaskError::EmptyRegion`],
    /// [`TaskError::UnknownWorker`] or [`TaskError::Ledger`] if the pool
    /// cannot cover the materials.
    pub fn submit(
        &mut self,
        request: TaskRequest,
        ledger: &mut ResourceLedger,
    ) -> Result<TaskId, TaskError> {
        let task = self.prepare(&request)?;
        ledger.reserve(task.id(), &task.requirements())?;
        Ok(self.register(request, task))
    }

    /// Register a prepared task and bind its workers.
    fn register(&mut self, request: TaskRequest, task: Task) -> TaskId {
        let task_id = task.id();
        let parts = task.total_parts();
        self.tasks.insert(task_id, task);

        let workers: Vec<WorkerId> = if request.workers.is_empty() {
            self.workers
                .iter()
                .filter(|(_, binding)| binding.task_id.is_none())
                .map(|(id, _)| *id)
                .collect()
        } else {
            request.workers
        };
        for worker_id in &workers {
            self.rebind(*worker_id, task_id);
        }

        info!(
            task_id = %task_id,
            kind = ?request.kind,
            parts,
            workers = workers.len(),
            "Task submitted"
        );
        task_id
    }

    /// Submit a chain's build task, whose materials were reserved when the
    /// chain was accepted.
    fn release_chained(
        &mut self,
        request: TaskRequest,
        ledger: &mut ResourceLedger,
    ) -> Result<TaskId, TaskError> {
        let task_id = request.task_id;
        match self.prepare(&request) {
            Ok(task) => Ok(self.register(request, task)),
            Err(e) => {
                ledger.return_all(task_id);
                Err(e)
            }
        }
    }

    /// Submit a dig task followed by a build task over the same cells.
    ///
    /// The build's materials are reserved up front so the pair is accepted
    /// or rejected as a whole. The build task is released when the dig task
    /// completes.
    ///
    /// # Errors
    ///
    /// Returns the first error of either request; nothing is reserved or
    /// registered in that case.
    pub fn submit_chain(
        &mut self,
        remove: TaskRequest,
        build: TaskRequest,
        ledger: &mut ResourceLedger,
    ) -> Result<TaskId, TaskError> {
        if remove.task_id == build.task_id {
            return Err(TaskError::DuplicateTask(build.task_id));
        }
        let build_task = self.prepare(&build)?;
        let build_id = build.task_id;
        ledger.reserve(build_id, &build_task.requirements())?;

        let remove_id = match self.submit(remove, ledger) {
            Ok(id) => id,
            Err(e) => {
                ledger.return_all(build_id);
                return Err(e);
            }
        };

        self.chained.insert(remove_id, build_id);
        self.add_finish_listener(remove_id, Box::new(move |_| Some(build)))?;
        debug!(remove_id = %remove_id, build_id = %build_id, "Task chain submitted");
        Ok(remove_id)
    }

    /// Attach a completion callback to a live task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] if the task is not live.
    pub fn add_finish_listener(
        &mut self,
        task_id: TaskId,
        listener: FinishListener,
    ) -> Result<(), TaskError> {
        self.tasks
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?
            .add_finish_listener(listener);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------

    /// Hand the worker the next part of its bound task.
    ///
    /// Returns `None` when the worker is unbound, already holds a part, or
    /// the task has no parts left.
    pub fn pull_part(&mut self, worker_id: WorkerId) -> Option<TaskPart> {
        let binding = self.workers.get_mut(&worker_id)?;
        if binding.held.is_some() {
            return None;
        }
        let task = self.tasks.get_mut(&binding.task_id?)?;
        let part = task.get_next_part()?;
        binding.held = Some(part.region.clone());
        debug!(
            worker_id = %worker_id,
            task_id = %part.task_id,
            items = part.items.len(),
            "Part pulled"
        );
        Some(part)
    }

    /// Whether the task has parts waiting to be pulled.
    pub fn has_available_parts(&self, task_id: TaskId) -> bool {
        self.tasks.get(&task_id).is_some_and(Task::has_available_parts)
    }

    /// Kind of a live task.
    pub fn task_kind(&self, task_id: TaskId) -> Option<TaskKind> {
        self.tasks.get(&task_id).map(Task::kind)
    }

    /// Record how the worker's held part ended.
    ///
    /// On success the part counts as finished and the task may complete.
    /// On failure the part goes back to the queue and the worker is
    /// unbound; if no bound workers remain, the task fails.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownWorker`] or [`TaskError::NoHeldPart`].
    pub fn report_part_outcome(
        &mut self,
        worker_id: WorkerId,
        outcome: PartOutcome,
        world: &mut dyn BlockWorld,
        ledger: &mut ResourceLedger,
    ) -> Result<(), TaskError> {
        let binding = self
            .workers
            .get_mut(&worker_id)
            .ok_or(TaskError::UnknownWorker(worker_id))?;
        let region = binding.held.take().ok_or(TaskError::NoHeldPart(worker_id))?;
        let Some(task_id) = binding.task_id else {
            return Ok(());
        };
        let Some(task) = self.tasks.get_mut(&task_id) else {
            // Cancelled while the part was in flight.
            return Ok(());
        };

        match outcome {
            PartOutcome::Success => {
                if let Some(completion) = task.finish_part(world, ledger) {
                    self.complete(completion, ledger);
                }
            }
            PartOutcome::Failed => {
                task.return_part(region);
                if let Some(binding) = self.workers.get_mut(&worker_id) {
                    binding.task_id = None;
                }
                warn!(worker_id = %worker_id, task_id = %task_id, "Part failed, worker unbound");
                if self.bound_workers(task_id) == 0 {
                    self.terminate(task_id, TaskStatus::Failed, ledger);
                }
            }
        }
        Ok(())
    }

    /// Use one reserved unit for a placed cell.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Ledger`] if the reservation is exhausted.
    pub fn consume_for_cell(
        &self,
        task_id: TaskId,
        item: &Item,
        ledger: &mut ResourceLedger,
    ) -> Result<(), TaskError> {
        Ok(ledger.consume_one(task_id, item)?)
    }

    /// Note a cell a worker wrote for `task_id`. Unknown tasks are ignored.
    pub fn record_placed(&mut self, task_id: TaskId, pos: Coordinate, material: Material) {
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.record_placed(pos, material);
        }
    }

    /// Cancel a live task. Placed cells stay; reservations are returned.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] if the task is not live.
    pub fn cancel(&mut self, task_id: TaskId, ledger: &mut ResourceLedger) -> Result<(), TaskError> {
        if !self.tasks.contains_key(&task_id) {
            return Err(TaskError::UnknownTask(task_id));
        }
        self.terminate(task_id, TaskStatus::Cancelled, ledger);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Progress of every live task.
    pub fn progress(&self) -> Vec<TaskProgress> {
        self.tasks.values().map(Task::progress).collect()
    }

    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the task is live.
    pub fn contains_task(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    /// Take every event recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<TaskEvent> {
        core::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn prepare(&self, request: &TaskRequest) -> Result<Task, TaskError> {
        let id = request.task_id;
        if self.tasks.contains_key(&id) || self.chained.values().any(|child| *child == id) {
            return Err(TaskError::DuplicateTask(id));
        }
        if let Some(unknown) = request
            .workers
            .iter()
            .find(|id| !self.workers.contains_key(id))
        {
            return Err(TaskError::UnknownWorker(*unknown));
        }
        Task::new(request, &self.settings)
    }

    fn bound_workers(&self, task_id: TaskId) -> usize {
        self.workers
            .values()
            .filter(|b| b.task_id == Some(task_id))
            .count()
    }

    fn bind(&mut self, worker_id: WorkerId, task_id: TaskId) {
        if let Some(binding) = self.workers.get_mut(&worker_id) {
            binding.task_id = Some(task_id);
        }
    }

    /// Move a worker to a new task. A part it held for another task goes
    /// back to that task's queue.
    fn rebind(&mut self, worker_id: WorkerId, task_id: TaskId) {
        let Some(binding) = self.workers.get_mut(&worker_id) else {
            return;
        };
        let Some(previous) = binding.task_id.replace(task_id).filter(|p| *p != task_id) else {
            return;
        };
        let held = binding.held.take();
        if let (Some(region), Some(task)) = (held, self.tasks.get_mut(&previous)) {
            task.return_part(region);
        }
        debug!(worker_id = %worker_id, from = %previous, to = %task_id, "Worker reassigned");
    }

    fn complete(&mut self, completion: TaskCompletion, ledger: &mut ResourceLedger) {
        let task_id = completion.task_id;
        self.tasks.remove(&task_id);
        let chained_child = self.chained.remove(&task_id);
        let surplus = ledger.return_all(task_id);
        if !surplus.is_empty() {
            debug!(task_id = %task_id, stacks = surplus.len(), "Surplus reservation returned");
        }
        self.unbind_all(task_id);

        for followup in completion.followups.clone() {
            let followup_id = followup.task_id;
            let result = if chained_child == Some(followup_id) {
                self.release_chained(followup, ledger)
            } else {
                self.submit(followup, ledger)
            };
            if let Err(e) = result {
                warn!(task_id = %followup_id, error = %e, "Follow-up task rejected");
            }
        }
        self.events.push(TaskEvent::Completed(completion));
    }

    fn terminate(&mut self, task_id: TaskId, status: TaskStatus, ledger: &mut ResourceLedger) {
        let Some(mut task) = self.tasks.remove(&task_id) else {
            return;
        };
        task.set_status(status);
        let returned = ledger.return_all(task_id);
        if let Some(child) = self.chained.remove(&task_id) {
            ledger.return_all(child);
        }
        self.unbind_all(task_id);

        info!(
            task_id = %task_id,
            status = ?status,
            completed_parts = task.completed_parts(),
            total_parts = task.total_parts(),
            returned = returned.len(),
            "Task ended"
        );
        self.events.push(match status {
            TaskStatus::Cancelled => TaskEvent::Cancelled(task_id),
            _ => TaskEvent::Failed(task_id),
        });
    }

    fn unbind_all(&mut self, task_id: TaskId) {
        for binding in self.workers.values_mut() {
            if binding.task_id == Some(task_id) {
                binding.task_id = None;
                binding.held = None;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use colony_blueprint::{StructureTemplate, TemplateBlock, build_layers};
    use colony_ledger::LedgerError;
    use colony_types::{Coordinate, Material, Region, ResourceStack};
    use colony_world::GridWorld;

    use super::*;
    use crate::request::TaskTarget;

    fn world() -> GridWorld {
        GridWorld::new(Region::new(
            Coordinate::new(-16, -4, -16),
            Coordinate::new(16, 16, 16),
        ))
    }

    fn ledger(entries: &[(&str, u32)]) -> ResourceLedger {
        let mut ledger = ResourceLedger::with_default_tools();
        for (name, amount) in entries {
            ledger.credit(&Item::new(*name), *amount);
        }
        ledger
    }

    fn manager_with_worker() -> (TaskManager, WorkerId) {
        let mut manager = TaskManager::new(TaskSettings::default());
        let worker = WorkerId::new();
        manager.register_worker(worker);
        (manager, worker)
    }

    /// Place every item of the part the way a worker would.
    fn work_part(
        manager: &mut TaskManager,
        part: &TaskPart,
        world: &mut GridWorld,
        ledger: &mut ResourceLedger,
    ) {
        for item in &part.items {
            if let Some(consumed) = &item.item {
                manager.consume_for_cell(part.task_id, consumed, ledger).unwrap();
            }
            world.set_material(item.pos, item.material.clone()).unwrap();
            manager.record_placed(part.task_id, item.pos, item.material.clone());
        }
    }

    fn plank_row(len: i32) -> TaskTarget {
        TaskTarget::Region(Region::new(
            Coordinate::new(0, 0, 0),
            Coordinate::new(len - 1, 0, 0),
        ))
    }

    #[test]
    fn end_to_end_planks_with_entity_batch() {
        let planks = Item::new("oak_planks");
        let mut ledger = ledger(&[("oak_planks", 10), ("chest", 1)]);
        let mut world = world();
        let (mut manager, worker) = manager_with_worker();

        // Four planks on the floor, a chest on top of one of them.
        let mut blocks: Vec<TemplateBlock> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .into_iter()
            .map(|(x, z)| TemplateBlock {
                pos: Coordinate::new(x, 0, z),
                material: Material::block("oak_planks"),
            })
            .collect();
        blocks.push(TemplateBlock {
            pos: Coordinate::new(0, 1, 0),
            material: Material::with_entity("chest"),
        });
        let template = StructureTemplate {
            size: Coordinate::new(2, 2, 2),
            blocks,
        };
        let data = Arc::new(build_layers(&template, 0));
        let origin = Coordinate::new(4, 0, 4);
        let task_id = TaskId::new();

        manager
            .submit(TaskRequest::blueprint(task_id, origin, data, vec![worker]), &mut ledger)
            .unwrap();
        assert_eq!(ledger.pool_amount(&planks), 6);
        assert_eq!(ledger.reserved_amount(task_id, &planks), 4);

        let part = manager.pull_part(worker).unwrap();
        assert_eq!(part.items.len(), 4);
        work_part(&mut manager, &part, &mut world, &mut ledger);
        assert_eq!(ledger.reserved_amount(task_id, &planks), 0);
        // The chest is not placed by hand.
        assert!(world.material_at(origin.offset(0, 1, 0)).is_empty());

        manager
            .report_part_outcome(worker, PartOutcome::Success, &mut world, &mut ledger)
            .unwrap();

        assert!(!manager.contains_task(task_id));
        assert_eq!(world.material_at(origin.offset(0, 1, 0)), Material::with_entity("chest"));
        assert!(!ledger.has_reservation(task_id));
        assert_eq!(ledger.pool_amount(&planks), 6);
        assert_eq!(manager.bound_task(worker), None);
        assert!(ledger.verify_conservation(1).is_balanced());

        let events = manager.drain_events();
        let [TaskEvent::Completed(completion)] = events.as_slice() else {
            panic!("expected one completion, got {events:?}");
        };
        assert_eq!(completion.built.len(), 5);
    }

    #[test]
    fn cancel_mid_flight_returns_pending_reservation() {
        let planks = Item::new("oak_planks");
        let mut ledger = ledger(&[("oak_planks", 10)]);
        let mut world = world();
        let (mut manager, worker) = manager_with_worker();
        let task_id = TaskId::new();

        manager
            .submit(
                TaskRequest::place(task_id, plank_row(6), Material::block("oak_planks"), vec![worker]),
                &mut ledger,
            )
            .unwrap();
        assert_eq!(ledger.pool_amount(&planks), 4);

        let part = manager.pull_part(worker).unwrap();
        work_part(&mut manager, &part, &mut world, &mut ledger);
        manager
            .report_part_outcome(worker, PartOutcome::Success, &mut world, &mut ledger)
            .unwrap();
        assert!(manager.contains_task(task_id));

        manager.cancel(task_id, &mut ledger).unwrap();
        assert_eq!(ledger.pool_amount(&planks), 7);
        for x in 0..3 {
            assert_eq!(
                world.material_at(Coordinate::new(x, 0, 0)),
                Material::block("oak_planks")
            );
        }
        assert!(world.material_at(Coordinate::new(3, 0, 0)).is_empty());
        assert_eq!(manager.bound_task(worker), None);
        assert!(matches!(
            manager.drain_events().as_slice(),
            [TaskEvent::Cancelled(id)] if *id == task_id
        ));
    }

    #[test]
    fn rejected_submission_creates_no_task() {
        let mut ledger = ledger(&[("oak_planks", 2)]);
        let (mut manager, worker) = manager_with_worker();
        let task_id = TaskId::new();
        let result = manager.submit(
            TaskRequest::place(task_id, plank_row(3), Material::block("oak_planks"), vec![worker]),
            &mut ledger,
        );
        assert!(matches!(
            result,
            Err(TaskError::Ledger(LedgerError::ResourceInsufficient { .. }))
        ));
        assert_eq!(manager.task_count(), 0);
        assert_eq!(manager.bound_task(worker), None);
        assert_eq!(ledger.pool_amount(&Item::new("oak_planks")), 2);
    }

    #[test]
    fn duplicate_and_empty_requests_are_rejected() {
        let mut ledger = ledger(&[]);
        let (mut manager, _) = manager_with_worker();
        let task_id = TaskId::new();
        manager
            .submit(TaskRequest::remove(task_id, plank_row(2), Vec::new()), &mut ledger)
            .unwrap();
        assert!(matches!(
            manager.submit(TaskRequest::remove(task_id, plank_row(2), Vec::new()), &mut ledger),
            Err(TaskError::DuplicateTask(_))
        ));
        assert!(matches!(
            manager.submit(
                TaskRequest::remove(TaskId::new(), TaskTarget::Coordinates(Vec::new()), Vec::new()),
                &mut ledger
            ),
            Err(TaskError::EmptyRegion(_))
        ));
    }

    #[test]
    fn empty_worker_list_binds_idle_workers() {
        let mut ledger = ledger(&[]);
        let (mut manager, first) = manager_with_worker();
        let second = WorkerId::new();
        manager.register_worker(second);
        let task_id = TaskId::new();
        manager
            .submit(TaskRequest::remove(task_id, plank_row(2), Vec::new()), &mut ledger)
            .unwrap();
        assert_eq!(manager.bound_task(first), Some(task_id));
        assert_eq!(manager.bound_task(second), Some(task_id));
    }

    #[test]
    fn last_worker_failure_fails_task() {
        let mut ledger = ledger(&[("stone", 5)]);
        let mut world = world();
        let (mut manager, worker) = manager_with_worker();
        let task_id = TaskId::new();
        manager
            .submit(
                TaskRequest::place(task_id, plank_row(3), Material::block("stone"), vec![worker]),
                &mut ledger,
            )
            .unwrap();
        manager.pull_part(worker).unwrap();
        manager
            .report_part_outcome(worker, PartOutcome::Failed, &mut world, &mut ledger)
            .unwrap();

        assert!(!manager.contains_task(task_id));
        assert_eq!(ledger.pool_amount(&Item::new("stone")), 5);
        assert!(matches!(
            manager.drain_events().as_slice(),
            [TaskEvent::Failed(id)] if *id == task_id
        ));
    }

    #[test]
    fn failure_with_other_workers_returns_part_to_back() {
        let mut ledger = ledger(&[]);
        let mut world = world();
        let (mut manager, first) = manager_with_worker();
        let second = WorkerId::new();
        manager.register_worker(second);
        let task_id = TaskId::new();
        manager
            .submit(TaskRequest::remove(task_id, plank_row(9), Vec::new()), &mut ledger)
            .unwrap();

        let failed = manager.pull_part(first).unwrap();
        manager
            .report_part_outcome(first, PartOutcome::Failed, &mut world, &mut ledger)
            .unwrap();
        assert!(manager.contains_task(task_id));
        assert_eq!(manager.bound_task(first), None);

        let next = manager.pull_part(second).unwrap();
        assert_ne!(next.region, failed.region);
        manager
            .report_part_outcome(second, PartOutcome::Success, &mut world, &mut ledger)
            .unwrap();
        let _ = manager.pull_part(second).unwrap();
        manager
            .report_part_outcome(second, PartOutcome::Success, &mut world, &mut ledger)
            .unwrap();
        let last = manager.pull_part(second).unwrap();
        assert_eq!(last.region, failed.region);
    }

    #[test]
    fn lost_worker_returns_held_part_for_others() {
        let mut ledger = ledger(&[]);
        let (mut manager, worker) = manager_with_worker();
        let task_id = TaskId::new();
        manager
            .submit(TaskRequest::remove(task_id, plank_row(2), vec![worker]), &mut ledger)
            .unwrap();
        let part = manager.pull_part(worker).unwrap();

        assert_eq!(manager.remove_worker(worker), Some(part.region.clone()));
        assert!(manager.has_available_parts(task_id));

        let replacement = WorkerId::new();
        manager.register_worker(replacement);
        assert_eq!(manager.claim_unassigned(replacement), Some(task_id));
        assert_eq!(manager.pull_part(replacement).map(|p| p.region), Some(part.region));
    }

    #[test]
    fn chain_releases_build_after_dig() {
        let stone = Item::new("stone");
        let mut ledger = ledger(&[("stone", 3)]);
        let mut world = world();
        world.fill(
            Region::new(Coordinate::new(0, 0, 0), Coordinate::new(2, 0, 0)),
            &Material::block("dirt"),
        );
        let (mut manager, worker) = manager_with_worker();
        let dig_id = TaskId::new();
        let place_id = TaskId::new();

        manager
            .submit_chain(
                TaskRequest::remove(dig_id, plank_row(3), vec![worker]),
                TaskRequest::place(place_id, plank_row(3), Material::block("stone"), Vec::new()),
                &mut ledger,
            )
            .unwrap();
        assert_eq!(ledger.reserved_amount(place_id, &stone), 3);
        assert!(!manager.contains_task(place_id));

        let part = manager.pull_part(worker).unwrap();
        for item in &part.items {
            world.set_material(item.pos, Material::empty()).unwrap();
        }
        manager
            .report_part_outcome(worker, PartOutcome::Success, &mut world, &mut ledger)
            .unwrap();

        assert!(manager.contains_task(place_id));
        assert_eq!(manager.bound_task(worker), Some(place_id));
        assert_eq!(ledger.reserved_amount(place_id, &stone), 3);
        assert_eq!(ledger.pool_amount(&stone), 0);
    }

    #[test]
    fn cancelling_chain_parent_returns_followup_reservation() {
        let stone = Item::new("stone");
        let mut ledger = ledger(&[("stone", 3)]);
        let (mut manager, worker) = manager_with_worker();
        let dig_id = TaskId::new();
        let place_id = TaskId::new();
        manager
            .submit_chain(
                TaskRequest::remove(dig_id, plank_row(3), vec![worker]),
                TaskRequest::place(place_id, plank_row(3), Material::block("stone"), Vec::new()),
                &mut ledger,
            )
            .unwrap();

        manager.cancel(dig_id, &mut ledger).unwrap();
        assert_eq!(ledger.pool_amount(&stone), 3);
        assert!(!ledger.has_reservation(place_id));
    }

    #[test]
    fn chained_build_id_cannot_be_submitted_directly() {
        let stone = Item::new("stone");
        let mut ledger = ledger(&[("stone", 6)]);
        let (mut manager, worker) = manager_with_worker();
        let dig_id = TaskId::new();
        let place_id = TaskId::new();
        manager
            .submit_chain(
                TaskRequest::remove(dig_id, plank_row(3), vec![worker]),
                TaskRequest::place(place_id, plank_row(3), Material::block("stone"), Vec::new()),
                &mut ledger,
            )
            .unwrap();

        let direct = TaskRequest::place(place_id, plank_row(2), Material::block("stone"), Vec::new());
        assert!(matches!(
            manager.submit(direct, &mut ledger),
            Err(TaskError::DuplicateTask(id)) if id == place_id
        ));
        assert!(!manager.contains_task(place_id));
        assert_eq!(ledger.reserved_amount(place_id, &stone), 3);
        assert_eq!(ledger.pool_amount(&stone), 3);

        // Once the chain is gone the id is free and reserves normally.
        manager.cancel(dig_id, &mut ledger).unwrap();
        let direct = TaskRequest::place(place_id, plank_row(2), Material::block("stone"), Vec::new());
        manager.submit(direct, &mut ledger).unwrap();
        assert_eq!(ledger.reserved_amount(place_id, &stone), 2);
        assert_eq!(ledger.pool_amount(&stone), 4);
        assert!(ledger.verify_conservation(1).is_balanced());
    }

    #[test]
    fn chain_rejection_reserves_nothing() {
        let mut ledger = ledger(&[("stone", 2)]);
        let (mut manager, worker) = manager_with_worker();
        let result = manager.submit_chain(
            TaskRequest::remove(TaskId::new(), plank_row(3), vec![worker]),
            TaskRequest::place(TaskId::new(), plank_row(3), Material::block("stone"), Vec::new()),
            &mut ledger,
        );
        assert!(result.is_err());
        assert_eq!(manager.task_count(), 0);
        assert_eq!(ledger.pool_amount(&Item::new("stone")), 2);
        assert!(ledger.verify_conservation(1).is_balanced());
    }

    #[test]
    fn tool_items_need_no_stock() {
        let mut ledger = ledger(&[]);
        let (mut manager, worker) = manager_with_worker();
        let task_id = TaskId::new();
        manager
            .submit(
                TaskRequest::place(task_id, plank_row(2), Material::fluid("water_bucket"), vec![worker]),
                &mut ledger,
            )
            .unwrap();
        let part = manager.pull_part(worker).unwrap();
        for item in &part.items {
            let consumed = item.item.as_ref().unwrap();
            assert!(manager.consume_for_cell(task_id, consumed, &mut ledger).is_ok());
        }
        assert_eq!(ledger.pool_stacks(), Vec::<ResourceStack>::new());
    }
}

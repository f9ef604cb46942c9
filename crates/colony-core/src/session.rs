//! The colony session: one context object owning all engine state.
//!
//! A [`ColonySession`] holds the world, the stock ledger, the task manager,
//! the workers, the blueprint registry and the tracked buildings. Hosts
//! submit work through it and drive it with [`run_tick`](crate::tick::run_tick).

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use colony_blueprint::BlueprintRegistry;
use colony_ledger::ResourceLedger;
use colony_tasks::{TaskCompletion, TaskEvent, TaskManager, TaskRequest};
use colony_types::{
    BuildingId, Coordinate, Material, TaskId, TaskKind, TaskProgress, WorkerId,
};
use colony_workers::{Worker, WorkerConfig};
use colony_world::{BlockWorld, BuildingIntegrity, GridNavigator, GridWorld, IntegrityReport};

use crate::clock::ColonyClock;
use crate::config::ColonyConfig;
use crate::error::CoreError;
use crate::persist::{SaveFile, SavedBlueprint};
use crate::submission::{RoadsSubmission, SubmissionResponse, TaskSubmission};

/// All state of one running colony.
pub struct ColonySession {
    pub(crate) config: ColonyConfig,
    pub(crate) clock: ColonyClock,
    pub(crate) world: Box<dyn BlockWorld + Send>,
    pub(crate) ledger: ResourceLedger,
    pub(crate) manager: TaskManager,
    pub(crate) workers: Vec<Worker>,
    pub(crate) blueprints: BlueprintRegistry,
    pub(crate) buildings: BTreeMap<BuildingId, BuildingIntegrity>,
    /// Repair task -> building it restores.
    pub(crate) repairs: BTreeMap<TaskId, BuildingId>,
}

impl std::fmt::Debug for ColonySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColonySession")
            .field("colony", &self.config.world.name)
            .field("tick", &self.clock.tick())
            .field("tasks", &self.manager.task_count())
            .field("workers", &self.workers.len())
            .field("buildings", &self.buildings.len())
            .finish_non_exhaustive()
    }
}

impl ColonySession {
    /// A fresh colony on an empty grid world sized by the configuration.
    ///
    /// The configured center is protected and the starting resources are
    /// credited.
    pub fn new(config: ColonyConfig) -> Self {
        let mut world = GridWorld::new(config.world.bounds());
        world.protect(config.world.center);
        Self::with_world(config, Box::new(world))
    }

    /// A fresh colony on a host-provided world.
    pub fn with_world(config: ColonyConfig, world: Box<dyn BlockWorld + Send>) -> Self {
        let mut ledger = ResourceLedger::new(config.ledger.tools())
            .with_sync_interval(config.ledger.sync_interval_ticks);
        for stack in config.ledger.starting_stacks() {
            ledger.credit(&stack.item, stack.amount);
        }
        let manager = TaskManager::new(config.tasks.settings());

        info!(
            colony = %config.world.name,
            bounds = ?config.world.bounds(),
            "Colony session created"
        );
        Self {
            config,
            clock: ColonyClock::new(),
            world,
            ledger,
            manager,
            workers: Vec::new(),
            blueprints: BlueprintRegistry::new(),
            buildings: BTreeMap::new(),
            repairs: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// The configuration the session was created with.
    pub const fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// The current tick.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Read access to the world.
    pub fn world(&self) -> &dyn BlockWorld {
        &*self.world
    }

    /// Write access to the world, for host-side changes.
    pub fn world_mut(&mut self) -> &mut dyn BlockWorld {
        &mut *self.world
    }

    /// The colony stock.
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Mutable colony stock, for crediting gathered items.
    pub const fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    /// The task manager.
    pub const fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// The blueprint registry.
    pub const fn blueprints(&self) -> &BlueprintRegistry {
        &self.blueprints
    }

    /// Mutable blueprint registry, for registering and editing templates.
    pub const fn blueprints_mut(&mut self) -> &mut BlueprintRegistry {
        &mut self.blueprints
    }

    /// Every worker, in the order they will be advanced next tick.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// One worker.
    pub fn worker(&self, worker_id: WorkerId) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id() == worker_id)
    }

    /// One worker, mutably (to set its condition flags).
    pub fn worker_mut(&mut self, worker_id: WorkerId) -> Option<&mut Worker> {
        self.workers.iter_mut().find(|w| w.id() == worker_id)
    }

    /// Progress of every live task.
    pub fn progress(&self) -> Vec<TaskProgress> {
        self.manager.progress()
    }

    /// Integrity of every tracked building.
    pub fn building_reports(&self) -> Vec<IntegrityReport> {
        self.buildings.values().map(BuildingIntegrity::report).collect()
    }

    // -------------------------------------------------------------------
    // Workers
    // -------------------------------------------------------------------

    /// Add a worker standing at `position`.
    pub fn spawn_worker(&mut self, position: Coordinate) -> WorkerId {
        let config: WorkerConfig = self.config.workers.worker_config();
        let navigator = GridNavigator::new(position, config.reach, config.speed);
        let worker_id = WorkerId::new();
        self.manager.register_worker(worker_id);
        self.workers
            .push(Worker::new(worker_id, Box::new(navigator), config));
        info!(worker_id = %worker_id, position = %position, "Worker spawned");
        worker_id
    }

    /// Remove a worker that left the colony. Its held part goes back to its
    /// task. Returns `false` if the worker is unknown.
    pub fn remove_worker(&mut self, worker_id: WorkerId) -> bool {
        let before = self.workers.len();
        self.workers.retain(|w| w.id() != worker_id);
        if self.workers.len() == before {
            return false;
        }
        if self.manager.remove_worker(worker_id).is_some() {
            info!(worker_id = %worker_id, "Lost worker's part returned to its task");
        }
        true
    }

    // -------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------

    /// Submit a task.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the submission is invalid or the scheduler
    /// rejects it (for example, insufficient resources). No task is created
    /// in that case.
    pub fn submit(&mut self, submission: TaskSubmission) -> Result<TaskId, CoreError> {
        let request = submission.into_request(&mut self.blueprints)?;
        self.submit_request(request)
    }

    /// Submit a task given as JSON and answer with a response payload.
    pub fn submit_json(&mut self, json: &str) -> SubmissionResponse {
        let result = TaskSubmission::from_json(json).and_then(|s| self.submit(s));
        if let Err(e) = &result {
            warn!(error = %e, "Submission rejected");
        }
        SubmissionResponse::from_result(&result)
    }

    /// Submit a road: a dig task whose completion releases a placement task.
    /// Returns the dig task id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Task`] if either task is rejected; nothing is
    /// reserved in that case.
    pub fn submit_roads(&mut self, roads: RoadsSubmission) -> Result<TaskId, CoreError> {
        let (dig, place) = roads.into_requests();
        Ok(self.manager.submit_chain(dig, place, &mut self.ledger)?)
    }

    /// Submit a prepared scheduler request.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Task`] if the scheduler rejects it.
    pub fn submit_request(&mut self, request: TaskRequest) -> Result<TaskId, CoreError> {
        Ok(self.manager.submit(request, &mut self.ledger)?)
    }

    /// Cancel a live task. Placed cells stay; materials are returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Task`] if the task is not live.
    pub fn cancel(&mut self, task_id: TaskId) -> Result<(), CoreError> {
        self.manager.cancel(task_id, &mut self.ledger)?;
        self.repairs.remove(&task_id);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Buildings
    // -------------------------------------------------------------------

    /// Start tracking the integrity of a set of cells.
    pub fn track_building(
        &mut self,
        cells: impl IntoIterator<Item = (Coordinate, Material)>,
    ) -> BuildingId {
        let building_id = BuildingId::new();
        let integrity = BuildingIntegrity::new(
            building_id,
            cells,
            self.config.world.integrity_checks_per_tick,
        );
        debug!(building_id = %building_id, "Building tracked");
        self.buildings.insert(building_id, integrity);
        building_id
    }

    /// Submit a task restoring every destroyed cell of a building.
    ///
    /// Returns `None` if nothing is known to be destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownBuilding`] or [`CoreError::Task`] if the
    /// repair is rejected.
    pub fn request_repair(&mut self, building_id: BuildingId) -> Result<Option<TaskId>, CoreError> {
        let plan = self
            .buildings
            .get(&building_id)
            .ok_or(CoreError::UnknownBuilding(building_id))?
            .repair_plan();
        if plan.is_empty() {
            return Ok(None);
        }
        let cells = plan.len();
        let task_id = self.submit_request(TaskRequest::cells(TaskId::new(), plan, Vec::new()))?;
        self.repairs.insert(task_id, building_id);
        info!(building_id = %building_id, task_id = %task_id, cells, "Repair requested");
        Ok(Some(task_id))
    }

    /// Update tracking state for a task that reached a terminal status.
    pub(crate) fn handle_event(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::Completed(completion) => self.on_completed(completion),
            TaskEvent::Failed(task_id) | TaskEvent::Cancelled(task_id) => {
                self.repairs.remove(task_id);
            }
        }
    }

    fn on_completed(&mut self, completion: &TaskCompletion) {
        let cells = completion.built.iter().map(|(pos, _)| *pos);
        if let Some(building_id) = self.repairs.remove(&completion.task_id) {
            if let Some(building) = self.buildings.get_mut(&building_id) {
                building.mark_repaired(cells);
            }
            return;
        }
        if completion.kind == TaskKind::Build && !completion.built.is_empty() {
            self.track_building(completion.built.iter().cloned());
        }
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Snapshot the persisted state. Units reserved by live tasks are saved
    /// as stock.
    pub fn save_file(&self) -> SaveFile {
        let blueprints = self
            .blueprints
            .overrides()
            .map(|(name, template)| SavedBlueprint {
                name: name.clone(),
                template: template.clone(),
            })
            .collect();
        SaveFile::new(self.ledger.stock_stacks(), blueprints)
    }

    /// Replace the stock and blueprint overrides with a save's contents.
    /// Live tasks are cancelled first, returning their materials.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Blueprint`] if a saved template is malformed; in
    /// that case nothing changes.
    pub fn restore(&mut self, save: SaveFile) -> Result<(), CoreError> {
        self.blueprints.restore_overrides(
            save.blueprints
                .into_iter()
                .map(|b| (b.name, b.template)),
        )?;

        for progress in self.manager.progress() {
            if let Err(e) = self.manager.cancel(progress.task_id, &mut self.ledger) {
                warn!(task_id = %progress.task_id, error = %e, "Cancel on restore failed");
            }
        }
        self.repairs.clear();
        self.ledger.restore_pool(&save.resources);
        info!(
            saved_at = %save.saved_at,
            resources = save.resources.len(),
            "Colony state restored"
        );
        Ok(())
    }

    /// Write the save file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Persist`] if writing fails.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        self.save_file().store(path)?;
        info!(path = %path.display(), tick = self.clock.tick(), "Colony saved");
        Ok(())
    }

    /// Load the save file if it exists. Returns whether one was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the file exists but cannot be decoded or
    /// restored.
    pub fn load(&mut self, path: &Path) -> Result<bool, CoreError> {
        match SaveFile::load(path)? {
            Some(save) => {
                self.restore(save)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

//! Configuration loading and typed config structures for the colony engine.
//!
//! The canonical configuration lives in `colony-config.yaml` at the project
//! root. Every section and field has a default, so a partial file (or no
//! file at all) yields a runnable configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use colony_ledger::DEFAULT_TOOL_ITEMS;
use colony_tasks::TaskSettings;
use colony_types::{Coordinate, Item, Material, Region, ResourceStack};
use colony_workers::WorkerConfig;

/// Environment variable overriding `persistence.save_path`.
pub const SAVE_PATH_ENV: &str = "COLONY_SAVE_PATH";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration, mirroring `colony-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColonyConfig {
    /// World bounds, timing and the protected colony center.
    #[serde(default)]
    pub world: WorldConfig,

    /// Task decomposition.
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Colony stock.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Worker spawning and action timing.
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Save file location and autosave cadence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl ColonyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `COLONY_SAVE_PATH` overrides `persistence.save_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise use the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.persistence.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.persistence.apply_env_overrides();
        Ok(config)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable colony name.
    #[serde(default = "default_colony_name")]
    pub name: String,

    /// Random seed for worker spawn placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Lowest corner of the world grid.
    #[serde(default = "default_bounds_min")]
    pub bounds_min: Coordinate,

    /// Highest corner of the world grid.
    #[serde(default = "default_bounds_max")]
    pub bounds_max: Coordinate,

    /// The colony center. It can never be dug out.
    #[serde(default)]
    pub center: Coordinate,

    /// Building cells compared against the world per building per tick.
    #[serde(default = "default_integrity_checks_per_tick")]
    pub integrity_checks_per_tick: usize,
}

impl WorldConfig {
    /// The world grid bounds.
    pub const fn bounds(&self) -> Region {
        Region::new(self.bounds_min, self.bounds_max)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_colony_name(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            bounds_min: default_bounds_min(),
            bounds_max: default_bounds_max(),
            center: Coordinate::ZERO,
            integrity_checks_per_tick: default_integrity_checks_per_tick(),
        }
    }
}

/// Task decomposition configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TasksConfig {
    /// Maximum part size along each axis.
    #[serde(default = "default_part_extent")]
    pub part_extent: Coordinate,

    /// Block placed below a blueprint's floor where the template leaves a gap.
    #[serde(default = "default_fill_material")]
    pub fill_material: String,

    /// Most cells a single task may target.
    #[serde(default = "default_max_task_volume")]
    pub max_volume: u64,
}

impl TasksConfig {
    /// Settings for the task manager.
    pub fn settings(&self) -> TaskSettings {
        TaskSettings {
            part_extent: self.part_extent,
            fill_material: Material::block(self.fill_material.clone()),
            max_volume: self.max_volume,
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            part_extent: default_part_extent(),
            fill_material: default_fill_material(),
            max_volume: default_max_task_volume(),
        }
    }
}

/// Colony stock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Items that are never reserved or consumed.
    #[serde(default = "default_tool_items")]
    pub tool_items: Vec<String>,

    /// Ticks between resource syncs to observers.
    #[serde(default = "default_sync_interval_ticks")]
    pub sync_interval_ticks: u64,

    /// Stock credited to a fresh colony (ignored when a save is loaded).
    #[serde(default)]
    pub starting_resources: BTreeMap<String, u32>,

    /// Verify stock conservation after every tick.
    #[serde(default = "default_true")]
    pub conservation_check: bool,
}

impl LedgerConfig {
    /// Tool items as ledger items.
    pub fn tools(&self) -> Vec<Item> {
        self.tool_items.iter().map(Item::new).collect()
    }

    /// Starting resources as stacks.
    pub fn starting_stacks(&self) -> Vec<ResourceStack> {
        self.starting_resources
            .iter()
            .map(|(item, amount)| ResourceStack::new(item.clone(), *amount))
            .collect()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tool_items: default_tool_items(),
            sync_interval_ticks: default_sync_interval_ticks(),
            starting_resources: BTreeMap::new(),
            conservation_check: true,
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkersConfig {
    /// Workers spawned at startup.
    #[serde(default = "default_initial_count")]
    pub initial_count: u32,

    /// Ticks to dig one cell.
    #[serde(default = "default_dig_ticks")]
    pub dig_ticks: u32,

    /// Ticks to place one cell.
    #[serde(default = "default_place_ticks")]
    pub place_ticks: u32,

    /// Distance from which a worker can act on a cell.
    #[serde(default = "default_reach")]
    pub reach: u32,

    /// Cells moved per tick.
    #[serde(default = "default_speed")]
    pub speed: u32,

    /// Add dug blocks to the colony stock.
    #[serde(default = "default_true")]
    pub credit_dug_items: bool,
}

impl WorkersConfig {
    /// Per-worker execution settings.
    pub const fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            dig_ticks: self.dig_ticks,
            place_ticks: self.place_ticks,
            reach: self.reach,
            speed: self.speed,
            credit_dug_items: self.credit_dug_items,
        }
    }
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let defaults = WorkerConfig::default();
        Self {
            initial_count: default_initial_count(),
            dig_ticks: defaults.dig_ticks,
            place_ticks: defaults.place_ticks,
            reach: defaults.reach,
            speed: defaults.speed,
            credit_dug_items: defaults.credit_dug_items,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the save file.
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// Save every N ticks (0 = only on shutdown).
    #[serde(default)]
    pub autosave_interval_ticks: u64,
}

impl PersistenceConfig {
    /// Apply `COLONY_SAVE_PATH` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(SAVE_PATH_ENV) {
            self.save_path = PathBuf::from(val);
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            autosave_interval_ticks: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_colony_name() -> String {
    "New Colony".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_bounds_min() -> Coordinate {
    Coordinate::new(-32, 0, -32)
}

const fn default_bounds_max() -> Coordinate {
    Coordinate::new(32, 32, 32)
}

const fn default_integrity_checks_per_tick() -> usize {
    colony_world::DEFAULT_CHECKS_PER_TICK
}

const fn default_part_extent() -> Coordinate {
    Coordinate::new(3, 3, 3)
}

fn default_fill_material() -> String {
    "dirt".to_owned()
}

const fn default_max_task_volume() -> u64 {
    32_768
}

fn default_tool_items() -> Vec<String> {
    DEFAULT_TOOL_ITEMS.iter().map(|s| (*s).to_owned()).collect()
}

const fn default_sync_interval_ticks() -> u64 {
    20
}

const fn default_initial_count() -> u32 {
    3
}

const fn default_dig_ticks() -> u32 {
    6
}

const fn default_place_ticks() -> u32 {
    4
}

const fn default_reach() -> u32 {
    2
}

const fn default_speed() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_save_path() -> PathBuf {
    PathBuf::from("colony-save.json")
}

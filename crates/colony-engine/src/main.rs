//! Colony engine binary.
//!
//! Wires the configuration, the colony session, the initial workforce and
//! the async run loop together, then saves the colony on exit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `colony-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the session and register built-in blueprints
//! 4. Restore the save file, if one exists
//! 5. Spawn the initial workers
//! 6. Submit the startup task queue
//! 7. Run the tick loop until stopped
//! 8. Save and log the result

mod bootstrap;
mod callback;
mod error;
mod spawner;

use std::path::Path;
use std::sync::Arc;

use colony_core::config::LoggingConfig;
use colony_core::{ColonyConfig, ColonySession, RunControl, runner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::callback::EngineCallback;
use crate::error::EngineError;

/// Configuration file, relative to the working directory.
const CONFIG_PATH: &str = "colony-config.yaml";

/// Startup task queue, relative to the working directory.
const TASK_QUEUE_PATH: &str = "colony-tasks.json";

/// Application entry point for the colony engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the run loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = ColonyConfig::load_or_default(Path::new(CONFIG_PATH))
        .map_err(EngineError::from)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        colony = %config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        max_ticks = config.world.max_ticks,
        "colony-engine starting"
    );

    // 3. Create the session.
    let save_path = config.persistence.save_path.clone();
    let autosave_interval_ticks = config.persistence.autosave_interval_ticks;
    let initial_workers = config.workers.initial_count;
    let seed = config.world.seed;
    let control = Arc::new(RunControl::from_config(&config.world, false));

    let mut session = ColonySession::new(config);
    bootstrap::register_builtin_blueprints(session.blueprints_mut())?;

    // 4. Restore the save file.
    if session.load(&save_path).map_err(EngineError::from)? {
        info!(path = %save_path.display(), "Save file restored");
    } else {
        info!(path = %save_path.display(), "No save file, starting fresh");
    }

    // 5. Spawn the initial workers.
    spawner::spawn_initial_workers(&mut session, initial_workers, seed)?;

    // 6. Submit the startup task queue.
    let queue = bootstrap::load_task_queue(Path::new(TASK_QUEUE_PATH))?;
    let queued = queue.len();
    let accepted = bootstrap::submit_queue(&mut session, queue);
    info!(queued, accepted, "Startup task queue submitted");

    // 7. Run until stopped.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => control.request_stop(),
                Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
            }
        });
    }

    let mut callback = EngineCallback::new(save_path.clone(), autosave_interval_ticks);
    let result = runner::run_simulation(&mut session, &control, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 8. Save and log the result.
    runner::log_run_end(&result);
    session.save(&save_path).map_err(EngineError::from)?;

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        autosaves = callback.saves(),
        "colony-engine shutdown complete"
    );

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

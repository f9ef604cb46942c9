//! Session bootstrap: built-in blueprints and the startup task queue.
//!
//! The task queue is an optional JSON file holding an array of task
//! submissions. Each entry is submitted in order; rejected entries are
//! logged and skipped so one bad entry does not block the rest.

use std::path::Path;

use colony_blueprint::{BlueprintRegistry, StructureTemplate, TemplateBlock};
use colony_core::{ColonySession, TaskSubmission};
use colony_types::{Coordinate, Material};
use tracing::{info, warn};

use crate::error::EngineError;

/// Name of the built-in starter hut.
pub const HUT_BLUEPRINT: &str = "hut";

/// A 3x3 plank floor under a single chest.
pub fn hut_template() -> StructureTemplate {
    let mut blocks: Vec<TemplateBlock> = Vec::new();
    for x in 0..3 {
        for z in 0..3 {
            blocks.push(TemplateBlock {
                pos: Coordinate::new(x, 0, z),
                material: Material::block("oak_planks"),
            });
        }
    }
    blocks.push(TemplateBlock {
        pos: Coordinate::new(1, 1, 1),
        material: Material::with_entity("chest"),
    });
    StructureTemplate {
        size: Coordinate::new(3, 2, 3),
        blocks,
    }
}

/// Register the built-in blueprints. Saved overrides loaded later take
/// precedence.
///
/// # Errors
///
/// Returns [`EngineError::Blueprint`] if a built-in template is malformed.
pub fn register_builtin_blueprints(registry: &mut BlueprintRegistry) -> Result<(), EngineError> {
    registry.register(HUT_BLUEPRINT, hut_template())?;
    info!(blueprint = HUT_BLUEPRINT, "Built-in blueprint registered");
    Ok(())
}

/// Read the task queue file. A missing file is an empty queue.
///
/// # Errors
///
/// Returns [`EngineError::TaskQueue`] if the file exists but cannot be
/// read or decoded.
pub fn load_task_queue(path: &Path) -> Result<Vec<TaskSubmission>, EngineError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(EngineError::TaskQueue {
                message: format!("failed to read {}: {e}", path.display()),
            });
        }
    };
    serde_json::from_str(&contents).map_err(|e| EngineError::TaskQueue {
        message: format!("failed to decode {}: {e}", path.display()),
    })
}

/// Submit every queued task. Returns how many were accepted.
pub fn submit_queue(session: &mut ColonySession, queue: Vec<TaskSubmission>) -> usize {
    let mut accepted: usize = 0;
    for submission in queue {
        let task_id = submission.task_id;
        match session.submit(submission) {
            Ok(_) => accepted = accepted.saturating_add(1),
            Err(e) => warn!(task_id = %task_id, error = %e, "Queued task rejected"),
        }
    }
    accepted
}

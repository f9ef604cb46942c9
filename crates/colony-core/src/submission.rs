//! The task submission boundary.
//!
//! Hosts hand the engine JSON payloads. A [`TaskSubmission`] describes one
//! build or dig task; a [`RoadsSubmission`] describes a dig followed by a
//! placement over the same cells. Every submission is answered with a
//! [`SubmissionResponse`]: acceptance carries the task id, rejection an
//! error message and no task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use colony_blueprint::{BlueprintPayload, BlueprintRegistry};
use colony_tasks::{TaskRequest, TaskTarget};
use colony_types::{Material, Rotation, TaskId, TaskKind, WorkerId};

use crate::error::CoreError;

/// A reference to a template held by the blueprint registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedBlueprint {
    /// Registry name.
    pub name: String,
    /// Rotation applied before layering.
    #[serde(default)]
    pub rotation: Rotation,
    /// Template-relative floor level.
    #[serde(default)]
    pub floor_level: i32,
}

/// One build or dig request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Caller-chosen task id.
    pub task_id: TaskId,
    /// Build or remove.
    pub kind: TaskKind,
    /// Cells to work on. For blueprints only the lowest corner matters: it
    /// is the template origin.
    pub target: TaskTarget,
    /// Inline blueprint to build.
    #[serde(default)]
    pub blueprint: Option<BlueprintPayload>,
    /// Registered blueprint to build.
    #[serde(default)]
    pub named_blueprint: Option<NamedBlueprint>,
    /// Material for a flat build.
    #[serde(default)]
    pub material: Option<Material>,
    /// Workers to bind; empty binds every idle worker.
    #[serde(default)]
    pub workers: Vec<WorkerId>,
}

impl TaskSubmission {
    /// Parse a submission from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] if the payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Turn the submission into a scheduler request, resolving blueprints.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSubmission`] if a build names neither a
    /// blueprint nor a material, or [`CoreError::Blueprint`] if the
    /// blueprint cannot be decoded or is not registered.
    pub fn into_request(self, registry: &mut BlueprintRegistry) -> Result<TaskRequest, CoreError> {
        let Self {
            task_id,
            kind,
            target,
            blueprint,
            named_blueprint,
            material,
            workers,
        } = self;

        if kind == TaskKind::Remove {
            return Ok(TaskRequest::remove(task_id, target, workers));
        }

        let origin = target.bounding_region().map(|r| r.min_corner());
        let data = match (blueprint, named_blueprint) {
            (Some(_), Some(_)) => {
                return Err(CoreError::InvalidSubmission {
                    reason: "both an inline and a named blueprint were given".to_owned(),
                });
            }
            (Some(payload), None) => Some(Arc::new(payload.into_block_data()?)),
            (None, Some(named)) => Some(registry.block_data(
                &named.name,
                named.rotation,
                named.floor_level,
            )?),
            (None, None) => None,
        };

        match (data, material) {
            (Some(data), _) => {
                let origin = origin.ok_or_else(|| CoreError::InvalidSubmission {
                    reason: "blueprint target has no cells".to_owned(),
                })?;
                Ok(TaskRequest::blueprint(task_id, origin, data, workers))
            }
            (None, Some(material)) => Ok(TaskRequest::place(task_id, target, material, workers)),
            (None, None) => Err(CoreError::InvalidSubmission {
                reason: "build needs a blueprint or a material".to_owned(),
            }),
        }
    }
}

/// A road: dig out the listed cells, then place `material` on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadsSubmission {
    /// Id of the dig task.
    pub dig_id: TaskId,
    /// Id of the placement task released when the dig completes.
    pub place_id: TaskId,
    /// Road cells.
    pub coordinates: Vec<colony_types::Coordinate>,
    /// Road surface.
    pub material: Material,
    /// Workers to bind to both tasks.
    #[serde(default)]
    pub workers: Vec<WorkerId>,
}

impl RoadsSubmission {
    /// Parse a roads submission from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] if the payload is malformed.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The dig request and the placement request it releases.
    pub fn into_requests(self) -> (TaskRequest, TaskRequest) {
        let target = TaskTarget::Coordinates(self.coordinates);
        let dig = TaskRequest::remove(self.dig_id, target.clone(), self.workers.clone());
        let place = TaskRequest::place(self.place_id, target, self.material, self.workers);
        (dig, place)
    }
}

/// Answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Whether a task was created.
    pub accepted: bool,
    /// The created task, when accepted.
    pub task_id: Option<TaskId>,
    /// Why the submission was rejected.
    pub error: Option<String>,
}

impl SubmissionResponse {
    /// Build a response from a submission result.
    pub fn from_result(result: &Result<TaskId, CoreError>) -> Self {
        match result {
            Ok(task_id) => Self {
                accepted: true,
                task_id: Some(*task_id),
                error: None,
            },
            Err(e) => Self {
                accepted: false,
                task_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

//! Versioned save file.
//!
//! Only the colony stock and edited blueprint templates are persisted. Live
//! tasks and their reservations are not; loading a save is equivalent to
//! cancelling every task and returning its materials.
//!
//! | Version | Shape |
//! |---------|-------|
//! | 1 | `{ "resources": [...] }` (every field optional) |
//! | 2 | `{ "version": 2, "saved_at", "resources", "blueprints" }` |
//!
//! Version 1 files are migrated to version 2 on load.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use colony_blueprint::StructureTemplate;
use colony_types::ResourceStack;

/// The version written by this build.
pub const SAVE_VERSION: u32 = 2;

/// Errors that can occur when reading or writing the save file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Failed to read or write the file.
    #[error("save file I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The file is not valid JSON for its version.
    #[error("failed to parse save file: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The file was written by a newer build.
    #[error("unsupported save file version {0} (newest known is {SAVE_VERSION})")]
    UnsupportedVersion(u64),
}

/// An edited blueprint template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedBlueprint {
    /// Registry name.
    pub name: String,
    /// The edited template.
    pub template: StructureTemplate,
}

/// The persisted colony state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Schema version, always [`SAVE_VERSION`] after loading.
    pub version: u32,
    /// When the file was written.
    pub saved_at: DateTime<Utc>,
    /// Colony stock.
    #[serde(default)]
    pub resources: Vec<ResourceStack>,
    /// Blueprint overrides.
    #[serde(default)]
    pub blueprints: Vec<SavedBlueprint>,
}

/// The original save layout.
#[derive(Debug, Default, Deserialize)]
struct SaveFileV1 {
    #[serde(default)]
    resources: Vec<ResourceStack>,
}

impl SaveFile {
    /// A current-version save stamped with the current time.
    pub fn new(resources: Vec<ResourceStack>, blueprints: Vec<SavedBlueprint>) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            resources,
            blueprints,
        }
    }

    /// Decode a save file of any known version.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] for malformed content or
    /// [`PersistError::UnsupportedVersion`] for an unknown version.
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1);

        match version {
            1 => {
                let legacy: SaveFileV1 = serde_json::from_value(value)?;
                info!(resources = legacy.resources.len(), "Migrating version 1 save file");
                Ok(Self::new(legacy.resources, Vec::new()))
            }
            2 => Ok(serde_json::from_value(value)?),
            other => Err(PersistError::UnsupportedVersion(other)),
        }
    }

    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Read a save file. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the file exists but cannot be read or
    /// decoded.
    pub fn load(path: &Path) -> Result<Option<Self>, PersistError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No save file found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the save file, replacing any previous one atomically.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if encoding or writing fails.
    pub fn store(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.encode()?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Save file written");
        Ok(())
    }
}

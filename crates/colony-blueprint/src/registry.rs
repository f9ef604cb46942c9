//! Named blueprint templates with a cache of built layer data.
//!
//! Base templates are registered at startup. Players may override a
//! template in-game; overrides shadow the base template, invalidate every
//! cached rotation/floor variant, and are persisted with the save file.

use std::collections::BTreeMap;
use std::sync::Arc;

use colony_types::Rotation;
use tracing::{debug, info};

use crate::error::BlueprintError;
use crate::layers::{BlueprintBlockData, build_layers};
use crate::template::StructureTemplate;

/// Cache key: template name, rotation, floor level.
type CacheKey = (String, Rotation, i32);

/// Registry of named templates and their built layer data.
#[derive(Debug, Default)]
pub struct BlueprintRegistry {
    base: BTreeMap<String, StructureTemplate>,
    overrides: BTreeMap<String, StructureTemplate>,
    cache: BTreeMap<CacheKey, Arc<BlueprintBlockData>>,
}

impl BlueprintRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            base: BTreeMap::new(),
            overrides: BTreeMap::new(),
            cache: BTreeMap::new(),
        }
    }

    /// Register a base template.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the template is malformed.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        template: StructureTemplate,
    ) -> Result<(), BlueprintError> {
        template.validate()?;
        let name = name.into();
        self.invalidate(&name);
        self.base.insert(name, template);
        Ok(())
    }

    /// Override a template (edited in-game). Cached variants are dropped.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the template is malformed.
    pub fn update(
        &mut self,
        name: impl Into<String>,
        template: StructureTemplate,
    ) -> Result<(), BlueprintError> {
        template.validate()?;
        let name = name.into();
        self.invalidate(&name);
        info!(blueprint = %name, "Blueprint template updated");
        self.overrides.insert(name, template);
        Ok(())
    }

    /// Whether a template is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.overrides.contains_key(name) || self.base.contains_key(name)
    }

    /// The effective template for `name`: the override if present.
    pub fn template(&self, name: &str) -> Option<&StructureTemplate> {
        self.overrides.get(name).or_else(|| self.base.get(name))
    }

    /// Built layer data for a template variant, building and caching it on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::UnknownBlueprint`] if no template is
    /// registered under `name`.
    pub fn block_data(
        &mut self,
        name: &str,
        rotation: Rotation,
        floor_level: i32,
    ) -> Result<Arc<BlueprintBlockData>, BlueprintError> {
        let key = (name.to_owned(), rotation, floor_level);
        if let Some(data) = self.cache.get(&key) {
            return Ok(Arc::clone(data));
        }

        let template = self
            .template(name)
            .ok_or_else(|| BlueprintError::UnknownBlueprint(name.to_owned()))?;
        let data = Arc::new(build_layers(&template.rotated(rotation), floor_level));
        debug!(blueprint = name, ?rotation, floor_level, "Blueprint built and cached");
        self.cache.insert(key, Arc::clone(&data));
        Ok(data)
    }

    /// Overridden templates, for persistence.
    pub fn overrides(&self) -> impl Iterator<Item = (&String, &StructureTemplate)> {
        self.overrides.iter()
    }

    /// Replace all overrides with persisted ones.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any persisted template is malformed;
    /// in that case no override is changed.
    pub fn restore_overrides(
        &mut self,
        overrides: impl IntoIterator<Item = (String, StructureTemplate)>,
    ) -> Result<(), BlueprintError> {
        let restored: BTreeMap<String, StructureTemplate> = overrides.into_iter().collect();
        for template in restored.values() {
            template.validate()?;
        }
        self.overrides = restored;
        self.cache.clear();
        Ok(())
    }

    fn invalidate(&mut self, name: &str) {
        self.cache.retain(|(cached, _, _), _| cached != name);
    }
}

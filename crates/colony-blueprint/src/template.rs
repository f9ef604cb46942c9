//! Raw structure templates, rotation, and the serialized blueprint payload.
//!
//! A [`StructureTemplate`] is the authored form of a prefab: a size box and
//! a list of positioned materials. Positions are relative to the template
//! origin and always lie inside `[0, size)` on every axis, including after
//! [`StructureTemplate::rotated`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use colony_types::{Coordinate, Material, Rotation};

use crate::error::BlueprintError;
use crate::layers::{BlueprintBlockData, build_layers};

/// One positioned material inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBlock {
    /// Position relative to the template origin.
    pub pos: Coordinate,
    /// What occupies the position.
    pub material: Material,
}

/// An authored structure: a size box plus its positioned materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTemplate {
    /// Number of cells along each axis.
    pub size: Coordinate,
    /// Every authored cell. Cells inside the box that are not listed are
    /// absent, which is different from being explicitly empty.
    pub blocks: Vec<TemplateBlock>,
}

impl StructureTemplate {
    /// Check that the size is positive and that every block is unique and
    /// inside the size box.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::InvalidSize`], [`BlueprintError::BlockOutOfBounds`]
    /// or [`BlueprintError::DuplicateBlock`].
    pub fn validate(&self) -> Result<(), BlueprintError> {
        let size = self.size;
        if size.x < 1 || size.y < 1 || size.z < 1 {
            return Err(BlueprintError::InvalidSize { size });
        }

        let mut seen = BTreeSet::new();
        for block in &self.blocks {
            let pos = block.pos;
            let inside = (0..size.x).contains(&pos.x)
                && (0..size.y).contains(&pos.y)
                && (0..size.z).contains(&pos.z);
            if !inside {
                return Err(BlueprintError::BlockOutOfBounds { pos, size });
            }
            if !seen.insert(pos) {
                return Err(BlueprintError::DuplicateBlock(pos));
            }
        }
        Ok(())
    }

    /// The template as a coordinate map.
    pub fn to_map(&self) -> BTreeMap<Coordinate, Material> {
        self.blocks
            .iter()
            .map(|b| (b.pos, b.material.clone()))
            .collect()
    }

    /// Return the template turned about the vertical axis.
    ///
    /// Quarter turns swap the x and z extents. Positions are shifted so the
    /// rotated template still starts at the origin.
    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        let size = rotated_size(self.size, rotation);
        let blocks = self
            .blocks
            .iter()
            .map(|b| TemplateBlock {
                pos: rotate_pos(b.pos, self.size, rotation),
                material: b.material.clone(),
            })
            .collect();
        Self { size, blocks }
    }
}

/// The size box after rotation.
pub const fn rotated_size(size: Coordinate, rotation: Rotation) -> Coordinate {
    match rotation {
        Rotation::None | Rotation::Clockwise180 => size,
        Rotation::Clockwise90 | Rotation::Counterclockwise90 => {
            Coordinate::new(size.z, size.y, size.x)
        }
    }
}

/// Map a template-relative position through a rotation of a box of `size`.
pub const fn rotate_pos(pos: Coordinate, size: Coordinate, rotation: Rotation) -> Coordinate {
    let last_x = size.x.saturating_sub(1);
    let last_z = size.z.saturating_sub(1);
    match rotation {
        Rotation::None => pos,
        Rotation::Clockwise90 => Coordinate::new(last_z.saturating_sub(pos.z), pos.y, pos.x),
        Rotation::Clockwise180 => Coordinate::new(
            last_x.saturating_sub(pos.x),
            pos.y,
            last_z.saturating_sub(pos.z),
        ),
        Rotation::Counterclockwise90 => Coordinate::new(pos.z, pos.y, last_x.saturating_sub(pos.x)),
    }
}

/// The blueprint payload carried by a task submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintPayload {
    /// The authored template.
    pub template: StructureTemplate,
    /// Rotation applied before layering.
    #[serde(default)]
    pub rotation: Rotation,
    /// Template-relative y at which the structure's floor sits. Cells below
    /// it are foundation.
    pub floor_level: i32,
}

impl BlueprintPayload {
    /// Decode a payload from its serialized JSON form and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::Decode`] for malformed JSON, or a
    /// validation error from [`StructureTemplate::validate`].
    pub fn decode(bytes: &[u8]) -> Result<Self, BlueprintError> {
        let payload: Self = serde_json::from_slice(bytes)?;
        payload.template.validate()?;
        Ok(payload)
    }

    /// Serialize the payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BlueprintError::Decode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, BlueprintError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Rotate the template and split it into build-order layers.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the template is malformed.
    pub fn into_block_data(self) -> Result<BlueprintBlockData, BlueprintError> {
        self.template.validate()?;
        let rotated = self.template.rotated(self.rotation);
        Ok(build_layers(&rotated, self.floor_level))
    }
}

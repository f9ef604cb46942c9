//! Materials that occupy cells and the items used to place them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Block name of the distinguished empty material.
pub const EMPTY_BLOCK: &str = "air";

/// An item type in the colony stock (e.g. `oak_planks`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Item(pub String);

impl Item {
    /// Create an item from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The item name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Item {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque descriptor of what occupies a coordinate.
///
/// Two flags matter to the engine: blocks carrying attached sub-state
/// (`block_entity`) and fluid-bearing blocks are never placed by hand,
/// they are applied in one batch when the owning task finishes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Material {
    /// Block name, e.g. `oak_planks` or `air`.
    pub block: String,
    /// The block carries attached sub-state (chests, furnaces, signs).
    #[serde(default)]
    pub block_entity: bool,
    /// The block contains a fluid.
    #[serde(default)]
    pub fluid: bool,
}

impl Material {
    /// A plain solid block with no attached state.
    pub fn block(name: impl Into<String>) -> Self {
        Self {
            block: name.into(),
            block_entity: false,
            fluid: false,
        }
    }

    /// A block that carries attached sub-state.
    pub fn with_entity(name: impl Into<String>) -> Self {
        Self {
            block_entity: true,
            ..Self::block(name)
        }
    }

    /// A fluid-bearing block.
    pub fn fluid(name: impl Into<String>) -> Self {
        Self {
            fluid: true,
            ..Self::block(name)
        }
    }

    /// The empty material.
    pub fn empty() -> Self {
        Self::block(EMPTY_BLOCK)
    }

    /// Whether this is the empty material.
    pub fn is_empty(&self) -> bool {
        self.block == EMPTY_BLOCK
    }

    /// Whether this cell must be deferred to the entity layer.
    pub const fn is_deferred(&self) -> bool {
        self.block_entity || self.fluid
    }

    /// The item consumed when placing this material, `None` for empty.
    pub fn item(&self) -> Option<Item> {
        if self.is_empty() {
            None
        } else {
            Some(Item::new(self.block.clone()))
        }
    }
}

impl core::fmt::Display for Material {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.block)
    }
}

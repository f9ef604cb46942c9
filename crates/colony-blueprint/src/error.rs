//! Error types for the `colony-blueprint` crate.

use colony_types::Coordinate;

/// Errors that can occur while decoding or building blueprints.
#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    /// The serialized payload is not valid JSON for a blueprint.
    #[error("failed to decode blueprint payload: {source}")]
    Decode {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A template size has a non-positive component.
    #[error("invalid template size {size}: every axis must be at least 1")]
    InvalidSize {
        /// The offending size.
        size: Coordinate,
    },

    /// A template block lies outside the template's size box.
    #[error("template block at {pos} lies outside size {size}")]
    BlockOutOfBounds {
        /// The block position.
        pos: Coordinate,
        /// The template size.
        size: Coordinate,
    },

    /// Two template blocks share a position.
    #[error("duplicate template block at {0}")]
    DuplicateBlock(Coordinate),

    /// No template is registered under the name.
    #[error("unknown blueprint: {0}")]
    UnknownBlueprint(String),
}

//! Structure templates and build-order layering for the colony task engine.
//!
//! A blueprint arrives as a serialized [`BlueprintPayload`]: an authored
//! [`StructureTemplate`], a [`Rotation`](colony_types::Rotation) and a floor
//! level. Decoding rotates the template and splits it into the layers that
//! decide build order (see [`layers`]).
//!
//! # Modules
//!
//! - [`template`] -- Authored templates, rotation, payload decoding
//! - [`layers`] -- [`build_layers`] and the immutable [`BlueprintBlockData`]
//! - [`registry`] -- Named templates, in-game overrides, built-data cache
//! - [`error`] -- [`BlueprintError`]

pub mod error;
pub mod layers;
pub mod registry;
pub mod template;

pub use error::BlueprintError;
pub use layers::{BlueprintBlockData, BlueprintLayer, build_layers};
pub use registry::BlueprintRegistry;
pub use template::{BlueprintPayload, StructureTemplate, TemplateBlock};

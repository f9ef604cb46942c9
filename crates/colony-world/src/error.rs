//! Error types for the `colony-world` crate.

use colony_types::Coordinate;

/// Errors that can occur when mutating the block world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The position lies outside the world bounds.
    #[error("position {0} is outside the world bounds")]
    OutOfBounds(Coordinate),

    /// The position holds a block that may not be removed.
    #[error("position {0} is protected")]
    Protected(Coordinate),
}

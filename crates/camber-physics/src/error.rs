//! Physics engine errors.

use thiserror::Error;

/// Errors raised by world operations and queries.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A convex sweep was requested with a non-convex shape.
    #[error("swept shape must be convex")]
    NonConvexSweep,
}

/// Errors raised while loading surface parameter tables.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The file could not be read.
    #[error("failed to read surface table: {0}")]
    Io(#[from] std::io::Error),

    /// The table was not valid JSON.
    #[error("failed to parse surface table: {0}")]
    Parse(#[from] serde_json::Error),
}

//! Shape construction errors.

use thiserror::Error;

/// Errors raised while building collision shapes.
#[derive(Debug, Clone, Error)]
pub enum ShapeError {
    /// A mesh part was given no triangles.
    #[error("mesh part has no triangles")]
    EmptyMesh,

    /// A triangle index referenced a vertex that does not exist.
    #[error("triangle index {index} out of range for {count} vertices")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of vertices in the part.
        count: usize,
    },

    /// A compound shape was given no children.
    #[error("compound shape has no children")]
    EmptyCompound,

    /// A mesh handle was used where a convex child was required.
    #[error("mesh shapes cannot be compound children")]
    MeshInCompound,
}

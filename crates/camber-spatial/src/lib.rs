//! Uniform XZ broadphase grid for the camber physics engine.
//!
//! The world is partitioned into square cells on the XZ plane, centered on
//! the origin. Cells are allocated lazily and hold separate occupant lists
//! for static and dynamic objects:
//!
//! - [`BroadphaseGrid`] - the grid itself, generic over the occupant key
//! - [`GridCell`] / [`CellKey`] - lazily allocated cell storage
//! - [`CellRange`] - inclusive rectangle of cell coordinates
//! - [`walk_grid_line`] - cell-by-cell traversal for ray and sweep queries

mod grid;
mod walk;

pub use grid::{BroadphaseGrid, CellKey, CellRange, GridCell, StaticCellRef};
pub use walk::walk_grid_line;

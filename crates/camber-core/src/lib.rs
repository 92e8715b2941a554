//! Core math types for the camber physics engine.
//!
//! Provides the deterministic fixed-point scalar and vector used for world
//! positions, the axis-aligned bounding box used throughout the broadphase,
//! and the collision contents bit constants:
//!
//! - [`Fixed`] / [`FixedVec3`] - Q32.32 fixed-point scalar and 3-vector
//! - [`Aabb3`] - 3D axis-aligned bounding box with ray slab tests
//! - contents/mask bit constants for collision filtering

mod aabb;
mod contents;
mod fixed;

pub use aabb::Aabb3;
pub use contents::{
    CONTENTS_DEBRIS, CONTENTS_OBJECT, CONTENTS_SOLID_GROUND, CONTENTS_SOLID_OBJECTS,
    CONTENTS_VEHICLE, COLLISION_MASK_ALL,
};
pub use fixed::{Fixed, FixedVec3, MAX_WORLD_SIZE};

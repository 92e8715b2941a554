//! Collision contents and mask bit constants.
//!
//! Every collision object carries a `contents` word describing what it is
//! and a `collide_mask` word describing what it collides with. Two objects
//! interact when either side's mask matches the other side's contents.

/// Solid world geometry (terrain, roads, buildings).
pub const CONTENTS_SOLID_GROUND: u32 = 1 << 0;

/// Solid placed objects (props, barriers).
pub const CONTENTS_SOLID_OBJECTS: u32 = 1 << 1;

/// Small movable debris.
pub const CONTENTS_DEBRIS: u32 = 1 << 2;

/// Generic dynamic object.
pub const CONTENTS_OBJECT: u32 = 1 << 3;

/// Vehicle body.
pub const CONTENTS_VEHICLE: u32 = 1 << 4;

/// Mask matching every contents bit.
pub const COLLISION_MASK_ALL: u32 = u32::MAX;

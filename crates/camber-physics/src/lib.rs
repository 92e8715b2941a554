//! Fixed-timestep rigid-body physics core for driving games.
//!
//! The world stores collision objects in generational storage, partitions
//! them over a uniform XZ grid, and steps them with an impulse-based
//! contact solver. Positions are fixed point so far-from-origin play areas
//! keep full precision:
//!
//! - [`PhysicsWorld`] - object storage, broadphase, stepping, queries
//! - [`CollisionObject`] / [`ObjectKind`] - statics, ghosts, rigid bodies
//! - [`BodyState`] - integration and the freeze state machine
//! - [`SurfaceRegistry`] - material parameters addressed by surface id
//! - [`Constraint`] / [`Controller`] - step hooks for joints and drivers
//! - [`QueryFilter`] / [`CollisionInfo`] - ray and convex-sweep queries

mod body;
mod constraint;
mod contact;
mod controller;
mod error;
mod object;
mod query;
mod surface;
mod world;

pub use body::{
    BodyState, FREEZE_TIME, GRAVITY, SLEEP_ANGULAR_SQ, SLEEP_LINEAR_SQ, WAKE_ANGULAR_SQ,
    WAKE_LINEAR_SQ,
};
pub use constraint::{Constraint, PointConstraint};
pub use contact::{ContactPair, MAX_CONTACT_PAIRS};
pub use controller::Controller;
pub use error::{PhysicsError, SurfaceError};
pub use object::{
    CollisionEvent, CollisionObject, CollisionPolicy, ObjectKey, ObjectKind, PhysicsCallbacks,
    AABB_EXPAND, MAX_OBJECT_EVENTS,
};
pub use query::{CollisionInfo, FilterMode, QueryFilter};
pub use surface::{SurfaceParam, SurfaceRegistry};
pub use world::{
    PhysicsWorld, WorldCollisionEvent, WorldConfig, WorldStats, DEFAULT_CELL_SIZE,
};

pub use camber_core::{
    Aabb3, Fixed, FixedVec3, COLLISION_MASK_ALL, CONTENTS_DEBRIS, CONTENTS_OBJECT,
    CONTENTS_SOLID_GROUND, CONTENTS_SOLID_OBJECTS, CONTENTS_VEHICLE, MAX_WORLD_SIZE,
};
pub use camber_shapes::{CollisionMesh, ShapeHandle, SharedShape};

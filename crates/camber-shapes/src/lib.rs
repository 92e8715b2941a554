//! Collision shapes and narrow-phase queries for the camber physics engine.
//!
//! Wraps parry3d shapes behind a glam-facing API:
//!
//! - [`ShapeHandle`] - owned, shared, or mesh collision shape
//! - [`CollisionMesh`] - triangle mesh split into parts with surface ids
//! - [`collect_contacts`] - pairwise contact generation with grouping
//! - [`ray_cast`] / [`shape_cast`] - exact single-object casts
//! - [`ShapeError`] - shape construction failures

mod cast;
mod contact;
mod convert;
mod error;
mod handle;

pub use cast::{ray_cast, shape_cast, CastHit};
pub use contact::{
    collect_contacts, ShapeContact, CONTACT_GROUPING_TOLERANCE, CONTACT_PREDICTION, MAX_CONTACTS,
};
pub use error::ShapeError;
pub use handle::{CollisionMesh, MeshPart, ShapeHandle, ShapePart};

pub use parry3d::shape::SharedShape;

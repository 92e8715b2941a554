//! Collision shape handles and triangle meshes.

use std::sync::Arc;

use camber_core::Aabb3;
use glam::{Quat, Vec3};
use parry3d::na::Point3;
use parry3d::shape::SharedShape;

use crate::convert::{from_na_point, from_na_rot, from_na_vec, to_na_iso};
use crate::error::ShapeError;

/// One part of a [`CollisionMesh`]: a triangle soup with a surface id.
#[derive(Clone)]
pub struct MeshPart {
    /// The triangle mesh geometry.
    pub shape: SharedShape,
    /// Surface parameter id used for material lookups and contents gating.
    pub surface_id: i32,
}

/// Static triangle-mesh collision geometry, split into parts that each
/// carry their own surface id.
#[derive(Clone)]
pub struct CollisionMesh {
    parts: Vec<MeshPart>,
    local_bounds: Aabb3,
}

impl Default for CollisionMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            local_bounds: Aabb3::EMPTY,
        }
    }

    /// Adds a triangle part.
    ///
    /// Rejects empty parts and out-of-range indices up front; the underlying
    /// mesh constructor is only called with validated input.
    pub fn add_part(
        &mut self,
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
        surface_id: i32,
    ) -> Result<(), ShapeError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(ShapeError::EmptyMesh);
        }
        let count = vertices.len();
        for tri in &indices {
            for &index in tri {
                if index as usize >= count {
                    return Err(ShapeError::IndexOutOfRange { index, count });
                }
            }
        }
        let points: Vec<Point3<f32>> = vertices
            .iter()
            .map(|v| Point3::new(v.x, v.y, v.z))
            .collect();
        for v in &vertices {
            self.local_bounds.union_point(*v);
        }
        self.parts.push(MeshPart {
            shape: SharedShape::trimesh(points, indices),
            surface_id,
        });
        Ok(())
    }

    /// The mesh parts.
    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// Local-space bounds over all parts.
    pub fn local_bounds(&self) -> Aabb3 {
        self.local_bounds
    }

    /// Returns true if no parts were added.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A collision shape attached to an object.
///
/// `Owned` shapes belong to one object; `Shared` shapes come from a cache
/// and may be attached to many objects. Both are reference counted, the
/// split only records intent. `Mesh` wraps static triangle geometry with
/// per-part surface ids.
#[derive(Clone)]
pub enum ShapeHandle {
    /// Shape owned by a single object.
    Owned(SharedShape),
    /// Shape shared from a cache.
    Shared(SharedShape),
    /// Static triangle mesh geometry.
    Mesh(Arc<CollisionMesh>),
}

/// One leaf shape of a [`ShapeHandle`], with its local placement.
#[derive(Clone)]
pub struct ShapePart {
    /// The leaf shape.
    pub shape: SharedShape,
    /// Local translation relative to the owning object.
    pub offset_pos: Vec3,
    /// Local rotation relative to the owning object.
    pub offset_rot: Quat,
    /// Surface id, for mesh parts.
    pub surface_id: Option<i32>,
}

impl ShapeHandle {
    /// An owned box shape.
    pub fn boxed(half_extents: Vec3) -> Self {
        ShapeHandle::Owned(SharedShape::cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
        ))
    }

    /// An owned sphere shape.
    pub fn sphere(radius: f32) -> Self {
        ShapeHandle::Owned(SharedShape::ball(radius))
    }

    /// An owned Y-axis cylinder shape.
    pub fn cylinder(half_height: f32, radius: f32) -> Self {
        ShapeHandle::Owned(SharedShape::cylinder(half_height, radius))
    }

    /// An owned compound of convex children at local placements.
    pub fn compound(children: Vec<(Vec3, Quat, ShapeHandle)>) -> Result<Self, ShapeError> {
        if children.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }
        let mut shapes = Vec::with_capacity(children.len());
        for (pos, rot, child) in children {
            let shape = match child {
                ShapeHandle::Owned(s) | ShapeHandle::Shared(s) => s,
                ShapeHandle::Mesh(_) => return Err(ShapeError::MeshInCompound),
            };
            shapes.push((to_na_iso(pos, rot), shape));
        }
        Ok(ShapeHandle::Owned(SharedShape::compound(shapes)))
    }

    /// Wraps a built collision mesh.
    pub fn mesh(mesh: Arc<CollisionMesh>) -> Self {
        ShapeHandle::Mesh(mesh)
    }

    /// Returns true if the whole shape is a single convex volume.
    ///
    /// Compounds and meshes are not convex even when every piece is.
    pub fn is_convex(&self) -> bool {
        match self {
            ShapeHandle::Owned(s) | ShapeHandle::Shared(s) => {
                s.as_compound().is_none() && s.as_support_map().is_some()
            }
            ShapeHandle::Mesh(_) => false,
        }
    }

    /// Enumerates the leaf shapes with their local placements.
    pub fn parts(&self) -> Vec<ShapePart> {
        match self {
            ShapeHandle::Owned(s) | ShapeHandle::Shared(s) => {
                if let Some(compound) = s.as_compound() {
                    compound
                        .shapes()
                        .iter()
                        .map(|(iso, shape)| ShapePart {
                            shape: shape.clone(),
                            offset_pos: from_na_vec(iso.translation.vector),
                            offset_rot: from_na_rot(iso.rotation),
                            surface_id: None,
                        })
                        .collect()
                } else {
                    vec![ShapePart {
                        shape: s.clone(),
                        offset_pos: Vec3::ZERO,
                        offset_rot: Quat::IDENTITY,
                        surface_id: None,
                    }]
                }
            }
            ShapeHandle::Mesh(mesh) => mesh
                .parts()
                .iter()
                .map(|part| ShapePart {
                    shape: part.shape.clone(),
                    offset_pos: Vec3::ZERO,
                    offset_rot: Quat::IDENTITY,
                    surface_id: Some(part.surface_id),
                })
                .collect(),
        }
    }

    /// Local-space bounding box.
    pub fn local_bounds(&self) -> Aabb3 {
        match self {
            ShapeHandle::Owned(s) | ShapeHandle::Shared(s) => {
                let aabb = s.compute_local_aabb();
                Aabb3::new(from_na_point(aabb.mins), from_na_point(aabb.maxs))
            }
            ShapeHandle::Mesh(mesh) => mesh.local_bounds(),
        }
    }

    /// Principal inertia diagonal for a body of the given mass.
    ///
    /// Meshes are static geometry in practice; they get a box approximation
    /// from their bounds so a misuse still yields finite inertia.
    pub fn inertia_for_mass(&self, mass: f32) -> Vec3 {
        match self {
            ShapeHandle::Owned(s) | ShapeHandle::Shared(s) => {
                let props = s.mass_properties(1.0);
                let unit_mass = 1.0 / props.inv_mass.max(f32::EPSILON);
                from_na_vec(props.principal_inertia()) * (mass / unit_mass)
            }
            ShapeHandle::Mesh(mesh) => {
                let he = mesh.local_bounds().half_extents();
                let coeff = mass / 3.0;
                Vec3::new(
                    coeff * (he.y * he.y + he.z * he.z),
                    coeff * (he.x * he.x + he.z * he.z),
                    coeff * (he.x * he.x + he.y * he.y),
                )
            }
        }
    }
}

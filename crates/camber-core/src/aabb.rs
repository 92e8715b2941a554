//! 3D axis-aligned bounding box.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// An empty box: min at +infinity, max at -infinity.
    ///
    /// Any `union_point` call produces a valid box containing that point.
    pub const EMPTY: Aabb3 = Aabb3 {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Creates a new AABB from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from center and half-extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Returns the center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents.
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns the full size along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if the box contains no volume.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Checks if a point is inside the AABB.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Checks if this AABB intersects another.
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the union of two AABBs.
    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        Aabb3 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grows the box to contain a point.
    pub fn union_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Returns the box grown by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Aabb3 {
        Aabb3 {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Returns the box translated by `offset`.
    pub fn translated(&self, offset: Vec3) -> Aabb3 {
        Aabb3 {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Returns the eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (mn, mx) = (self.min, self.max);
        [
            Vec3::new(mn.x, mn.y, mn.z),
            Vec3::new(mx.x, mn.y, mn.z),
            Vec3::new(mn.x, mx.y, mn.z),
            Vec3::new(mx.x, mx.y, mn.z),
            Vec3::new(mn.x, mn.y, mx.z),
            Vec3::new(mx.x, mn.y, mx.z),
            Vec3::new(mn.x, mx.y, mx.z),
            Vec3::new(mx.x, mx.y, mx.z),
        ]
    }

    /// Slab test against a segment from `start` to `end`.
    ///
    /// Returns `Some((tnear, tfar))` in segment parameters if the segment
    /// overlaps the box, with `tnear` clamped to 0 when the start is inside.
    pub fn intersects_segment(&self, start: Vec3, end: Vec3) -> Option<(f32, f32)> {
        let dir = end - start;
        let mut tnear = 0.0f32;
        let mut tfar = 1.0f32;
        for axis in 0..3 {
            let d = dir[axis];
            let s = start[axis];
            if d.abs() < f32::EPSILON {
                if s < self.min[axis] || s > self.max[axis] {
                    return None;
                }
            } else {
                let inv = 1.0 / d;
                let mut t0 = (self.min[axis] - s) * inv;
                let mut t1 = (self.max[axis] - s) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                tnear = tnear.max(t0);
                tfar = tfar.min(t1);
                if tnear > tfar {
                    return None;
                }
            }
        }
        Some((tnear, tfar))
    }

    /// 2D slab test in the XZ plane, ignoring Y.
    ///
    /// Used by the broadphase grid walk, where cells only bound X and Z.
    pub fn intersects_segment_xz(&self, start: Vec3, end: Vec3) -> Option<(f32, f32)> {
        let dir = end - start;
        let mut tnear = 0.0f32;
        let mut tfar = 1.0f32;
        for axis in [0usize, 2] {
            let d = dir[axis];
            let s = start[axis];
            if d.abs() < f32::EPSILON {
                if s < self.min[axis] || s > self.max[axis] {
                    return None;
                }
            } else {
                let inv = 1.0 / d;
                let mut t0 = (self.min[axis] - s) * inv;
                let mut t1 = (self.max[axis] - s) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                tnear = tnear.max(t0);
                tfar = tfar.min(t1);
                if tnear > tfar {
                    return None;
                }
            }
        }
        Some((tnear, tfar))
    }
}

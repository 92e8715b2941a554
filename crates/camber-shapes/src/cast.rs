//! Exact ray and convex-sweep casts against a single shape.

use glam::{Quat, Vec3};
use parry3d::query::{self, Ray};
use parry3d::shape::SharedShape;

use crate::convert::{from_na_point, from_na_vec, to_na_iso, to_na_point, to_na_vec};
use crate::handle::ShapeHandle;

/// Result of a ray or sweep cast.
#[derive(Debug, Clone, Copy)]
pub struct CastHit {
    /// Hit parameter along the segment, in `[0, 1]`.
    pub fraction: f32,
    /// Hit point in world space.
    pub position: Vec3,
    /// Surface normal at the hit, world space.
    pub normal: Vec3,
    /// Surface id of the hit part, when it has one.
    pub surface_id: Option<i32>,
}

fn hit_is_finite(fraction: f32, position: Vec3, normal: Vec3) -> bool {
    fraction.is_finite() && position.is_finite() && normal.is_finite()
}

/// Casts the segment `start..end` against a shape at a world transform.
///
/// `accept_part` filters parts by surface id. Returns the closest accepted
/// hit. Results with non-finite components are discarded.
pub fn ray_cast(
    shape: &ShapeHandle,
    pos: Vec3,
    rot: Quat,
    start: Vec3,
    end: Vec3,
    mut accept_part: impl FnMut(Option<i32>) -> bool,
) -> Option<CastHit> {
    let dir = end - start;
    let ray = Ray::new(to_na_point(start), to_na_vec(dir));
    let mut best: Option<CastHit> = None;
    for part in shape.parts() {
        if !accept_part(part.surface_id) {
            continue;
        }
        let iso = to_na_iso(pos + rot * part.offset_pos, rot * part.offset_rot);
        let Some(hit) = part.shape.cast_ray_and_get_normal(&iso, &ray, 1.0, true) else {
            continue;
        };
        let position = start + dir * hit.toi;
        let normal = from_na_vec(hit.normal);
        if !hit_is_finite(hit.toi, position, normal) {
            continue;
        }
        if best.as_ref().map_or(true, |b| hit.toi < b.fraction) {
            best = Some(CastHit {
                fraction: hit.toi,
                position,
                normal,
                surface_id: part.surface_id,
            });
        }
    }
    best
}

/// Sweeps a convex shape along `start..end` against a target shape.
///
/// The swept shape keeps a fixed rotation over the sweep. Returns the
/// closest accepted hit with the witness point and normal on the target.
pub fn shape_cast(
    target: &ShapeHandle,
    target_pos: Vec3,
    target_rot: Quat,
    swept: &SharedShape,
    swept_rot: Quat,
    start: Vec3,
    end: Vec3,
    mut accept_part: impl FnMut(Option<i32>) -> bool,
) -> Option<CastHit> {
    let vel = to_na_vec(end - start);
    let zero_vel = to_na_vec(Vec3::ZERO);
    let swept_iso = to_na_iso(start, swept_rot);
    let mut best: Option<CastHit> = None;
    for part in target.parts() {
        if !accept_part(part.surface_id) {
            continue;
        }
        let iso = to_na_iso(
            target_pos + target_rot * part.offset_pos,
            target_rot * part.offset_rot,
        );
        let result = query::time_of_impact(
            &iso,
            &zero_vel,
            &*part.shape,
            &swept_iso,
            &vel,
            &**swept,
            1.0,
            true,
        );
        let Ok(Some(toi)) = result else {
            continue;
        };
        // Witness and normal come back in the target part's local frame.
        let position = from_na_point(iso * toi.witness1);
        let normal = from_na_vec(iso.rotation * *toi.normal1);
        if !hit_is_finite(toi.toi, position, normal) {
            continue;
        }
        if best.as_ref().map_or(true, |b| toi.toi < b.fraction) {
            best = Some(CastHit {
                fraction: toi.toi,
                position,
                normal,
                surface_id: part.surface_id,
            });
        }
    }
    best
}

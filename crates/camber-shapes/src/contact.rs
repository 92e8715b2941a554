//! Pairwise contact generation.

use glam::{Quat, Vec3};
use parry3d::query;

use crate::convert::{from_na_point, from_na_vec, to_na_iso};
use crate::handle::ShapeHandle;

/// Distance below which separated shapes still produce a contact.
pub const CONTACT_PREDICTION: f32 = 0.01;

/// Per-axis position tolerance for merging near-coincident contacts.
pub const CONTACT_GROUPING_TOLERANCE: f32 = 0.05;

/// Upper bound on contacts produced for one object pair.
pub const MAX_CONTACTS: usize = 64;

/// A single contact between two shapes.
#[derive(Debug, Clone, Copy)]
pub struct ShapeContact {
    /// Contact point on the first shape, world space.
    pub position: Vec3,
    /// Contact normal pointing from the second shape toward the first.
    pub normal: Vec3,
    /// Penetration depth; negative when the shapes are separated but within
    /// the prediction distance.
    pub depth: f32,
    /// Surface id of the first shape's part, when it has one.
    pub surface_id: Option<i32>,
}

fn similar(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

/// Collects contacts between two shapes placed at world transforms.
///
/// `accept_part_a` filters the first shape's parts by surface id; parts it
/// rejects produce no contacts. Leaf pairs are tested at a shared origin
/// halfway between the two objects so coordinates stay small, and results
/// are shifted back to world space. Contacts landing within
/// [`CONTACT_GROUPING_TOLERANCE`] of each other on every axis, with the
/// same surface id, are averaged into one. Output is capped at
/// [`MAX_CONTACTS`].
pub fn collect_contacts(
    shape_a: &ShapeHandle,
    a_pos: Vec3,
    a_rot: Quat,
    shape_b: &ShapeHandle,
    b_pos: Vec3,
    b_rot: Quat,
    mut accept_part_a: impl FnMut(Option<i32>) -> bool,
    out: &mut Vec<ShapeContact>,
) {
    let origin = (a_pos + b_pos) * 0.5;

    for part_a in shape_a.parts() {
        if !accept_part_a(part_a.surface_id) {
            continue;
        }
        let iso_a = to_na_iso(
            (a_pos - origin) + a_rot * part_a.offset_pos,
            a_rot * part_a.offset_rot,
        );
        for part_b in shape_b.parts() {
            if out.len() >= MAX_CONTACTS {
                return;
            }
            let iso_b = to_na_iso(
                (b_pos - origin) + b_rot * part_b.offset_pos,
                b_rot * part_b.offset_rot,
            );
            let result = query::contact(
                &iso_a,
                &*part_a.shape,
                &iso_b,
                &*part_b.shape,
                CONTACT_PREDICTION,
            );
            let Ok(Some(contact)) = result else {
                continue;
            };
            let normal = from_na_vec(*contact.normal2);
            let position = from_na_point(contact.point1) + origin;
            let depth = -contact.dist;
            if !normal.is_finite() || !position.is_finite() || !depth.is_finite() {
                continue;
            }
            merge_or_push(
                out,
                ShapeContact {
                    position,
                    normal,
                    depth,
                    surface_id: part_a.surface_id,
                },
            );
        }
    }
}

/// Merges a contact into an existing near-coincident one, or appends it.
fn merge_or_push(out: &mut Vec<ShapeContact>, contact: ShapeContact) {
    for existing in out.iter_mut() {
        if existing.surface_id != contact.surface_id {
            continue;
        }
        let same_spot = similar(existing.position.x, contact.position.x, CONTACT_GROUPING_TOLERANCE)
            && similar(existing.position.y, contact.position.y, CONTACT_GROUPING_TOLERANCE)
            && similar(existing.position.z, contact.position.z, CONTACT_GROUPING_TOLERANCE);
        if !same_spot {
            continue;
        }
        existing.position = (existing.position + contact.position) * 0.5;
        existing.normal = ((existing.normal + contact.normal) * 0.5).normalize_or_zero();
        existing.depth = (existing.depth + contact.depth) * 0.5;
        return;
    }
    out.push(contact);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_on_box_contact() {
        // Unit sphere resting 0.1 deep in the top of a large box.
        let sphere = ShapeHandle::sphere(1.0);
        let ground = ShapeHandle::boxed(Vec3::new(10.0, 1.0, 10.0));
        let mut out = Vec::new();
        collect_contacts(
            &ground,
            Vec3::new(0.0, -1.0, 0.0),
            Quat::IDENTITY,
            &sphere,
            Vec3::new(0.0, 0.9, 0.0),
            Quat::IDENTITY,
            |_| true,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        let c = out[0];
        assert!((c.depth - 0.1).abs() < 1e-3, "depth {}", c.depth);
        // Normal points from the sphere (second shape) toward the ground.
        assert!(c.normal.y < -0.99, "normal {:?}", c.normal);
        assert!(c.position.y.abs() < 0.05, "position {:?}", c.position);
    }

    #[test]
    fn test_separated_beyond_prediction_no_contact() {
        let a = ShapeHandle::sphere(0.5);
        let b = ShapeHandle::sphere(0.5);
        let mut out = Vec::new();
        collect_contacts(
            &a,
            Vec3::ZERO,
            Quat::IDENTITY,
            &b,
            Vec3::new(2.0, 0.0, 0.0),
            Quat::IDENTITY,
            |_| true,
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_part_filter_skips_contacts() {
        let sphere = ShapeHandle::sphere(1.0);
        let ground = ShapeHandle::boxed(Vec3::new(10.0, 1.0, 10.0));
        let mut out = Vec::new();
        collect_contacts(
            &ground,
            Vec3::new(0.0, -1.0, 0.0),
            Quat::IDENTITY,
            &sphere,
            Vec3::new(0.0, 0.9, 0.0),
            Quat::IDENTITY,
            |_| false,
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_grouping_merges_coincident_contacts() {
        let mut out = vec![ShapeContact {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            depth: 0.1,
            surface_id: None,
        }];
        merge_or_push(
            &mut out,
            ShapeContact {
                position: Vec3::splat(0.01),
                normal: Vec3::Y,
                depth: 0.2,
                surface_id: None,
            },
        );
        assert_eq!(out.len(), 1);
        assert!((out[0].depth - 0.15).abs() < 1e-6);
        // Different surface id stays separate even at the same spot.
        merge_or_push(
            &mut out,
            ShapeContact {
                position: Vec3::ZERO,
                normal: Vec3::Y,
                depth: 0.1,
                surface_id: Some(2),
            },
        );
        assert_eq!(out.len(), 2);
    }
}

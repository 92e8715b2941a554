//! Contact pairs and the impulse math shared by the solver.

use camber_core::FixedVec3;
use glam::Vec3;

use crate::object::ObjectKey;

/// Upper bound on contact pairs stored per object per step.
pub const MAX_CONTACT_PAIRS: usize = 32;

/// Denominator floor below which a contact is skipped entirely.
pub(crate) const DENOMINATOR_EPSILON: f32 = 1e-7;

/// One contact between two objects, produced by detection and consumed by
/// the solver in the same step.
#[derive(Debug, Clone, Copy)]
pub struct ContactPair {
    /// First object. Statics and ghosts always take this slot.
    pub body_a: ObjectKey,
    /// Second object, always the rigid body whose detection found the pair.
    pub body_b: ObjectKey,
    /// Contact normal pointing from `body_b` toward `body_a`.
    pub normal: Vec3,
    /// Contact point relative to `base`.
    pub position: Vec3,
    /// Reference position the pair's float coordinates are relative to.
    pub base: FixedVec3,
    /// Penetration depth; positive when overlapping.
    pub depth: f32,
    /// Share of the correction each contact of the pair's batch receives,
    /// `1 / contact count`.
    pub dt_fraction: f32,
    /// Restitution contribution of `body_a`.
    pub restitution_a: f32,
    /// Friction contribution of `body_a`.
    pub friction_a: f32,
    /// Restitution contribution of `body_b`.
    pub restitution_b: f32,
    /// Friction contribution of `body_b`.
    pub friction_b: f32,
    /// Surface id of the contacted material.
    pub surface_id: i32,
    /// True when `body_a` is immovable for this pair.
    pub a_static: bool,
}

/// Coulomb friction impulse opposing the tangential contact velocity.
///
/// The tangential speed is reversed outright when doing so costs less than
/// the static friction budget `mu_static * normal_impulse`; otherwise the
/// dynamic budget `mu_dynamic * normal_impulse` is spent along the reversed
/// tangent.
pub(crate) fn friction_impulse(
    normal: Vec3,
    point_velocity: Vec3,
    normal_impulse: f32,
    denominator: f32,
    mu_static: f32,
    mu_dynamic: f32,
) -> Vec3 {
    let tangent_velocity = point_velocity - point_velocity.dot(normal) * normal;
    let speed = tangent_velocity.length();
    if speed <= 0.0 || denominator <= 0.0 {
        return Vec3::ZERO;
    }
    let tangent = -tangent_velocity / speed;
    let impulse_to_reverse = speed / denominator;
    let magnitude = if impulse_to_reverse < mu_static * normal_impulse {
        impulse_to_reverse
    } else {
        mu_dynamic * normal_impulse
    };
    tangent * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friction_opposes_tangent_motion() {
        // Sliding along +X on a floor with normal -Y (normal points from the
        // moving body toward the floor).
        let f = friction_impulse(Vec3::NEG_Y, Vec3::new(4.0, -1.0, 0.0), 100.0, 0.1, 0.8, 0.6);
        assert!(f.x < 0.0);
        assert!(f.y.abs() < 1e-6, "friction must stay tangential: {f:?}");
    }

    #[test]
    fn test_static_friction_stops_slow_slide() {
        // Reversing costs 1.0 / 0.1 = 10, well under the 80 budget.
        let f = friction_impulse(Vec3::NEG_Y, Vec3::new(1.0, 0.0, 0.0), 100.0, 0.1, 0.8, 0.6);
        assert!((f.x + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_dynamic_friction_caps_fast_slide() {
        // Reversing would cost 1000; capped at 0.6 * 100.
        let f = friction_impulse(Vec3::NEG_Y, Vec3::new(100.0, 0.0, 0.0), 100.0, 0.1, 0.8, 0.6);
        assert!((f.x + 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_no_friction_without_tangent_velocity() {
        let f = friction_impulse(Vec3::NEG_Y, Vec3::new(0.0, -5.0, 0.0), 100.0, 0.1, 0.8, 0.6);
        assert_eq!(f, Vec3::ZERO);
    }
}

//! Constraints applied around each simulation step.

use camber_core::FixedVec3;
use glam::Vec3;

use crate::object::ObjectKey;
use crate::world::PhysicsWorld;

/// A constraint participating in the step.
///
/// `pre_apply` runs before integration, `apply` runs after contacts are
/// resolved. Disabled constraints are skipped entirely.
pub trait Constraint: Send {
    /// Whether the constraint participates this step.
    fn enabled(&self) -> bool {
        true
    }

    /// Runs before bodies integrate.
    fn pre_apply(&mut self, _world: &mut PhysicsWorld, _dt: f32) {}

    /// Runs after contacts are resolved.
    fn apply(&mut self, _world: &mut PhysicsWorld, _dt: f32) {}
}

/// Pins a body-local point toward a world-space anchor with a velocity
/// impulse proportional to the separation.
pub struct PointConstraint {
    /// Constrained body.
    pub body: ObjectKey,
    /// World-space anchor the point is pulled toward.
    pub anchor: FixedVec3,
    /// Attachment point in the body's local frame.
    pub local_point: Vec3,
    /// Correction strength, fraction of the separation removed per second.
    pub strength: f32,
    /// Whether the constraint participates.
    pub enabled: bool,
}

impl PointConstraint {
    /// Creates an enabled point constraint.
    pub fn new(body: ObjectKey, anchor: FixedVec3, local_point: Vec3, strength: f32) -> Self {
        Self {
            body,
            anchor,
            local_point,
            strength,
            enabled: true,
        }
    }
}

impl Constraint for PointConstraint {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let Some(object) = world.object_mut(self.body) else {
            return;
        };
        let world_point = object.position.offset(object.orientation * self.local_point);
        let error = self.anchor.delta(world_point);
        let Some(body) = object.body_mut() else {
            return;
        };
        if body.mass <= 0.0 {
            return;
        }
        let impulse = error * self.strength * body.mass * dt;
        body.apply_central_impulse(impulse);
        body.try_wake(true);
    }
}

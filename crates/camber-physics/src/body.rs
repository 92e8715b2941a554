//! Rigid body state and integration.
//!
//! Bodies use semi-implicit Euler integration with a freeze state machine:
//! a body whose velocities stay under the sleep thresholds for
//! [`FREEZE_TIME`] seconds freezes, and wakes when an impulse pushes it
//! past the wake thresholds. Positions integrate in fixed point; all
//! velocity math is `f32`.

use camber_core::FixedVec3;
use glam::{Mat3, Quat, Vec3};

use crate::object::{CollisionObject, ObjectKind};

/// Downward gravity applied to every body, m/s^2.
pub const GRAVITY: f32 = 9.81;

/// Seconds of stillness before a body freezes.
pub const FREEZE_TIME: f32 = 0.5;

/// Squared linear speed under which a body counts as still.
pub const SLEEP_LINEAR_SQ: f32 = 0.08;
/// Squared angular speed under which a body counts as still.
pub const SLEEP_ANGULAR_SQ: f32 = 0.08;
/// Squared linear speed a wake impulse must exceed.
pub const WAKE_LINEAR_SQ: f32 = 0.002;
/// Squared angular speed a wake impulse must exceed.
pub const WAKE_ANGULAR_SQ: f32 = 0.005;

/// Per-component velocity clamp.
const VELOCITY_CLAMP: f32 = 16384.0;
/// Squared angular speed under which angular velocity snaps to zero.
const MIN_ANGULAR_SQ: f32 = 1e-6;
/// Angular damping factor per second.
const ANGULAR_DAMPING: f32 = 0.01;

/// Dynamic state of a rigid body.
pub struct BodyState {
    /// Body mass. Non-positive mass disables integration.
    pub mass: f32,
    /// Inverse mass.
    pub inv_mass: f32,
    /// Local center of mass offset.
    pub center_of_mass: Vec3,
    /// Center of mass offset rotated into world space.
    pub center_of_mass_trans: Vec3,
    /// Principal inertia diagonal.
    pub inertia: Vec3,
    /// Inverse principal inertia diagonal.
    pub inv_inertia: Vec3,
    /// Inverse inertia tensor in world space.
    pub inv_inertia_world: Mat3,

    /// Linear velocity, m/s.
    pub linear_velocity: Vec3,
    /// Angular velocity, rad/s.
    pub angular_velocity: Vec3,
    /// Accumulated force, cleared each integration.
    pub force: Vec3,
    /// Accumulated torque, cleared each integration.
    pub torque: Vec3,
    /// Per-axis linear motion scale.
    pub linear_factor: Vec3,
    /// Per-axis angular motion scale.
    pub angular_factor: Vec3,
    /// Gravity applied to this body.
    pub gravity: f32,

    /// Position at the start of the last integration.
    pub prev_position: FixedVec3,
    /// Orientation at the start of the last integration.
    pub prev_orientation: Quat,

    /// Asleep: skipped by integration and detection.
    pub frozen: bool,
    /// Held frozen by gameplay; impulses cannot wake it.
    pub force_frozen: bool,
    /// Whether stillness freezes the body automatically.
    pub auto_freeze: bool,
    /// Countdown to freezing while still.
    pub freeze_time: f32,
    /// Keep accumulated forces across frozen frames.
    pub preserve_forces: bool,
    /// Disable the built-in angular damping.
    pub disable_damping: bool,
    /// Responds to impulses itself but never pushes moveable partners.
    pub infinite_mass: bool,
    /// Vehicle body: car-vs-car pairs use the dedicated correction factor.
    pub car: bool,

    /// Minimum interval between integrations; 0 integrates every step.
    pub min_frame_time: f32,
    /// Whether motion still integrates every step while the interval gates
    /// collision detection only.
    pub min_frame_time_ignore_motion: bool,
    pub(crate) frame_time_accumulator: f32,
    /// Effective dt of the last integration.
    pub last_frame_time: f32,
}

impl BodyState {
    /// Creates body state with the given mass and principal inertia.
    pub fn new(mass: f32, inertia: Vec3) -> Self {
        let inv = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };
        Self {
            mass,
            inv_mass: inv(mass),
            center_of_mass: Vec3::ZERO,
            center_of_mass_trans: Vec3::ZERO,
            inertia,
            inv_inertia: Vec3::new(inv(inertia.x), inv(inertia.y), inv(inertia.z)),
            inv_inertia_world: Mat3::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
            gravity: GRAVITY,
            prev_position: FixedVec3::ZERO,
            prev_orientation: Quat::IDENTITY,
            frozen: false,
            force_frozen: false,
            auto_freeze: true,
            freeze_time: FREEZE_TIME,
            preserve_forces: false,
            disable_damping: false,
            infinite_mass: false,
            car: false,
            min_frame_time: 0.0,
            min_frame_time_ignore_motion: false,
            frame_time_accumulator: 0.0,
            last_frame_time: 0.0,
        }
    }

    /// Velocity of a point attached to the body.
    ///
    /// `rel` is the body position minus the contact point; the solver keeps
    /// this inverted lever-arm convention throughout.
    pub fn point_velocity(&self, rel: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(rel)
    }

    /// Effective inverse mass seen by an impulse along `normal` at `rel`.
    pub fn impulse_denominator(&self, rel: Vec3, normal: Vec3) -> f32 {
        let r0 = rel + self.center_of_mass_trans;
        self.inv_mass + normal.dot((self.inv_inertia_world * r0.cross(normal)).cross(r0))
    }

    /// Applies an impulse at a lever arm.
    pub fn apply_impulse(&mut self, rel: Vec3, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity +=
            self.inv_inertia_world * (rel + self.center_of_mass_trans).cross(impulse);
    }

    /// Accumulates a force at a lever arm for the next integration.
    pub fn apply_force(&mut self, rel: Vec3, force: Vec3) {
        self.force += force;
        self.torque += (rel + self.center_of_mass_trans).cross(force);
    }

    /// Applies a central impulse.
    pub fn apply_central_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Applies an angular impulse.
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_velocity += self.inv_inertia_world * impulse;
    }

    /// Clears sleep state so the body simulates next step.
    pub fn wake(&mut self) {
        self.frozen = false;
        self.force_frozen = false;
        self.freeze_time = FREEZE_TIME;
    }

    /// Puts the body to sleep until explicitly woken.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.force_frozen = true;
    }

    /// Wakes the body from automatic sleep.
    ///
    /// Fails when the body is held frozen, or when `velocity_check` is set
    /// and the current velocities are below the wake thresholds.
    pub fn try_wake(&mut self, velocity_check: bool) -> bool {
        if self.force_frozen {
            return false;
        }
        if velocity_check
            && self.linear_velocity.length_squared() < WAKE_LINEAR_SQ
            && self.angular_velocity.length_squared() < WAKE_ANGULAR_SQ
        {
            return false;
        }
        self.frozen = false;
        self.freeze_time = FREEZE_TIME;
        true
    }

    /// Whether this step's detection should run for the body.
    pub fn can_integrate(&self, check_ignore: bool) -> bool {
        self.frame_time_accumulator == 0.0 || check_ignore == self.min_frame_time_ignore_motion
    }

    /// Sets the minimum integration interval, resetting the accumulator
    /// when the interval changes.
    pub fn set_min_frame_time(&mut self, time: f32, ignore_motion: bool) {
        if self.min_frame_time != time {
            self.frame_time_accumulator = 0.0;
        }
        self.min_frame_time = time;
        self.min_frame_time_ignore_motion = ignore_motion;
    }
}

fn clamp_components(v: Vec3, limit: f32) -> Vec3 {
    v.clamp(Vec3::splat(-limit), Vec3::splat(limit))
}

/// Quaternion derivative for an angular velocity.
fn angular_velocity_to_spin(orientation: Quat, w: Vec3) -> Quat {
    Quat::from_xyzw(w.x * 0.5, w.y * 0.5, w.z * 0.5, 0.0) * orientation
}

impl CollisionObject {
    /// Integrates the body forward by `dt`.
    ///
    /// Frozen bodies only shed their accumulated forces. Bodies with a
    /// minimum frame interval accumulate time until the interval elapses,
    /// then integrate with the accumulated dt.
    pub fn integrate(&mut self, dt: f32) {
        let ObjectKind::Dynamic(body) = &mut self.kind else {
            return;
        };
        if body.frozen || body.force_frozen {
            if !body.preserve_forces {
                body.force = Vec3::ZERO;
                body.torque = Vec3::ZERO;
                body.linear_velocity = Vec3::ZERO;
                body.angular_velocity = Vec3::ZERO;
            }
            return;
        }
        if body.mass <= 0.0 {
            return;
        }

        if body.min_frame_time > 0.0 {
            if body.frame_time_accumulator < body.min_frame_time {
                body.frame_time_accumulator += dt;
                if !body.min_frame_time_ignore_motion {
                    return;
                }
                body.last_frame_time = dt;
            } else if body.min_frame_time_ignore_motion {
                body.frame_time_accumulator = 0.0;
                body.last_frame_time = dt;
            } else {
                body.last_frame_time = body.frame_time_accumulator + dt;
                body.frame_time_accumulator = 0.0;
            }
        } else {
            body.last_frame_time = dt;
        }

        body.prev_position = self.position;
        body.prev_orientation = self.orientation;
        let time = body.last_frame_time;

        // Sleep countdown while both velocities stay small.
        if body.auto_freeze {
            if body.linear_velocity.length_squared() < SLEEP_LINEAR_SQ
                && body.angular_velocity.length_squared() < SLEEP_ANGULAR_SQ
            {
                body.freeze_time -= time;
                if body.freeze_time < 0.0 {
                    body.frozen = true;
                }
            } else {
                body.freeze_time = FREEZE_TIME;
            }
        }

        body.linear_velocity += Vec3::new(0.0, -body.gravity, 0.0) * time
            + body.force * body.inv_mass * time;
        body.linear_velocity = clamp_components(body.linear_velocity, VELOCITY_CLAMP);

        body.angular_velocity += body.inv_inertia_world * body.torque * time;
        body.angular_velocity = clamp_components(body.angular_velocity, VELOCITY_CLAMP);
        if body.angular_velocity.length_squared() < MIN_ANGULAR_SQ {
            body.angular_velocity = Vec3::ZERO;
        }
        if !body.disable_damping {
            let scale = 1.0 - ANGULAR_DAMPING * time;
            body.angular_velocity = if scale > 0.0 {
                body.angular_velocity * scale
            } else {
                Vec3::ZERO
            };
        }

        let spin =
            angular_velocity_to_spin(self.orientation, body.angular_velocity * body.angular_factor);
        self.orientation = (self.orientation + spin * time).normalize();
        self.position = self
            .position
            .offset(body.linear_velocity * body.linear_factor * time);

        body.force = Vec3::ZERO;
        body.torque = Vec3::ZERO;

        self.bounds_dirty = true;
        self.transform_dirty = true;
        self.update_inertia_tensor();
    }

    /// Rebuilds velocities from the transform delta after the solver has
    /// corrected positions, then refreshes the world bounds.
    pub fn post_step_update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if let ObjectKind::Dynamic(body) = &mut self.kind {
            body.linear_velocity = self.position.delta(body.prev_position) / dt;
            let dq = self.orientation * body.prev_orientation.conjugate();
            let mut angular = Vec3::new(dq.x, dq.y, dq.z) * (2.0 / dt);
            if dq.w < 0.0 {
                angular = -angular;
            }
            body.angular_velocity = angular;
        }
        self.refresh_bounds();
    }

    /// Rebuilds the world-space inverse inertia tensor and rotated center
    /// of mass from the current orientation.
    pub fn update_inertia_tensor(&mut self) {
        let orientation = self.orientation;
        if let ObjectKind::Dynamic(body) = &mut self.kind {
            let rot = Mat3::from_quat(orientation);
            body.inv_inertia_world =
                rot * Mat3::from_diagonal(body.inv_inertia) * rot.transpose();
            body.center_of_mass_trans = orientation * body.center_of_mass;
        }
        self.transform_dirty = false;
    }

    /// Applies an impulse at a world-space point.
    pub fn apply_world_impulse(&mut self, point: FixedVec3, impulse: Vec3) {
        let rel = self.position.delta(point);
        if let Some(body) = self.body_mut() {
            body.apply_impulse(rel, impulse);
        }
    }

    /// Accumulates a force at a world-space point.
    pub fn apply_world_force(&mut self, point: FixedVec3, force: Vec3) {
        let rel = self.position.delta(point);
        if let Some(body) = self.body_mut() {
            body.apply_force(rel, force);
        }
    }

    /// Copies transform and dynamic state from another object.
    ///
    /// Used for swapping a body between simulation islands or mirroring a
    /// replay body onto a live one. Shape, policy, and grid registration
    /// are left alone.
    pub fn copy_state_from(&mut self, other: &CollisionObject) {
        self.position = other.position;
        self.orientation = other.orientation;
        if let (ObjectKind::Dynamic(body), ObjectKind::Dynamic(src)) =
            (&mut self.kind, &other.kind)
        {
            body.linear_velocity = src.linear_velocity;
            body.angular_velocity = src.angular_velocity;
            body.force = src.force;
            body.torque = src.torque;
            body.prev_position = src.prev_position;
            body.prev_orientation = src.prev_orientation;
            body.frozen = src.frozen;
            body.force_frozen = src.force_frozen;
            body.freeze_time = src.freeze_time;
            body.last_frame_time = src.last_frame_time;
        }
        self.mark_moved();
        self.refresh_bounds();
        self.update_inertia_tensor();
    }
}

//! Collision objects: statics, ghosts, and rigid bodies.

use camber_core::{Aabb3, FixedVec3, COLLISION_MASK_ALL, CONTENTS_OBJECT};
use camber_shapes::ShapeHandle;
use camber_spatial::{CellKey, StaticCellRef};
use glam::{Quat, Vec3};
use slotmap::new_key_type;

use crate::body::BodyState;
use crate::contact::ContactPair;

new_key_type! {
    /// Generational key identifying a collision object in a world.
    pub struct ObjectKey;
}

/// World AABBs are grown by this margin on every side.
pub const AABB_EXPAND: f32 = 0.15;

/// Upper bound on collision events kept per object between steps.
pub const MAX_OBJECT_EVENTS: usize = 8;

/// How an object participates in detection, queries, and response.
#[derive(Debug, Clone, Copy)]
pub struct CollisionPolicy {
    /// What this object is, as contents bits.
    pub contents: u32,
    /// What this object collides with.
    pub collide_mask: u32,
    /// Whether ray and sweep queries can hit this object.
    pub raycast: bool,
    /// Whether contacts move this object and its partners.
    pub response: bool,
    /// Whether collision events are recorded on this object's event list.
    pub record_contacts: bool,
    /// Whether this object tests against other dynamic objects. Statics are
    /// always tested regardless.
    pub check_collisions: bool,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self {
            contents: CONTENTS_OBJECT,
            collide_mask: COLLISION_MASK_ALL,
            raycast: true,
            response: true,
            record_contacts: false,
            check_collisions: true,
        }
    }
}

impl CollisionPolicy {
    /// Policy for a ghost: detected and reported, never responded to.
    pub fn ghost() -> Self {
        Self {
            response: false,
            raycast: false,
            record_contacts: true,
            ..Self::default()
        }
    }
}

/// What kind of object this is.
pub enum ObjectKind {
    /// Immovable world geometry, registered over a cell range.
    Static,
    /// Trigger volume: produces contacts and events, never moves or pushes.
    Ghost,
    /// Simulated rigid body.
    Dynamic(Box<BodyState>),
}

/// A collision event delivered to an object's callback and event list.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    /// The other object in the contact.
    pub other: ObjectKey,
    /// Contact point, world space.
    pub position: Vec3,
    /// Contact normal pointing away from the other object.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
    /// Magnitude of the normal impulse applied by the solver.
    pub applied_impulse: f32,
    /// Closing speed along the normal at the contact.
    pub impact_velocity: f32,
    /// True when the other object does not receive collision response.
    pub other_no_response: bool,
}

/// Per-object simulation hooks.
///
/// Callbacks receive the object itself, never the world, so they cannot
/// re-enter the step that is dispatching them.
pub trait PhysicsCallbacks: Send {
    /// Called before the object integrates.
    fn pre_simulate(&mut self, _object: &mut CollisionObject, _dt: f32) {}
    /// Called after the object's contacts are resolved.
    fn post_simulate(&mut self, _object: &mut CollisionObject, _dt: f32) {}
    /// Called once per resolved contact.
    fn on_collide(&mut self, _object: &mut CollisionObject, _event: &CollisionEvent) {}
    /// Called when the object joins the simulated moveable set.
    fn on_start_move(&mut self, _object: &mut CollisionObject) {}
    /// Called when the object leaves the simulated moveable set.
    fn on_stop_move(&mut self, _object: &mut CollisionObject) {}
}

/// A collision object: shared transform, shape, and policy, plus the
/// dynamic state when the object is a rigid body.
pub struct CollisionObject {
    /// Collision shape.
    pub shape: ShapeHandle,
    /// World position, fixed point.
    pub position: FixedVec3,
    /// World orientation.
    pub orientation: Quat,
    /// Detection and response policy.
    pub policy: CollisionPolicy,
    /// Static, ghost, or rigid body.
    pub kind: ObjectKind,
    /// Gameplay-side identifier, used by query filters.
    pub user_id: Option<u64>,
    /// Fallback surface id when a contact has no mesh part material.
    pub surface_id: i32,
    /// Friction value, multiplied with the partner's at contacts.
    pub friction: f32,
    /// Restitution value, summed with the partner's at contacts.
    pub restitution: f32,
    /// Per-object addition to the positional correction factor.
    pub erp_offset: f32,
    /// Per-object simulation hooks.
    pub callbacks: Option<Box<dyn PhysicsCallbacks>>,

    /// Contacts found for this object during the current step.
    pub(crate) contact_pairs: Vec<ContactPair>,
    /// Bounded list of recent collision events, drained by gameplay code.
    pub(crate) events: Vec<CollisionEvent>,
    /// Grid cell this object currently occupies (dynamics and ghosts).
    pub(crate) cell: Option<CellKey>,
    /// Grid registration for statics.
    pub(crate) static_ref: Option<StaticCellRef>,
    /// World AABB needs recomputing.
    pub(crate) bounds_dirty: bool,
    /// Derived rotation state (inertia frame) needs recomputing.
    pub(crate) transform_dirty: bool,
    pub(crate) world_bounds: Aabb3,
}

impl CollisionObject {
    fn with_kind(shape: ShapeHandle, position: FixedVec3, orientation: Quat, kind: ObjectKind) -> Self {
        let mut object = Self {
            shape,
            position,
            orientation,
            policy: CollisionPolicy::default(),
            kind,
            user_id: None,
            surface_id: 0,
            friction: 1.0,
            restitution: 1.0,
            erp_offset: 0.0,
            callbacks: None,
            contact_pairs: Vec::new(),
            events: Vec::new(),
            cell: None,
            static_ref: None,
            bounds_dirty: true,
            transform_dirty: true,
            world_bounds: Aabb3::EMPTY,
        };
        object.refresh_bounds();
        object
    }

    /// Creates an immovable object. Friction and restitution default to 1.0
    /// and act as multipliers over the surface parameters.
    pub fn new_static(shape: ShapeHandle, position: FixedVec3, orientation: Quat) -> Self {
        Self::with_kind(shape, position, orientation, ObjectKind::Static)
    }

    /// Creates a ghost trigger volume.
    pub fn new_ghost(shape: ShapeHandle, position: FixedVec3, orientation: Quat) -> Self {
        let mut object = Self::with_kind(shape, position, orientation, ObjectKind::Ghost);
        object.policy = CollisionPolicy::ghost();
        object
    }

    /// Creates a rigid body with inertia derived from the shape.
    pub fn new_dynamic(
        shape: ShapeHandle,
        mass: f32,
        position: FixedVec3,
        orientation: Quat,
    ) -> Self {
        let body = BodyState::new(mass, shape.inertia_for_mass(mass));
        let mut object =
            Self::with_kind(shape, position, orientation, ObjectKind::Dynamic(Box::new(body)));
        object.friction = 0.1;
        object.restitution = 0.1;
        object.update_inertia_tensor();
        object
    }

    /// Returns the body state when this object is dynamic.
    pub fn body(&self) -> Option<&BodyState> {
        match &self.kind {
            ObjectKind::Dynamic(body) => Some(body),
            _ => None,
        }
    }

    /// Mutable body state access.
    pub fn body_mut(&mut self) -> Option<&mut BodyState> {
        match &mut self.kind {
            ObjectKind::Dynamic(body) => Some(body),
            _ => None,
        }
    }

    /// Returns true for rigid bodies.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, ObjectKind::Dynamic(_))
    }

    /// Returns true for ghost trigger volumes.
    pub fn is_ghost(&self) -> bool {
        matches!(self.kind, ObjectKind::Ghost)
    }

    /// Two objects interact when either side's mask matches the other
    /// side's contents.
    pub fn can_collide_with(&self, other: &CollisionObject) -> bool {
        (self.policy.contents & other.policy.collide_mask) != 0
            || (self.policy.collide_mask & other.policy.contents) != 0
    }

    /// Marks the transform as changed, forcing bounds and inertia updates.
    pub fn mark_moved(&mut self) {
        self.bounds_dirty = true;
        self.transform_dirty = true;
    }

    /// Moves the object, updating derived state.
    pub fn set_transform(&mut self, position: FixedVec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation;
        self.mark_moved();
        self.refresh_bounds();
        self.update_inertia_tensor();
    }

    /// Current world-space bounds, recomputed when stale.
    pub fn world_bounds(&mut self) -> Aabb3 {
        if self.bounds_dirty {
            self.refresh_bounds();
        }
        self.world_bounds
    }

    /// Last computed world-space bounds without refreshing.
    pub fn cached_bounds(&self) -> Aabb3 {
        self.world_bounds
    }

    /// Recomputes the world AABB from the rotated local bounds.
    pub(crate) fn refresh_bounds(&mut self) {
        let local = self.shape.local_bounds();
        let mut bounds = Aabb3::EMPTY;
        for corner in local.corners() {
            bounds.union_point(self.orientation * corner);
        }
        self.world_bounds = bounds.expanded(AABB_EXPAND).translated(self.position.to_vec3());
        self.bounds_dirty = false;
    }

    /// Contacts found for this object during the last step.
    pub fn contact_pairs(&self) -> &[ContactPair] {
        &self.contact_pairs
    }

    /// Drains the recorded collision events.
    pub fn take_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: CollisionEvent) {
        if self.policy.record_contacts && self.events.len() < MAX_OBJECT_EVENTS {
            self.events.push(event);
        }
    }
}

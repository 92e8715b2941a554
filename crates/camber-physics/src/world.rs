//! The physics world: object storage, broadphase, stepping, and the
//! contact solver.
//!
//! `simulate_step` runs a fixed phase order:
//!
//! 1. enabled constraints pre-apply
//! 2. controllers update
//! 3. moveables run their pre-simulate hook, clear contacts, integrate,
//!    and re-place themselves in the grid; awake bodies join the moving set
//! 4. the caller's pre-integration hook runs
//! 5. moving bodies detect collisions against grid neighbors
//! 6. moving bodies rebuild velocities from their transform deltas
//! 7. contact pairs are resolved and events dispatched
//! 8. enabled constraints apply

use std::collections::VecDeque;

use camber_shapes::{collect_contacts, ShapeHandle};
use camber_spatial::BroadphaseGrid;
use glam::{Vec2, Vec3};
use serde::Serialize;
use slotmap::SlotMap;
use tracing::warn;

use crate::constraint::Constraint;
use crate::contact::{friction_impulse, ContactPair, DENOMINATOR_EPSILON, MAX_CONTACT_PAIRS};
use crate::controller::Controller;
use crate::object::{CollisionEvent, CollisionObject, ObjectKey, ObjectKind};
use crate::surface::SurfaceRegistry;

/// Default broadphase cell edge length, world units.
pub const DEFAULT_CELL_SIZE: f32 = 24.0;

/// Cell-range tolerance used when gathering a body's neighbor cells.
const BOX_RANGE_TOLERANCE: f32 = 0.1;

/// World-level tuning values.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// Fraction of penetration removed per contact.
    pub erp: f32,
    /// Correction factor for contacts between two vehicle bodies. Kept
    /// separate from `erp` so car handling can be tuned independently.
    pub car_vs_car_erp: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            erp: 0.15,
            car_vs_car_erp: 0.15,
        }
    }
}

/// A resolved contact, queued on the world for polling after the step.
#[derive(Debug, Clone, Copy)]
pub struct WorldCollisionEvent {
    /// First object of the pair.
    pub body_a: ObjectKey,
    /// Second object of the pair.
    pub body_b: ObjectKey,
    /// Contact point, world space.
    pub position: Vec3,
    /// Contact normal pointing from `body_b` toward `body_a`.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
    /// Magnitude of the applied normal impulse.
    pub applied_impulse: f32,
    /// Closing speed along the normal.
    pub impact_velocity: f32,
}

/// Counters describing the world's current occupancy.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorldStats {
    /// Total objects.
    pub objects: usize,
    /// Grid-registered statics.
    pub statics: usize,
    /// Moveable objects (bodies and ghosts).
    pub moveables: usize,
    /// Allocated broadphase cells.
    pub allocated_cells: usize,
    /// Collision events waiting to be drained.
    pub queued_events: usize,
}

/// The simulation world.
pub struct PhysicsWorld {
    config: WorldConfig,
    pub(crate) objects: SlotMap<ObjectKey, CollisionObject>,
    statics: Vec<ObjectKey>,
    moveables: Vec<ObjectKey>,
    pub(crate) grid: Option<BroadphaseGrid<ObjectKey>>,
    pub(crate) surfaces: SurfaceRegistry,
    constraints: Vec<Box<dyn Constraint>>,
    controllers: Vec<Box<dyn Controller>>,
    events: VecDeque<WorldCollisionEvent>,
    moving: Vec<ObjectKey>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl PhysicsWorld {
    /// Creates a world with no broadphase grid; call [`Self::init_grid`]
    /// before stepping.
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            objects: SlotMap::with_key(),
            statics: Vec::new(),
            moveables: Vec::new(),
            grid: None,
            surfaces: SurfaceRegistry::new(),
            constraints: Vec::new(),
            controllers: Vec::new(),
            events: VecDeque::new(),
            moving: Vec::new(),
        }
    }

    /// World tuning values.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Mutable tuning values.
    pub fn config_mut(&mut self) -> &mut WorldConfig {
        &mut self.config
    }

    /// The surface parameter registry.
    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// Mutable surface registry.
    pub fn surfaces_mut(&mut self) -> &mut SurfaceRegistry {
        &mut self.surfaces
    }

    /// Replaces the surface registry, e.g. after loading a level table.
    pub fn set_surfaces(&mut self, surfaces: SurfaceRegistry) {
        self.surfaces = surfaces;
    }

    /// The broadphase grid, when initialized.
    pub fn grid(&self) -> Option<&BroadphaseGrid<ObjectKey>> {
        self.grid.as_ref()
    }

    /// Creates the broadphase grid and registers every existing object.
    pub fn init_grid(&mut self, world_size: Vec2, cell_size: f32) {
        let mut grid = BroadphaseGrid::new(world_size, cell_size);
        for &key in &self.statics {
            if let Some(object) = self.objects.get_mut(key) {
                let bounds = object.world_bounds();
                let pos = object.position.to_vec3();
                object.static_ref = grid.add_static(key, pos, &bounds);
                if object.static_ref.is_none() {
                    warn!(?pos, "static object outside world bounds, not registered");
                }
            }
        }
        for &key in &self.moveables {
            if let Some(object) = self.objects.get_mut(key) {
                object.cell = grid.place_dynamic(key, object.position.to_vec3());
            }
        }
        self.grid = Some(grid);
    }

    /// Drops the broadphase grid. The simulation stops stepping until a
    /// grid exists again; objects keep their state.
    pub fn destroy_grid(&mut self) {
        self.grid = None;
        for (_, object) in &mut self.objects {
            object.cell = None;
            object.static_ref = None;
        }
    }

    fn registers_as_static(object: &CollisionObject) -> bool {
        match object.kind {
            ObjectKind::Static => true,
            // Mesh ghosts cover fixed regions; they live with the statics.
            ObjectKind::Ghost => matches!(object.shape, ShapeHandle::Mesh(_)),
            ObjectKind::Dynamic(_) => false,
        }
    }

    /// Adds an object to the world and registers it in the grid.
    pub fn add_object(&mut self, object: CollisionObject) -> ObjectKey {
        let grid_static = Self::registers_as_static(&object);
        let key = self.objects.insert(object);
        if grid_static {
            self.statics.push(key);
            if let Some(grid) = &mut self.grid {
                let object = &mut self.objects[key];
                let bounds = object.world_bounds();
                let pos = object.position.to_vec3();
                object.static_ref = grid.add_static(key, pos, &bounds);
                if object.static_ref.is_none() {
                    warn!(?pos, "static object outside world bounds, not registered");
                }
            }
        } else {
            self.moveables.push(key);
            if let Some(grid) = &mut self.grid {
                let object = &mut self.objects[key];
                object.cell = grid.place_dynamic(key, object.position.to_vec3());
            }
        }
        key
    }

    /// Removes an object and returns it, unregistering it from the grid.
    pub fn remove_object(&mut self, key: ObjectKey) -> Option<CollisionObject> {
        let mut object = self.objects.remove(key)?;
        if let Some(grid) = &mut self.grid {
            if let Some(static_ref) = object.static_ref.take() {
                grid.remove_static(key, &static_ref);
            }
            if let Some(cell) = object.cell.take() {
                grid.remove_dynamic(key, cell);
            }
        }
        self.statics.retain(|k| *k != key);
        self.moveables.retain(|k| *k != key);
        object.static_ref = None;
        object.cell = None;
        Some(object)
    }

    /// Removes and drops an object.
    pub fn destroy_object(&mut self, key: ObjectKey) {
        let _ = self.remove_object(key);
    }

    /// Looks up an object.
    pub fn object(&self, key: ObjectKey) -> Option<&CollisionObject> {
        self.objects.get(key)
    }

    /// Mutable object lookup.
    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut CollisionObject> {
        self.objects.get_mut(key)
    }

    /// Number of objects in the world.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns true when `key` names a live moveable (body or convex
    /// ghost). Linear over the moveable list; intended for debug asserts.
    pub fn is_valid_body(&self, key: ObjectKey) -> bool {
        self.moveables.contains(&key) && self.objects.contains_key(key)
    }

    /// Returns true when `key` names a live grid-registered static.
    /// Linear over the static list; intended for debug asserts.
    pub fn is_valid_static_object(&self, key: ObjectKey) -> bool {
        self.statics.contains(&key) && self.objects.contains_key(key)
    }

    /// Puts a body back into the simulated moveable set. Idempotent; fires
    /// the object's `on_start_move` callback when the set changes.
    pub fn add_to_moveable_list(&mut self, key: ObjectKey) {
        if self.moveables.contains(&key) {
            return;
        }
        let Some(object) = self.objects.get_mut(key) else {
            return;
        };
        if Self::registers_as_static(object) {
            return;
        }
        self.moveables.push(key);
        if let Some(grid) = &mut self.grid {
            // The object may have been teleported while paused.
            if let Some(old) = object.cell.take() {
                grid.remove_dynamic(key, old);
            }
            object.cell = grid.place_dynamic(key, object.position.to_vec3());
        }
        if let Some(mut callbacks) = object.callbacks.take() {
            callbacks.on_start_move(object);
            object.callbacks = Some(callbacks);
        }
    }

    /// Takes a body out of the simulated moveable set without removing it
    /// from the world. Idempotent; fires `on_stop_move` when the set
    /// changes. The object stays in its grid cell so queries and neighbors
    /// still find it.
    pub fn remove_from_moveable_list(&mut self, key: ObjectKey) {
        let Some(i) = self.moveables.iter().position(|k| *k == key) else {
            return;
        };
        self.moveables.swap_remove(i);
        if let Some(object) = self.objects.get_mut(key) {
            if let Some(mut callbacks) = object.callbacks.take() {
                callbacks.on_stop_move(object);
                object.callbacks = Some(callbacks);
            }
        }
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    /// Drops every constraint.
    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    /// Adds a controller.
    pub fn add_controller(&mut self, controller: Box<dyn Controller>) {
        self.controllers.push(controller);
    }

    /// Drops every controller.
    pub fn clear_controllers(&mut self) {
        self.controllers.clear();
    }

    /// Snapshot of every moveable's cached world AABB, for debug drawing.
    pub fn body_world_aabbs(&self) -> Vec<(ObjectKey, camber_core::Aabb3)> {
        self.moveables
            .iter()
            .filter_map(|&key| self.objects.get(key).map(|o| (key, o.cached_bounds())))
            .collect()
    }

    /// Drains the world-level collision event queue.
    pub fn drain_events(&mut self) -> impl Iterator<Item = WorldCollisionEvent> + '_ {
        self.events.drain(..)
    }

    /// Occupancy counters for diagnostics.
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            objects: self.objects.len(),
            statics: self.statics.len(),
            moveables: self.moveables.len(),
            allocated_cells: self.grid.as_ref().map_or(0, |g| g.allocated_cells()),
            queued_events: self.events.len(),
        }
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advances the simulation by `dt`.
    ///
    /// `iteration` distinguishes substeps when the caller splits a frame.
    /// `pre_integrate` runs between integration and collision detection,
    /// the slot where gameplay applies steering and engine forces.
    pub fn simulate_step(
        &mut self,
        dt: f32,
        iteration: u32,
        mut pre_integrate: Option<&mut dyn FnMut(&mut PhysicsWorld, f32, u32)>,
    ) {
        if self.grid.is_none() {
            return;
        }

        let mut constraints = std::mem::take(&mut self.constraints);
        for constraint in constraints.iter_mut().filter(|c| c.enabled()) {
            constraint.pre_apply(self, dt);
        }
        constraints.append(&mut self.constraints);
        self.constraints = constraints;

        let mut controllers = std::mem::take(&mut self.controllers);
        for controller in controllers.iter_mut().filter(|c| c.enabled()) {
            controller.update(self, dt);
        }
        controllers.append(&mut self.controllers);
        self.controllers = controllers;

        let mut moving = std::mem::take(&mut self.moving);
        moving.clear();
        let moveables = self.moveables.clone();
        for &key in &moveables {
            if let Some(object) = self.objects.get_mut(key) {
                if let Some(mut callbacks) = object.callbacks.take() {
                    callbacks.pre_simulate(object, dt);
                    object.callbacks = Some(callbacks);
                }
                object.contact_pairs.clear();
            }
            self.integrate_single(key, dt);
            if let Some(object) = self.objects.get(key) {
                if object.body().map_or(false, |b| !b.frozen) {
                    moving.push(key);
                }
            }
        }

        if let Some(pre) = pre_integrate.as_deref_mut() {
            pre(self, dt, iteration);
        }

        for &key in &moving {
            self.detect_collisions_single(key);
        }

        for &key in &moving {
            if let Some(object) = self.objects.get_mut(key) {
                object.post_step_update(dt);
            }
        }

        for &key in &moving {
            let pairs = match self.objects.get_mut(key) {
                Some(object) => std::mem::take(&mut object.contact_pairs),
                None => continue,
            };
            for pair in &pairs {
                self.process_contact_pair(pair);
            }
            if let Some(object) = self.objects.get_mut(key) {
                // Pairs stay inspectable until the next step clears them.
                object.contact_pairs = pairs;
                if let Some(mut callbacks) = object.callbacks.take() {
                    callbacks.post_simulate(object, dt);
                    object.callbacks = Some(callbacks);
                }
            }
        }

        let mut constraints = std::mem::take(&mut self.constraints);
        for constraint in constraints.iter_mut().filter(|c| c.enabled()) {
            constraint.apply(self, dt);
        }
        constraints.append(&mut self.constraints);
        self.constraints = constraints;

        self.moving = moving;
    }

    /// Integrates one moveable and re-places it in its grid cell.
    ///
    /// Frozen bodies that lost their cell (e.g. after a grid rebuild) are
    /// still placed so queries and neighbors can find them.
    fn integrate_single(&mut self, key: ObjectKey, dt: f32) {
        let Some(grid) = self.grid.as_mut() else {
            return;
        };
        let Some(object) = self.objects.get_mut(key) else {
            return;
        };
        let old_cell = object.cell;
        object.integrate(dt);
        let (frozen, integrated) = match object.body() {
            Some(body) => (body.frozen, body.can_integrate(true)),
            None => (false, true),
        };
        if (!frozen && integrated) || (old_cell.is_none() && frozen) {
            let pos = object.position.to_vec3();
            if let Some(old) = object.cell.take() {
                grid.remove_dynamic(key, old);
            }
            object.cell = grid.place_dynamic(key, pos);
            if object.cell.is_none() {
                warn!(?pos, "object left the world grid");
            }
        }
    }

    // ========================================================================
    // Detection
    // ========================================================================

    fn detect_collisions_single(&mut self, key: ObjectKey) {
        let (bounds, check_dynamics, last_dt) = {
            let Some(object) = self.objects.get_mut(key) else {
                return;
            };
            let Some(body) = object.body() else {
                return;
            };
            if body.frozen || !body.can_integrate(false) {
                return;
            }
            let last_dt = body.last_frame_time;
            let check_dynamics = object.policy.check_collisions;
            (object.world_bounds(), check_dynamics, last_dt)
        };
        let Some(grid) = self.grid.as_ref() else {
            return;
        };
        let range = grid.find_box_range(&bounds, BOX_RANGE_TOLERANCE);
        let mut static_candidates: Vec<ObjectKey> = Vec::new();
        let mut dynamic_candidates: Vec<ObjectKey> = Vec::new();
        for (x, z) in range.iter() {
            let Some(cell) = grid.cell_at(x, z) else {
                continue;
            };
            // Statics never reach above the cell's recorded height ceiling;
            // a body passing entirely over it skips them.
            if bounds.min.y <= cell.max_static_height
                && bounds.max.y >= -cell.max_static_height
            {
                for &other in &cell.statics {
                    if !static_candidates.contains(&other) {
                        static_candidates.push(other);
                    }
                }
            }
            if check_dynamics {
                for &other in &cell.dynamics {
                    if other != key && !dynamic_candidates.contains(&other) {
                        dynamic_candidates.push(other);
                    }
                }
            }
        }
        for other in static_candidates {
            self.detect_static_vs_body(other, key, last_dt);
        }
        for other in dynamic_candidates {
            if self.objects.get(other).map_or(false, CollisionObject::is_dynamic) {
                self.detect_body_collisions(key, other, last_dt);
            } else {
                self.detect_static_vs_body(other, key, last_dt);
            }
        }
    }

    /// Tests two rigid bodies and stores contacts on the first.
    fn detect_body_collisions(&mut self, a_key: ObjectKey, b_key: ObjectKey, _dt: f32) {
        let Some([obj_a, obj_b]) = self.objects.get_disjoint_mut([a_key, b_key]) else {
            return;
        };
        if !obj_a.can_collide_with(obj_b) {
            return;
        }
        if obj_a.contact_pairs.len() >= MAX_CONTACT_PAIRS {
            return;
        }
        let delta = obj_a.position.delta(obj_b.position);
        let bounds_a = obj_a.world_bounds();
        let bounds_b = obj_b.world_bounds();
        if delta.length_squared()
            > bounds_a.size().length_squared() + bounds_b.size().length_squared()
        {
            return;
        }
        // The partner may have found this pair already from its own side.
        if obj_b
            .contact_pairs
            .iter()
            .any(|p| p.body_a == b_key && p.body_b == a_key)
        {
            return;
        }
        let base = obj_a.position;
        let b_rel = obj_b.position.delta(base);
        let mut contacts = Vec::new();
        collect_contacts(
            &obj_a.shape,
            Vec3::ZERO,
            obj_a.orientation,
            &obj_b.shape,
            b_rel,
            obj_b.orientation,
            |_| true,
            &mut contacts,
        );
        if contacts.is_empty() {
            return;
        }
        let fraction = 1.0 / contacts.len() as f32;
        for contact in contacts {
            if obj_a.contact_pairs.len() >= MAX_CONTACT_PAIRS {
                break;
            }
            if contact.depth < 0.0 {
                continue;
            }
            obj_a.contact_pairs.push(ContactPair {
                body_a: a_key,
                body_b: b_key,
                normal: contact.normal,
                position: contact.position,
                base,
                depth: contact.depth,
                dt_fraction: fraction,
                restitution_a: obj_a.restitution,
                friction_a: obj_a.friction,
                restitution_b: obj_b.restitution,
                friction_b: obj_b.friction,
                surface_id: contact.surface_id.unwrap_or(obj_a.surface_id),
                a_static: false,
            });
        }
    }

    /// Tests an immovable object (static or ghost) against a rigid body and
    /// stores contacts on the body.
    fn detect_static_vs_body(&mut self, static_key: ObjectKey, body_key: ObjectKey, _dt: f32) {
        let Some([obj_s, obj_b]) = self.objects.get_disjoint_mut([static_key, body_key]) else {
            return;
        };
        if !obj_s.can_collide_with(obj_b) {
            return;
        }
        if obj_b.contact_pairs.len() >= MAX_CONTACT_PAIRS {
            return;
        }
        let bounds_s = obj_s.world_bounds();
        let bounds_b = obj_b.world_bounds();
        if !bounds_s.intersects(&bounds_b) {
            return;
        }
        let base = obj_s.position;
        let b_rel = obj_b.position.delta(base);
        let body_contents = obj_b.policy.contents;
        let surfaces = &self.surfaces;
        let ghost_pair = obj_s.is_ghost();
        let mut contacts = Vec::new();
        collect_contacts(
            &obj_s.shape,
            Vec3::ZERO,
            obj_s.orientation,
            &obj_b.shape,
            b_rel,
            obj_b.orientation,
            |surface_id| match surface_id {
                Some(id) => surfaces
                    .get(id)
                    .map_or(true, |s| s.contents_mask & body_contents == body_contents),
                None => true,
            },
            &mut contacts,
        );
        if contacts.is_empty() {
            return;
        }
        let fraction = 1.0 / contacts.len() as f32;
        for contact in contacts {
            if obj_b.contact_pairs.len() >= MAX_CONTACT_PAIRS {
                break;
            }
            if contact.depth < 0.0 && !ghost_pair {
                continue;
            }
            let depth = contact.depth.min(1.0);
            let surface_id = contact.surface_id.unwrap_or(obj_s.surface_id);
            let (surf_friction, surf_restitution) = surfaces
                .get(surface_id)
                .map_or((1.0, 1.0), |s| (s.friction, s.restitution));
            obj_b.contact_pairs.push(ContactPair {
                body_a: static_key,
                body_b: body_key,
                normal: contact.normal,
                position: contact.position,
                base,
                depth,
                dt_fraction: fraction,
                restitution_a: surf_restitution * obj_s.restitution,
                friction_a: surf_friction * obj_s.friction,
                restitution_b: obj_b.restitution,
                friction_b: obj_b.friction,
                surface_id,
                a_static: true,
            });
        }
    }

    // ========================================================================
    // Solver
    // ========================================================================

    fn process_contact_pair(&mut self, pair: &ContactPair) {
        let erp_base = self.config.erp;
        let car_erp = self.config.car_vs_car_erp;
        let Some([obj_a, obj_b]) = self.objects.get_disjoint_mut([pair.body_a, pair.body_b])
        else {
            return;
        };
        if !obj_b.is_dynamic() {
            return;
        }
        let n = pair.normal;
        let a_movable = !pair.a_static && obj_a.is_dynamic();
        let erp_offset = (obj_a.erp_offset + obj_b.erp_offset).max(0.0);

        let mut applied = 0.0;
        let impact_velocity;

        if !a_movable {
            let rel_b = obj_b.position.delta(pair.base) - pair.position;
            impact_velocity = obj_b
                .body()
                .map_or(0.0, |b| b.point_velocity(rel_b).dot(n).abs());
            if obj_a.policy.response && obj_b.policy.response && pair.depth > 0.0 {
                let erp = erp_base + erp_offset;
                let positional_error = pair.depth * pair.dt_fraction;
                // The normal points toward the immovable side; push B the
                // other way.
                let correction = -n * (positional_error * erp);
                obj_b.position = obj_b.position.offset(correction);
                if let Some(body) = obj_b.body_mut() {
                    body.prev_position = body.prev_position.offset(correction);
                }
                obj_b.mark_moved();
                applied =
                    apply_impulse_response(obj_a, obj_b, pair, positional_error * erp * 2.0);
            }
        } else {
            let rel_a = obj_a.position.delta(pair.base) - pair.position;
            let rel_b = obj_b.position.delta(pair.base) - pair.position;
            let vel_a = obj_a.body().map_or(Vec3::ZERO, |b| b.point_velocity(rel_a));
            let vel_b = obj_b.body().map_or(Vec3::ZERO, |b| b.point_velocity(rel_b));
            impact_velocity = (vel_a - vel_b).dot(n).abs();
            let car_pair = obj_a.body().map_or(false, |b| b.car)
                && obj_b.body().map_or(false, |b| b.car);
            let erp = if car_pair { car_erp } else { erp_base } + erp_offset;
            let positional_error = pair.depth * pair.dt_fraction;
            if pair.depth > 0.0 {
                let correction = n * (positional_error * erp);
                if obj_a.policy.response
                    && obj_b.policy.response
                    && obj_a
                        .body()
                        .map_or(false, |b| !b.force_frozen && !b.infinite_mass)
                {
                    obj_a.position = obj_a.position.offset(correction);
                    if let Some(body) = obj_a.body_mut() {
                        body.prev_position = body.prev_position.offset(correction);
                    }
                    obj_a.mark_moved();
                }
                if obj_b.policy.response
                    && obj_a.policy.response
                    && obj_b
                        .body()
                        .map_or(false, |b| !b.force_frozen && !b.infinite_mass)
                {
                    obj_b.position = obj_b.position.offset(-correction);
                    if let Some(body) = obj_b.body_mut() {
                        body.prev_position = body.prev_position.offset(-correction);
                    }
                    obj_b.mark_moved();
                }
            }
            applied =
                2.0 * apply_impulse_response(obj_a, obj_b, pair, positional_error * erp * 2.0);
        }

        // Ghost contacts keep negative depth for proximity reporting; only
        // solid pairs require penetration before an event fires.
        if pair.depth <= 0.0 && !obj_a.is_ghost() {
            return;
        }
        let position = pair.base.to_vec3() + pair.position;
        let event_a = CollisionEvent {
            other: pair.body_b,
            position,
            normal: n,
            depth: pair.depth,
            applied_impulse: applied,
            impact_velocity,
            other_no_response: !obj_b.policy.response,
        };
        let event_b = CollisionEvent {
            other: pair.body_a,
            position,
            normal: -n,
            depth: pair.depth,
            applied_impulse: applied,
            impact_velocity,
            other_no_response: !obj_a.policy.response,
        };
        if let Some(mut callbacks) = obj_a.callbacks.take() {
            callbacks.on_collide(obj_a, &event_a);
            obj_a.callbacks = Some(callbacks);
        }
        obj_a.push_event(event_a);
        if let Some(mut callbacks) = obj_b.callbacks.take() {
            callbacks.on_collide(obj_b, &event_b);
            obj_b.callbacks = Some(callbacks);
        }
        obj_b.push_event(event_b);

        self.events.push_back(WorldCollisionEvent {
            body_a: pair.body_a,
            body_b: pair.body_b,
            position,
            normal: n,
            depth: pair.depth,
            applied_impulse: applied,
            impact_velocity,
        });
    }
}

/// Resolves one contact with a restitution-scaled normal impulse and a
/// Coulomb friction impulse, waking the bodies it moves.
///
/// `error_correction` is the non-negative Baumgarte term added to the
/// impulse; the normal impulse itself never pulls the bodies together.
/// Returns the applied normal impulse magnitude.
fn apply_impulse_response(
    obj_a: &mut CollisionObject,
    obj_b: &mut CollisionObject,
    pair: &ContactPair,
    error_correction: f32,
) -> f32 {
    let n = pair.normal;
    let rel_a = obj_a.position.delta(pair.base) - pair.position;
    let rel_b = obj_b.position.delta(pair.base) - pair.position;

    let a_participates = !pair.a_static && obj_a.is_dynamic();
    let vel_a = if a_participates {
        obj_a.body().map_or(Vec3::ZERO, |b| b.point_velocity(rel_a))
    } else {
        Vec3::ZERO
    };
    let vel_b = obj_b.body().map_or(Vec3::ZERO, |b| b.point_velocity(rel_b));
    let contact_velocity = vel_b - vel_a;

    let mut denominator = 0.0;
    if a_participates {
        if let Some(body) = obj_a.body() {
            if !body.force_frozen {
                denominator += body.impulse_denominator(rel_a, n);
            }
        }
    }
    if let Some(body) = obj_b.body() {
        if !body.force_frozen {
            denominator += body.impulse_denominator(rel_b, n);
        }
    }
    if denominator < DENOMINATOR_EPSILON {
        return 0.0;
    }

    let combined_restitution = 1.0 + pair.restitution_a + pair.restitution_b;
    let combined_friction = (pair.friction_a + pair.friction_b) * 0.5;

    let impulse_speed = contact_velocity.dot(n);
    let penetration_term = error_correction / denominator;
    let velocity_term = impulse_speed / denominator;
    let restitution_term = impulse_speed * combined_restitution / denominator;

    let normal_impulse = (penetration_term + velocity_term).max(0.0);
    let normal_impulse_rest = (penetration_term + restitution_term).max(0.0);
    let impulse_vector = n * normal_impulse_rest;
    let friction = friction_impulse(
        n,
        contact_velocity,
        normal_impulse,
        denominator,
        combined_friction,
        combined_friction,
    );

    let a_infinite = obj_a.body().map_or(false, |b| b.infinite_mass);
    let b_infinite = obj_b.body().map_or(false, |b| b.infinite_mass);
    let b_moveable = obj_b.is_dynamic();

    if a_participates
        && obj_a.policy.response
        && obj_b.policy.response
        && !(a_infinite && b_moveable)
    {
        if let Some(body) = obj_a.body_mut() {
            if !body.force_frozen {
                body.apply_impulse(rel_a, impulse_vector - friction);
                body.try_wake(true);
            }
        }
    }
    if b_moveable
        && obj_b.policy.response
        && obj_a.policy.response
        && !(b_infinite && a_participates)
    {
        if let Some(body) = obj_b.body_mut() {
            if !body.force_frozen {
                body.apply_impulse(rel_b, -impulse_vector + friction);
                body.try_wake(true);
            }
        }
    }
    normal_impulse
}

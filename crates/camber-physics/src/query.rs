//! Ray and convex-sweep queries over the broadphase grid.
//!
//! Queries walk the cells under the segment and test each cell's occupants
//! exactly. The walk carries a closest-hit cutoff: once two visited cells
//! in a row fail to improve the best hit (or lie entirely beyond it), the
//! walk stops early.

use camber_core::{Aabb3, FixedVec3};
use camber_shapes::{ray_cast, shape_cast, SharedShape};
use camber_spatial::{walk_grid_line, BroadphaseGrid};
use glam::{Quat, Vec3};

use crate::error::PhysicsError;
use crate::object::{CollisionObject, ObjectKey};
use crate::world::PhysicsWorld;

/// Cells that may fail to improve the closest hit before the walk stops.
const MAX_CLOSEST_TRIES: u32 = 2;

/// Result of a ray or sweep query.
#[derive(Debug, Clone, Copy)]
pub struct CollisionInfo {
    /// Hit parameter along the segment, in `[0, 1]`.
    pub fraction: f32,
    /// Hit point, world space.
    pub position: Vec3,
    /// Surface normal at the hit.
    pub normal: Vec3,
    /// The object that was hit.
    pub object: Option<ObjectKey>,
    /// Surface id of the hit material.
    pub surface_id: i32,
}

/// Whether the filter's lists exclude or select candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Listed objects and user ids are skipped.
    Exclude,
    /// Only listed objects and user ids are tested. Empty lists make the
    /// filter inert.
    IncludeOnly,
}

/// Candidate filtering for queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryFilter<'a> {
    /// How the lists are interpreted.
    pub mode: FilterMode,
    /// Objects the lists name directly.
    pub objects: &'a [ObjectKey],
    /// Gameplay user ids the lists name.
    pub user_ids: &'a [u64],
    /// Test static objects.
    pub include_statics: bool,
    /// Test dynamic objects and ghosts.
    pub include_dynamics: bool,
    /// Hit objects that opted out of raycasts.
    pub force_raycast: bool,
    /// Contents bits that disqualify a candidate outright.
    pub ignore_contents_mask: u32,
}

impl Default for QueryFilter<'_> {
    fn default() -> Self {
        Self {
            mode: FilterMode::Exclude,
            objects: &[],
            user_ids: &[],
            include_statics: true,
            include_dynamics: true,
            force_raycast: false,
            ignore_contents_mask: 0,
        }
    }
}

impl QueryFilter<'_> {
    fn allows(&self, key: ObjectKey, object: &CollisionObject) -> bool {
        if self.ignore_contents_mask & object.policy.contents != 0 {
            return false;
        }
        let is_static = !object.is_dynamic() && !object.is_ghost();
        if is_static && !self.include_statics {
            return false;
        }
        if !is_static && !self.include_dynamics {
            return false;
        }
        let listed = self.objects.contains(&key)
            || object
                .user_id
                .map_or(false, |id| self.user_ids.contains(&id));
        match self.mode {
            FilterMode::Exclude => !listed,
            FilterMode::IncludeOnly => {
                listed || (self.objects.is_empty() && self.user_ids.is_empty())
            }
        }
    }
}

struct QueryContext<'a> {
    start: FixedVec3,
    end: FixedVec3,
    start_w: Vec3,
    end_w: Vec3,
    ray_box: Aabb3,
    ray_mask: u32,
    filter: &'a QueryFilter<'a>,
    swept: Option<(&'a SharedShape, Quat)>,
}

impl PhysicsWorld {
    /// Casts a ray from `start` to `end` against objects whose contents
    /// match `ray_mask`. Returns the closest hit, or `None` on a miss or
    /// when no grid exists.
    pub fn test_line_collision(
        &self,
        start: FixedVec3,
        end: FixedVec3,
        ray_mask: u32,
        filter: &QueryFilter<'_>,
    ) -> Option<CollisionInfo> {
        let start_w = start.to_vec3();
        let end_w = end.to_vec3();
        let mut ray_box = Aabb3::EMPTY;
        ray_box.union_point(start_w);
        ray_box.union_point(end_w);
        self.run_query(QueryContext {
            start,
            end,
            start_w,
            end_w,
            ray_box,
            ray_mask,
            filter,
            swept: None,
        })
    }

    /// Sweeps a convex shape from `start` to `end` with a fixed rotation.
    ///
    /// Non-convex shapes (compounds, meshes) are rejected.
    pub fn test_convex_sweep(
        &self,
        swept: &SharedShape,
        rotation: Quat,
        start: FixedVec3,
        end: FixedVec3,
        ray_mask: u32,
        filter: &QueryFilter<'_>,
    ) -> Result<Option<CollisionInfo>, PhysicsError> {
        if swept.as_compound().is_some() || swept.as_support_map().is_none() {
            return Err(PhysicsError::NonConvexSweep);
        }
        let start_w = start.to_vec3();
        let end_w = end.to_vec3();
        let mut ray_box = Aabb3::EMPTY;
        ray_box.union_point(start_w);
        ray_box.union_point(end_w);
        // Inflate by the swept shape's full extent so boundary objects are
        // still candidates.
        let local = swept.compute_local_aabb();
        let size = Vec3::new(
            local.maxs.x - local.mins.x,
            local.maxs.y - local.mins.y,
            local.maxs.z - local.mins.z,
        );
        ray_box.min -= size;
        ray_box.max += size;
        Ok(self.run_query(QueryContext {
            start,
            end,
            start_w,
            end_w,
            ray_box,
            ray_mask,
            filter,
            swept: Some((swept, rotation)),
        }))
    }

    fn run_query(&self, ctx: QueryContext<'_>) -> Option<CollisionInfo> {
        let grid = self.grid.as_ref()?;
        let mut best = CollisionInfo {
            fraction: f32::MAX,
            position: ctx.end_w,
            normal: Vec3::ZERO,
            object: None,
            surface_id: -1,
        };
        let mut seen: Vec<ObjectKey> = Vec::new();

        let start_cell = grid.world_to_cell(ctx.start_w);
        let end_cell = grid.world_to_cell(ctx.end_w);
        let start_coord = (start_cell.x.floor() as i32, start_cell.y.floor() as i32);
        let end_coord = (end_cell.x.floor() as i32, end_cell.y.floor() as i32);

        if start_coord == end_coord {
            self.test_on_cell(grid, start_coord.0, start_coord.1, &ctx, &mut best, &mut seen);
        } else {
            let mut closest_tries = 0;
            walk_grid_line(start_cell, end_cell, |x, z| {
                if !self.test_on_cell(grid, x, z, &ctx, &mut best, &mut seen) {
                    closest_tries += 1;
                }
                closest_tries < MAX_CLOSEST_TRIES
            });
        }

        if best.fraction <= 1.0 {
            best.fraction = best.fraction.max(0.0);
            Some(best)
        } else {
            None
        }
    }

    /// Tests one cell's occupants. Returns false when the cell improved the
    /// closest hit or lies entirely beyond it, which feeds the walk cutoff.
    fn test_on_cell(
        &self,
        grid: &BroadphaseGrid<ObjectKey>,
        x: i32,
        z: i32,
        ctx: &QueryContext<'_>,
        best: &mut CollisionInfo,
        seen: &mut Vec<ObjectKey>,
    ) -> bool {
        let Some(cell) = grid.cell_at(x, z) else {
            return true;
        };
        let bounds = grid.cell_bounds(x, z);
        if let Some((tnear, _)) = bounds.intersects_segment_xz(ctx.start_w, ctx.end_w) {
            if tnear > best.fraction {
                return false;
            }
        }
        // Statics never reach above the cell's recorded height ceiling, so
        // a query passing entirely over it can skip them.
        let statics_in_reach =
            ctx.ray_box.min.y <= bounds.max.y && ctx.ray_box.max.y >= bounds.min.y;
        let mut hit = false;
        let mut hit_closest = false;
        let mut test = |keys: &[ObjectKey], seen: &mut Vec<ObjectKey>| {
            for &key in keys {
                if seen.contains(&key) {
                    continue;
                }
                let Some(result) = self.test_object(key, ctx) else {
                    continue;
                };
                hit = true;
                seen.push(key);
                if result.fraction < best.fraction {
                    *best = result;
                    hit_closest = true;
                }
            }
        };
        if ctx.filter.include_statics && statics_in_reach {
            test(&cell.statics, seen);
        }
        if ctx.filter.include_dynamics {
            test(&cell.dynamics, seen);
        }
        if hit {
            !hit_closest
        } else {
            true
        }
    }

    fn test_object(&self, key: ObjectKey, ctx: &QueryContext<'_>) -> Option<CollisionInfo> {
        let object = self.objects.get(key)?;
        if !ctx.filter.force_raycast && !object.policy.raycast {
            return None;
        }
        if ctx.ray_mask & object.policy.contents == 0 {
            return None;
        }
        if !ctx.filter.allows(key, object) {
            return None;
        }
        if !object.cached_bounds().intersects(&ctx.ray_box) {
            return None;
        }
        // Cast in the object's translated frame so the fixed-point delta
        // keeps precision far from the origin.
        let local_start = ctx.start.delta(object.position);
        let local_end = ctx.end.delta(object.position);
        let surfaces = &self.surfaces;
        let mask = ctx.ray_mask;
        let part_filter = |surface_id: Option<i32>| match surface_id {
            Some(id) => surfaces
                .get(id)
                .map_or(true, |s| s.contents_mask & mask == mask),
            None => true,
        };
        let hit = match ctx.swept {
            None => ray_cast(
                &object.shape,
                Vec3::ZERO,
                object.orientation,
                local_start,
                local_end,
                part_filter,
            ),
            Some((shape, rotation)) => shape_cast(
                &object.shape,
                Vec3::ZERO,
                object.orientation,
                shape,
                rotation,
                local_start,
                local_end,
                part_filter,
            ),
        }?;
        Some(CollisionInfo {
            fraction: hit.fraction,
            position: hit.position + object.position.to_vec3(),
            normal: hit.normal,
            object: Some(key),
            surface_id: hit.surface_id.unwrap_or(object.surface_id),
        })
    }
}

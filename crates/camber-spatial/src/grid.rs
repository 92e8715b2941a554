//! Lazily allocated uniform grid over the XZ plane.

use camber_core::Aabb3;
use glam::{Vec2, Vec3};
use slotmap::{new_key_type, SlotMap};
use tracing::warn;

new_key_type! {
    /// Generational key for an allocated grid cell.
    ///
    /// Objects hold their cell key instead of a pointer; a key left behind
    /// after the cell is freed simply fails the generation check on lookup.
    pub struct CellKey;
}

/// Inclusive rectangle of cell coordinates.
///
/// Coordinates are not clamped to the grid; out-of-range cells are skipped
/// by the bounds-checked accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// Minimum X cell coordinate.
    pub min_x: i32,
    /// Minimum Z cell coordinate.
    pub min_z: i32,
    /// Maximum X cell coordinate.
    pub max_x: i32,
    /// Maximum Z cell coordinate.
    pub max_z: i32,
}

impl CellRange {
    /// Iterates every (x, z) coordinate in the range.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let xs = self.min_x..=self.max_x;
        let zs = self.min_z..=self.max_z;
        zs.flat_map(move |z| xs.clone().map(move |x| (x, z)))
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        let w = (self.max_x - self.min_x + 1).max(0) as usize;
        let d = (self.max_z - self.min_z + 1).max(0) as usize;
        w * d
    }

    /// Returns true if the range covers no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where a static object lives in the grid.
#[derive(Debug, Clone, Copy)]
pub struct StaticCellRef {
    /// Home cell at the object's position.
    pub home: CellKey,
    /// Full rectangle of cells the object's bounds touch.
    pub range: CellRange,
}

/// One allocated grid cell.
#[derive(Debug)]
pub struct GridCell<K> {
    /// Static occupants registered over this cell.
    pub statics: Vec<K>,
    /// Dynamic occupants currently placed in this cell.
    pub dynamics: Vec<K>,
    /// Highest static AABB top seen in this cell, for query culling.
    pub max_static_height: f32,
}

impl<K> Default for GridCell<K> {
    fn default() -> Self {
        Self {
            statics: Vec::new(),
            dynamics: Vec::new(),
            max_static_height: 0.0,
        }
    }
}

/// Uniform broadphase grid over the XZ plane, centered on the origin.
///
/// `K` is the occupant key type. Cells are allocated on first use and
/// addressed either by integer (x, z) coordinate or by [`CellKey`].
#[derive(Debug)]
pub struct BroadphaseGrid<K> {
    cells: SlotMap<CellKey, GridCell<K>>,
    /// Dense row-major index, `width * depth` entries.
    index: Vec<Option<CellKey>>,
    width: i32,
    depth: i32,
    cell_size: f32,
    inv_cell_size: f32,
    /// World-space XZ position of cell (0, 0)'s min corner.
    origin: Vec2,
}

impl<K: Copy + PartialEq> BroadphaseGrid<K> {
    /// Creates a grid covering `world_size` units in X and Z, split into
    /// square cells of `cell_size` units.
    pub fn new(world_size: Vec2, cell_size: f32) -> Self {
        let width = (world_size.x / cell_size).ceil().max(1.0) as i32;
        let depth = (world_size.y / cell_size).ceil().max(1.0) as i32;
        let origin = Vec2::new(
            width as f32 * cell_size * -0.5,
            depth as f32 * cell_size * -0.5,
        );
        Self {
            cells: SlotMap::with_key(),
            index: vec![None; (width * depth) as usize],
            width,
            depth,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            origin,
        }
    }

    /// Grid width in cells (X axis).
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid depth in cells (Z axis).
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Cell edge length in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of currently allocated cells.
    pub fn allocated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Fractional cell coordinates of a world position.
    pub fn world_to_cell(&self, pos: Vec3) -> Vec2 {
        Vec2::new(
            (pos.x - self.origin.x) * self.inv_cell_size,
            (pos.z - self.origin.y) * self.inv_cell_size,
        )
    }

    /// Integer cell coordinates of a world position, if inside the grid.
    pub fn cell_coord(&self, pos: Vec3) -> Option<(i32, i32)> {
        let c = self.world_to_cell(pos);
        let (x, z) = (c.x.floor() as i32, c.y.floor() as i32);
        self.in_bounds(x, z).then_some((x, z))
    }

    /// Returns true if (x, z) addresses a cell inside the grid.
    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        x >= 0 && x < self.width && z >= 0 && z < self.depth
    }

    /// World-space bounds of a cell.
    ///
    /// The Y extent covers the tallest static registered in the cell, in
    /// both directions; an unallocated cell gets a zero-height slab.
    pub fn cell_bounds(&self, x: i32, z: i32) -> Aabb3 {
        let h = self
            .cell_key_at(x, z)
            .and_then(|k| self.cells.get(k))
            .map_or(0.0, |c| c.max_static_height);
        let min = Vec3::new(
            self.origin.x + x as f32 * self.cell_size,
            -h,
            self.origin.y + z as f32 * self.cell_size,
        );
        Aabb3::new(min, min + Vec3::new(self.cell_size, 2.0 * h, self.cell_size))
    }

    /// Rectangle of cells a bounding box touches.
    ///
    /// With a positive `tolerance`, boxes whose fractional position sits
    /// within `tolerance` of a cell edge extend the range one cell across
    /// that edge, so objects straddling a boundary are found from both
    /// sides. The result is not clamped to the grid.
    pub fn find_box_range(&self, bounds: &Aabb3, tolerance: f32) -> CellRange {
        let min = self.world_to_cell(bounds.min);
        let max = self.world_to_cell(bounds.max);
        let mut min_x = min.x.floor() as i32;
        let mut min_z = min.y.floor() as i32;
        let mut max_x = max.x.floor() as i32;
        let mut max_z = max.y.floor() as i32;
        if tolerance > 0.0 {
            if min.x - min.x.floor() < tolerance {
                min_x -= 1;
            }
            if min.y - min.y.floor() < tolerance {
                min_z -= 1;
            }
            if max.x - max.x.floor() > 1.0 - tolerance {
                max_x += 1;
            }
            if max.y - max.y.floor() > 1.0 - tolerance {
                max_z += 1;
            }
        }
        CellRange {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    /// Key of the allocated cell at (x, z), if any.
    pub fn cell_key_at(&self, x: i32, z: i32) -> Option<CellKey> {
        if !self.in_bounds(x, z) {
            return None;
        }
        self.index[(z * self.width + x) as usize]
    }

    /// The allocated cell at (x, z), if any.
    pub fn cell_at(&self, x: i32, z: i32) -> Option<&GridCell<K>> {
        self.cell_key_at(x, z).and_then(|k| self.cells.get(k))
    }

    /// Looks up a cell by key. Stale keys return `None`.
    pub fn cell(&self, key: CellKey) -> Option<&GridCell<K>> {
        self.cells.get(key)
    }

    /// Mutable lookup by key.
    pub fn cell_mut(&mut self, key: CellKey) -> Option<&mut GridCell<K>> {
        self.cells.get_mut(key)
    }

    /// Returns the cell at (x, z), allocating it if needed.
    ///
    /// Returns `None` when the coordinate is outside the grid.
    pub fn get_or_alloc_cell(&mut self, x: i32, z: i32) -> Option<CellKey> {
        if !self.in_bounds(x, z) {
            return None;
        }
        let slot = (z * self.width + x) as usize;
        if let Some(key) = self.index[slot] {
            return Some(key);
        }
        let key = self.cells.insert(GridCell::default());
        self.index[slot] = Some(key);
        Some(key)
    }

    /// Frees the cell at (x, z).
    ///
    /// Dynamic occupants are dropped from the grid; they re-place themselves
    /// on their next integration. Warns if statics are still registered.
    pub fn free_cell_at(&mut self, x: i32, z: i32) {
        let Some(key) = self.cell_key_at(x, z) else {
            return;
        };
        if let Some(cell) = self.cells.remove(key) {
            if !cell.statics.is_empty() {
                warn!(x, z, count = cell.statics.len(), "freed grid cell still had static occupants");
            }
        }
        self.index[(z * self.width + x) as usize] = None;
    }

    /// Registers a static object over every cell its bounds touch.
    ///
    /// The position must be inside the grid; the home cell is the one
    /// containing `position`. `bounds.max.y` raises each touched cell's
    /// static height ceiling. Returns `None` when the position is out of
    /// bounds.
    pub fn add_static(&mut self, key: K, position: Vec3, bounds: &Aabb3) -> Option<StaticCellRef> {
        let (hx, hz) = self.cell_coord(position)?;
        let home = self.get_or_alloc_cell(hx, hz)?;
        let range = self.find_box_range(bounds, 0.0);
        let top = bounds.max.y.abs().max(bounds.min.y.abs());
        for (x, z) in range.iter() {
            let Some(cell_key) = self.get_or_alloc_cell(x, z) else {
                continue;
            };
            let cell = &mut self.cells[cell_key];
            cell.statics.push(key);
            if top > cell.max_static_height {
                cell.max_static_height = top;
            }
        }
        Some(StaticCellRef { home, range })
    }

    /// Unregisters a static object from every cell in its stored range.
    ///
    /// Cells left without statics are freed.
    pub fn remove_static(&mut self, key: K, cell_ref: &StaticCellRef) {
        for (x, z) in cell_ref.range.iter() {
            let Some(cell_key) = self.cell_key_at(x, z) else {
                continue;
            };
            let Some(cell) = self.cells.get_mut(cell_key) else {
                continue;
            };
            match cell.statics.iter().position(|k| *k == key) {
                Some(i) => {
                    cell.statics.swap_remove(i);
                }
                None => {
                    warn!(x, z, "static object missing from grid cell on removal");
                }
            }
            if cell.statics.is_empty() {
                self.free_cell_at(x, z);
            }
        }
    }

    /// Places a dynamic object in the cell containing `position`,
    /// allocating the cell if needed. Returns the cell key, or `None` when
    /// the position is outside the grid.
    pub fn place_dynamic(&mut self, key: K, position: Vec3) -> Option<CellKey> {
        let (x, z) = self.cell_coord(position)?;
        let cell_key = self.get_or_alloc_cell(x, z)?;
        let cell = &mut self.cells[cell_key];
        if !cell.dynamics.contains(&key) {
            cell.dynamics.push(key);
        }
        Some(cell_key)
    }

    /// Removes a dynamic object from the cell it was placed in.
    ///
    /// A stale cell key is a no-op.
    pub fn remove_dynamic(&mut self, key: K, cell_key: CellKey) {
        if let Some(cell) = self.cells.get_mut(cell_key) {
            if let Some(i) = cell.dynamics.iter().position(|k| *k == key) {
                cell.dynamics.swap_remove(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> BroadphaseGrid<u32> {
        BroadphaseGrid::new(Vec2::splat(240.0), 24.0)
    }

    #[test]
    fn test_grid_is_origin_centered() {
        let g = grid();
        assert_eq!(g.width(), 10);
        assert_eq!(g.depth(), 10);
        assert_eq!(g.cell_coord(Vec3::ZERO), Some((5, 5)));
        assert_eq!(g.cell_coord(Vec3::new(-120.0, 0.0, -120.0)), Some((0, 0)));
        assert_eq!(g.cell_coord(Vec3::new(130.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_find_box_range_tolerance_extends_across_edges() {
        let g = grid();
        // Box inside one cell, but its min corner sits 0.5 units (fraction
        // ~0.02) from the cell edge.
        let b = Aabb3::new(Vec3::new(0.5, 0.0, 0.5), Vec3::new(10.0, 1.0, 10.0));
        let tight = g.find_box_range(&b, 0.0);
        assert_eq!((tight.min_x, tight.min_z, tight.max_x, tight.max_z), (5, 5, 5, 5));
        let loose = g.find_box_range(&b, 0.1);
        assert_eq!((loose.min_x, loose.min_z), (4, 4));
        assert_eq!((loose.max_x, loose.max_z), (5, 5));
    }

    #[test]
    fn test_static_spanning_two_cells() {
        let mut g = grid();
        // 30 units wide with 24-unit cells: always at least two cells in X.
        let b = Aabb3::new(Vec3::new(-15.0, 0.0, 1.0), Vec3::new(15.0, 5.0, 10.0));
        let cell_ref = g.add_static(7, Vec3::new(0.0, 0.0, 5.0), &b).unwrap();
        assert!(cell_ref.range.len() >= 2);
        for (x, z) in cell_ref.range.iter() {
            let cell = g.cell_at(x, z).unwrap();
            assert!(cell.statics.contains(&7));
            assert!(cell.max_static_height >= 5.0);
        }
        g.remove_static(7, &cell_ref);
        for (x, z) in cell_ref.range.iter() {
            assert!(g.cell_at(x, z).is_none());
        }
    }

    #[test]
    fn test_dynamic_placement_and_stale_key() {
        let mut g = grid();
        let cell = g.place_dynamic(1, Vec3::new(30.0, 2.0, -30.0)).unwrap();
        assert!(g.cell(cell).unwrap().dynamics.contains(&1));
        // Re-placing in the same cell does not duplicate.
        assert_eq!(g.place_dynamic(1, Vec3::new(31.0, 2.0, -30.0)), Some(cell));
        assert_eq!(g.cell(cell).unwrap().dynamics.len(), 1);
        let (x, z) = g.cell_coord(Vec3::new(30.0, 0.0, -30.0)).unwrap();
        g.free_cell_at(x, z);
        // The stored key is now stale; removal through it is a no-op.
        assert!(g.cell(cell).is_none());
        g.remove_dynamic(1, cell);
    }

    #[test]
    fn test_out_of_bounds_placement_rejected() {
        let mut g = grid();
        assert!(g.place_dynamic(1, Vec3::new(5000.0, 0.0, 0.0)).is_none());
        let b = Aabb3::new(Vec3::splat(4999.0), Vec3::splat(5001.0));
        assert!(g.add_static(1, Vec3::splat(5000.0), &b).is_none());
    }
}

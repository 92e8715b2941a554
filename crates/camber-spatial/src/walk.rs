//! Cell-by-cell line traversal used by ray and sweep queries.

use glam::Vec2;

/// Walks the grid cells along a line in fractional cell coordinates.
///
/// Samples the line at unit-length parameter steps (measured in Manhattan
/// cell distance), visiting the cell under each sample. The visitor returns
/// `false` to stop the walk early. Consecutive samples can land in the same
/// cell; duplicates are filtered before dispatch.
pub fn walk_grid_line(start: Vec2, end: Vec2, mut visit: impl FnMut(i32, i32) -> bool) {
    let dif = end - start;
    let dist = dif.x.abs() + dif.y.abs();
    if dist <= f32::EPSILON {
        visit(start.x.floor() as i32, start.y.floor() as i32);
        return;
    }
    let step = dif / dist;
    let steps = dist.ceil() as i32;
    let mut last: Option<(i32, i32)> = None;
    for i in 0..=steps {
        let p = start + step * i as f32;
        let cell = (p.x.floor() as i32, p.y.floor() as i32);
        if last == Some(cell) {
            continue;
        }
        last = Some(cell);
        if !visit(cell.0, cell.1) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(start: Vec2, end: Vec2) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        walk_grid_line(start, end, |x, z| {
            out.push((x, z));
            true
        });
        out
    }

    #[test]
    fn test_walk_single_cell() {
        assert_eq!(collect(Vec2::new(3.2, 3.8), Vec2::new(3.9, 3.1)), vec![(3, 3)]);
    }

    #[test]
    fn test_walk_axis_aligned() {
        let cells = collect(Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(3, 0)));
        assert!(cells.windows(2).all(|w| w[1].0 == w[0].0 + 1 && w[1].1 == 0));
    }

    #[test]
    fn test_walk_diagonal_covers_endpoints() {
        let cells = collect(Vec2::new(0.5, 0.5), Vec2::new(4.5, 4.5));
        assert_eq!(cells.first(), Some(&(0, 0)));
        assert_eq!(cells.last(), Some(&(4, 4)));
    }

    #[test]
    fn test_walk_stops_on_false() {
        let mut visited = 0;
        walk_grid_line(Vec2::new(0.5, 0.5), Vec2::new(9.5, 0.5), |_, _| {
            visited += 1;
            visited < 3
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_walk_negative_direction() {
        let cells = collect(Vec2::new(4.5, 2.5), Vec2::new(0.5, 2.5));
        assert_eq!(cells.first(), Some(&(4, 2)));
        assert_eq!(cells.last(), Some(&(0, 2)));
    }
}

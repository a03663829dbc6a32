//! Line-of-sight path smoothing.
//!
//! A raw A* path hugs the grid and turns every cell or two.  Smoothing
//! keeps only the waypoints where the path actually has to bend: starting
//! at the first waypoint it jumps to the farthest later waypoint still in
//! line of sight, commits it, and repeats.  The scan from each committed
//! waypoint stops at the first waypoint that is not visible.
//!
//! Line of sight rasterises the segment with integer Bresenham stepping and
//! fails on the first traversed cell that is not walkable.  Bresenham
//! stepping is direction dependent (a thin diagonal wall can be threaded in
//! one direction and hit in the other), so the trace always runs from the
//! lexicographically smaller endpoint.  That makes the test symmetric.

use ts_core::Vec2;

use crate::{GridCell, NavGrid};

/// `true` when every cell on the Bresenham line between `a` and `b`
/// (both included) is walkable.
pub fn has_line_of_sight(grid: &NavGrid, a: GridCell, b: GridCell) -> bool {
    let (from, to) = if b < a { (b, a) } else { (a, b) };

    let dx = (to.x - from.x).abs();
    let dz = (to.z - from.z).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sz = if from.z < to.z { 1 } else { -1 };
    let mut err = dx - dz;
    let (mut x, mut z) = (from.x, from.z);

    loop {
        if !grid.is_walkable(GridCell::new(x, z)) {
            return false;
        }
        if x == to.x && z == to.z {
            return true;
        }
        let e2 = 2 * err;
        if e2 > -dz {
            err -= dz;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            z += sz;
        }
    }
}

/// World-space line of sight between the cells containing `a` and `b`.
pub fn line_of_sight_world(grid: &NavGrid, a: Vec2, b: Vec2) -> bool {
    has_line_of_sight(grid, grid.world_to_grid(a), grid.world_to_grid(b))
}

/// Greedy farthest-visible reduction of a cell path.
///
/// Keeps the first and last cells, never grows the path, and every pair of
/// consecutive output cells has line of sight (given the input's
/// consecutive cells do, as any A* path's do).
pub fn smooth(grid: &NavGrid, path: &[GridCell]) -> Vec<GridCell> {
    smooth_by(path, |a, b| has_line_of_sight(grid, a, b))
}

/// [`smooth`] over world-space waypoints.
pub fn smooth_world(grid: &NavGrid, path: &[Vec2]) -> Vec<Vec2> {
    smooth_by(path, |a, b| line_of_sight_world(grid, a, b))
}

fn smooth_by<T: Copy>(path: &[T], visible: impl Fn(T, T) -> bool) -> Vec<T> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let mut out = vec![path[0]];
    let mut current = 0;
    while current < path.len() - 1 {
        let mut farthest = current + 1;
        for i in current + 2..path.len() {
            if visible(path[current], path[i]) {
                farthest = i;
            } else {
                break;
            }
        }
        out.push(path[farthest]);
        current = farthest;
    }
    out
}

//! Path search trait and default A* implementation.
//!
//! # Pluggability
//!
//! The route manager calls search through the [`PathFinder`] trait, so an
//! application can swap in jump-point search or a hierarchical planner
//! without touching the rest of the crate.  The default [`AStarPathFinder`]
//! is plenty for city grids of a few tens of thousands of cells.
//!
//! # Cost model
//!
//! Movement is 8-connected.  Moving between two cells costs the Euclidean
//! distance between their centres (1 orthogonally, √2 diagonally) and the
//! heuristic is the Euclidean distance to the goal, which is admissible and
//! consistent for that cost, so the first time the goal is popped its cost
//! is optimal.  Costs are `f64` in cell units.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{GridCell, NavGrid};

/// Neighbour offsets in expansion order: orthogonals first, then diagonals.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

const NO_PARENT: usize = usize::MAX;

// ── PathFinder trait ──────────────────────────────────────────────────────────

/// Pluggable grid search.
///
/// Implementations must be deterministic: the same grid and endpoints
/// always yield the same path.
pub trait PathFinder: Send + Sync {
    /// Cells from `start` to `end` inclusive, or `None` when either endpoint
    /// is not walkable or the two are not connected.
    ///
    /// `start == end` on a walkable cell yields a one-cell path.
    fn find_path(&self, grid: &NavGrid, start: GridCell, end: GridCell) -> Option<Vec<GridCell>>;
}

impl<P: PathFinder + ?Sized> PathFinder for Box<P> {
    fn find_path(&self, grid: &NavGrid, start: GridCell, end: GridCell) -> Option<Vec<GridCell>> {
        (**self).find_path(grid, start, end)
    }
}

// ── AStarPathFinder ───────────────────────────────────────────────────────────

/// Classic A* with a binary-heap open set and lazy deletion.
///
/// Scores, parents and the closed set live in flat arrays indexed by the
/// packed cell index, allocated once per query.
#[derive(Copy, Clone, Debug, Default)]
pub struct AStarPathFinder;

impl PathFinder for AStarPathFinder {
    fn find_path(&self, grid: &NavGrid, start: GridCell, end: GridCell) -> Option<Vec<GridCell>> {
        astar(grid, start, end)
    }
}

/// Total movement cost of a cell sequence.
pub fn path_cost(cells: &[GridCell]) -> f64 {
    cells.windows(2).map(|w| w[0].distance(w[1])).sum()
}

// ── A* internals ──────────────────────────────────────────────────────────────

/// Open-set entry.  Ordered so the max-heap pops the lowest `f`, breaking
/// ties on lower `h`, then lower cell index.
#[derive(Copy, Clone, Debug)]
struct OpenEntry {
    f:     f64,
    h:     f64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.index.cmp(&self.index))
    }
}

fn astar(grid: &NavGrid, start: GridCell, end: GridCell) -> Option<Vec<GridCell>> {
    let start_idx = grid.index_of(start)?;
    let end_idx = grid.index_of(end)?;
    if !grid.is_walkable_index(start_idx) || !grid.is_walkable_index(end_idx) {
        return None;
    }
    if start_idx == end_idx {
        return Some(vec![start]);
    }

    let n = grid.len();
    let mut g_score = vec![f64::INFINITY; n];
    let mut parent = vec![NO_PARENT; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();

    let h0 = start.distance(end);
    g_score[start_idx] = 0.0;
    open.push(OpenEntry { f: h0, h: h0, index: start_idx });

    while let Some(OpenEntry { index, .. }) = open.pop() {
        // Stale entry for a cell already finalised through a cheaper route.
        if closed[index] {
            continue;
        }
        if index == end_idx {
            return Some(reconstruct(grid, &parent, end_idx));
        }
        closed[index] = true;

        let cell = grid.cell_at(index);
        for (dx, dz) in NEIGHBOURS {
            let next = cell.offset(dx, dz);
            let Some(next_idx) = grid.index_of(next) else {
                continue;
            };
            if closed[next_idx] || !grid.is_walkable_index(next_idx) {
                continue;
            }
            let step = if dx == 0 || dz == 0 { 1.0 } else { std::f64::consts::SQRT_2 };
            let tentative = g_score[index] + step;
            if tentative < g_score[next_idx] {
                g_score[next_idx] = tentative;
                parent[next_idx] = index;
                let h = next.distance(end);
                open.push(OpenEntry { f: tentative + h, h, index: next_idx });
            }
        }
    }

    None
}

fn reconstruct(grid: &NavGrid, parent: &[usize], end_idx: usize) -> Vec<GridCell> {
    let mut cells = Vec::new();
    let mut cur = end_idx;
    while cur != NO_PARENT {
        cells.push(grid.cell_at(cur));
        cur = parent[cur];
    }
    cells.reverse();
    cells
}

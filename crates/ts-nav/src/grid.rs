//! Occupancy grid built from city geometry.
//!
//! # Data layout
//!
//! Cells are stored row-major in one flat array: cell `(x, z)` lives at
//! index `z * width + x`.  That packed index doubles as the cell's identity
//! key everywhere in this crate (A* score arrays, closed bitmap), so no
//! per-cell hashing or string keys are needed.
//!
//! # Marking rules
//!
//! A rectangle marks every cell its interior overlaps.  Streets are marked
//! [`CellState::Walkable`] first, then building footprints are marked
//! [`CellState::Blocked`], so a cell covered by both ends up blocked.
//! Cells no geometry touches stay [`CellState::Unmarked`] and are not
//! traversable.

use std::fmt;

use tracing::info;

use ts_core::{Aabb, Building, CityLayout, SimRng, StreetSegment, Vec2};

use crate::{NavError, NavResult};

/// Padding added around the geometry extent when bounds are derived.
pub const BOUNDS_PADDING: f32 = 50.0;

/// Attempts made by [`NavGrid::random_walkable_position`] before falling
/// back to the grid centre.
const RANDOM_POSITION_ATTEMPTS: usize = 100;

// ── CellState / GridCell ──────────────────────────────────────────────────────

/// Tri-state occupancy of one grid cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum CellState {
    #[default]
    Unmarked = 0,
    Walkable = 1,
    Blocked = -1,
}

/// Integer grid coordinate.  May lie outside the grid; every query treats
/// out-of-bounds cells as not walkable.
///
/// Ordering is lexicographic on `(x, z)`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

impl GridCell {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Euclidean distance between cell centres, in cells.
    #[inline]
    pub fn distance(self, other: GridCell) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dz * dz).sqrt()
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> GridCell {
        GridCell::new(self.x.saturating_add(dx), self.z.saturating_add(dz))
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

// ── NavGrid ───────────────────────────────────────────────────────────────────

/// Walkability grid over the city.  Immutable once built.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavGrid {
    cell_size: f32,
    origin:    Vec2,
    width:     u32,
    height:    u32,
    cells:     Vec<CellState>,
}

impl NavGrid {
    // ── Dimensions ────────────────────────────────────────────────────────

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World position of the minimum corner of cell `(0, 0)`.
    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// World rectangle covered by the grid.
    pub fn world_bounds(&self) -> Aabb {
        let extent = Vec2::new(
            self.width as f32 * self.cell_size,
            self.height as f32 * self.cell_size,
        );
        Aabb::new(self.origin, self.origin + extent)
    }

    // ── Cell access ───────────────────────────────────────────────────────

    #[inline]
    pub fn in_bounds(&self, cell: GridCell) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as u32) < self.width && (cell.z as u32) < self.height
    }

    /// Packed index of `cell`, or `None` when it is outside the grid.
    #[inline]
    pub fn index_of(&self, cell: GridCell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some(cell.z as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    /// Inverse of [`index_of`](Self::index_of).
    #[inline]
    pub fn cell_at(&self, index: usize) -> GridCell {
        let w = self.width as usize;
        GridCell::new((index % w) as i32, (index / w) as i32)
    }

    /// State of `cell`; out-of-bounds cells read as `Unmarked`.
    #[inline]
    pub fn cell_state(&self, cell: GridCell) -> CellState {
        self.index_of(cell).map_or(CellState::Unmarked, |i| self.cells[i])
    }

    #[inline]
    pub fn is_walkable(&self, cell: GridCell) -> bool {
        self.cell_state(cell) == CellState::Walkable
    }

    #[inline]
    pub(crate) fn is_walkable_index(&self, index: usize) -> bool {
        self.cells[index] == CellState::Walkable
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == CellState::Walkable).count()
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    // ── Coordinate transforms ─────────────────────────────────────────────

    /// Cell containing `pos` (floor division; may be out of bounds).
    #[inline]
    pub fn world_to_grid(&self, pos: Vec2) -> GridCell {
        GridCell::new(
            ((pos.x - self.origin.x) / self.cell_size).floor() as i32,
            ((pos.z - self.origin.z) / self.cell_size).floor() as i32,
        )
    }

    /// World position of the centre of `cell`.
    #[inline]
    pub fn grid_to_world(&self, cell: GridCell) -> Vec2 {
        Vec2::new(
            self.origin.x + (cell.x as f32 + 0.5) * self.cell_size,
            self.origin.z + (cell.z as f32 + 0.5) * self.cell_size,
        )
    }

    // ── Walkability queries ───────────────────────────────────────────────

    /// Nearest walkable cell by expanding square rings around `cell`.
    ///
    /// Rings of radius `1..=max_radius` are scanned in order; within a ring
    /// the perimeter is visited with `dx` outer and `dz` inner, both
    /// ascending, and the first walkable cell wins.  A walkable `cell` is
    /// returned unchanged.  When nothing walkable is found the input cell is
    /// returned as a best-effort fallback, which may itself be unwalkable.
    pub fn find_nearest_walkable(&self, cell: GridCell, max_radius: u32) -> GridCell {
        if self.is_walkable(cell) {
            return cell;
        }
        let max_radius = max_radius.min(i32::MAX as u32) as i32;
        for radius in 1..=max_radius {
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    if dx.abs() != radius && dz.abs() != radius {
                        continue;
                    }
                    let candidate = cell.offset(dx, dz);
                    if self.is_walkable(candidate) {
                        return candidate;
                    }
                }
            }
        }
        cell
    }

    /// World-space snap: centre of the nearest walkable cell to `pos`.
    pub fn nearest_walkable_position(&self, pos: Vec2, max_radius: u32) -> Vec2 {
        let cell = self.world_to_grid(pos);
        let snapped = self.find_nearest_walkable(cell, max_radius);
        if snapped == cell && !self.is_walkable(cell) {
            pos
        } else {
            self.grid_to_world(snapped)
        }
    }

    /// Centre of a random walkable cell, or the grid centre when none was
    /// hit in a bounded number of attempts.
    pub fn random_walkable_position(&self, rng: &mut SimRng) -> Vec2 {
        if !self.cells.is_empty() {
            for _ in 0..RANDOM_POSITION_ATTEMPTS {
                let cell = GridCell::new(
                    rng.gen_range(0..self.width) as i32,
                    rng.gen_range(0..self.height) as i32,
                );
                if self.is_walkable(cell) {
                    return self.grid_to_world(cell);
                }
            }
        }
        self.world_bounds().center()
    }

    #[inline]
    pub fn is_position_accessible(&self, pos: Vec2) -> bool {
        self.is_walkable(self.world_to_grid(pos))
    }

    // ── Marking (builder only) ────────────────────────────────────────────

    /// Cell range `[first, last]` overlapped by `[lo, hi)` along one axis,
    /// clipped to `0..len`.  `None` when the clipped range is empty.
    fn span(&self, lo: f32, hi: f32, origin: f32, len: u32) -> Option<(usize, usize)> {
        let first = ((lo - origin) / self.cell_size).floor() as i64;
        let last = (((hi - origin) / self.cell_size).ceil() as i64 - 1).max(first);
        let first = first.max(0);
        let last = last.min(len as i64 - 1);
        (first <= last).then_some((first as usize, last as usize))
    }

    fn mark_rect(&mut self, rect: &Aabb, state: CellState) {
        let Some((x0, x1)) = self.span(rect.min.x, rect.max.x, self.origin.x, self.width) else {
            return;
        };
        let Some((z0, z1)) = self.span(rect.min.z, rect.max.z, self.origin.z, self.height) else {
            return;
        };
        let w = self.width as usize;
        for z in z0..=z1 {
            self.cells[z * w + x0..=z * w + x1].fill(state);
        }
    }
}

// ── NavGridBuilder ────────────────────────────────────────────────────────────

/// Collects street and building geometry and produces a [`NavGrid`].
///
/// # Example
///
/// ```rust
/// use ts_core::{Building, Orientation, StreetSegment, Vec2};
/// use ts_nav::NavGridBuilder;
///
/// let mut b = NavGridBuilder::new(5.0);
/// b.add_street(&StreetSegment::new(Vec2::ZERO, 8.0, 100.0, Orientation::Horizontal));
/// b.add_building(&Building::new(Vec2::new(0.0, 20.0), 20.0));
/// let grid = b.build().unwrap();
/// assert!(grid.is_position_accessible(Vec2::ZERO));
/// ```
#[derive(Clone, Debug)]
pub struct NavGridBuilder {
    cell_size: f32,
    streets:   Vec<Aabb>,
    buildings: Vec<Building>,
    bounds:    Option<Aabb>,
}

impl NavGridBuilder {
    pub fn new(cell_size: f32) -> Self {
        Self { cell_size, streets: Vec::new(), buildings: Vec::new(), bounds: None }
    }

    /// Builder pre-loaded with every street and building of `layout`.
    pub fn from_layout(layout: &CityLayout, cell_size: f32) -> Self {
        let mut b = Self::new(cell_size);
        for street in &layout.streets {
            b.add_street(street);
        }
        for building in &layout.buildings {
            b.add_building(building);
        }
        b
    }

    pub fn add_street(&mut self, street: &StreetSegment) -> &mut Self {
        self.streets.push(street.rect());
        self
    }

    pub fn add_building(&mut self, building: &Building) -> &mut Self {
        self.buildings.push(*building);
        self
    }

    /// Cover exactly `bounds` instead of deriving the extent from geometry.
    pub fn bounds(&mut self, bounds: Aabb) -> &mut Self {
        self.bounds = Some(bounds);
        self
    }

    /// Grid extent.  Buildings contribute `center ± size` (a generous
    /// margin around each footprint); streets are used only when there are
    /// no buildings.  Either way [`BOUNDS_PADDING`] is added on every side.
    fn derive_bounds(&self) -> NavResult<Aabb> {
        if let Some(bounds) = self.bounds {
            return Ok(bounds);
        }
        let from_buildings = self
            .buildings
            .iter()
            .map(|b| Aabb::from_center(b.center, b.size * 2.0, b.size * 2.0))
            .reduce(|acc, r| acc.union(&r));
        let extent = match from_buildings {
            Some(extent) => extent,
            None => self
                .streets
                .iter()
                .copied()
                .reduce(|acc, r| acc.union(&r))
                .ok_or(NavError::EmptyLayout)?,
        };
        Ok(extent.expanded(BOUNDS_PADDING))
    }

    pub fn build(&self) -> NavResult<NavGrid> {
        let cs = self.cell_size;
        if !cs.is_finite() || cs <= 0.0 {
            return Err(NavError::InvalidCellSize(cs));
        }
        let bounds = self.derive_bounds()?;

        let width = (bounds.width() / cs).ceil().max(1.0) as u32;
        let height = (bounds.depth() / cs).ceil().max(1.0) as u32;

        let mut grid = NavGrid {
            cell_size: cs,
            origin: bounds.min,
            width,
            height,
            cells: vec![CellState::Unmarked; width as usize * height as usize],
        };

        for rect in &self.streets {
            grid.mark_rect(rect, CellState::Walkable);
        }
        for building in &self.buildings {
            grid.mark_rect(&building.footprint(), CellState::Blocked);
        }

        info!(
            width,
            height,
            cell_size = cs,
            walkable = grid.walkable_count(),
            "navigation grid built"
        );
        Ok(grid)
    }
}

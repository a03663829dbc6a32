//! Uniform-grid spatial hash for neighbour queries.
//!
//! # Layout
//!
//! The plane is split into square cells of `cell_size`.  A position maps to
//! cell `(floor(x / cell_size), floor(z / cell_size))`, packed into one
//! `i64` key (`x` in the high 32 bits, `z` in the low 32).  Buckets hold
//! plain handles (`K`, usually [`AgentId`](ts_core::AgentId)), never the
//! entities themselves, so the owner of the entities stays the single
//! source of truth for their lifetime.
//!
//! A reverse map from handle to `(cell key, position)` makes moves and
//! removals O(bucket length) and guarantees each handle is in at most one
//! bucket.
//!
//! # Exactness
//!
//! [`SpatialIndex::query`] scans every bucket the query disc can touch and
//! filters by true distance, so it returns exactly the handles whose last
//! recorded position is within `radius`.  When the disc covers more cells
//! than there are occupied buckets it filters the entry map directly, so
//! the cost is bounded by the population rather than by `radius²`.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use ts_core::Vec2;

/// Handle-to-bucket spatial hash.
#[derive(Clone, Debug)]
pub struct SpatialIndex<K> {
    cell_size: f32,
    buckets:   FxHashMap<i64, Vec<K>>,
    entries:   FxHashMap<K, (i64, Vec2)>,
}

impl<K: Copy + Eq + Hash> SpatialIndex<K> {
    /// New empty index.  A non-finite or non-positive `cell_size` falls back
    /// to 1.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 { cell_size } else { 1.0 };
        Self { cell_size, buckets: FxHashMap::default(), entries: FxHashMap::default() }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn cell_coord(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    #[inline]
    fn pack(cx: i32, cz: i32) -> i64 {
        ((cx as i64) << 32) | (cz as u32 as i64)
    }

    #[inline]
    fn key_of(&self, pos: Vec2) -> i64 {
        Self::pack(self.cell_coord(pos.x), self.cell_coord(pos.z))
    }

    /// Insert `key` at `pos`, or move it there if already present.
    pub fn update(&mut self, key: K, pos: Vec2) {
        let cell = self.key_of(pos);
        if let Some(entry) = self.entries.get_mut(&key) {
            let old = entry.0;
            *entry = (cell, pos);
            if old == cell {
                return;
            }
            Self::detach(&mut self.buckets, old, key);
        } else {
            self.entries.insert(key, (cell, pos));
        }
        self.buckets.entry(cell).or_default().push(key);
    }

    /// Alias of [`update`](Self::update) for first insertion.
    #[inline]
    pub fn insert(&mut self, key: K, pos: Vec2) {
        self.update(key, pos);
    }

    /// Remove `key`.  Returns its last position, or `None` if absent.
    pub fn remove(&mut self, key: K) -> Option<Vec2> {
        let (cell, pos) = self.entries.remove(&key)?;
        Self::detach(&mut self.buckets, cell, key);
        Some(pos)
    }

    fn detach(buckets: &mut FxHashMap<i64, Vec<K>>, cell: i64, key: K) {
        if let Some(bucket) = buckets.get_mut(&cell) {
            if let Some(i) = bucket.iter().position(|k| *k == key) {
                bucket.swap_remove(i);
            }
            if bucket.is_empty() {
                buckets.remove(&cell);
            }
        }
    }

    /// All handles within `radius` of `center` (inclusive), with their
    /// recorded positions.  Order is unspecified.
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<(K, Vec2)> {
        let mut out = Vec::new();
        if radius.is_nan() || radius < 0.0 || !center.is_finite() {
            return out;
        }
        let r2 = radius * radius;
        let x0 = self.cell_coord(center.x - radius);
        let x1 = self.cell_coord(center.x + radius);
        let z0 = self.cell_coord(center.z - radius);
        let z1 = self.cell_coord(center.z + radius);

        // A window wider than the occupied buckets is cheaper as a flat scan.
        let span = (i64::from(x1) - i64::from(x0) + 1).saturating_mul(i64::from(z1) - i64::from(z0) + 1);
        if span > self.buckets.len() as i64 {
            out.extend(
                self.entries
                    .iter()
                    .filter(|(_, (_, pos))| pos.distance_squared(center) <= r2)
                    .map(|(&key, &(_, pos))| (key, pos)),
            );
            return out;
        }

        for cx in x0..=x1 {
            for cz in z0..=z1 {
                let Some(bucket) = self.buckets.get(&Self::pack(cx, cz)) else {
                    continue;
                };
                for &key in bucket {
                    if let Some(&(_, pos)) = self.entries.get(&key) {
                        if pos.distance_squared(center) <= r2 {
                            out.push((key, pos));
                        }
                    }
                }
            }
        }
        out
    }

    #[inline]
    pub fn position_of(&self, key: K) -> Option<Vec2> {
        self.entries.get(&key).map(|&(_, pos)| pos)
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of non-empty buckets.
    #[inline]
    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }
}

//! Frame-step time model.
//!
//! # Design
//!
//! The simulation advances one tick per rendered frame.  The external
//! clock hands every component a `dt` in seconds; `SimClock` accumulates
//! those into an elapsed-seconds total (kept in `f64` so long sessions do
//! not lose sub-millisecond resolution) alongside an integer frame counter.
//!
//! Every timer (route refresh, lane-change duration, signal phases) reads
//! this clock or counts down by `dt`; nothing consults the wall clock, so a
//! run is a pure function of its inputs.

use std::fmt;

use crate::Aabb;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// Frame counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Frames elapsed from `earlier` to `self` (saturating).
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Accumulates frame deltas into simulated time.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Frames completed so far.
    pub current_tick: Tick,
    /// Simulated seconds since the session started.
    pub elapsed_secs: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame of `dt` seconds.  Negative or non-finite deltas
    /// count as zero.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.current_tick = self.current_tick + 1;
        self.elapsed_secs += dt as f64;
    }

    /// Elapsed time split into (minutes, seconds) for log lines.
    pub fn elapsed_ms(&self) -> (u64, u32) {
        let total = self.elapsed_secs.max(0.0) as u64;
        (total / 60, (total % 60) as u32)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m, s) = self.elapsed_ms();
        write!(f, "{} ({:02}:{:02})", self.current_tick, m, s)
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Component-specific settings (routing, traffic, collision) live in their
/// own config structs next to the component that reads them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Master RNG seed.  The same seed and inputs always produce the same run.
    pub seed: u64,

    /// Upper bound applied to every frame delta, so a stalled frame cannot
    /// teleport vehicles through buildings.  Default: 0.1 s.
    pub max_delta_secs: f32,

    /// Hard world limits; the player vehicle is clamped into this rectangle.
    /// Default: ±500.
    pub world_bounds: Aabb,

    /// Navigation grid resolution in world units per cell.  Default: 5.
    pub nav_cell_size: f32,
}

impl SimConfig {
    /// Clamp a raw frame delta into `[0, max_delta_secs]`.
    #[inline]
    pub fn clamp_delta(&self, dt: f32) -> f32 {
        if dt.is_finite() { dt.clamp(0.0, self.max_delta_secs) } else { 0.0 }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed:           42,
            max_delta_secs: 0.1,
            world_bounds:   Aabb::square(500.0),
            nav_cell_size:  5.0,
        }
    }
}

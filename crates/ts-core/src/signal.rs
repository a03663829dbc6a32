//! Intersection traffic signals.
//!
//! Every intersection runs the same four-phase cycle:
//!
//! | Phase | North–South | East–West | Default duration |
//! |-------|-------------|-----------|------------------|
//! | 0     | green       | red       | 8 s              |
//! | 1     | yellow      | red       | 2 s              |
//! | 2     | red         | green     | 8 s              |
//! | 3     | red         | yellow    | 2 s              |
//!
//! "North–South" is travel along the `z` axis, "East–West" along `x`.

use crate::Vec2;

/// Default phase durations in seconds.
pub const DEFAULT_PHASE_SECS: [f32; 4] = [8.0, 2.0, 8.0, 2.0];

/// Travel axis an approaching vehicle is on.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    /// Dominant axis of travel for a vehicle facing `heading`.
    #[inline]
    pub fn of_heading(heading: f32) -> Axis {
        Axis::of_direction(Vec2::from_heading(heading))
    }

    #[inline]
    pub fn of_direction(dir: Vec2) -> Axis {
        if dir.z.abs() >= dir.x.abs() { Axis::NorthSouth } else { Axis::EastWest }
    }
}

/// The light a vehicle sees.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalLight {
    Red,
    Yellow,
    Green,
}

/// A four-phase fixed-time signal controller.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficSignal {
    phase: u8,
    timer: f32,
    durations: [f32; 4],
}

impl TrafficSignal {
    /// A signal starting at the beginning of `phase` (taken modulo 4).
    pub fn new(phase: u8) -> Self {
        Self::with_durations(phase, DEFAULT_PHASE_SECS)
    }

    pub fn with_durations(phase: u8, durations: [f32; 4]) -> Self {
        Self { phase: phase % 4, timer: 0.0, durations }
    }

    /// Offset the phase timer, e.g. to stagger neighbouring intersections.
    pub fn with_elapsed(mut self, secs: f32) -> Self {
        self.timer = secs.max(0.0);
        self
    }

    #[inline]
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Advance the controller by `dt` seconds, stepping through as many
    /// phases as the delta covers.
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.timer += dt;
        // Bounded so a zero-length phase table cannot spin forever.
        for _ in 0..4 {
            let duration = self.durations[self.phase as usize].max(0.0);
            if self.timer < duration {
                break;
            }
            self.timer -= duration;
            self.phase = (self.phase + 1) % 4;
        }
    }

    /// The light shown to traffic travelling along `axis`.
    pub fn light_for(&self, axis: Axis) -> SignalLight {
        match (self.phase, axis) {
            (0, Axis::NorthSouth) | (2, Axis::EastWest) => SignalLight::Green,
            (1, Axis::NorthSouth) | (3, Axis::EastWest) => SignalLight::Yellow,
            _ => SignalLight::Red,
        }
    }
}

impl Default for TrafficSignal {
    fn default() -> Self {
        Self::new(0)
    }
}

//! Simulation observer trait for progress reporting and UI hooks.

use ts_core::Tick;
use ts_nav::{Announcement, Route};

use crate::FrameReport;

/// Callbacks invoked by [`Sim::step`][crate::Sim::step] at key points in
/// the frame.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — turn-by-turn printer
///
/// ```rust,ignore
/// struct Voice;
///
/// impl SimObserver for Voice {
///     fn on_announcement(&mut self, _tick: Tick, announcement: &Announcement) {
///         println!("{}", announcement.text);
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each frame, before any processing.
    fn on_frame_start(&mut self, _tick: Tick) {}

    /// Called when the GPS computed a new route this frame.
    fn on_reroute(&mut self, _tick: Tick, _route: &Route) {}

    /// Called when a turn instruction became due this frame.
    fn on_announcement(&mut self, _tick: Tick, _announcement: &Announcement) {}

    /// Called once when the player reaches the destination.  The GPS session
    /// has already ended.
    fn on_arrival(&mut self, _tick: Tick) {}

    /// Called at the end of each frame with what happened in it.
    fn on_frame_end(&mut self, _report: &FrameReport) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

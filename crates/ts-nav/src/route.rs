//! GPS route sessions.
//!
//! A [`RouteManager`] owns at most one navigation session: a fixed
//! destination and, when a path exists, the current [`Route`] to it from
//! the vehicle's live position.  The caller drives it once per frame with
//! [`RouteManager::update`], which decides whether the route needs to be
//! recomputed and returns any voice-style announcement that became due.
//!
//! # Recompute triggers
//!
//! | Condition                                                    |
//! |--------------------------------------------------------------|
//! | no route yet                                                 |
//! | route older than `refresh_interval_secs`                     |
//! | vehicle farther than `recalculate_distance` from the route   |
//!
//! After a failed attempt (no path) the manager waits for the refresh
//! interval, a move of more than `recalculate_distance` from where the
//! attempt was made, or a new destination before trying again, so an
//! unreachable destination does not cost a full search every frame.

use std::fmt;

use tracing::{debug, warn};

use ts_core::Vec2;

use crate::{smooth, GridCell, NavError, NavGrid, NavResult, PathFinder};

// ── RouteConfig ───────────────────────────────────────────────────────────────

/// Tunables for [`RouteManager`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteConfig {
    /// Maximum route age before a periodic recompute.  Default: 2 s.
    pub refresh_interval_secs: f64,
    /// Off-route distance that forces a recompute.  Default: 20.
    pub recalculate_distance: f32,
    /// Ring radius, in cells, used to snap unwalkable endpoints.  Default: 10.
    pub snap_radius: u32,
    /// Instructions closer than this are treated as already passed by
    /// [`RouteManager::next_turn`].  Default: 5.
    pub min_turn_distance: f32,
    /// Distance at which an instruction is announced.  Default: 50.
    pub announce_distance: f32,
    /// Distance to the destination that counts as arrived.  Default: 10.
    pub arrival_threshold: f32,
    /// Speed assumed for ETA estimates, km/h (world units are metres).
    /// Default: 25.
    pub average_speed_kmh: f32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 2.0,
            recalculate_distance:  20.0,
            snap_radius:           10,
            min_turn_distance:     5.0,
            announce_distance:     50.0,
            arrival_threshold:     10.0,
            average_speed_kmh:     25.0,
        }
    }
}

// ── Directive / Instruction ───────────────────────────────────────────────────

/// Turn directive at a route waypoint.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Directive {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    Arrived,
}

impl Directive {
    /// Classify a signed turn angle in degrees (positive = right).
    ///
    /// | `|angle|`   | Directive       |
    /// |-------------|-----------------|
    /// | `< 15`      | straight        |
    /// | `15 .. 75`  | slight turn     |
    /// | `75 .. 105` | turn            |
    /// | `>= 105`    | sharp turn      |
    pub fn from_angle(degrees: f32) -> Directive {
        let mag = degrees.abs();
        let right = degrees > 0.0;
        if mag < 15.0 || !mag.is_finite() {
            Directive::Straight
        } else if mag < 75.0 {
            if right { Directive::SlightRight } else { Directive::SlightLeft }
        } else if mag < 105.0 {
            if right { Directive::Right } else { Directive::Left }
        } else if right {
            Directive::SharpRight
        } else {
            Directive::SharpLeft
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Directive::Straight => "Continue straight",
            Directive::SlightLeft => "Turn slight left",
            Directive::Left => "Turn left",
            Directive::SharpLeft => "Turn sharp left",
            Directive::SlightRight => "Turn slight right",
            Directive::Right => "Turn right",
            Directive::SharpRight => "Turn sharp right",
            Directive::Arrived => "You have arrived at your destination",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Signed turn angle in degrees at `current` for a path `prev → current →
/// next`; positive turns right.
pub fn turn_angle(prev: Vec2, current: Vec2, next: Vec2) -> f32 {
    let incoming = (current - prev).normalize_or(Vec2::ZERO);
    let outgoing = (next - current).normalize_or(Vec2::ZERO);
    incoming.cross(outgoing).atan2(incoming.dot(outgoing)).to_degrees()
}

/// One entry of a route's turn-by-turn list.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub position:            Vec2,
    pub directive:           Directive,
    /// Path distance from the route start to `position`.
    pub distance_from_start: f32,
}

/// The upcoming instruction as seen from the vehicle.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NextTurn {
    pub directive: Directive,
    /// Straight-line distance from the vehicle.
    pub distance:  f32,
    pub position:  Vec2,
}

/// A spoken-style instruction that became due this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub directive: Directive,
    pub distance:  f32,
    /// `"In 42 meters, turn left"`, or the bare directive when close.
    pub text:      String,
}

impl Announcement {
    fn new(directive: Directive, distance: f32) -> Self {
        let text = if distance > 10.0 {
            format!("In {} meters, {}", distance.round() as i64, directive.text().to_lowercase())
        } else {
            directive.text().to_string()
        };
        Self { directive, distance, text }
    }
}

/// Result of one [`RouteManager::update`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteTick {
    /// A new route was computed this frame.
    pub rerouted:     bool,
    /// The destination was reached; the session has ended.
    pub arrived:      bool,
    pub announcement: Option<Announcement>,
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// A computed path to the destination with its turn list.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// World-space waypoints from start to destination.  Never empty.
    pub path:           Vec<Vec2>,
    pub total_distance: f32,
    pub instructions:   Vec<Instruction>,
    /// Simulation time (seconds) the route was computed at.
    pub computed_at:    f64,
}

impl Route {
    /// Build a route and its instructions from a non-empty waypoint list.
    pub fn new(path: Vec<Vec2>, computed_at: f64) -> Self {
        let mut cumulative = Vec::with_capacity(path.len());
        let mut acc = 0.0f32;
        for (i, p) in path.iter().enumerate() {
            if i > 0 {
                acc += path[i - 1].distance(*p);
            }
            cumulative.push(acc);
        }

        let mut instructions: Vec<Instruction> = path
            .windows(3)
            .enumerate()
            .map(|(i, w)| Instruction {
                position:            w[1],
                directive:           Directive::from_angle(turn_angle(w[0], w[1], w[2])),
                distance_from_start: cumulative[i + 1],
            })
            .collect();
        if let Some(&last) = path.last() {
            instructions.push(Instruction {
                position:            last,
                directive:           Directive::Arrived,
                distance_from_start: acc,
            });
        }

        Self { path, total_distance: acc, instructions, computed_at }
    }

    /// Closest point to `pos` on the route polyline, with the index of the
    /// segment it lies on.
    fn project(&self, pos: Vec2) -> (Vec2, usize) {
        let mut best = (self.path.first().copied().unwrap_or(pos), 0);
        let mut best_d2 = pos.distance_squared(best.0);
        for (i, w) in self.path.windows(2).enumerate() {
            let p = pos.closest_on_segment(w[0], w[1]);
            let d2 = pos.distance_squared(p);
            if d2 < best_d2 {
                best_d2 = d2;
                best = (p, i);
            }
        }
        best
    }

    /// Closest point to `pos` on the route polyline.
    pub fn nearest_point(&self, pos: Vec2) -> Vec2 {
        self.project(pos).0
    }

    #[inline]
    pub fn distance_to(&self, pos: Vec2) -> f32 {
        pos.distance(self.nearest_point(pos))
    }

    /// Path distance still to travel after projecting `pos` onto the route.
    pub fn remaining_distance(&self, pos: Vec2) -> f32 {
        if self.path.len() < 2 {
            return 0.0;
        }
        let (p, seg) = self.project(pos);
        let rest: f32 = self.path[seg + 1..].windows(2).map(|w| w[0].distance(w[1])).sum();
        p.distance(self.path[seg + 1]) + rest
    }
}

/// Format an ETA in minutes the way the dashboard shows it.
pub fn format_eta(minutes: u32) -> String {
    match minutes {
        0 => "< 1 min".to_string(),
        m if m < 60 => format!("{m} min"),
        m => format!("{}h {}m", m / 60, m % 60),
    }
}

// ── Path planning ─────────────────────────────────────────────────────────────

/// Snap both endpoints to walkable cells, search, smooth, and convert to
/// world space.
///
/// An endpoint with no walkable cell within `snap_radius` is used as is,
/// in which case the search reports [`NavError::NoPath`].
pub fn plan_path<P: PathFinder + ?Sized>(
    grid: &NavGrid,
    finder: &P,
    from: Vec2,
    to: Vec2,
    snap_radius: u32,
) -> NavResult<Vec<Vec2>> {
    let start = grid.find_nearest_walkable(grid.world_to_grid(from), snap_radius);
    let end = grid.find_nearest_walkable(grid.world_to_grid(to), snap_radius);
    let cells: Vec<GridCell> = finder
        .find_path(grid, start, end)
        .ok_or(NavError::NoPath { from: start, to: end })?;
    Ok(smooth(grid, &cells).into_iter().map(|c| grid.grid_to_world(c)).collect())
}

// ── RouteManager ──────────────────────────────────────────────────────────────

/// Position and time of the last search, successful or not.
#[derive(Copy, Clone, Debug)]
struct Attempt {
    at:       f64,
    position: Vec2,
}

/// Stateful navigation session toward one destination.
pub struct RouteManager<P: PathFinder> {
    finder:         P,
    config:         RouteConfig,
    destination:    Option<Vec2>,
    route:          Option<Route>,
    last_attempt:   Option<Attempt>,
    /// Instructions already announced this session, by value, so a
    /// recompute that reproduces them does not repeat them.
    announced:      Vec<(Directive, Vec2)>,
}

impl<P: PathFinder> RouteManager<P> {
    pub fn new(finder: P, config: RouteConfig) -> Self {
        Self {
            finder,
            config,
            destination: None,
            route: None,
            last_attempt: None,
            announced: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn finder(&self) -> &P {
        &self.finder
    }

    // ── Session ───────────────────────────────────────────────────────────

    /// Start (or restart) a session toward `destination`.
    pub fn set_destination(&mut self, destination: Vec2) {
        debug!(%destination, "destination set");
        self.destination = Some(destination);
        self.route = None;
        self.last_attempt = None;
        self.announced.clear();
    }

    /// End the session and discard the route.
    pub fn clear_destination(&mut self) {
        self.destination = None;
        self.route = None;
        self.last_attempt = None;
        self.announced.clear();
    }

    #[inline]
    pub fn destination(&self) -> Option<Vec2> {
        self.destination
    }

    #[inline]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.destination.is_some()
    }

    // ── Per-frame update ──────────────────────────────────────────────────

    /// Advance the session with the vehicle at `position` at simulation
    /// time `now` (seconds).
    pub fn update(&mut self, grid: &NavGrid, position: Vec2, now: f64) -> RouteTick {
        let mut tick = RouteTick::default();
        if self.destination.is_none() {
            return tick;
        }
        if self.is_destination_reached(position) {
            debug!(%position, "destination reached");
            self.clear_destination();
            tick.arrived = true;
            return tick;
        }
        if self.should_recompute(position, now) {
            tick.rerouted = self.reroute(grid, position, now);
        }
        tick.announcement = self.next_announcement(position);
        tick
    }

    fn should_recompute(&self, position: Vec2, now: f64) -> bool {
        let refresh = self.config.refresh_interval_secs;
        match (&self.route, self.last_attempt) {
            (Some(route), _) => {
                now - route.computed_at > refresh
                    || route.distance_to(position) > self.config.recalculate_distance
            }
            (None, None) => true,
            (None, Some(failed)) => {
                now - failed.at > refresh
                    || position.distance(failed.position) > self.config.recalculate_distance
            }
        }
    }

    /// Recompute the route from `position` immediately.  Returns `true`
    /// when a route was found.
    pub fn reroute(&mut self, grid: &NavGrid, position: Vec2, now: f64) -> bool {
        let Some(destination) = self.destination else {
            return false;
        };
        self.last_attempt = Some(Attempt { at: now, position });
        match plan_path(grid, &self.finder, position, destination, self.config.snap_radius) {
            Ok(path) => {
                let route = Route::new(path, now);
                debug!(
                    waypoints = route.path.len(),
                    distance = route.total_distance,
                    "route computed"
                );
                self.announced.retain(|&(directive, at)| {
                    route.instructions.iter().any(|i| i.directive == directive && i.position == at)
                });
                self.route = Some(route);
                true
            }
            Err(err) => {
                warn!(%position, %destination, %err, "no route to destination");
                self.route = None;
                false
            }
        }
    }

    fn next_announcement(&mut self, position: Vec2) -> Option<Announcement> {
        let route = self.route.as_ref()?;
        let due = route.instructions.iter().find_map(|ins| {
            let d = position.distance(ins.position);
            let key = (ins.directive, ins.position);
            (d <= self.config.announce_distance && !self.announced.contains(&key))
                .then_some((key, d))
        })?;
        let ((directive, at), distance) = due;
        self.announced.push((directive, at));
        Some(Announcement::new(directive, distance))
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// First instruction more than `min_turn_distance` away from
    /// `position`.
    pub fn next_turn(&self, position: Vec2) -> Option<NextTurn> {
        self.route.as_ref()?.instructions.iter().find_map(|ins| {
            let distance = position.distance(ins.position);
            (distance > self.config.min_turn_distance).then_some(NextTurn {
                directive: ins.directive,
                distance,
                position: ins.position,
            })
        })
    }

    pub fn nearest_point_on_route(&self, position: Vec2) -> Option<Vec2> {
        self.route.as_ref().map(|r| r.nearest_point(position))
    }

    /// Path distance left to the destination; `0` without a route.
    pub fn remaining_distance(&self, position: Vec2) -> f32 {
        self.route.as_ref().map_or(0.0, |r| r.remaining_distance(position))
    }

    /// Whole minutes to the destination at the configured average speed.
    pub fn estimated_minutes(&self, position: Vec2) -> u32 {
        let km = self.remaining_distance(position) / 1000.0;
        let speed = self.config.average_speed_kmh.max(f32::EPSILON);
        (km / speed * 60.0).round().max(0.0) as u32
    }

    /// Formatted ETA, e.g. `"3 min"` or `"1h 5m"`.
    pub fn estimated_time(&self, position: Vec2) -> String {
        format_eta(self.estimated_minutes(position))
    }

    pub fn is_destination_reached(&self, position: Vec2) -> bool {
        self.destination
            .is_some_and(|d| position.distance(d) <= self.config.arrival_threshold)
    }
}

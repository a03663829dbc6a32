//! A single traffic vehicle and its per-frame AI.
//!
//! # Frame step
//!
//! The manager drives each agent in two calls per frame:
//!
//! 1. [`TrafficAgent::traffic_behavior`] reacts to the surroundings:
//!    neighbours closer than the avoidance distance push the agent away and
//!    slow it, a neighbour ahead within the follow distance flags traffic,
//!    and the closest intersection's signal may hold the agent at a red
//!    light or make it brake for a yellow one.
//! 2. [`TrafficAgent::tick`] runs the AI (waypoint following, steering,
//!    braking/acceleration, lane changes, stuck detection) and integrates
//!    movement.
//!
//! Agents wander: their path is a short random walk regenerated whenever
//! it runs out, with no obstacle awareness.  Keeping them off buildings is
//! the collision resolver's job.
//!
//! # Stuck handling
//!
//! While speed stays below `stuck_speed` (and the agent is not held at a
//! red light) the stuck timer accumulates.  Every time it crosses another
//! multiple of `max_stuck_secs` the agent regenerates its path and jumps by
//! a small random offset.  The timer only resets once the agent moves
//! again, so the manager can remove agents that stay stuck for
//! `stuck_removal_factor` timeouts.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use ts_core::{AgentId, AgentRng, Axis, Intersection, SignalLight, Vec2};

use crate::{TrafficError, TrafficResult};

// ── VehicleKind ───────────────────────────────────────────────────────────────

/// Body style of a traffic vehicle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleKind {
    Sedan,
    Suv,
    Truck,
    Van,
    Sports,
}

/// Footprint of a vehicle body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleDimensions {
    pub width:  f32,
    pub height: f32,
    pub length: f32,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 5] = [
        VehicleKind::Sedan,
        VehicleKind::Suv,
        VehicleKind::Truck,
        VehicleKind::Van,
        VehicleKind::Sports,
    ];

    /// Spawn weights, aligned with [`ALL`](Self::ALL).
    pub const WEIGHTS: [f32; 5] = [0.4, 0.25, 0.15, 0.15, 0.05];

    /// Weighted random kind.
    pub fn sample(rng: &mut AgentRng) -> VehicleKind {
        let roll: f32 = rng.random();
        let mut cumulative = 0.0;
        for (kind, w) in Self::ALL.iter().zip(Self::WEIGHTS) {
            cumulative += w;
            if roll <= cumulative {
                return *kind;
            }
        }
        VehicleKind::Sedan
    }

    pub fn dimensions(self) -> VehicleDimensions {
        let (width, height, length) = match self {
            VehicleKind::Sedan => (3.5, 1.4, 7.0),
            VehicleKind::Suv => (4.0, 2.0, 8.0),
            VehicleKind::Truck => (4.5, 2.5, 10.0),
            VehicleKind::Van => (4.0, 2.2, 9.0),
            VehicleKind::Sports => (3.2, 1.2, 6.5),
        };
        VehicleDimensions { width, height, length }
    }

    /// Cruising speed restored by [`TrafficAgent::resume`].
    pub fn type_speed(self) -> f32 {
        match self {
            VehicleKind::Sedan => 25.0,
            VehicleKind::Suv => 22.0,
            VehicleKind::Truck => 18.0,
            VehicleKind::Van => 20.0,
            VehicleKind::Sports => 35.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VehicleKind::Sedan => "sedan",
            VehicleKind::Suv => "suv",
            VehicleKind::Truck => "truck",
            VehicleKind::Van => "van",
            VehicleKind::Sports => "sports",
        }
    }
}

// ── AgentParams ───────────────────────────────────────────────────────────────

/// Driving constants shared by every agent.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentParams {
    /// Speed gained per second when not braking.  Default: 8.
    pub acceleration:           f32,
    /// Speed lost per second when braking.  Default: 15.
    pub brake_force:            f32,
    /// Maximum yaw rate at full speed, rad/s.  Default: 1.5.
    pub turn_speed:             f32,
    /// Floor on the speed fraction used for the turn rate, so a stopped
    /// car can still orient itself.  Default: 0.25.
    pub min_turn_fraction:      f32,
    /// Per-frame speed multiplier.  Default: 0.98.
    pub friction:               f32,
    /// Waypoint counts as reached inside this radius.  Default: 5.
    pub arrival_radius:         f32,
    /// Waypoints per generated path (inclusive range).  Default: 5..=15.
    pub path_len:               (u32, u32),
    /// Leg length range of generated paths.  Default: 20..=30.
    pub leg_length:             (f32, f32),
    /// Maximum heading change between legs, radians.  Default: π/4.
    pub max_leg_turn:           f32,
    /// Below this speed the agent counts as stopped.  Default: 1.
    pub stuck_speed:            f32,
    /// Stuck time between recovery attempts.  Default: 3 s.
    pub max_stuck_secs:         f32,
    /// Half-extent of the random jump on recovery.  Default: 2.5.
    pub stuck_jitter:           f32,
    /// Neighbour ahead within this distance means traffic.  Default: 8.
    pub follow_distance:        f32,
    /// Cosine of the half-angle of the "ahead" cone.  Default: cos 30°.
    pub ahead_cone_cos:         f32,
    /// Chance per frame of a spontaneous brake.  Default: 0.05.
    pub random_brake_chance:    f64,
    /// Lane-change cooldown range, seconds.  Default: 5..15.
    pub lane_change_delay:      (f32, f32),
    /// Chance of starting a lane change when the cooldown expires.
    /// Default: 0.1.
    pub lane_change_chance:     f64,
    /// Half-extent of the lateral lane offset.  Default: 3.
    pub lane_offset:            f32,
    /// Lane-change duration range, seconds.  Default: 2..4.
    pub lane_change_secs:       (f32, f32),
    /// Neighbours closer than this are pushed away.  Default: 8.
    pub avoid_distance:         f32,
    /// Push speed away from close neighbours.  Default: 2 per second.
    pub avoid_push:             f32,
    /// Speed multiplier per close neighbour.  Default: 0.8.
    pub avoid_slowdown:         f32,
    /// Signals are obeyed inside this distance.  Default: 10.
    pub stop_distance:          f32,
    /// Yellow means brake inside this distance.  Default: 5.
    pub yellow_stop_distance:   f32,
    /// Emergency vehicles closer than this are yielded to.  Default: 15.
    pub emergency_distance:     f32,
    /// Sideways jump when yielding.  Default: 3.
    pub emergency_push:         f32,
    /// Speed multiplier when yielding.  Default: 0.3.
    pub emergency_slowdown:     f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            acceleration:         8.0,
            brake_force:          15.0,
            turn_speed:           1.5,
            min_turn_fraction:    0.25,
            friction:             0.98,
            arrival_radius:       5.0,
            path_len:             (5, 15),
            leg_length:           (20.0, 30.0),
            max_leg_turn:         FRAC_PI_4,
            stuck_speed:          1.0,
            max_stuck_secs:       3.0,
            stuck_jitter:         2.5,
            follow_distance:      8.0,
            ahead_cone_cos:       0.866,
            random_brake_chance:  0.05,
            lane_change_delay:    (5.0, 15.0),
            lane_change_chance:   0.1,
            lane_offset:          3.0,
            lane_change_secs:     (2.0, 4.0),
            avoid_distance:       8.0,
            avoid_push:           2.0,
            avoid_slowdown:       0.8,
            stop_distance:        10.0,
            yellow_stop_distance: 5.0,
            emergency_distance:   15.0,
            emergency_push:       3.0,
            emergency_slowdown:   0.3,
        }
    }
}

/// Uniform sample from `lo..hi`, or `lo` for an empty range.
fn sample_between(rng: &mut AgentRng, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

/// Wrap an angle into `(-π, π]`.
fn wrap_angle(a: f32) -> f32 {
    let a = a.rem_euclid(TAU);
    if a > PI { a - TAU } else { a }
}

// ── AgentSnapshot ─────────────────────────────────────────────────────────────

/// Read-only view of an agent for rendering and debugging.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentSnapshot {
    pub id:             AgentId,
    pub kind:           VehicleKind,
    pub position:       Vec2,
    pub heading:        f32,
    pub speed:          f32,
    pub max_speed:      f32,
    pub moving:         bool,
    pub braking:        bool,
    pub changing_lanes: bool,
    pub path_len:       usize,
    pub path_index:     usize,
    pub stuck_secs:     f32,
}

// ── TrafficAgent ──────────────────────────────────────────────────────────────

/// One simulated vehicle.
#[derive(Clone, Debug)]
pub struct TrafficAgent {
    id:        AgentId,
    kind:      VehicleKind,
    position:  Vec2,
    heading:   f32,
    speed:     f32,
    max_speed: f32,

    path:       Vec<Vec2>,
    path_index: usize,
    target:     Vec2,

    stuck_secs: f32,
    recoveries: u32,

    lane_change_timer:  f32,
    lane_change_delay:  f32,
    /// Seconds left in the current lane change; `0` when not changing.
    lane_change_left:   f32,

    braking:        bool,
    traffic_ahead:  bool,
    held_at_signal: bool,

    rng: AgentRng,
}

impl TrafficAgent {
    /// Agent at `position` with a random kind, cruising speed, heading and
    /// path, all drawn from its own RNG stream.
    pub fn new(id: AgentId, position: Vec2, seed: u64, params: &AgentParams) -> Self {
        let mut rng = AgentRng::new(seed, id);
        let kind = VehicleKind::sample(&mut rng);
        let max_speed = 10.0 + rng.random::<f32>() * 15.0;
        let heading = rng.gen_range(0.0..TAU);
        let lane_change_delay = sample_between(&mut rng, params.lane_change_delay);
        let mut agent = Self {
            id,
            kind,
            position,
            heading,
            speed: 0.0,
            max_speed,
            path: Vec::new(),
            path_index: 0,
            target: position,
            stuck_secs: 0.0,
            recoveries: 0,
            lane_change_timer: 0.0,
            lane_change_delay,
            lane_change_left: 0.0,
            braking: false,
            traffic_ahead: false,
            held_at_signal: false,
            rng,
        };
        agent.generate_path(params);
        agent
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn heading(&self) -> f32 {
        self.heading
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    #[inline]
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    #[inline]
    pub fn path_index(&self) -> usize {
        self.path_index
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    #[inline]
    pub fn stuck_secs(&self) -> f32 {
        self.stuck_secs
    }

    #[inline]
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    #[inline]
    pub fn is_braking(&self) -> bool {
        self.braking
    }

    #[inline]
    pub fn is_changing_lanes(&self) -> bool {
        self.lane_change_left > 0.0
    }

    #[inline]
    pub fn is_held_at_signal(&self) -> bool {
        self.held_at_signal
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.speed > 0.5
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_heading(self.heading)
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_heading(&mut self, heading: f32) {
        self.heading = wrap_angle(heading);
    }

    /// Set the current speed, clamped to `[0, ∞)`.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn set_max_speed(&mut self, max_speed: f32) {
        self.max_speed = max_speed.max(0.0);
    }

    // ── Path ──────────────────────────────────────────────────────────────

    /// Replace the path with a fresh random walk from the current position.
    ///
    /// Each leg turns by at most `max_leg_turn` from the previous leg's
    /// heading, starting from the agent's own heading.
    pub fn generate_path(&mut self, params: &AgentParams) {
        let (lo, hi) = params.path_len;
        let len = if hi > lo { self.rng.gen_range(lo..=hi) } else { lo.max(1) };
        let mut heading = self.heading;
        let mut at = self.position;
        self.path.clear();
        for _ in 0..len {
            heading += self.rng.symmetric(params.max_leg_turn);
            let leg = if params.leg_length.1 > params.leg_length.0 {
                self.rng.gen_range(params.leg_length.0..=params.leg_length.1)
            } else {
                params.leg_length.0
            };
            at += Vec2::from_heading(heading) * leg;
            self.path.push(at);
        }
        self.path_index = 0;
        self.target = self.path.first().copied().unwrap_or(self.position);
    }

    // ── Surroundings ──────────────────────────────────────────────────────

    /// React to nearby vehicles and the closest intersection.
    ///
    /// `neighbours` may include this agent's own handle; it is skipped.
    pub fn traffic_behavior(
        &mut self,
        neighbours: &[(AgentId, Vec2)],
        intersections: &[&Intersection],
        dt: f32,
        params: &AgentParams,
    ) {
        self.traffic_ahead = false;
        self.held_at_signal = false;
        let forward = self.forward();

        for &(other, pos) in neighbours {
            if other == self.id {
                continue;
            }
            let offset = pos - self.position;
            let d = offset.length();
            if d < params.avoid_distance {
                let away = (-offset).normalize_or(-forward);
                self.position += away * (params.avoid_push * dt);
                self.speed *= params.avoid_slowdown;
                self.braking = true;
            }
            if d < params.follow_distance {
                if let Some(dir) = offset.try_normalize() {
                    if dir.dot(forward) >= params.ahead_cone_cos {
                        self.traffic_ahead = true;
                    }
                }
            }
        }

        let closest = intersections.iter().min_by(|a, b| {
            self.position
                .distance_squared(a.position)
                .total_cmp(&self.position.distance_squared(b.position))
        });
        if let Some(intersection) = closest {
            let d = self.position.distance(intersection.position);
            if d < params.stop_distance {
                match intersection.signal.light_for(Axis::of_heading(self.heading)) {
                    SignalLight::Red => {
                        self.speed = 0.0;
                        self.braking = true;
                        self.held_at_signal = true;
                    }
                    SignalLight::Yellow if d < params.yellow_stop_distance => {
                        self.traffic_ahead = true;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Move aside for an emergency vehicle at `source`.
    pub fn yield_to_emergency(&mut self, source: Vec2, params: &AgentParams) {
        let offset = self.position - source;
        if offset.length() < params.emergency_distance {
            let away = offset.normalize_or(Vec2::from_heading(self.heading + FRAC_PI_2));
            self.position += away * params.emergency_push;
            self.speed *= params.emergency_slowdown;
            self.braking = true;
        }
    }

    // ── Frame step ────────────────────────────────────────────────────────

    /// Run the AI and integrate movement over `dt` seconds.
    ///
    /// # Errors
    ///
    /// [`TrafficError::AgentFault`] when the agent ends the step with a
    /// non-finite position, heading or speed.  The agent is left as is for
    /// the caller to reset.
    pub fn tick(&mut self, dt: f32, params: &AgentParams) -> TrafficResult<()> {
        self.follow_path(params);
        self.steer(dt, params);
        self.control_speed(dt, params);
        self.update_lane_change(dt, params);
        self.update_stuck(dt, params);

        self.speed *= params.friction;
        self.position += self.forward() * (self.speed * dt);

        self.traffic_ahead = false;
        self.held_at_signal = false;

        if self.position.is_finite() && self.heading.is_finite() && self.speed.is_finite() {
            Ok(())
        } else {
            Err(TrafficError::AgentFault(self.id))
        }
    }

    fn follow_path(&mut self, params: &AgentParams) {
        if self.path.is_empty() {
            self.generate_path(params);
            return;
        }
        if self.position.distance(self.target) < params.arrival_radius {
            self.path_index += 1;
            match self.path.get(self.path_index) {
                Some(&next) => self.target = next,
                None => self.generate_path(params),
            }
        }
    }

    fn steer(&mut self, dt: f32, params: &AgentParams) {
        let Some(dir) = (self.target - self.position).try_normalize() else {
            return;
        };
        let diff = wrap_angle(dir.heading() - self.heading);
        let fraction = if self.max_speed > 0.0 { self.speed / self.max_speed } else { 0.0 };
        let max_rate = params.turn_speed * dt * fraction.clamp(params.min_turn_fraction, 1.0);
        if diff.abs() > max_rate {
            self.heading = wrap_angle(self.heading + diff.signum() * max_rate);
        } else {
            self.heading = dir.heading();
        }
    }

    fn control_speed(&mut self, dt: f32, params: &AgentParams) {
        if self.held_at_signal {
            self.speed = 0.0;
            self.braking = true;
            return;
        }
        let brake = self.traffic_ahead || self.rng.gen_bool(params.random_brake_chance);
        self.braking = brake;
        self.speed = if brake {
            (self.speed - params.brake_force * dt).max(0.0)
        } else {
            (self.speed + params.acceleration * dt).min(self.max_speed)
        };
    }

    fn update_lane_change(&mut self, dt: f32, params: &AgentParams) {
        if self.lane_change_left > 0.0 {
            self.lane_change_left = (self.lane_change_left - dt).max(0.0);
        }
        self.lane_change_timer += dt;
        if self.lane_change_timer > self.lane_change_delay && self.lane_change_left <= 0.0 {
            if self.rng.gen_bool(params.lane_change_chance) {
                let right = Vec2::new(self.heading.cos(), -self.heading.sin());
                self.target += right * self.rng.symmetric(params.lane_offset);
                self.lane_change_left = sample_between(&mut self.rng, params.lane_change_secs);
            }
            self.lane_change_timer = 0.0;
            self.lane_change_delay = sample_between(&mut self.rng, params.lane_change_delay);
        }
    }

    fn update_stuck(&mut self, dt: f32, params: &AgentParams) {
        if self.held_at_signal {
            return;
        }
        if self.speed >= params.stuck_speed {
            self.stuck_secs = 0.0;
            self.recoveries = 0;
            return;
        }
        self.stuck_secs += dt;
        let next_recovery = params.max_stuck_secs * (self.recoveries + 1) as f32;
        if self.stuck_secs > next_recovery {
            self.recover(params);
        }
    }

    /// New path plus a small random jump.
    fn recover(&mut self, params: &AgentParams) {
        self.recoveries += 1;
        self.generate_path(params);
        let j = params.stuck_jitter;
        self.position += Vec2::new(self.rng.symmetric(j), self.rng.symmetric(j));
    }

    // ── Manager hooks ─────────────────────────────────────────────────────

    /// Halve the speed.
    pub fn brake(&mut self) {
        self.braking = true;
        self.speed *= 0.5;
    }

    /// Teleport to `position` with a fresh heading and path, at rest.
    pub fn respawn(&mut self, position: Vec2, params: &AgentParams) {
        self.position = position;
        self.heading = self.rng.gen_range(0.0..TAU);
        self.speed = 0.0;
        self.stuck_secs = 0.0;
        self.recoveries = 0;
        self.lane_change_left = 0.0;
        self.braking = false;
        self.generate_path(params);
    }

    #[inline]
    pub fn is_in_bounds(&self, bounds: &ts_core::Aabb) -> bool {
        bounds.contains(self.position)
    }

    /// Stop and cap speed at zero until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.speed = 0.0;
        self.max_speed = 0.0;
    }

    /// Restore the cruising speed of this vehicle kind.
    pub fn resume(&mut self) {
        self.max_speed = self.kind.type_speed();
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id:             self.id,
            kind:           self.kind,
            position:       self.position,
            heading:        self.heading,
            speed:          self.speed,
            max_speed:      self.max_speed,
            moving:         self.is_moving(),
            braking:        self.braking,
            changing_lanes: self.is_changing_lanes(),
            path_len:       self.path.len(),
            path_index:     self.path_index,
            stuck_secs:     self.stuck_secs,
        }
    }
}

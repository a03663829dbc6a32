//! The `Sim` struct and its frame loop.

use tracing::debug;

use ts_core::{AgentId, CityLayout, Intersection, IntersectionId, SimClock, SimConfig, Tick, TsError, Vec2};
use ts_nav::{NavGrid, NextTurn, PathFinder, RouteManager, RouteTick};
use ts_traffic::{AgentSnapshot, CollisionResolver, TrafficManager, TrafficStats};

use crate::{PlayerVehicle, SimObserver, SimResult};

// ── Reports ───────────────────────────────────────────────────────────────────

/// What happened during one [`Sim::step`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub tick:                Tick,
    /// Delta actually simulated, after clamping.
    pub dt:                  f32,
    pub agents:              usize,
    /// Traffic pairs pushed apart.
    pub agent_collisions:    usize,
    /// Traffic agents pushed out of buildings.
    pub agent_building_hits: usize,
    /// The player was pushed out of a building.
    pub player_hit_building: bool,
    /// Agents the player ran into, ascending.
    pub player_struck:       Vec<AgentId>,
    pub route:               RouteTick,
}

/// Read-only picture of the whole simulation for rendering and dumps.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimSnapshot {
    pub tick:               Tick,
    pub elapsed_secs:       f64,
    pub player:             PlayerVehicle,
    pub agents:             Vec<AgentSnapshot>,
    pub stats:              TrafficStats,
    pub destination:        Option<Vec2>,
    /// Route polyline, start to destination.
    pub route:              Option<Vec<Vec2>>,
    pub next_turn:          Option<NextTurn>,
    pub remaining_distance: f32,
    pub eta:                String,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The main simulation runner.
///
/// `Sim<P>` holds all simulation state and drives the frame loop:
///
/// 1. **Clock**: clamp the delta to `max_delta_secs`, advance the clock and
///    every intersection's signal controller.
/// 2. **Traffic**: spawn, run the agent AI, respawn strays, clean up stuck
///    and abandoned agents.
/// 3. **Collisions**: separate close traffic pairs, push traffic and the
///    player out of buildings, separate the player from traffic, clamp the
///    player to the world bounds.
/// 4. **GPS**: update the route session from the player's corrected
///    position.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<P: PathFinder> {
    pub config: SimConfig,

    pub clock: SimClock,

    /// City the simulation runs in; its intersections' signals tick here.
    pub layout: CityLayout,

    /// Occupancy grid built once from `layout`.
    pub grid: NavGrid,

    pub traffic: TrafficManager,

    pub collisions: CollisionResolver,

    /// Route session of the player's GPS.
    pub gps: RouteManager<P>,

    pub player: PlayerVehicle,
}

impl<P: PathFinder> Sim<P> {
    // ── Frame loop ────────────────────────────────────────────────────────

    /// Advance the simulation by one frame of `dt` seconds.
    pub fn step<O: SimObserver>(&mut self, dt: f32, observer: &mut O) -> FrameReport {
        let dt = self.config.clamp_delta(dt);
        let tick = self.clock.current_tick;
        observer.on_frame_start(tick);

        self.clock.advance(dt);
        self.layout.tick_signals(dt);

        self.traffic.update(dt, &self.layout.intersections);
        let agent_collisions = self.collisions.resolve_agents(&mut self.traffic);
        let agent_building_hits = self.collisions.resolve_agent_buildings(&mut self.traffic);

        let player_hit_building = self.collisions.resolve_buildings(&mut self.player);
        let player_struck = self.collisions.resolve_player(&mut self.player, &mut self.traffic);
        if !player_struck.is_empty() {
            debug!(%tick, struck = player_struck.len(), "player hit traffic");
        }
        CollisionResolver::constrain_to_bounds(&mut self.player, &self.config.world_bounds);

        let route = self.gps.update(&self.grid, self.player.position, self.clock.elapsed_secs);
        if route.rerouted {
            if let Some(r) = self.gps.route() {
                observer.on_reroute(tick, r);
            }
        }
        if let Some(announcement) = &route.announcement {
            observer.on_announcement(tick, announcement);
        }
        if route.arrived {
            observer.on_arrival(tick);
        }

        let report = FrameReport {
            tick,
            dt,
            agents: self.traffic.len(),
            agent_collisions,
            agent_building_hits,
            player_hit_building,
            player_struck,
            route,
        };
        observer.on_frame_end(&report);
        report
    }

    /// Run exactly `n` frames of `dt` seconds each.
    pub fn run_frames<O: SimObserver>(&mut self, n: u64, dt: f32, observer: &mut O) {
        for _ in 0..n {
            self.step(dt, observer);
        }
    }

    // ── Inputs ────────────────────────────────────────────────────────────

    /// Copy in the player vehicle's live state from the control layer.
    pub fn set_player_state(&mut self, position: Vec2, heading: f32, speed: f32) {
        self.player = PlayerVehicle { position, heading, speed };
    }

    /// Start GPS guidance toward `destination`.  The route is computed on
    /// the next frame.
    pub fn set_destination(&mut self, destination: Vec2) {
        self.gps.set_destination(destination);
    }

    pub fn clear_destination(&mut self) {
        self.gps.clear_destination();
    }

    pub fn set_traffic_density(&mut self, density: f32) {
        self.traffic.set_traffic_density(density);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SimSnapshot {
        let at = self.player.position;
        SimSnapshot {
            tick:               self.clock.current_tick,
            elapsed_secs:       self.clock.elapsed_secs,
            player:             self.player.clone(),
            agents:             self.traffic.snapshots(),
            stats:              self.traffic.stats(),
            destination:        self.gps.destination(),
            route:              self.gps.route().map(|r| r.path.clone()),
            next_turn:          self.gps.next_turn(at),
            remaining_distance: self.gps.remaining_distance(at),
            eta:                self.gps.estimated_time(at),
        }
    }

    /// Snapshot of one traffic agent.
    ///
    /// # Errors
    ///
    /// [`TsError::AgentNotFound`] if `id` is not live.
    pub fn agent(&self, id: AgentId) -> SimResult<AgentSnapshot> {
        self.traffic
            .agent(id)
            .map(|a| a.snapshot())
            .ok_or_else(|| TsError::AgentNotFound(id).into())
    }

    /// # Errors
    ///
    /// [`TsError::IntersectionNotFound`] if `id` is not in the layout.
    pub fn intersection(&self, id: IntersectionId) -> SimResult<&Intersection> {
        self.layout
            .intersection(id)
            .ok_or_else(|| TsError::IntersectionNotFound(id).into())
    }
}

//! `TrafficManager` — owner of the traffic population.
//!
//! # Storage
//!
//! Agents live in a dense `Vec<TrafficAgent>`.  A `FxHashMap<AgentId,
//! usize>` maps handles to slots and is rebuilt after every removal, so
//! slot order (and therefore update order) is insertion order, which keeps
//! runs deterministic.  Ids are allocated monotonically and never reused.
//!
//! The spatial index holds `AgentId` handles only.  Every path that moves
//! an agent refreshes its entry before the next agent is processed, and
//! every removal path deletes the entry.
//!
//! # Frame
//!
//! [`TrafficManager::update`]:
//!
//! 1. advance the spawn timer, spawning one agent per elapsed interval while
//!    under the cap;
//! 2. for each agent in slot order: query neighbours and intersections,
//!    run the behaviour step and the AI tick, refresh the index entry,
//!    respawn it if it left the city bounds;
//! 3. [`cleanup`](TrafficManager::cleanup): remove agents stuck for too
//!    long or abandoned far from every street.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use ts_core::{Aabb, AgentId, Intersection, IntersectionId, SimRng, Vec2};

use crate::agent::{AgentParams, AgentSnapshot, TrafficAgent, VehicleKind};
use crate::{SpatialIndex, TrafficError, TrafficResult};

// ── TrafficConfig ─────────────────────────────────────────────────────────────

/// Population and query settings.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficConfig {
    /// Population cap.  Default: 20.
    pub max_vehicles:          usize,
    /// Agents spawned by [`TrafficManager::new`].  Default: 5.
    pub initial_vehicles:      usize,
    /// Seconds between timed spawns.  Default: 3.
    pub spawn_interval_secs:   f32,
    /// Neighbour query radius for the behaviour step.  Default: 20.
    pub neighbour_radius:      f32,
    /// Intersection query radius for the behaviour step.  Default: 15.
    pub intersection_radius:   f32,
    /// Agents farther than this from every street position are removed.
    /// Default: 50.
    pub abandon_distance:      f32,
    /// Agents stuck for this many stuck timeouts are removed.  Default: 3.
    pub stuck_removal_factor:  f32,
    /// Leaving this rectangle triggers a respawn.  Default: ±200.
    pub city_bounds:           Aabb,
    /// Bucket size of the agent spatial index.  Default: 50.
    pub spatial_cell_size:     f32,
    /// `max_vehicles = floor(density * density_scale)`.  Default: 30.
    pub density_scale:         f32,
    /// Radius around an emergency vehicle whose agents are told to yield.
    /// Default: 20.
    pub emergency_radius:      f32,
    /// Per-agent driving constants.
    pub agent:                 AgentParams,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            max_vehicles:         20,
            initial_vehicles:     5,
            spawn_interval_secs:  3.0,
            neighbour_radius:     20.0,
            intersection_radius:  15.0,
            abandon_distance:     50.0,
            stuck_removal_factor: 3.0,
            city_bounds:          Aabb::square(200.0),
            spatial_cell_size:    50.0,
            density_scale:        30.0,
            emergency_radius:     20.0,
            agent:                AgentParams::default(),
        }
    }
}

// ── TrafficStats ──────────────────────────────────────────────────────────────

/// Aggregate population figures for dashboards and logs.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficStats {
    pub total:         usize,
    pub max_vehicles:  usize,
    pub average_speed: f32,
    pub moving:        usize,
    pub braking:       usize,
    /// Count per kind, in [`VehicleKind::ALL`] order.
    pub by_kind:       [usize; 5],
}

impl TrafficStats {
    pub fn count_of(&self, kind: VehicleKind) -> usize {
        VehicleKind::ALL
            .iter()
            .position(|k| *k == kind)
            .map_or(0, |i| self.by_kind[i])
    }
}

// ── Street lookup ─────────────────────────────────────────────────────────────

/// Street position stored in the abandonment R-tree.
#[derive(Clone)]
struct StreetEntry {
    point: [f32; 2], // [x, z]
}

impl RTreeObject for StreetEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StreetEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dz = self.point[1] - point[1];
        dx * dx + dz * dz
    }
}

// ── TrafficManager ────────────────────────────────────────────────────────────

pub struct TrafficManager {
    config: TrafficConfig,

    agents: Vec<TrafficAgent>,
    slots:  FxHashMap<AgentId, usize>,
    next_id: AgentId,

    index:              SpatialIndex<AgentId>,
    intersection_index: SpatialIndex<IntersectionId>,

    street_positions: Vec<Vec2>,
    street_tree:      RTree<StreetEntry>,

    spawn_timer: f32,
    paused:      bool,
    disposed:    bool,

    seed: u64,
    rng:  SimRng,
}

impl TrafficManager {
    /// Build the manager and spawn `config.initial_vehicles` agents (capped
    /// at `max_vehicles`).
    ///
    /// `street_positions` are the spawn points and the reference set for
    /// abandonment; `intersections` are indexed once by position.
    pub fn new(
        config: TrafficConfig,
        street_positions: Vec<Vec2>,
        intersections: &[Intersection],
        seed: u64,
    ) -> Self {
        let mut intersection_index = SpatialIndex::new(config.spatial_cell_size);
        for intersection in intersections {
            intersection_index.insert(intersection.id, intersection.position);
        }
        let street_tree = RTree::bulk_load(
            street_positions
                .iter()
                .map(|p| StreetEntry { point: [p.x, p.z] })
                .collect(),
        );

        let mut manager = Self {
            index: SpatialIndex::new(config.spatial_cell_size),
            intersection_index,
            agents: Vec::new(),
            slots: FxHashMap::default(),
            next_id: AgentId(0),
            street_positions,
            street_tree,
            spawn_timer: 0.0,
            paused: false,
            disposed: false,
            rng: SimRng::new(seed),
            seed,
            config,
        };

        let initial = manager.config.initial_vehicles.min(manager.config.max_vehicles);
        for _ in 0..initial {
            if manager.spawn().is_err() {
                break;
            }
        }
        info!(
            agents = manager.agents.len(),
            streets = manager.street_positions.len(),
            intersections = manager.intersection_index.len(),
            "traffic manager ready"
        );
        manager
    }

    // ── Population ────────────────────────────────────────────────────────

    /// Spawn one agent at a random street position.
    ///
    /// # Errors
    ///
    /// [`TrafficError::NoSpawnPositions`] when the manager has no street
    /// positions.
    pub fn spawn(&mut self) -> TrafficResult<AgentId> {
        let position = self
            .rng
            .choose(&self.street_positions)
            .copied()
            .ok_or(TrafficError::NoSpawnPositions)?;
        Ok(self.spawn_at(position))
    }

    /// Spawn one agent at `position`, ignoring the cap.
    pub fn spawn_at(&mut self, position: Vec2) -> AgentId {
        let id = self.next_id;
        self.next_id = id.next();
        let mut agent = TrafficAgent::new(id, position, self.seed, &self.config.agent);
        if self.paused {
            agent.pause();
        }
        self.index.insert(id, position);
        self.slots.insert(id, self.agents.len());
        self.agents.push(agent);
        debug!(agent = %id, x = position.x, z = position.z, "spawned traffic vehicle");
        id
    }

    /// Remove one agent.  Returns `false` if the id is unknown.
    pub fn remove(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.slots.get(&id).copied() else {
            return false;
        };
        self.agents.remove(slot);
        self.index.remove(id);
        self.rebuild_slots();
        debug!(agent = %id, "removed traffic vehicle");
        true
    }

    fn rebuild_slots(&mut self) {
        self.slots.clear();
        for (slot, agent) in self.agents.iter().enumerate() {
            self.slots.insert(agent.id(), slot);
        }
    }

    /// Street position to respawn at; the city centre when there are none.
    fn respawn_position(&mut self) -> Vec2 {
        self.rng
            .choose(&self.street_positions)
            .copied()
            .unwrap_or_else(|| self.config.city_bounds.center())
    }

    // ── Frame ─────────────────────────────────────────────────────────────

    /// Advance the population by `dt` seconds.
    ///
    /// `intersections` is the live intersection list (signals change every
    /// frame); ids returned by the intersection index are resolved against
    /// it and unknown ids are skipped.
    pub fn update(&mut self, dt: f32, intersections: &[Intersection]) {
        if self.disposed || !dt.is_finite() || dt <= 0.0 {
            return;
        }

        self.spawn_timer += dt;
        let interval = self.config.spawn_interval_secs.max(f32::EPSILON);
        while self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            if self.agents.len() < self.config.max_vehicles && self.spawn().is_err() {
                break;
            }
        }

        for slot in 0..self.agents.len() {
            self.step_agent(slot, dt, intersections);
        }

        self.cleanup();
    }

    fn step_agent(&mut self, slot: usize, dt: f32, intersections: &[Intersection]) {
        let params = &self.config.agent;
        let agent = &mut self.agents[slot];
        let id = agent.id();
        let position = agent.position();

        let neighbours = self.index.query(position, self.config.neighbour_radius);
        let nearby: Vec<&Intersection> = self
            .intersection_index
            .query(position, self.config.intersection_radius)
            .into_iter()
            .filter_map(|(iid, _)| intersections.get(iid.index()).filter(|i| i.id == iid))
            .collect();

        agent.traffic_behavior(&neighbours, &nearby, dt, params);
        let faulted = agent.tick(dt, params).is_err();
        let in_bounds = agent.is_in_bounds(&self.config.city_bounds);

        if faulted || !in_bounds {
            if faulted {
                warn!(agent = %id, "traffic vehicle entered an invalid state; respawning");
            } else {
                debug!(agent = %id, "traffic vehicle left the city; respawning");
            }
            let at = self.respawn_position();
            self.agents[slot].respawn(at, &self.config.agent);
        }
        self.index.update(id, self.agents[slot].position());
    }

    /// Remove agents stuck for `stuck_removal_factor` timeouts or abandoned
    /// farther than `abandon_distance` from every street position.
    ///
    /// Returns the number of agents removed.
    pub fn cleanup(&mut self) -> usize {
        let stuck_limit = self.config.agent.max_stuck_secs * self.config.stuck_removal_factor;
        let abandon2 = self.config.abandon_distance * self.config.abandon_distance;
        let has_streets = self.street_tree.size() > 0;

        let doomed: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|a| {
                let stuck = a.stuck_secs() > stuck_limit;
                let p = a.position();
                let abandoned = has_streets
                    && self
                        .street_tree
                        .nearest_neighbor(&[p.x, p.z])
                        .is_some_and(|s| s.distance_2(&[p.x, p.z]) > abandon2);
                stuck || abandoned
            })
            .map(TrafficAgent::id)
            .collect();

        if doomed.is_empty() {
            return 0;
        }
        for id in &doomed {
            self.index.remove(*id);
            debug!(agent = %id, "cleaned up traffic vehicle");
        }
        self.agents.retain(|a| !doomed.contains(&a.id()));
        self.rebuild_slots();
        doomed.len()
    }

    /// Drop every agent and clear the index.  Safe to call repeatedly;
    /// later [`update`](Self::update) calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.agents.clear();
        self.slots.clear();
        self.index.clear();
        self.disposed = true;
        info!("traffic manager disposed");
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ── Controls ──────────────────────────────────────────────────────────

    /// Rescale the population for `density` in `[0, 1]` (clamped).
    ///
    /// `max_vehicles = floor(density * density_scale)`; the spawn interval
    /// becomes `clamp(5 - 4 * density, 1, 5)` seconds.  Agents beyond the new
    /// cap are removed from the end of the population immediately.
    pub fn set_traffic_density(&mut self, density: f32) {
        let density = if density.is_finite() { density.clamp(0.0, 1.0) } else { 0.0 };
        self.config.max_vehicles = (density * self.config.density_scale).floor() as usize;
        self.config.spawn_interval_secs = (5.0 - 4.0 * density).clamp(1.0, 5.0);

        let mut trimmed = 0;
        while self.agents.len() > self.config.max_vehicles {
            if let Some(agent) = self.agents.pop() {
                self.index.remove(agent.id());
                trimmed += 1;
            }
        }
        if trimmed > 0 {
            self.rebuild_slots();
        }
        info!(
            density,
            max_vehicles = self.config.max_vehicles,
            spawn_interval = self.config.spawn_interval_secs,
            trimmed,
            "traffic density changed"
        );
    }

    pub fn set_city_bounds(&mut self, bounds: Aabb) {
        self.config.city_bounds = bounds;
    }

    /// Stop every agent; agents spawned while paused start stopped.
    pub fn pause(&mut self) {
        self.paused = true;
        for agent in &mut self.agents {
            agent.pause();
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
        for agent in &mut self.agents {
            agent.resume();
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Agents within `radius` of `center`.
    pub fn vehicles_in_area(&self, center: Vec2, radius: f32) -> Vec<AgentId> {
        self.index.query(center, radius).into_iter().map(|(id, _)| id).collect()
    }

    /// Make agents near `position` yield to an emergency vehicle there.
    ///
    /// Returns the number of agents told to yield.
    pub fn add_emergency_vehicle(&mut self, position: Vec2) -> usize {
        let nearby = self.index.query(position, self.config.emergency_radius);
        for (id, _) in &nearby {
            let Some(&slot) = self.slots.get(id) else {
                continue;
            };
            let agent = &mut self.agents[slot];
            agent.yield_to_emergency(position, &self.config.agent);
            self.index.update(*id, agent.position());
        }
        nearby.len()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn stats(&self) -> TrafficStats {
        let mut stats = TrafficStats {
            total: self.agents.len(),
            max_vehicles: self.config.max_vehicles,
            ..TrafficStats::default()
        };
        let mut speed_sum = 0.0;
        for agent in &self.agents {
            speed_sum += agent.speed();
            if agent.is_moving() {
                stats.moving += 1;
            }
            if agent.is_braking() {
                stats.braking += 1;
            }
            if let Some(i) = VehicleKind::ALL.iter().position(|k| *k == agent.kind()) {
                stats.by_kind[i] += 1;
            }
        }
        if !self.agents.is_empty() {
            stats.average_speed = speed_sum / self.agents.len() as f32;
        }
        stats
    }

    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(TrafficAgent::snapshot).collect()
    }

    pub fn agent(&self, id: AgentId) -> Option<&TrafficAgent> {
        self.slots.get(&id).map(|&slot| &self.agents[slot])
    }

    /// Mutable access to one agent.  Callers that move it must call
    /// [`refresh`](Self::refresh) before the next query.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut TrafficAgent> {
        self.slots.get(&id).map(|&slot| &mut self.agents[slot])
    }

    /// Move `id` by `offset` and re-bucket it.  Returns the agent for
    /// further adjustment, or `None` if `id` is not live.
    pub fn displace(&mut self, id: AgentId, offset: Vec2) -> Option<&mut TrafficAgent> {
        let slot = *self.slots.get(&id)?;
        let agent = &mut self.agents[slot];
        let position = agent.position() + offset;
        agent.set_position(position);
        self.index.update(id, position);
        Some(agent)
    }

    /// Re-bucket `id` at its current position.
    ///
    /// # Errors
    ///
    /// [`TrafficError::UnknownAgent`] if `id` is not live.
    pub fn refresh(&mut self, id: AgentId) -> TrafficResult<()> {
        let slot = *self.slots.get(&id).ok_or(TrafficError::UnknownAgent(id))?;
        self.index.update(id, self.agents[slot].position());
        Ok(())
    }

    #[inline]
    pub fn agents(&self) -> &[TrafficAgent] {
        &self.agents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[inline]
    pub fn index(&self) -> &SpatialIndex<AgentId> {
        &self.index
    }

    #[inline]
    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    #[inline]
    pub fn street_positions(&self) -> &[Vec2] {
        &self.street_positions
    }
}

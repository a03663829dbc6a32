//! Corrective collision response between vehicles and buildings.
//!
//! Runs after movement integration and only repairs overlaps it finds; a
//! fast vehicle can still tunnel through a thin footprint within one frame.
//!
//! Vehicles are points with a radius.  A building overlap pushes the
//! vehicle a fixed distance away from the footprint centre and stops it;
//! this applies to traffic agents and the player alike.
//! Two vehicles closer than the minimum separation are pushed apart along
//! their separation vector, half the push each, and both lose half their
//! speed.

use rstar::{RTree, RTreeObject, AABB};

use ts_core::{Aabb, AgentId, CityLayout, Vec2};

use crate::{TrafficAgent, TrafficManager};

/// Separation direction for coincident bodies.
const FALLBACK_DIR: Vec2 = Vec2::new(1.0, 0.0);

// ── Collidable ────────────────────────────────────────────────────────────────

/// Anything the resolver can push around.
pub trait Collidable {
    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    /// Multiply the current speed by `factor`.
    fn scale_speed(&mut self, factor: f32);
    /// Stop dead.
    fn halt(&mut self);
}

impl Collidable for TrafficAgent {
    fn position(&self) -> Vec2 {
        TrafficAgent::position(self)
    }
    fn set_position(&mut self, position: Vec2) {
        TrafficAgent::set_position(self, position);
    }
    fn scale_speed(&mut self, factor: f32) {
        let speed = self.speed() * factor;
        self.set_speed(speed);
    }
    fn halt(&mut self) {
        self.set_speed(0.0);
    }
}

// ── CollisionConfig ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionConfig {
    /// Vehicle radius added to building footprints.  Default: 2.
    pub vehicle_radius:     f32,
    /// Distance a vehicle is pushed out of a building.  Default: 3.
    pub building_push:      f32,
    /// Vehicles closer than this collide.  Default: 4.
    pub min_separation:     f32,
    /// Total push applied to a colliding pair, split evenly.  Default: 2.
    pub vehicle_push:       f32,
    /// Speed multiplier applied to both vehicles of a pair.  Default: 0.5.
    pub speed_penalty:      f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            vehicle_radius: 2.0,
            building_push:  3.0,
            min_separation: 4.0,
            vehicle_push:   2.0,
            speed_penalty:  0.5,
        }
    }
}

// ── Building index ────────────────────────────────────────────────────────────

#[derive(Clone)]
struct FootprintEntry {
    footprint: Aabb,
}

impl RTreeObject for FootprintEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.footprint.min.x, self.footprint.min.z],
            [self.footprint.max.x, self.footprint.max.z],
        )
    }
}

// ── CollisionResolver ─────────────────────────────────────────────────────────

pub struct CollisionResolver {
    config:    CollisionConfig,
    buildings: RTree<FootprintEntry>,
}

impl CollisionResolver {
    pub fn from_layout(layout: &CityLayout, config: CollisionConfig) -> Self {
        Self::from_footprints(layout.buildings.iter().map(|b| b.footprint()), config)
    }

    pub fn from_footprints(footprints: impl IntoIterator<Item = Aabb>, config: CollisionConfig) -> Self {
        let entries = footprints.into_iter().map(|footprint| FootprintEntry { footprint }).collect();
        Self { config, buildings: RTree::bulk_load(entries) }
    }

    #[inline]
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    #[inline]
    pub fn building_count(&self) -> usize {
        self.buildings.size()
    }

    /// Footprint (expanded by the vehicle radius) containing `p`, closest
    /// centre first.
    fn overlapping_footprint(&self, p: Vec2) -> Option<Aabb> {
        let r = self.config.vehicle_radius;
        let envelope = AABB::from_corners([p.x - r, p.z - r], [p.x + r, p.z + r]);
        self.buildings
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.footprint)
            .filter(|f| f.contains_with_margin(p, r))
            .min_by(|a, b| {
                p.distance_squared(a.center()).total_cmp(&p.distance_squared(b.center()))
            })
    }

    /// Offset that pushes a body at `p` out of the building it overlaps.
    fn building_push(&self, p: Vec2) -> Option<Vec2> {
        let footprint = self.overlapping_footprint(p)?;
        let dir = (p - footprint.center()).normalize_or(FALLBACK_DIR);
        Some(dir * self.config.building_push)
    }

    /// Push `body` out of the building it overlaps, if any, and halt it.
    pub fn resolve_buildings<C: Collidable + ?Sized>(&self, body: &mut C) -> bool {
        let p = body.position();
        let Some(offset) = self.building_push(p) else {
            return false;
        };
        body.set_position(p + offset);
        body.halt();
        true
    }

    /// Separate every pair of traffic agents closer than `min_separation`.
    ///
    /// Pairs are visited once in slot order, against the index as updated by
    /// earlier pairs.  Returns the number of pairs resolved.
    pub fn resolve_agents(&self, manager: &mut TrafficManager) -> usize {
        let ids: Vec<AgentId> = manager.agents().iter().map(TrafficAgent::id).collect();
        let mut resolved = 0;
        for id in ids {
            let Some(pos) = manager.index().position_of(id) else {
                continue;
            };
            let close: Vec<(AgentId, Vec2)> = manager
                .index()
                .query(pos, self.config.min_separation)
                .into_iter()
                .filter(|&(other, opos)| other > id && pos.distance(opos) < self.config.min_separation)
                .collect();
            for (other, _) in close {
                if self.separate(manager, id, other) {
                    resolved += 1;
                }
            }
        }
        resolved
    }

    fn separate(&self, manager: &mut TrafficManager, a: AgentId, b: AgentId) -> bool {
        let (Some(pa), Some(pb)) = (manager.index().position_of(a), manager.index().position_of(b)) else {
            return false;
        };
        let dir = (pa - pb).normalize_or(FALLBACK_DIR);
        let half = self.config.vehicle_push * 0.5;
        for (id, offset) in [(a, dir * half), (b, -(dir * half))] {
            if let Some(agent) = manager.displace(id, offset) {
                agent.scale_speed(self.config.speed_penalty);
            }
        }
        true
    }

    /// Push every traffic agent out of the building it overlaps, halt it and
    /// re-bucket it.  Returns the number of agents pushed.
    pub fn resolve_agent_buildings(&self, manager: &mut TrafficManager) -> usize {
        let ids: Vec<AgentId> = manager.agents().iter().map(TrafficAgent::id).collect();
        let mut pushed = 0;
        for id in ids {
            let Some(p) = manager.agent(id).map(TrafficAgent::position) else {
                continue;
            };
            let Some(offset) = self.building_push(p) else {
                continue;
            };
            if let Some(agent) = manager.displace(id, offset) {
                agent.halt();
                pushed += 1;
            }
        }
        pushed
    }

    /// Separate the player from traffic closer than `min_separation`.
    ///
    /// Struck agents are pushed away and brake.  Returns their ids.
    pub fn resolve_player<C: Collidable + ?Sized>(
        &self,
        player: &mut C,
        manager: &mut TrafficManager,
    ) -> Vec<AgentId> {
        let p = player.position();
        let mut hit: Vec<(AgentId, Vec2)> = manager
            .index()
            .query(p, self.config.min_separation)
            .into_iter()
            .filter(|&(_, apos)| p.distance(apos) < self.config.min_separation)
            .collect();
        hit.sort_by_key(|&(id, _)| id);

        let half = self.config.vehicle_push * 0.5;
        for &(id, apos) in &hit {
            let dir = (player.position() - apos).normalize_or(FALLBACK_DIR);
            player.set_position(player.position() + dir * half);
            player.scale_speed(self.config.speed_penalty);
            if let Some(agent) = manager.displace(id, -(dir * half)) {
                agent.brake();
            }
        }
        hit.into_iter().map(|(id, _)| id).collect()
    }

    /// Clamp `body` into `bounds`.  Returns `true` if it was outside.
    pub fn constrain_to_bounds<C: Collidable + ?Sized>(body: &mut C, bounds: &Aabb) -> bool {
        let p = body.position();
        if bounds.contains(p) {
            return false;
        }
        body.set_position(bounds.clamp(p));
        true
    }
}

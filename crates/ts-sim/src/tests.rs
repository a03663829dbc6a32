//! Integration tests for ts-sim.

use ts_core::{
    Building, CityLayout, Orientation, SimConfig, StreetSegment, Tick, TrafficSignal, Vec2,
};
use ts_nav::{AStarPathFinder, Announcement, Route};
use ts_traffic::TrafficConfig;

use crate::{FrameReport, Sim, SimBuilder, SimObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// One wide east-west street with a 20×20 building in the middle of it,
/// spawn points at both ends and one signalised junction at the west end.
fn detour_layout() -> CityLayout {
    let mut layout = CityLayout::new();
    layout
        .add_street(StreetSegment::new(Vec2::new(50.0, 0.0), 80.0, 140.0, Orientation::Horizontal))
        .add_building(Building::new(Vec2::new(50.0, 0.0), 20.0))
        .add_spawn_position(Vec2::new(0.0, 0.0))
        .add_spawn_position(Vec2::new(100.0, 0.0));
    layout.add_intersection(Vec2::new(0.0, 0.0), TrafficSignal::new(0));
    layout
}

fn no_traffic() -> TrafficConfig {
    TrafficConfig { initial_vehicles: 0, max_vehicles: 0, ..TrafficConfig::default() }
}

fn quiet_sim() -> Sim<AStarPathFinder> {
    SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
        .traffic_config(no_traffic())
        .build()
        .unwrap()
}

#[derive(Default)]
struct Recorder {
    frames:        u64,
    reroutes:      usize,
    announcements: Vec<String>,
    arrivals:      Vec<Tick>,
    last_report:   Option<FrameReport>,
}

impl SimObserver for Recorder {
    fn on_frame_start(&mut self, tick: Tick) {
        assert_eq!(tick.0, self.frames);
    }
    fn on_reroute(&mut self, _tick: Tick, route: &Route) {
        assert!(route.path.len() >= 2);
        self.reroutes += 1;
    }
    fn on_announcement(&mut self, _tick: Tick, announcement: &Announcement) {
        self.announcements.push(announcement.text.clone());
    }
    fn on_arrival(&mut self, tick: Tick) {
        self.arrivals.push(tick);
    }
    fn on_frame_end(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.last_report = Some(report.clone());
    }
}

// ── SimBuilder ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use ts_core::{CityLayout, SimConfig, Vec2};
    use ts_nav::{AStarPathFinder, NavError};

    use super::*;
    use crate::SimError;

    #[test]
    fn builds_grid_traffic_and_collisions() {
        let sim = SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
            .build()
            .unwrap();
        assert!(sim.grid.walkable_count() > 0);
        assert_eq!(sim.traffic.len(), 5);
        assert_eq!(sim.collisions.building_count(), 1);
        assert_eq!(sim.player.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn player_start_override() {
        let sim = SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
            .player_start(Vec2::new(10.0, 5.0))
            .build()
            .unwrap();
        assert_eq!(sim.player.position, Vec2::new(10.0, 5.0));
    }

    #[test]
    fn empty_layout_is_rejected() {
        let result = SimBuilder::new(SimConfig::default(), CityLayout::new(), AStarPathFinder).build();
        assert!(matches!(result, Err(SimError::Nav(NavError::EmptyLayout))));
    }

    #[test]
    fn bad_cell_size_is_rejected() {
        let result = SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
            .cell_size(0.0)
            .build();
        assert!(matches!(result, Err(SimError::Nav(NavError::InvalidCellSize(_)))));
    }

    #[test]
    fn bad_delta_cap_is_rejected() {
        let config = SimConfig { max_delta_secs: 0.0, ..SimConfig::default() };
        let result = SimBuilder::new(config, detour_layout(), AStarPathFinder).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn out_of_range_agent_probabilities_are_rejected() {
        for (brake, lane) in [(1.5, 0.1), (0.05, -0.2), (f64::NAN, 0.1)] {
            let mut traffic = TrafficConfig::default();
            traffic.agent.random_brake_chance = brake;
            traffic.agent.lane_change_chance = lane;
            let result = SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
                .traffic_config(traffic)
                .build();
            assert!(matches!(result, Err(SimError::Config(_))), "brake {brake}, lane {lane}");
        }
    }
}

// ── Frame loop ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod frame_tests {
    use ts_core::{Aabb, AgentId, IntersectionId, TsError, Vec2};

    use super::*;
    use crate::{NoopObserver, SimError};

    #[test]
    fn delta_is_clamped() {
        let mut sim = quiet_sim();
        let report = sim.step(5.0, &mut NoopObserver);
        assert_eq!(report.dt, 0.1);
        assert!((sim.clock.elapsed_secs - 0.1).abs() < 1e-6);

        let report = sim.step(-1.0, &mut NoopObserver);
        assert_eq!(report.dt, 0.0);
        assert_eq!(sim.clock.current_tick, Tick(2));
    }

    #[test]
    fn run_frames_calls_hooks_in_order() {
        let mut sim = quiet_sim();
        let mut rec = Recorder::default();
        sim.run_frames(25, 1.0 / 60.0, &mut rec);
        assert_eq!(rec.frames, 25);
        assert_eq!(rec.last_report.map(|r| r.tick), Some(Tick(24)));
    }

    #[test]
    fn signals_advance_with_the_clock() {
        let mut sim = quiet_sim();
        let id = IntersectionId(0);
        assert_eq!(sim.intersection(id).unwrap().signal.phase(), 0);
        // 9 s: past the 8 s green, inside the 2 s yellow.
        sim.run_frames(90, 0.1, &mut NoopObserver);
        assert_eq!(sim.intersection(id).unwrap().signal.phase(), 1);
    }

    #[test]
    fn player_is_pushed_out_of_buildings() {
        let mut sim = quiet_sim();
        sim.set_player_state(Vec2::new(55.0, 0.0), 0.0, 12.0);
        let report = sim.step(0.1, &mut NoopObserver);
        assert!(report.player_hit_building);
        assert_eq!(sim.player.position, Vec2::new(58.0, 0.0));
        assert_eq!(sim.player.speed, 0.0);
    }

    #[test]
    fn traffic_is_pushed_out_of_buildings() {
        let mut sim = quiet_sim();
        let id = sim.traffic.spawn_at(Vec2::new(45.0, 0.0));
        sim.traffic.pause();

        let report = sim.step(0.1, &mut NoopObserver);
        assert_eq!(report.agent_building_hits, 1);
        assert_eq!(sim.agent(id).unwrap().position, Vec2::new(42.0, 0.0));

        sim.run_frames(29, 0.1, &mut NoopObserver);
        let footprint = Aabb::from_center(Vec2::new(50.0, 0.0), 20.0, 20.0);
        let at = sim.agent(id).unwrap().position;
        assert!(!footprint.contains(at), "agent still inside at {at}");
    }

    #[test]
    fn player_is_kept_in_the_world() {
        let mut sim = quiet_sim();
        sim.set_player_state(Vec2::new(900.0, 0.0), 0.0, 5.0);
        sim.step(0.1, &mut NoopObserver);
        assert_eq!(sim.player.position, Vec2::new(500.0, 0.0));
    }

    #[test]
    fn player_strikes_traffic() {
        let mut sim = quiet_sim();
        let id = sim.traffic.spawn_at(Vec2::new(20.0, 30.0));
        sim.traffic.pause();
        sim.set_player_state(Vec2::new(18.0, 30.0), 0.0, 10.0);
        let report = sim.step(0.1, &mut NoopObserver);
        assert_eq!(report.player_struck, vec![id]);
        assert!(sim.agent(id).unwrap().braking);
        assert!(sim.player.speed < 10.0);
    }

    #[test]
    fn unknown_handles_are_errors() {
        let sim = quiet_sim();
        assert!(matches!(sim.agent(AgentId(99)), Err(SimError::Core(TsError::AgentNotFound(_)))));
        assert!(matches!(
            sim.intersection(IntersectionId(3)),
            Err(SimError::Core(TsError::IntersectionNotFound(_)))
        ));
    }

    #[test]
    fn density_is_forwarded() {
        let mut sim = SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
            .build()
            .unwrap();
        sim.set_traffic_density(0.1);
        assert!(sim.traffic.len() <= 3);
        sim.run_frames(100, 0.1, &mut NoopObserver);
        assert!(sim.traffic.len() <= 3);
    }

    #[test]
    fn same_seed_same_run() {
        let build = || {
            SimBuilder::new(SimConfig::default(), detour_layout(), AStarPathFinder)
                .build()
                .unwrap()
        };
        let mut a = build();
        let mut b = build();
        a.set_destination(Vec2::new(100.0, 0.0));
        b.set_destination(Vec2::new(100.0, 0.0));
        a.run_frames(300, 1.0 / 60.0, &mut NoopObserver);
        b.run_frames(300, 1.0 / 60.0, &mut NoopObserver);
        assert_eq!(a.snapshot(), b.snapshot());
    }
}

// ── GPS ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod gps_tests {
    use ts_core::{CityLayout, GridCityParams, SimConfig, SimRng, Vec2};
    use ts_nav::AStarPathFinder;

    use super::*;
    use crate::NoopObserver;

    #[test]
    fn route_is_computed_on_the_next_frame() {
        let mut sim = quiet_sim();
        let mut rec = Recorder::default();
        sim.set_destination(Vec2::new(100.0, 0.0));
        assert!(sim.gps.route().is_none());

        let report = sim.step(0.1, &mut rec);
        assert!(report.route.rerouted);
        assert_eq!(rec.reroutes, 1);

        let snap = sim.snapshot();
        let path = snap.route.unwrap();
        assert!(path.len() >= 3, "route should bend around the building");
        assert!(snap.remaining_distance > 100.0);
        assert_eq!(snap.destination, Some(Vec2::new(100.0, 0.0)));
        assert!(!snap.eta.is_empty());

        // Inside the refresh interval and on the route: no recompute.
        let report = sim.step(0.1, &mut rec);
        assert!(!report.route.rerouted);
        assert_eq!(rec.reroutes, 1);
    }

    #[test]
    fn upcoming_turn_is_announced_once() {
        let mut sim = quiet_sim();
        let mut rec = Recorder::default();
        sim.set_destination(Vec2::new(100.0, 0.0));
        sim.step(0.1, &mut rec);
        assert!(rec.announcements.is_empty());

        sim.set_player_state(Vec2::new(30.0, 5.0), 0.0, 8.0);
        sim.step(0.1, &mut rec);
        sim.step(0.1, &mut rec);
        assert_eq!(rec.announcements.len(), 1);
        assert!(rec.announcements[0].starts_with("In 24 meters"), "{}", rec.announcements[0]);
        assert!(sim.snapshot().next_turn.is_some());
    }

    #[test]
    fn arrival_ends_the_session() {
        let mut sim = quiet_sim();
        let mut rec = Recorder::default();
        sim.set_destination(Vec2::new(100.0, 0.0));
        sim.step(0.1, &mut rec);

        sim.set_player_state(Vec2::new(97.0, 0.0), 0.0, 3.0);
        let report = sim.step(0.1, &mut rec);
        assert!(report.route.arrived);
        assert_eq!(rec.arrivals, vec![Tick(1)]);
        assert!(!sim.gps.is_active());
        assert_eq!(sim.snapshot().destination, None);

        sim.step(0.1, &mut rec);
        assert_eq!(rec.arrivals.len(), 1);
    }

    #[test]
    fn clear_destination_drops_the_route() {
        let mut sim = quiet_sim();
        sim.set_destination(Vec2::new(100.0, 0.0));
        sim.step(0.1, &mut NoopObserver);
        assert!(sim.gps.route().is_some());
        sim.clear_destination();
        assert!(sim.gps.route().is_none());
        assert!(sim.snapshot().route.is_none());
        let report = sim.step(0.1, &mut NoopObserver);
        assert!(!report.route.rerouted);
    }

    #[test]
    fn routes_across_a_generated_city() {
        let params = GridCityParams { city_size: 6, ..GridCityParams::default() };
        let layout = CityLayout::generate_grid(&params, &mut SimRng::new(7));
        let start = layout.spawn_positions[0];
        let goal = *layout.spawn_positions.last().unwrap();

        let mut sim = SimBuilder::new(SimConfig::default(), layout, AStarPathFinder)
            .player_start(start)
            .build()
            .unwrap();
        sim.set_destination(goal);
        let report = sim.step(1.0 / 60.0, &mut NoopObserver);
        assert!(report.route.rerouted);
        let route = sim.gps.route().unwrap();
        assert!(route.total_distance >= start.distance(goal) * 0.9);
    }
}

//! city_drive — headless drive across a generated grid city.
//!
//! Generates a 15×15 block city, fills it with ambient traffic and lets a
//! simple autopilot drive the taxi along the GPS route to the far corner.
//! Turn announcements and arrival are printed as they happen; the final
//! simulation snapshot is written to `output/city_drive/snapshot.json`.
//!
//! Set `RUST_LOG=debug` to see the simulation's own tracing output.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ts_core::{CityLayout, GridCityParams, SimConfig, SimRng, Tick, Vec2};
use ts_nav::{AStarPathFinder, Announcement, Route};
use ts_sim::{FrameReport, Sim, SimBuilder, SimObserver};
use ts_traffic::TrafficConfig;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:            u64 = 42;
const FRAME_SECS:      f32 = 1.0 / 60.0;
const MAX_FRAMES:      u64 = 60 * 60 * 3; // three simulated minutes
const CRUISE_SPEED:    f32 = 12.0;
/// Distance at which the autopilot moves on to the next waypoint.
const WAYPOINT_REACH:  f32 = 2.0;

// ── Observer ──────────────────────────────────────────────────────────────────

/// Prints GPS events and counts what happened on the road.
#[derive(Default)]
struct DriveLog {
    reroutes:      usize,
    arrived_at:    Option<Tick>,
    traffic_hits:  usize,
    building_hits: usize,
}

impl SimObserver for DriveLog {
    fn on_reroute(&mut self, tick: Tick, route: &Route) {
        self.reroutes += 1;
        println!(
            "[{tick:>6}] route: {} waypoints, {:.0} m, {} turns",
            route.path.len(),
            route.total_distance,
            route.instructions.len()
        );
    }

    fn on_announcement(&mut self, tick: Tick, announcement: &Announcement) {
        println!("[{tick:>6}] {}", announcement.text);
    }

    fn on_arrival(&mut self, tick: Tick) {
        println!("[{tick:>6}] You have arrived");
        self.arrived_at = Some(tick);
    }

    fn on_frame_end(&mut self, report: &FrameReport) {
        self.traffic_hits += report.player_struck.len();
        if report.player_hit_building {
            self.building_hits += 1;
        }
    }
}

// ── Autopilot ─────────────────────────────────────────────────────────────────

/// Drives the player straight at the next route waypoint.
struct Autopilot {
    waypoint:   usize,
    /// `computed_at` of the route the waypoint index refers to.
    route_time: f64,
}

impl Autopilot {
    fn new() -> Self {
        Self { waypoint: 0, route_time: f64::NAN }
    }

    fn drive(&mut self, sim: &mut Sim<AStarPathFinder>, dt: f32) {
        let Some(route) = sim.gps.route() else {
            sim.set_player_state(sim.player.position, sim.player.heading, 0.0);
            return;
        };
        if route.computed_at != self.route_time {
            self.route_time = route.computed_at;
            self.waypoint = 0;
        }

        let position = sim.player.position;
        while self.waypoint + 1 < route.path.len()
            && position.distance(route.path[self.waypoint]) < WAYPOINT_REACH
        {
            self.waypoint += 1;
        }
        let target = route.path[self.waypoint.min(route.path.len() - 1)];

        let Some(dir) = (target - position).try_normalize() else {
            return;
        };
        let step = (CRUISE_SPEED * dt).min(position.distance(target));
        sim.set_player_state(position + dir * step, dir.heading(), CRUISE_SPEED);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== city_drive — taxi navigation and traffic core ===");

    // 1. Generate the city.
    let params = GridCityParams::default();
    let layout = CityLayout::generate_grid(&params, &mut SimRng::new(SEED));
    println!(
        "City: {} streets, {} buildings, {} intersections, {} spawn points",
        layout.streets.len(),
        layout.buildings.len(),
        layout.intersections.len(),
        layout.spawn_positions.len()
    );

    let start = layout.spawn_positions.first().copied().unwrap_or(Vec2::ZERO);
    let goal = layout.spawn_positions.last().copied().unwrap_or(Vec2::ZERO);

    // 2. Build the simulation.
    let config = SimConfig { seed: SEED, ..SimConfig::default() };
    let mut sim = SimBuilder::new(config, layout, AStarPathFinder)
        .traffic_config(TrafficConfig { max_vehicles: 30, ..TrafficConfig::default() })
        .player_start(start)
        .build()
        .context("building simulation")?;
    println!(
        "Nav grid: {}×{} cells, {} walkable  |  Traffic: {} vehicles",
        sim.grid.width(),
        sim.grid.height(),
        sim.grid.walkable_count(),
        sim.traffic.len()
    );
    println!("Driving {start} → {goal}");
    println!();

    // 3. Drive.
    sim.set_destination(goal);
    let mut log = DriveLog::default();
    let mut autopilot = Autopilot::new();

    let t0 = Instant::now();
    for _ in 0..MAX_FRAMES {
        autopilot.drive(&mut sim, FRAME_SECS);
        sim.step(FRAME_SECS, &mut log);
        if log.arrived_at.is_some() {
            break;
        }
    }
    let elapsed = t0.elapsed();

    // 4. Summary.
    let stats = sim.traffic.stats();
    println!();
    println!(
        "Simulated {:.1} s in {:.3} s wall time",
        sim.clock.elapsed_secs,
        elapsed.as_secs_f64()
    );
    match log.arrived_at {
        Some(tick) => println!("Arrived on frame {tick} after {} route(s)", log.reroutes),
        None => println!(
            "Did not arrive; {:.0} m left ({})",
            sim.gps.remaining_distance(sim.player.position),
            sim.gps.estimated_time(sim.player.position)
        ),
    }
    println!(
        "Traffic: {} vehicles, {} moving, {} braking, avg speed {:.1}",
        stats.total, stats.moving, stats.braking, stats.average_speed
    );
    println!("Bumps: {} with traffic, {} with buildings", log.traffic_hits, log.building_hits);

    // 5. Snapshot dump.
    let dir = Path::new("output/city_drive");
    std::fs::create_dir_all(dir)?;
    let path = dir.join("snapshot.json");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &sim.snapshot())?;
    println!("Snapshot written to {}", path.display());

    Ok(())
}

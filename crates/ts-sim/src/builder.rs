//! Fluent builder for constructing a [`Sim`].

use tracing::info;

use ts_core::{CityLayout, SimClock, SimConfig, Vec2};
use ts_nav::{NavGridBuilder, PathFinder, RouteConfig, RouteManager};
use ts_traffic::{CollisionConfig, CollisionResolver, TrafficConfig, TrafficManager};

use crate::{PlayerVehicle, Sim, SimError, SimResult};

/// Fluent builder for [`Sim<P>`].
///
/// # Required inputs
///
/// - [`SimConfig`] — seed, frame delta cap, world bounds, grid resolution
/// - [`CityLayout`] — streets, buildings, intersections, spawn positions
/// - `P: PathFinder` — the path search used by the GPS (e.g.
///   [`ts_nav::AStarPathFinder`])
///
/// # Optional inputs (have defaults)
///
/// | Method                  | Default                                  |
/// |-------------------------|------------------------------------------|
/// | `.traffic_config(c)`    | `TrafficConfig::default()`               |
/// | `.route_config(c)`      | `RouteConfig::default()`                 |
/// | `.collision_config(c)`  | `CollisionConfig::default()`             |
/// | `.cell_size(s)`         | `config.nav_cell_size`                   |
/// | `.player_start(p)`      | first spawn position, else the origin    |
///
/// # Example
///
/// ```rust,ignore
/// let layout = CityLayout::generate_grid(&GridCityParams::default(), &mut SimRng::new(7));
/// let mut sim = SimBuilder::new(SimConfig::default(), layout, AStarPathFinder)
///     .traffic_config(TrafficConfig { max_vehicles: 10, ..Default::default() })
///     .build()?;
/// sim.run_frames(600, 1.0 / 60.0, &mut NoopObserver);
/// ```
pub struct SimBuilder<P: PathFinder> {
    config:    SimConfig,
    layout:    CityLayout,
    finder:    P,
    traffic:   Option<TrafficConfig>,
    route:     Option<RouteConfig>,
    collision: Option<CollisionConfig>,
    cell_size: Option<f32>,
    player:    Option<Vec2>,
}

impl<P: PathFinder> SimBuilder<P> {
    /// Create a builder with all required inputs.
    pub fn new(config: SimConfig, layout: CityLayout, finder: P) -> Self {
        Self {
            config,
            layout,
            finder,
            traffic:   None,
            route:     None,
            collision: None,
            cell_size: None,
            player:    None,
        }
    }

    pub fn traffic_config(mut self, config: TrafficConfig) -> Self {
        self.traffic = Some(config);
        self
    }

    pub fn route_config(mut self, config: RouteConfig) -> Self {
        self.route = Some(config);
        self
    }

    pub fn collision_config(mut self, config: CollisionConfig) -> Self {
        self.collision = Some(config);
        self
    }

    /// Override the navigation grid resolution from `SimConfig`.
    pub fn cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    pub fn player_start(mut self, position: Vec2) -> Self {
        self.player = Some(position);
        self
    }

    /// Validate inputs, build the navigation grid, traffic population and
    /// collision index, and return a ready-to-step [`Sim`].
    ///
    /// # Errors
    ///
    /// - [`SimError::Config`] for a non-positive or non-finite frame delta
    ///   cap, or an agent probability outside `[0, 1]`.
    /// - [`SimError::Nav`] when the grid cannot be built (empty layout or
    ///   invalid cell size).
    pub fn build(self) -> SimResult<Sim<P>> {
        let max_dt = self.config.max_delta_secs;
        if !max_dt.is_finite() || max_dt <= 0.0 {
            return Err(SimError::Config(format!("max_delta_secs must be positive, got {max_dt}")));
        }

        let traffic_config = self.traffic.unwrap_or_default();
        check_probability("random_brake_chance", traffic_config.agent.random_brake_chance)?;
        check_probability("lane_change_chance", traffic_config.agent.lane_change_chance)?;

        let cell_size = self.cell_size.unwrap_or(self.config.nav_cell_size);
        let grid = NavGridBuilder::from_layout(&self.layout, cell_size).build()?;

        let traffic = TrafficManager::new(
            traffic_config,
            self.layout.spawn_positions.clone(),
            &self.layout.intersections,
            self.config.seed,
        );
        let collisions =
            CollisionResolver::from_layout(&self.layout, self.collision.unwrap_or_default());
        let gps = RouteManager::new(self.finder, self.route.unwrap_or_default());

        let start = self
            .player
            .or_else(|| self.layout.spawn_positions.first().copied())
            .unwrap_or(Vec2::ZERO);

        info!(
            grid_width = grid.width(),
            grid_height = grid.height(),
            walkable = grid.walkable_count(),
            buildings = collisions.building_count(),
            intersections = self.layout.intersections.len(),
            agents = traffic.len(),
            "simulation built"
        );

        Ok(Sim {
            clock: SimClock::new(),
            config: self.config,
            layout: self.layout,
            grid,
            traffic,
            collisions,
            gps,
            player: PlayerVehicle::new(start),
        })
    }
}

fn check_probability(name: &str, p: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimError::Config(format!("{name} must be within [0, 1], got {p}")))
    }
}

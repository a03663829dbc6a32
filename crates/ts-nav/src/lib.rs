//! `ts-nav` — navigation grid, A* search, and GPS routing.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                      |
//! |------------|---------------------------------------------------------------|
//! | [`grid`]   | `NavGrid` occupancy grid, `NavGridBuilder`, `GridCell`        |
//! | [`search`] | `PathFinder` trait, `AStarPathFinder`, `path_cost`            |
//! | [`smooth`] | Bresenham line of sight, greedy farthest-visible smoothing    |
//! | [`route`]  | `RouteManager`, `Route`, turn instructions, `RouteConfig`     |
//! | [`error`]  | `NavError`, `NavResult<T>`                                    |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod error;
pub mod grid;
pub mod route;
pub mod search;
pub mod smooth;


pub use error::{NavError, NavResult};
pub use grid::{CellState, GridCell, NavGrid, NavGridBuilder};
pub use route::{
    format_eta, plan_path, Announcement, Directive, Instruction, NextTurn, Route, RouteConfig,
    RouteManager, RouteTick, turn_angle,
};
pub use search::{path_cost, AStarPathFinder, PathFinder};
pub use smooth::{has_line_of_sight, line_of_sight_world, smooth, smooth_world};

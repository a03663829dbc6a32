//! `ts-sim` — frame loop orchestrator for the taxi simulation core.
//!
//! # Frame loop
//!
//! ```text
//! per rendered frame (dt from the caller):
//!   ① Clock       — clamp dt to max_delta_secs, advance clock and signals.
//!   ② Traffic     — spawn timer, per-agent behaviour + AI tick, respawn
//!                   strays, remove stuck/abandoned agents.
//!   ③ Collisions  — traffic pairs, traffic vs buildings, player vs
//!                   buildings, player vs traffic, player clamped to the
//!                   world bounds.
//!   ④ GPS         — route session update from the corrected player
//!                   position; reroute/announcement/arrival hooks.
//! ```
//!
//! # Cargo features
//!
//! | Feature | Effect                                                      |
//! |---------|-------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on snapshots and configs. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ts_core::{CityLayout, GridCityParams, SimConfig, SimRng, Vec2};
//! use ts_nav::AStarPathFinder;
//! use ts_sim::{NoopObserver, SimBuilder};
//!
//! let layout = CityLayout::generate_grid(&GridCityParams::default(), &mut SimRng::new(7));
//! let mut sim = SimBuilder::new(SimConfig::default(), layout, AStarPathFinder).build()?;
//! sim.set_destination(Vec2::new(120.0, -80.0));
//! sim.run_frames(600, 1.0 / 60.0, &mut NoopObserver);
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod player;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use player::PlayerVehicle;
pub use sim::{FrameReport, Sim, SimSnapshot};

//! `ts-core` — foundational types for the taxi simulation core.
//!
//! Every other `ts-*` crate depends on this one.  It has no `ts-*`
//! dependencies and minimal external ones (`rand`, `thiserror`, optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`ids`]     | `AgentId`, `IntersectionId`                                |
//! | [`geo`]     | `Vec2` (ground-plane x/z point), `Aabb`                    |
//! | [`time`]    | `Tick`, `SimClock`, `SimConfig`                            |
//! | [`rng`]     | `AgentRng` (per-agent), `SimRng` (global)                  |
//! | [`city`]    | `CityLayout`, streets, buildings, grid-city generator      |
//! | [`signal`]  | `TrafficSignal`, `SignalLight`, `Axis`                     |
//! | [`error`]   | `TsError`, `TsResult`                                      |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public data types.   |

pub mod city;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod signal;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use city::{Building, CityLayout, GridCityParams, Intersection, Orientation, StreetSegment};
pub use error::{TsError, TsResult};
pub use geo::{Aabb, Vec2};
pub use ids::{AgentId, IntersectionId};
pub use rng::{AgentRng, SimRng};
pub use signal::{Axis, SignalLight, TrafficSignal};
pub use time::{SimClock, SimConfig, Tick};

//! `ts-traffic` — traffic vehicles, their population, and collision repair.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                        |
//! |---------------|-----------------------------------------------------------------|
//! | [`spatial`]   | `SpatialIndex<K>` — uniform-grid hash of non-owning handles     |
//! | [`agent`]     | `TrafficAgent` — wandering vehicle AI and movement integration  |
//! | [`manager`]   | `TrafficManager` — spawning, density control, frame update      |
//! | [`collision`] | `CollisionResolver` — building, agent and player overlap repair |
//! | [`error`]     | `TrafficError`, `TrafficResult<T>`                              |
//!
//! # Frame order
//!
//! Within one simulation frame the caller runs
//! [`TrafficManager::update`] first, then
//! [`CollisionResolver::resolve_agents`] and the player checks.  The
//! manager refreshes each agent's index entry right after moving it, and
//! the resolver refreshes every entry it pushes, so no query ever observes
//! a stale bucket.

pub mod agent;
pub mod collision;
pub mod error;
pub mod manager;
pub mod spatial;


pub use agent::{AgentParams, AgentSnapshot, TrafficAgent, VehicleDimensions, VehicleKind};
pub use collision::{Collidable, CollisionConfig, CollisionResolver};
pub use error::{TrafficError, TrafficResult};
pub use manager::{TrafficConfig, TrafficManager, TrafficStats};
pub use spatial::SpatialIndex;

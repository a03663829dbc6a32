//! The player's taxi as seen by the simulation core.
//!
//! Driving input lives outside the core; the caller copies the vehicle's
//! live state in with [`Sim::set_player_state`](crate::Sim::set_player_state)
//! each frame and reads back any collision correction.

use ts_core::Vec2;
use ts_traffic::Collidable;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerVehicle {
    pub position: Vec2,
    /// Yaw in radians, `0` facing `+z`.
    pub heading:  f32,
    pub speed:    f32,
}

impl PlayerVehicle {
    pub fn new(position: Vec2) -> Self {
        Self { position, ..Self::default() }
    }
}

impl Collidable for PlayerVehicle {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn scale_speed(&mut self, factor: f32) {
        self.speed *= factor;
    }

    fn halt(&mut self) {
        self.speed = 0.0;
    }
}

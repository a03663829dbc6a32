//! Static city layout consumed by navigation and traffic.
//!
//! The layout is produced once per session by city generation and then
//! read by the navigation grid builder, the traffic manager (spawn
//! positions, intersections) and the collision resolver (building
//! footprints).  Only signal phases change after generation.
//!
//! [`CityLayout::generate_grid`] builds the Manhattan-style city the game
//! uses: a square of blocks separated by streets, most blocks carrying one
//! building and the rest left as parks.

use crate::{Aabb, IntersectionId, SimRng, TrafficSignal, Vec2};

/// Orientation of a straight street segment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Runs along the `x` axis.
    Horizontal,
    /// Runs along the `z` axis.
    Vertical,
}

/// A straight, axis-aligned piece of road surface.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreetSegment {
    pub center:      Vec2,
    /// Extent across the direction of travel.
    pub width:       f32,
    /// Extent along the direction of travel.
    pub length:      f32,
    pub orientation: Orientation,
}

impl StreetSegment {
    pub fn new(center: Vec2, width: f32, length: f32, orientation: Orientation) -> Self {
        Self { center, width, length, orientation }
    }

    /// Road surface rectangle.
    pub fn rect(&self) -> Aabb {
        match self.orientation {
            Orientation::Horizontal => Aabb::from_center(self.center, self.length, self.width),
            Orientation::Vertical => Aabb::from_center(self.center, self.width, self.length),
        }
    }
}

/// A square building footprint.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Building {
    pub center: Vec2,
    /// Side length of the footprint.
    pub size:   f32,
}

impl Building {
    pub fn new(center: Vec2, size: f32) -> Self {
        Self { center, size }
    }

    #[inline]
    pub fn footprint(&self) -> Aabb {
        Aabb::from_center(self.center, self.size, self.size)
    }
}

/// A signalised junction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intersection {
    pub id:       IntersectionId,
    pub position: Vec2,
    pub signal:   TrafficSignal,
}

/// Parameters of the grid-city generator.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCityParams {
    /// Blocks per side.  Default: 15.
    pub city_size:          u32,
    /// Side length of one block.  Default: 40.
    pub block_size:         f32,
    /// Width of every street.  Default: 8.
    pub street_width:       f32,
    /// Probability that a block becomes a park instead of a building.
    /// Default: 0.1.
    pub park_probability:   f64,
    /// Building footprint as a fraction of the block.  Default: 0.8.
    pub building_fraction:  f32,
}

impl Default for GridCityParams {
    fn default() -> Self {
        Self {
            city_size:         15,
            block_size:        40.0,
            street_width:      8.0,
            park_probability:  0.1,
            building_fraction: 0.8,
        }
    }
}

/// Everything the simulation core needs to know about the city.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CityLayout {
    pub streets:         Vec<StreetSegment>,
    pub buildings:       Vec<Building>,
    /// `intersections[i].id == IntersectionId(i)`.
    pub intersections:   Vec<Intersection>,
    /// Points on the road surface where vehicles may (re)spawn.
    pub spawn_positions: Vec<Vec2>,
}

impl CityLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_street(&mut self, street: StreetSegment) -> &mut Self {
        self.streets.push(street);
        self
    }

    pub fn add_building(&mut self, building: Building) -> &mut Self {
        self.buildings.push(building);
        self
    }

    pub fn add_spawn_position(&mut self, pos: Vec2) -> &mut Self {
        self.spawn_positions.push(pos);
        self
    }

    /// Append an intersection, assigning the next sequential id.
    pub fn add_intersection(&mut self, position: Vec2, signal: TrafficSignal) -> IntersectionId {
        let id = IntersectionId(self.intersections.len() as u32);
        self.intersections.push(Intersection { id, position, signal });
        id
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id.index())
    }

    /// Advance every signal by `dt` seconds.
    pub fn tick_signals(&mut self, dt: f32) {
        for intersection in &mut self.intersections {
            intersection.signal.tick(dt);
        }
    }

    /// Bounding rectangle of all streets and buildings, or `None` for an
    /// empty layout.
    pub fn extent(&self) -> Option<Aabb> {
        self.streets
            .iter()
            .map(StreetSegment::rect)
            .chain(self.buildings.iter().map(Building::footprint))
            .reduce(|acc, r| acc.union(&r))
    }

    /// Generate a grid city.
    ///
    /// Block `(x, z)` is centred at `((x - n/2) * pitch, (z - n/2) * pitch)`
    /// with `pitch = block_size + street_width`.  Each block contributes a
    /// horizontal street along its `+z` edge, a vertical street along its
    /// `+x` edge, and one spawn position on each; intersections sit between
    /// adjacent blocks and start at a random phase.
    pub fn generate_grid(params: &GridCityParams, rng: &mut SimRng) -> CityLayout {
        let n = params.city_size;
        let block = params.block_size;
        let street = params.street_width;
        let pitch = block + street;
        let half_n = n as f32 / 2.0;
        let edge = block / 2.0 + street / 2.0;
        let street_len = block + street * 2.0;

        let block_center = |x: u32, z: u32| {
            Vec2::new((x as f32 - half_n) * pitch, (z as f32 - half_n) * pitch)
        };

        let mut layout = CityLayout::new();
        for x in 0..n {
            for z in 0..n {
                let c = block_center(x, z);

                if !rng.gen_bool(params.park_probability) {
                    layout.add_building(Building::new(c, block * params.building_fraction));
                }

                layout.add_street(StreetSegment::new(
                    Vec2::new(c.x, c.z + edge),
                    street,
                    street_len,
                    Orientation::Horizontal,
                ));
                layout.add_street(StreetSegment::new(
                    Vec2::new(c.x + edge, c.z),
                    street,
                    street_len,
                    Orientation::Vertical,
                ));
            }
        }

        for x in 0..n {
            for z in 0..n {
                let c = block_center(x, z);
                layout.add_spawn_position(Vec2::new(c.x, c.z + edge));
                layout.add_spawn_position(Vec2::new(c.x + edge, c.z));
            }
        }

        for x in 0..n.saturating_sub(1) {
            for z in 0..n.saturating_sub(1) {
                let c = block_center(x, z);
                let phase: u8 = rng.gen_range(0..4);
                let offset: f32 = rng.gen_range(0.0..2.0);
                layout.add_intersection(
                    Vec2::new(c.x + edge, c.z + edge),
                    TrafficSignal::new(phase).with_elapsed(offset),
                );
            }
        }

        layout
    }
}

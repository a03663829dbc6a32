//! Unit tests for ts-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, IntersectionId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn next_is_monotonic() {
        assert_eq!(AgentId(0).next(), AgentId(1));
        assert!(AgentId(5).next() > AgentId(5));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(IntersectionId::default(), IntersectionId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(AgentId(7).to_string(), "AgentId(7)");
        assert_eq!(IntersectionId(3).to_string(), "IntersectionId(3)");
    }
}

#[cfg(test)]
mod geo {
    use crate::{Aabb, Vec2};

    const EPS: f32 = 1e-5;

    #[test]
    fn heading_roundtrip() {
        for h in [-2.5f32, -1.0, 0.0, 0.3, 1.57, 3.0] {
            let v = Vec2::from_heading(h);
            assert!((v.length() - 1.0).abs() < EPS);
            assert!((v.heading() - h).abs() < 1e-4, "h={h} got {}", v.heading());
        }
    }

    #[test]
    fn heading_zero_faces_plus_z() {
        let v = Vec2::from_heading(0.0);
        assert!(v.x.abs() < EPS);
        assert!((v.z - 1.0).abs() < EPS);
    }

    #[test]
    fn cross_sign_follows_heading_growth() {
        // Facing +z, then turning toward +x grows the heading.
        let ahead = Vec2::new(0.0, 1.0);
        let right = Vec2::new(1.0, 0.0);
        assert!(ahead.cross(right) > 0.0);
        assert!(right.cross(ahead) < 0.0);
    }

    #[test]
    fn normalize_zero_is_none() {
        assert!(Vec2::ZERO.try_normalize().is_none());
        assert_eq!(Vec2::ZERO.normalize_or(Vec2::new(1.0, 0.0)), Vec2::new(1.0, 0.0));
        let n = Vec2::new(3.0, 4.0).try_normalize().unwrap();
        assert!((n.length() - 1.0).abs() < EPS);
    }

    #[test]
    fn closest_on_segment_clamps() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(Vec2::new(5.0, 3.0).closest_on_segment(a, b), Vec2::new(5.0, 0.0));
        assert_eq!(Vec2::new(-4.0, 1.0).closest_on_segment(a, b), a);
        assert_eq!(Vec2::new(14.0, 1.0).closest_on_segment(a, b), b);
        assert_eq!(Vec2::new(1.0, 1.0).closest_on_segment(a, a), a);
    }

    #[test]
    fn aabb_from_center_and_contains() {
        let r = Aabb::from_center(Vec2::new(10.0, 0.0), 4.0, 2.0);
        assert_eq!(r.min, Vec2::new(8.0, -1.0));
        assert_eq!(r.max, Vec2::new(12.0, 1.0));
        assert!(r.contains(Vec2::new(12.0, 1.0)));
        assert!(!r.contains(Vec2::new(12.1, 0.0)));
        assert!(r.contains_with_margin(Vec2::new(12.1, 0.0), 0.5));
        assert_eq!(r.center(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn aabb_union_and_clamp() {
        let a = Aabb::square(1.0);
        let b = Aabb::from_center(Vec2::new(5.0, 5.0), 2.0, 2.0);
        let u = a.union(&b);
        assert_eq!(u.min, Vec2::new(-1.0, -1.0));
        assert_eq!(u.max, Vec2::new(6.0, 6.0));
        assert_eq!(u.clamp(Vec2::new(100.0, -100.0)), Vec2::new(6.0, -1.0));
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, SimConfig, Tick};

    #[test]
    fn clock_advances() {
        let mut c = SimClock::new();
        c.advance(0.5);
        c.advance(0.25);
        assert_eq!(c.current_tick, Tick(2));
        assert!((c.elapsed_secs - 0.75).abs() < 1e-9);
    }

    #[test]
    fn bad_deltas_count_as_zero() {
        let mut c = SimClock::new();
        c.advance(-1.0);
        c.advance(f32::NAN);
        c.advance(f32::INFINITY);
        assert_eq!(c.current_tick, Tick(3));
        assert_eq!(c.elapsed_secs, 0.0);
    }

    #[test]
    fn elapsed_split() {
        let c = SimClock { current_tick: Tick(10), elapsed_secs: 125.4 };
        assert_eq!(c.elapsed_ms(), (2, 5));
        assert_eq!(c.to_string(), "F10 (02:05)");
    }

    #[test]
    fn delta_clamp() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.clamp_delta(1.0), cfg.max_delta_secs);
        assert_eq!(cfg.clamp_delta(-0.2), 0.0);
        assert_eq!(cfg.clamp_delta(f32::NAN), 0.0);
        assert_eq!(cfg.clamp_delta(0.016), 0.016);
    }

    #[test]
    fn tick_since_saturates() {
        assert_eq!(Tick(10).since(Tick(4)), 6);
        assert_eq!(Tick(4).since(Tick(10)), 0);
    }
}

#[cfg(test)]
mod rng {
    use crate::{AgentId, AgentRng, SimRng};

    #[test]
    fn agent_rng_is_deterministic() {
        let mut a = AgentRng::new(7, AgentId(3));
        let mut b = AgentRng::new(7, AgentId(3));
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn different_agents_diverge() {
        let mut a = AgentRng::new(7, AgentId(3));
        let mut b = AgentRng::new(7, AgentId(4));
        let xs: Vec<u64> = (0..4).map(|_| a.random()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.random()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn symmetric_bounds() {
        let mut r = AgentRng::new(1, AgentId(0));
        for _ in 0..200 {
            let v = r.symmetric(2.5);
            assert!((-2.5..2.5).contains(&v));
        }
        assert_eq!(r.symmetric(0.0), 0.0);
    }

    #[test]
    fn sim_rng_choose_empty() {
        let mut r = SimRng::new(9);
        let empty: [u8; 0] = [];
        assert!(r.choose(&empty).is_none());
        assert!(r.choose(&[1, 2, 3]).is_some());
    }

    #[test]
    fn gen_bool_tolerates_bad_probabilities() {
        let mut a = AgentRng::new(5, AgentId(1));
        let mut s = SimRng::new(5);
        for _ in 0..32 {
            assert!(a.gen_bool(1.5));
            assert!(!a.gen_bool(-0.5));
            assert!(!a.gen_bool(f64::NAN));
            assert!(s.gen_bool(f64::INFINITY));
            assert!(!s.gen_bool(f64::NAN));
        }
    }
}

#[cfg(test)]
mod signal {
    use crate::{Axis, SignalLight, TrafficSignal};

    #[test]
    fn phase_table() {
        let s = TrafficSignal::new(0);
        assert_eq!(s.light_for(Axis::NorthSouth), SignalLight::Green);
        assert_eq!(s.light_for(Axis::EastWest), SignalLight::Red);

        let s = TrafficSignal::new(1);
        assert_eq!(s.light_for(Axis::NorthSouth), SignalLight::Yellow);
        assert_eq!(s.light_for(Axis::EastWest), SignalLight::Red);

        let s = TrafficSignal::new(2);
        assert_eq!(s.light_for(Axis::NorthSouth), SignalLight::Red);
        assert_eq!(s.light_for(Axis::EastWest), SignalLight::Green);

        let s = TrafficSignal::new(3);
        assert_eq!(s.light_for(Axis::NorthSouth), SignalLight::Red);
        assert_eq!(s.light_for(Axis::EastWest), SignalLight::Yellow);
    }

    #[test]
    fn phase_wraps_modulo_four() {
        assert_eq!(TrafficSignal::new(6).phase(), 2);
    }

    #[test]
    fn tick_advances_through_cycle() {
        let mut s = TrafficSignal::new(0);
        s.tick(7.5);
        assert_eq!(s.phase(), 0);
        s.tick(1.0);
        assert_eq!(s.phase(), 1);
        s.tick(2.0);
        assert_eq!(s.phase(), 2);
        // One full cycle returns to the same phase.
        s.tick(20.0);
        assert_eq!(s.phase(), 2);
    }

    #[test]
    fn large_delta_steps_multiple_phases() {
        let mut s = TrafficSignal::new(0);
        s.tick(10.5);
        assert_eq!(s.phase(), 2);
    }

    #[test]
    fn bad_delta_ignored() {
        let mut s = TrafficSignal::new(0).with_elapsed(7.9);
        s.tick(f32::NAN);
        s.tick(-3.0);
        assert_eq!(s.phase(), 0);
    }

    #[test]
    fn zero_durations_do_not_hang() {
        let mut s = TrafficSignal::with_durations(0, [0.0; 4]);
        s.tick(1.0);
        assert!(s.phase() < 4);
    }

    #[test]
    fn axis_from_heading() {
        assert_eq!(Axis::of_heading(0.0), Axis::NorthSouth);
        assert_eq!(Axis::of_heading(std::f32::consts::FRAC_PI_2), Axis::EastWest);
        assert_eq!(Axis::of_heading(std::f32::consts::PI), Axis::NorthSouth);
    }
}

#[cfg(test)]
mod city {
    use crate::{
        Building, CityLayout, GridCityParams, IntersectionId, Orientation, SimRng, StreetSegment,
        TrafficSignal, Vec2,
    };

    #[test]
    fn street_rect_orientation() {
        let h = StreetSegment::new(Vec2::ZERO, 8.0, 48.0, Orientation::Horizontal);
        assert_eq!(h.rect().width(), 48.0);
        assert_eq!(h.rect().depth(), 8.0);
        let v = StreetSegment::new(Vec2::ZERO, 8.0, 48.0, Orientation::Vertical);
        assert_eq!(v.rect().width(), 8.0);
        assert_eq!(v.rect().depth(), 48.0);
    }

    #[test]
    fn building_footprint() {
        let b = Building::new(Vec2::new(10.0, 10.0), 20.0);
        let f = b.footprint();
        assert_eq!(f.min, Vec2::new(0.0, 0.0));
        assert_eq!(f.max, Vec2::new(20.0, 20.0));
    }

    #[test]
    fn intersection_ids_are_sequential() {
        let mut layout = CityLayout::new();
        let a = layout.add_intersection(Vec2::ZERO, TrafficSignal::default());
        let b = layout.add_intersection(Vec2::new(10.0, 0.0), TrafficSignal::default());
        assert_eq!(a, IntersectionId(0));
        assert_eq!(b, IntersectionId(1));
        assert_eq!(layout.intersection(b).unwrap().position, Vec2::new(10.0, 0.0));
        assert!(layout.intersection(IntersectionId(9)).is_none());
    }

    #[test]
    fn empty_layout_has_no_extent() {
        assert!(CityLayout::new().extent().is_none());
    }

    #[test]
    fn grid_counts() {
        let params = GridCityParams { city_size: 4, park_probability: 0.0, ..Default::default() };
        let layout = CityLayout::generate_grid(&params, &mut SimRng::new(1));
        assert_eq!(layout.buildings.len(), 16);
        assert_eq!(layout.streets.len(), 32);
        assert_eq!(layout.spawn_positions.len(), 32);
        assert_eq!(layout.intersections.len(), 9);
        for (i, int) in layout.intersections.iter().enumerate() {
            assert_eq!(int.id.index(), i);
        }
    }

    #[test]
    fn all_parks() {
        let params = GridCityParams { city_size: 3, park_probability: 1.0, ..Default::default() };
        let layout = CityLayout::generate_grid(&params, &mut SimRng::new(1));
        assert!(layout.buildings.is_empty());
        assert_eq!(layout.streets.len(), 18);
    }

    #[test]
    fn spawn_positions_lie_on_streets() {
        let params = GridCityParams { city_size: 5, ..Default::default() };
        let layout = CityLayout::generate_grid(&params, &mut SimRng::new(3));
        for p in &layout.spawn_positions {
            assert!(
                layout.streets.iter().any(|s| s.rect().contains(*p)),
                "spawn {p} is off-road"
            );
            assert!(
                !layout.buildings.iter().any(|b| b.footprint().contains(*p)),
                "spawn {p} is inside a building"
            );
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let params = GridCityParams::default();
        let a = CityLayout::generate_grid(&params, &mut SimRng::new(11));
        let b = CityLayout::generate_grid(&params, &mut SimRng::new(11));
        assert_eq!(a.buildings, b.buildings);
        assert_eq!(a.intersections, b.intersections);
    }

    #[test]
    fn tick_signals_advances_all() {
        let mut layout = CityLayout::new();
        layout.add_intersection(Vec2::ZERO, TrafficSignal::new(0));
        layout.add_intersection(Vec2::ZERO, TrafficSignal::new(2));
        layout.tick_signals(8.5);
        assert_eq!(layout.intersections[0].signal.phase(), 1);
        assert_eq!(layout.intersections[1].signal.phase(), 3);
    }
}

use rand::Rng;

use crate::models::{Coordinate, RouteBounds};

pub const DEFAULT_MIN_WAYPOINTS: usize = 2;
pub const DEFAULT_MAX_WAYPOINTS: usize = 6;
pub const DEFAULT_MAX_DEVIATION: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSettings {
    pub min_count: usize,
    pub max_count: usize,
    /// Lateral perturbation per axis, as a fraction of that axis' start–end span.
    pub max_deviation: f64,
}

impl Default for WaypointSettings {
    fn default() -> Self {
        Self {
            min_count: DEFAULT_MIN_WAYPOINTS,
            max_count: DEFAULT_MAX_WAYPOINTS,
            max_deviation: DEFAULT_MAX_DEVIATION,
        }
    }
}

pub fn random_waypoint_count<R: Rng + ?Sized>(rng: &mut R, settings: &WaypointSettings) -> usize {
    let max = settings.max_count.max(settings.min_count);
    rng.gen_range(settings.min_count..=max)
}

/// Random intermediate points biased toward the start–end rectangle.
///
/// Each axis is sampled independently: a uniform position along that axis'
/// span, then a uniform offset of at most `max_deviation / 2 * |span|` either
/// way. Points therefore stay inside [`deviation_envelope`].
pub fn generate_waypoints<R: Rng + ?Sized>(
    rng: &mut R,
    start: Coordinate,
    end: Coordinate,
    count: usize,
    max_deviation: f64,
) -> Vec<Coordinate> {
    (0..count)
        .map(|_| Coordinate {
            lat: sample_axis(rng, start.lat, end.lat, max_deviation),
            lon: sample_axis(rng, start.lon, end.lon, max_deviation),
        })
        .collect()
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, from: f64, to: f64, max_deviation: f64) -> f64 {
    let span = to - from;
    let position = from + span * rng.gen::<f64>();
    let offset = (rng.gen::<f64>() - 0.5) * max_deviation * span.abs();
    position + offset
}

/// Region every generated waypoint falls in.
pub fn deviation_envelope(start: Coordinate, end: Coordinate, max_deviation: f64) -> RouteBounds {
    let margin = |span: f64| span.abs() * max_deviation / 2.0;
    let lat_margin = margin(end.lat - start.lat);
    let lon_margin = margin(end.lon - start.lon);
    RouteBounds {
        min_lat: start.lat.min(end.lat) - lat_margin,
        max_lat: start.lat.max(end.lat) + lat_margin,
        min_lon: start.lon.min(end.lon) - lon_margin,
        max_lon: start.lon.max(end.lon) + lon_margin,
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn produces_requested_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = Coordinate { lat: 35.15, lon: -90.05 };
        let end = Coordinate { lat: 36.16, lon: -86.78 };
        assert_eq!(generate_waypoints(&mut rng, start, end, 4, 0.5).len(), 4);
        assert!(generate_waypoints(&mut rng, start, end, 0, 0.5).is_empty());
    }

    #[test]
    fn identical_endpoints_collapse_to_a_point() {
        let mut rng = StdRng::seed_from_u64(1);
        let here = Coordinate { lat: 45.93, lon: 4.57 };
        let points = generate_waypoints(&mut rng, here, here, 5, 0.5);
        assert!(points.iter().all(|p| *p == here));
    }

    #[test]
    fn zero_deviation_stays_in_rectangle() {
        let mut rng = StdRng::seed_from_u64(3);
        let start = Coordinate { lat: 10.0, lon: 20.0 };
        let end = Coordinate { lat: 11.0, lon: 18.0 };
        let rect = RouteBounds::from_points(&[start, end]).unwrap();
        for point in generate_waypoints(&mut rng, start, end, 50, 0.0) {
            assert!(rect.contains(point), "{point:?} escaped {rect:?}");
        }
    }

    #[test]
    fn count_respects_settings() {
        let mut rng = StdRng::seed_from_u64(11);
        let settings = WaypointSettings::default();
        for _ in 0..200 {
            let n = random_waypoint_count(&mut rng, &settings);
            assert!((2..=6).contains(&n));
        }
    }

    #[test]
    fn inverted_count_range_uses_minimum() {
        let mut rng = StdRng::seed_from_u64(5);
        let settings = WaypointSettings {
            min_count: 3,
            max_count: 1,
            max_deviation: 0.5,
        };
        assert_eq!(random_waypoint_count(&mut rng, &settings), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-80.0..=80.0, -170.0..=170.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_waypoints_within_deviation_bound(
                start in valid_coord(),
                end in valid_coord(),
                count in 0usize..12,
                deviation in 0.0f64..2.0,
                seed in any::<u64>(),
            ) {
                let mut rng = StdRng::seed_from_u64(seed);
                let envelope = deviation_envelope(start, end, deviation);
                for point in generate_waypoints(&mut rng, start, end, count, deviation) {
                    prop_assert!(point.lat >= envelope.min_lat - 1e-9 && point.lat <= envelope.max_lat + 1e-9);
                    prop_assert!(point.lon >= envelope.min_lon - 1e-9 && point.lon <= envelope.max_lon + 1e-9);
                }
            }

            #[test]
            fn prop_envelope_contains_endpoints(
                start in valid_coord(),
                end in valid_coord(),
                deviation in 0.0f64..2.0,
            ) {
                let envelope = deviation_envelope(start, end, deviation);
                prop_assert!(envelope.contains(start));
                prop_assert!(envelope.contains(end));
            }
        }
    }
}

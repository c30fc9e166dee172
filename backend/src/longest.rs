use rand::Rng;

use crate::{
    models::{Coordinate, Route},
    routing::RouteProvider,
    waypoints::{generate_waypoints, random_waypoint_count, WaypointSettings},
};

pub const DEFAULT_MIN_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
pub const DEFAULT_MIN_GEOMETRY_POINTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct LongestRouteParams {
    /// Accepted routes are at least this many times the fastest distance.
    pub min_multiplier: f64,
    pub max_attempts: usize,
    /// Accepted geometries have strictly more points than this.
    pub min_geometry_points: usize,
    pub waypoints: WaypointSettings,
}

impl Default for LongestRouteParams {
    fn default() -> Self {
        Self {
            min_multiplier: DEFAULT_MIN_MULTIPLIER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_geometry_points: DEFAULT_MIN_GEOMETRY_POINTS,
            waypoints: WaypointSettings::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LongestRouteError {
    #[error("fastest route distance must be a non-negative number of meters, got {0}")]
    InvalidBaseline(f64),
    #[error("Could not find a longer route within the specified distance range ({attempts} attempts).")]
    Exhausted { attempts: usize },
}

/// Why a single attempt was thrown away.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("routing service returned no route")]
    NoRoute,
    #[error("route is {distance_m:.0} m, below the {target_m:.0} m target")]
    TooShort { distance_m: f64, target_m: f64 },
    #[error("geometry has only {points} points")]
    Degenerate { points: usize },
}

#[derive(Debug, Clone)]
pub struct LongestRoute {
    pub route: Route,
    /// 1-based index of the accepting attempt.
    pub attempts: usize,
    pub waypoints: Vec<Coordinate>,
}

/// Acceptance test for one attempt.
pub fn accept(
    candidate: Option<Route>,
    target_m: f64,
    min_geometry_points: usize,
) -> Result<Route, Rejection> {
    let route = candidate.ok_or(Rejection::NoRoute)?;
    if route.distance_m.is_nan() || route.distance_m < target_m {
        return Err(Rejection::TooShort {
            distance_m: route.distance_m,
            target_m,
        });
    }
    if route.point_count() <= min_geometry_points {
        return Err(Rejection::Degenerate {
            points: route.point_count(),
        });
    }
    Ok(route)
}

/// Search for a route significantly longer than the fastest one.
///
/// # Algorithm: randomized waypoint perturbation
///
/// Each attempt draws a fresh waypoint count and waypoint set between
/// `start` and `end`, asks `provider` for the route
/// start → waypoints → end, and keeps it only if
/// - a route came back,
/// - its distance is at least `fastest_distance_m * min_multiplier`,
/// - its geometry has more than `min_geometry_points` points.
///
/// Attempts are sequential and independent; nothing carries over from a
/// rejected attempt. The first acceptable route wins. After
/// `max_attempts` rejections the search gives up with
/// [`LongestRouteError::Exhausted`]; there is no best-so-far fallback.
pub async fn search_longest_route<P, R>(
    provider: &P,
    rng: &mut R,
    params: &LongestRouteParams,
    start: Coordinate,
    end: Coordinate,
    fastest_distance_m: f64,
) -> Result<LongestRoute, LongestRouteError>
where
    P: RouteProvider + ?Sized,
    R: Rng + ?Sized,
{
    if !fastest_distance_m.is_finite() || fastest_distance_m < 0.0 {
        return Err(LongestRouteError::InvalidBaseline(fastest_distance_m));
    }

    let target_m = fastest_distance_m * params.min_multiplier;
    tracing::info!(
        "Searching longest route: target ≥ {:.0} m ({}× {:.0} m), up to {} attempts",
        target_m,
        params.min_multiplier,
        fastest_distance_m,
        params.max_attempts
    );

    for attempt in 1..=params.max_attempts {
        let count = random_waypoint_count(rng, &params.waypoints);
        let waypoints = generate_waypoints(rng, start, end, count, params.waypoints.max_deviation);

        let mut points = Vec::with_capacity(waypoints.len() + 2);
        points.push(start);
        points.extend_from_slice(&waypoints);
        points.push(end);

        match accept(provider.route(&points).await, target_m, params.min_geometry_points) {
            Ok(route) => {
                tracing::info!(
                    "✓ Accepted attempt {attempt}: {:.0} m through {count} waypoints",
                    route.distance_m
                );
                return Ok(LongestRoute {
                    route,
                    attempts: attempt,
                    waypoints,
                });
            }
            Err(rejection) => {
                tracing::debug!("Rejected attempt {attempt} ({count} waypoints): {rejection}");
            }
        }
    }

    tracing::info!("No qualifying route after {} attempts", params.max_attempts);
    Err(LongestRouteError::Exhausted {
        attempts: params.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::models::Leg;

    const START: Coordinate = Coordinate { lat: 35.1495, lon: -90.0490 };
    const END: Coordinate = Coordinate { lat: 35.0494, lon: -90.0241 };

    fn route(distance_m: f64, points: usize) -> Route {
        Route {
            distance_m,
            duration_s: distance_m / 15.0,
            geometry: (0..points)
                .map(|i| Coordinate { lat: 35.0 + i as f64 * 0.001, lon: -90.0 })
                .collect(),
            legs: vec![Leg {
                distance_m,
                duration_s: distance_m / 15.0,
                steps: Vec::new(),
            }],
        }
    }

    /// Answers every request with the same route and records what was asked.
    struct FixedProvider {
        answer: Option<Route>,
        requests: Mutex<Vec<Vec<Coordinate>>>,
    }

    impl FixedProvider {
        fn new(answer: Option<Route>) -> Self {
            Self {
                answer,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Vec<Coordinate>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RouteProvider for FixedProvider {
        async fn route(&self, points: &[Coordinate]) -> Option<Route> {
            self.requests.lock().unwrap().push(points.to_vec());
            self.answer.clone()
        }
    }

    /// Plays back a fixed script of answers, then "no route".
    struct ScriptedProvider {
        script: Mutex<Vec<Option<Route>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<Option<Route>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl RouteProvider for ScriptedProvider {
        async fn route(&self, _points: &[Coordinate]) -> Option<Route> {
            *self.calls.lock().unwrap() += 1;
            self.script.lock().unwrap().pop().flatten()
        }
    }

    async fn search<P: RouteProvider>(provider: &P, fastest: f64) -> Result<LongestRoute, LongestRouteError> {
        let mut rng = StdRng::seed_from_u64(42);
        search_longest_route(provider, &mut rng, &LongestRouteParams::default(), START, END, fastest).await
    }

    #[tokio::test]
    async fn accepts_on_first_attempt() {
        let provider = FixedProvider::new(Some(route(2500.0, 40)));
        let found = search(&provider, 1000.0).await.unwrap();
        assert_eq!(found.attempts, 1);
        assert_eq!(found.route.distance_m, 2500.0);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn exhausts_after_exactly_max_attempts() {
        let provider = FixedProvider::new(Some(route(1500.0, 40)));
        let err = search(&provider, 1000.0).await.unwrap_err();
        assert!(matches!(err, LongestRouteError::Exhausted { attempts: 10 }));
        assert_eq!(provider.requests().len(), 10);
    }

    #[tokio::test]
    async fn never_accepts_degenerate_geometry() {
        let provider = FixedProvider::new(Some(route(9000.0, DEFAULT_MIN_GEOMETRY_POINTS)));
        let err = search(&provider, 1000.0).await.unwrap_err();
        assert!(matches!(err, LongestRouteError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn missing_routes_count_as_attempts() {
        let provider = FixedProvider::new(None);
        assert!(search(&provider, 1000.0).await.is_err());
        assert_eq!(provider.requests().len(), 10);
    }

    #[tokio::test]
    async fn keeps_trying_until_a_route_qualifies() {
        let provider = ScriptedProvider::new(vec![
            None,
            Some(route(1999.0, 40)),
            Some(route(5000.0, 3)),
            Some(route(2000.0, 6)),
            Some(route(8000.0, 80)),
        ]);
        let found = search(&provider, 1000.0).await.unwrap();
        assert_eq!(found.attempts, 4);
        assert_eq!(found.route.distance_m, 2000.0);
        assert_eq!(*provider.calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn requests_route_through_generated_waypoints() {
        let provider = FixedProvider::new(Some(route(2500.0, 40)));
        let found = search(&provider, 1000.0).await.unwrap();
        let request = &provider.requests()[0];
        assert_eq!(request.first(), Some(&START));
        assert_eq!(request.last(), Some(&END));
        assert_eq!(&request[1..request.len() - 1], found.waypoints.as_slice());
        assert!((2..=6).contains(&found.waypoints.len()));
    }

    #[tokio::test]
    async fn invalid_baseline_issues_no_request() {
        let provider = FixedProvider::new(Some(route(2500.0, 40)));
        for fastest in [-5.0, f64::NAN, f64::INFINITY] {
            let err = search(&provider, fastest).await.unwrap_err();
            assert!(matches!(err, LongestRouteError::InvalidBaseline(_)));
        }
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn zero_length_baseline_still_searches() {
        let provider = FixedProvider::new(Some(route(2500.0, 60)));
        let found = search(&provider, 0.0).await.unwrap();
        assert_eq!(found.attempts, 1);
        assert_eq!(found.route.distance_m, 2500.0);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn zero_attempt_budget_gives_up_immediately() {
        let provider = FixedProvider::new(Some(route(2500.0, 40)));
        let params = LongestRouteParams {
            max_attempts: 0,
            ..LongestRouteParams::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let err = search_longest_route(&provider, &mut rng, &params, START, END, 1000.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LongestRouteError::Exhausted { attempts: 0 }));
        assert!(provider.requests().is_empty());
    }

    #[test]
    fn rejection_reasons() {
        assert_eq!(accept(None, 2000.0, 5).unwrap_err(), Rejection::NoRoute);
        assert!(matches!(
            accept(Some(route(1999.9, 40)), 2000.0, 5),
            Err(Rejection::TooShort { .. })
        ));
        assert_eq!(
            accept(Some(route(2000.0, 5)), 2000.0, 5).unwrap_err(),
            Rejection::Degenerate { points: 5 }
        );
        assert!(accept(Some(route(2000.0, 6)), 2000.0, 5).is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_accepted_routes_meet_both_thresholds(
                distance in 0.0f64..100_000.0,
                points in 0usize..50,
                target in 0.0f64..100_000.0,
                min_points in 0usize..20,
            ) {
                if let Ok(route) = accept(Some(route(distance, points)), target, min_points) {
                    prop_assert!(route.distance_m >= target);
                    prop_assert!(route.point_count() > min_points);
                }
            }

            #[test]
            fn prop_qualifying_routes_are_accepted(
                target in 0.0f64..100_000.0,
                extra in 0.0f64..1_000.0,
                min_points in 0usize..20,
                extra_points in 1usize..20,
            ) {
                let candidate = route(target + extra, min_points + extra_points);
                prop_assert!(accept(Some(candidate), target, min_points).is_ok());
            }
        }
    }
}

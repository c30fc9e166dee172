use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Coordinate, Leg, Maneuver, Modifier, Route, Step};

/// Source of driving routes through an ordered list of points.
///
/// The first point is the origin, the last the destination and anything in
/// between a waypoint. Implementations perform a single request and never
/// retry; any failure is reported as `None`.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, points: &[Coordinate]) -> Option<Route>;
}

/// Client for the OSRM `route` service.
#[derive(Clone)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            profile: profile.into(),
        }
    }

    fn route_url(&self, points: &[Coordinate]) -> String {
        format!(
            "{}/route/v1/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.profile,
            coordinates_path(points)
        )
    }

    async fn fetch(&self, points: &[Coordinate]) -> Result<OsrmResponse, reqwest::Error> {
        self.client
            .get(self.route_url(points))
            .query(&[("overview", "full"), ("geometries", "geojson"), ("steps", "true")])
            .send()
            .await?
            .error_for_status()?
            .json::<OsrmResponse>()
            .await
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    #[tracing::instrument(skip(self, points), fields(points = points.len()))]
    async fn route(&self, points: &[Coordinate]) -> Option<Route> {
        if points.len() < 2 {
            tracing::warn!("refusing to route fewer than two points");
            return None;
        }

        match self.fetch(points).await {
            Ok(response) => {
                let route = best_route(response);
                match &route {
                    Some(route) => tracing::debug!(
                        "route found: {:.0} m, {} geometry points, {} legs",
                        route.distance_m,
                        route.point_count(),
                        route.legs.len()
                    ),
                    None => tracing::debug!("routing service returned no usable route"),
                }
                route
            }
            Err(err) => {
                tracing::warn!("route request failed: {err}");
                None
            }
        }
    }
}

/// OSRM wants `lon,lat` pairs separated by `;`.
pub fn coordinates_path(points: &[Coordinate]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.lon, p.lat))
        .collect::<Vec<_>>()
        .join(";")
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    #[serde(default)]
    duration: f64,
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    name: Option<String>,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
}

fn best_route(response: OsrmResponse) -> Option<Route> {
    if response.code != "Ok" {
        tracing::debug!(
            "routing service answered {}: {}",
            response.code,
            response.message.as_deref().unwrap_or("no message")
        );
        return None;
    }
    response.routes.into_iter().next().and_then(into_route)
}

/// A route is only built from a complete candidate: finite non-negative
/// distance and at least one leg.
fn into_route(raw: OsrmRoute) -> Option<Route> {
    if !raw.distance.is_finite() || raw.distance < 0.0 || raw.legs.is_empty() {
        return None;
    }

    let geometry = raw
        .geometry
        .coordinates
        .into_iter()
        .map(|[lon, lat]| Coordinate { lat, lon })
        .collect();

    let legs = raw
        .legs
        .into_iter()
        .map(|leg| Leg {
            distance_m: leg.distance.max(0.0),
            duration_s: leg.duration.max(0.0),
            steps: leg.steps.into_iter().map(into_step).collect(),
        })
        .collect();

    Some(Route {
        distance_m: raw.distance,
        duration_s: raw.duration.max(0.0),
        geometry,
        legs,
    })
}

fn into_step(raw: OsrmStep) -> Step {
    let modifier = raw.maneuver.modifier.as_deref().and_then(Modifier::parse);
    let name = raw.name.filter(|name| !name.trim().is_empty());
    let instruction = raw
        .maneuver
        .instruction
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| synthesize_instruction(&raw.maneuver.kind, modifier));

    Step {
        instruction,
        name,
        maneuver: Maneuver {
            kind: raw.maneuver.kind,
            modifier,
        },
        distance_m: raw.distance.max(0.0),
    }
}

/// Plain-English text for services that only report maneuver type and modifier.
pub fn synthesize_instruction(kind: &str, modifier: Option<Modifier>) -> String {
    if modifier == Some(Modifier::UTurn) && kind != "depart" && kind != "arrive" {
        return "Make a U-turn".to_string();
    }
    let with_direction = |verb: &str| match modifier {
        Some(modifier) => format!("{verb} {modifier}"),
        None => verb.to_string(),
    };

    match kind {
        "depart" => "Depart".to_string(),
        "arrive" => "Arrive at your destination".to_string(),
        "turn" | "end of road" => match modifier {
            Some(Modifier::Straight) => "Continue straight".to_string(),
            _ => with_direction("Turn"),
        },
        "continue" | "new name" => match modifier {
            None | Some(Modifier::Straight) => "Continue".to_string(),
            _ => with_direction("Continue"),
        },
        "fork" => with_direction("Keep"),
        "merge" => with_direction("Merge"),
        "on ramp" => "Take the ramp".to_string(),
        "off ramp" => "Take the exit".to_string(),
        "roundabout" | "rotary" | "roundabout turn" => "Enter the roundabout".to_string(),
        "exit roundabout" | "exit rotary" => "Exit the roundabout".to_string(),
        _ => shared::presentation::DEFAULT_INSTRUCTION.to_string(),
    }
}

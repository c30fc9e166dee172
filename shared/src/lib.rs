use std::fmt;

use serde::{Deserialize, Serialize};

pub mod presentation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RouteBounds {
    /// Smallest box holding every point, `None` for an empty slice.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(points.iter().skip(1).fold(seed, |acc, p| Self {
            min_lat: acc.min_lat.min(p.lat),
            max_lat: acc.max_lat.max(p.lat),
            min_lon: acc.min_lon.min(p.lon),
            max_lon: acc.max_lon.max(p.lon),
        }))
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

/// Directional hint attached to a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    #[serde(rename = "uturn")]
    UTurn,
    #[serde(rename = "sharp right")]
    SharpRight,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "slight right")]
    SlightRight,
    #[serde(rename = "straight")]
    Straight,
    #[serde(rename = "slight left")]
    SlightLeft,
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "sharp left")]
    SharpLeft,
}

impl Modifier {
    pub const ALL: [Modifier; 8] = [
        Modifier::UTurn,
        Modifier::SharpRight,
        Modifier::Right,
        Modifier::SlightRight,
        Modifier::Straight,
        Modifier::SlightLeft,
        Modifier::Left,
        Modifier::SharpLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::UTurn => "uturn",
            Modifier::SharpRight => "sharp right",
            Modifier::Right => "right",
            Modifier::SlightRight => "slight right",
            Modifier::Straight => "straight",
            Modifier::SlightLeft => "slight left",
            Modifier::Left => "left",
            Modifier::SharpLeft => "sharp left",
        }
    }

    /// Lenient lookup, unknown hints map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|modifier| modifier.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Maneuver type as reported by the routing service ("turn", "depart", ...).
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub maneuver: Maneuver,
    pub distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub distance_m: f64,
    pub duration_s: f64,
    pub steps: Vec<Step>,
}

/// A driving route: ordered legs of ordered steps plus the full path geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Vec<Coordinate>,
    pub legs: Vec<Leg>,
}

impl Route {
    pub fn point_count(&self) -> usize {
        self.geometry.len()
    }

    pub fn bounds(&self) -> Option<RouteBounds> {
        RouteBounds::from_points(&self.geometry)
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.legs.iter().flat_map(|leg| leg.steps.iter())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    #[default]
    Fastest,
    Longest,
}

/// What the browser reported when asked for the device position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceLocation {
    Position(Coordinate),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    /// Blank or missing means "use the device location".
    #[serde(default)]
    pub start: Option<String>,
    pub end: String,
    #[serde(default)]
    pub device_location: Option<DeviceLocation>,
    #[serde(default)]
    pub mode: RouteMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiPointRouteRequest {
    pub waypoints: Vec<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub point_count: usize,
    pub bounds: RouteBounds,
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub route: Route,
    pub distance_km: f64,
    pub gpx_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RouteMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LongestOutcome {
    Found {
        route: RouteResponse,
        attempts: usize,
    },
    Exhausted {
        attempts: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsResponse {
    pub start: Coordinate,
    pub end: Coordinate,
    pub fastest: RouteResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longest: Option<LongestOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

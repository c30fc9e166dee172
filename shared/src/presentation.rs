//! Map and direction-list presentation.
//!
//! The actual map widget is abstracted behind [`MapSurface`]; [`MapSession`]
//! owns the display state (active route layer, markers, rendered
//! directions) so that every mutation goes through one place.

use std::fmt;

use crate::{Coordinate, Leg, Modifier, Route, RouteBounds};

pub const METERS_TO_MILES: f64 = 0.000621371;
pub const UNNAMED_ROAD: &str = "Unnamed Road";
pub const DEFAULT_INSTRUCTION: &str = "Proceed";

pub const TILE_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// Operations the presentation layer needs from a map widget.
pub trait MapSurface {
    /// Handle used to remove a layer or marker later on.
    type Layer;

    fn add_route_layer(&mut self, geometry: &[Coordinate]) -> Self::Layer;
    fn add_marker(&mut self, at: Coordinate) -> Self::Layer;
    fn remove_layer(&mut self, layer: Self::Layer);
    fn fit_bounds(&mut self, bounds: RouteBounds);
}

/// One rendered line of the instruction list.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionItem {
    pub instruction: String,
    pub modifier: Option<Modifier>,
    pub icon: Option<String>,
    pub road_name: String,
    pub distance_miles: f64,
}

impl fmt::Display for DirectionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instruction)?;
        if let Some(modifier) = self.modifier {
            write!(f, " ({modifier})")?;
        }
        write!(
            f,
            " onto {} ({:.2} miles)",
            self.road_name, self.distance_miles
        )
    }
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}

pub fn direction_icon(modifier: Modifier) -> String {
    format!("icons/{}.svg", modifier.as_str().replace(' ', "-"))
}

/// Flatten every leg's steps into display items, in route order.
pub fn render_directions(legs: &[Leg]) -> Vec<DirectionItem> {
    legs.iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|step| {
            let instruction = if step.instruction.trim().is_empty() {
                DEFAULT_INSTRUCTION.to_string()
            } else {
                step.instruction.clone()
            };
            let road_name = step
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(UNNAMED_ROAD)
                .to_string();
            DirectionItem {
                instruction,
                modifier: step.maneuver.modifier,
                icon: step.maneuver.modifier.map(direction_icon),
                road_name,
                distance_miles: meters_to_miles(step.distance_m),
            }
        })
        .collect()
}

/// Display state of one map: exactly one route layer and one pair of
/// start/end markers at any time.
pub struct MapSession<S: MapSurface> {
    surface: S,
    route_layer: Option<S::Layer>,
    start_marker: Option<S::Layer>,
    end_marker: Option<S::Layer>,
    directions: Vec<DirectionItem>,
    distance_m: Option<f64>,
}

impl<S: MapSurface> MapSession<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            route_layer: None,
            start_marker: None,
            end_marker: None,
            directions: Vec::new(),
            distance_m: None,
        }
    }

    /// Replace whatever is displayed with `route`.
    pub fn show_route(&mut self, route: &Route, start: Coordinate, end: Coordinate) {
        if let Some(layer) = self.route_layer.take() {
            self.surface.remove_layer(layer);
        }
        self.route_layer = Some(self.surface.add_route_layer(&route.geometry));
        if let Some(bounds) = route.bounds() {
            self.surface.fit_bounds(bounds);
        }
        self.place_markers(start, end);
        self.directions = render_directions(&route.legs);
        self.distance_m = Some(route.distance_m);
    }

    fn place_markers(&mut self, start: Coordinate, end: Coordinate) {
        if let Some(marker) = self.start_marker.take() {
            self.surface.remove_layer(marker);
        }
        self.start_marker = Some(self.surface.add_marker(start));

        if let Some(marker) = self.end_marker.take() {
            self.surface.remove_layer(marker);
        }
        self.end_marker = Some(self.surface.add_marker(end));
    }

    pub fn directions(&self) -> &[DirectionItem] {
        &self.directions
    }

    pub fn has_route(&self) -> bool {
        self.route_layer.is_some()
    }

    /// Total distance of the displayed route, in meters.
    pub fn distance_m(&self) -> Option<f64> {
        self.distance_m
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{Maneuver, Step};

    #[derive(Debug, Clone, PartialEq)]
    enum Drawn {
        Route(usize),
        Marker(Coordinate),
    }

    #[derive(Default)]
    struct RecordingSurface {
        next_id: u32,
        live: BTreeMap<u32, Drawn>,
        fitted: Vec<RouteBounds>,
    }

    impl RecordingSurface {
        fn insert(&mut self, drawn: Drawn) -> u32 {
            self.next_id += 1;
            self.live.insert(self.next_id, drawn);
            self.next_id
        }

        fn routes(&self) -> Vec<usize> {
            self.live
                .values()
                .filter_map(|d| match d {
                    Drawn::Route(len) => Some(*len),
                    Drawn::Marker(_) => None,
                })
                .collect()
        }

        fn markers(&self) -> Vec<Coordinate> {
            self.live
                .values()
                .filter_map(|d| match d {
                    Drawn::Marker(at) => Some(*at),
                    Drawn::Route(_) => None,
                })
                .collect()
        }
    }

    impl MapSurface for RecordingSurface {
        type Layer = u32;

        fn add_route_layer(&mut self, geometry: &[Coordinate]) -> u32 {
            self.insert(Drawn::Route(geometry.len()))
        }

        fn add_marker(&mut self, at: Coordinate) -> u32 {
            self.insert(Drawn::Marker(at))
        }

        fn remove_layer(&mut self, layer: u32) {
            assert!(self.live.remove(&layer).is_some(), "removed unknown layer");
        }

        fn fit_bounds(&mut self, bounds: RouteBounds) {
            self.fitted.push(bounds);
        }
    }

    fn step(instruction: &str, name: Option<&str>, modifier: Option<Modifier>, distance_m: f64) -> Step {
        Step {
            instruction: instruction.into(),
            name: name.map(Into::into),
            maneuver: Maneuver {
                kind: "turn".into(),
                modifier,
            },
            distance_m,
        }
    }

    fn route(points: usize, distance_m: f64) -> Route {
        Route {
            distance_m,
            duration_s: 60.0,
            geometry: (0..points)
                .map(|i| Coordinate::new(35.0 + i as f64 * 0.01, -90.0))
                .collect(),
            legs: vec![Leg {
                distance_m,
                duration_s: 60.0,
                steps: vec![
                    step("Head north", Some("Main Street"), None, 1609.344),
                    step("Turn", None, Some(Modifier::Left), 500.0),
                ],
            }],
        }
    }

    #[test]
    fn renders_directions_with_defaults() {
        let items = render_directions(&route(3, 2109.0).legs);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].road_name, "Main Street");
        assert!((items[0].distance_miles - 1.0).abs() < 1e-3);
        assert_eq!(items[0].icon, None);
        assert_eq!(items[1].road_name, UNNAMED_ROAD);
        assert_eq!(items[1].icon.as_deref(), Some("icons/left.svg"));
        assert_eq!(items[1].to_string(), "Turn (left) onto Unnamed Road (0.31 miles)");
    }

    #[test]
    fn blank_instruction_falls_back() {
        let legs = vec![Leg {
            distance_m: 0.0,
            duration_s: 0.0,
            steps: vec![step("  ", Some(""), Some(Modifier::SharpRight), 0.0)],
        }];
        let items = render_directions(&legs);
        assert_eq!(items[0].instruction, DEFAULT_INSTRUCTION);
        assert_eq!(items[0].road_name, UNNAMED_ROAD);
        assert_eq!(items[0].icon.as_deref(), Some("icons/sharp-right.svg"));
    }

    #[test]
    fn showing_a_route_replaces_the_previous_one() {
        let mut session = MapSession::new(RecordingSurface::default());
        let a = Coordinate::new(35.0, -90.0);
        let b = Coordinate::new(35.2, -90.0);

        session.show_route(&route(4, 1000.0), a, b);
        session.show_route(&route(9, 2500.0), a, b);

        let surface = session.surface();
        assert_eq!(surface.routes(), vec![9]);
        assert_eq!(surface.markers(), vec![a, b]);
        assert_eq!(surface.fitted.len(), 2);
        assert_eq!(session.distance_m(), Some(2500.0));
        assert_eq!(session.directions().len(), 2);
    }

    #[test]
    fn markers_follow_the_latest_query() {
        let mut session = MapSession::new(RecordingSurface::default());
        session.show_route(&route(4, 1000.0), Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0));
        session.show_route(&route(4, 1000.0), Coordinate::new(3.0, 3.0), Coordinate::new(4.0, 4.0));
        assert_eq!(
            session.surface().markers(),
            vec![Coordinate::new(3.0, 3.0), Coordinate::new(4.0, 4.0)]
        );
    }

    #[test]
    fn empty_geometry_skips_fit_bounds() {
        let mut session = MapSession::new(RecordingSurface::default());
        session.show_route(&route(0, 0.0), Coordinate::new(1.0, 1.0), Coordinate::new(1.0, 1.0));
        assert!(session.has_route());
        assert!(session.surface().fitted.is_empty());
    }
}

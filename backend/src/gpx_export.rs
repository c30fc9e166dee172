use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{Coordinate, Route};

const CREATOR: &str = "detour";

pub fn encode_route_as_gpx(route: &Route, name: &str) -> Result<String, RouteError> {
    let mut buffer = Vec::new();
    write_route_gpx(route, name, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

/// Write the route geometry as a single-track GPX 1.1 document.
pub fn write_route_gpx<W: Write>(route: &Route, name: &str, writer: W) -> Result<(), RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(name.into()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    segment.points.extend(route.geometry.iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);

    gpx::write(&gpx, writer)?;
    Ok(())
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

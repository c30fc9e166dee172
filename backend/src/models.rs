pub use shared::{
    ApiError, Coordinate, DeviceLocation, DirectionsRequest, DirectionsResponse, GeocodeRequest,
    GeocodeResponse, Leg, LongestOutcome, Maneuver, Modifier, MultiPointRouteRequest, Route,
    RouteBounds, RouteMetadata, RouteMode, RouteResponse, Step,
};

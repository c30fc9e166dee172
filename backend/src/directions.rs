//! The user-facing "get directions" flow: resolve both endpoints, fetch the
//! fastest route and, on request, run the longest-route search from it.

use axum::http::StatusCode;
use rand::Rng;

use crate::{
    geocoding::Geocoder,
    longest::{search_longest_route, LongestRoute, LongestRouteError, LongestRouteParams},
    models::{Coordinate, DeviceLocation, DirectionsRequest, Route, RouteMode},
    routing::RouteProvider,
};

pub const GEOLOCATION_UNSUPPORTED: &str = "Geolocation is not supported by this browser.";

#[derive(Debug, thiserror::Error)]
pub enum DirectionsError {
    #[error("Please enter a destination.")]
    EmptyDestination,
    #[error("Could not geocode start location.")]
    StartNotFound,
    #[error("Could not geocode end location.")]
    EndNotFound,
    #[error("Unable to get current location: {0}")]
    LocationUnavailable(String),
    #[error("No route found.")]
    NoRoute,
}

impl DirectionsError {
    pub fn status(&self) -> StatusCode {
        match self {
            DirectionsError::EmptyDestination
            | DirectionsError::StartNotFound
            | DirectionsError::EndNotFound
            | DirectionsError::LocationUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DirectionsError::NoRoute => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Clone)]
pub enum LongestSearch {
    Found(LongestRoute),
    Exhausted { attempts: usize },
}

#[derive(Debug, Clone)]
pub struct Directions {
    pub start: Coordinate,
    pub end: Coordinate,
    pub fastest: Route,
    pub longest: Option<LongestSearch>,
}

impl Directions {
    /// The route that ends up on the map: the longest one when found.
    pub fn displayed(&self) -> &Route {
        match &self.longest {
            Some(LongestSearch::Found(found)) => &found.route,
            _ => &self.fastest,
        }
    }
}

/// Run the full directions flow.
///
/// Every step suspends on at most one request and a failure stops the flow
/// before anything later is asked for. An exhausted longest-route search is
/// not a failure: the fastest route is still returned alongside it.
pub async fn plan_directions<G, P, R>(
    geocoder: &G,
    router: &P,
    search: &LongestRouteParams,
    req: &DirectionsRequest,
    rng: &mut R,
) -> Result<Directions, DirectionsError>
where
    G: Geocoder + ?Sized,
    P: RouteProvider + ?Sized,
    R: Rng + ?Sized,
{
    let end_address = req.end.trim();
    if end_address.is_empty() {
        return Err(DirectionsError::EmptyDestination);
    }

    let start = resolve_start(geocoder, req).await?;
    let end = geocoder
        .geocode(end_address)
        .await
        .ok_or(DirectionsError::EndNotFound)?;

    let fastest = router
        .route(&[start, end])
        .await
        .ok_or(DirectionsError::NoRoute)?;
    tracing::info!(
        "Fastest route: {:.0} m, {} points",
        fastest.distance_m,
        fastest.point_count()
    );

    let longest = match req.mode {
        RouteMode::Fastest => None,
        RouteMode::Longest => {
            match search_longest_route(router, rng, search, start, end, fastest.distance_m).await {
                Ok(found) => Some(LongestSearch::Found(found)),
                Err(LongestRouteError::Exhausted { attempts }) => {
                    Some(LongestSearch::Exhausted { attempts })
                }
                Err(err @ LongestRouteError::InvalidBaseline(_)) => {
                    tracing::warn!("skipping longest route search: {err}");
                    None
                }
            }
        }
    };

    Ok(Directions {
        start,
        end,
        fastest,
        longest,
    })
}

async fn resolve_start<G: Geocoder + ?Sized>(
    geocoder: &G,
    req: &DirectionsRequest,
) -> Result<Coordinate, DirectionsError> {
    let address = req
        .start
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty());

    match (address, &req.device_location) {
        (Some(address), _) => geocoder
            .geocode(address)
            .await
            .ok_or(DirectionsError::StartNotFound),
        (None, Some(DeviceLocation::Position(position))) => Ok(*position),
        (None, Some(DeviceLocation::Unavailable { reason })) => {
            Err(DirectionsError::LocationUnavailable(reason.clone()))
        }
        (None, None) => Err(DirectionsError::LocationUnavailable(
            GEOLOCATION_UNSUPPORTED.to_string(),
        )),
    }
}

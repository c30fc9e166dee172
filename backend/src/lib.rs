pub mod config;
pub mod directions;
pub mod error;
pub mod geocoding;
pub mod gpx_export;
pub mod longest;
pub mod models;
pub mod routing;
pub mod waypoints;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use rand::{rngs::StdRng, SeedableRng};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServiceConfig;
use crate::directions::{plan_directions, Directions, LongestSearch};
use crate::error::RouteError;
use crate::geocoding::{Geocoder, NominatimClient};
use crate::gpx_export::encode_route_as_gpx;
use crate::longest::LongestRouteParams;
use crate::models::{
    ApiError, Coordinate, DirectionsRequest, DirectionsResponse, GeocodeRequest, GeocodeResponse,
    LongestOutcome, MultiPointRouteRequest, Route, RouteMetadata, RouteResponse,
};
use crate::routing::{OsrmClient, RouteProvider};

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn RouteProvider>,
    pub search: LongestRouteParams,
}

impl AppState {
    /// Wire the Nominatim and OSRM clients described by `config`.
    pub fn from_config(config: &ServiceConfig) -> reqwest::Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            geocoder: Arc::new(NominatimClient::new(client.clone(), config.nominatim_url.clone())),
            router: Arc::new(OsrmClient::new(
                client,
                config.osrm_url.clone(),
                config.osrm_profile.clone(),
            )),
            search: config.search.clone(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/directions", post(directions_handler))
        .route("/api/route", post(route_handler))
        .route("/api/geocode", post(geocode_handler))
        .layer(cors)
        .with_state(state)
}

async fn directions_handler(
    State(state): State<AppState>,
    Json(req): Json<DirectionsRequest>,
) -> Result<Json<DirectionsResponse>, (StatusCode, Json<ApiError>)> {
    tracing::info!(
        "Directions request: {:?} -> {:?} ({:?})",
        req.start.as_deref().unwrap_or("<device location>"),
        req.end,
        req.mode
    );

    let mut rng = StdRng::from_entropy();
    let directions = plan_directions(
        state.geocoder.as_ref(),
        state.router.as_ref(),
        &state.search,
        &req,
        &mut rng,
    )
    .await
    .map_err(|err| api_error(err.into()))?;

    directions_response(directions).map(Json).map_err(api_error)
}

/// POST /api/route - route through an explicit list of points
async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<MultiPointRouteRequest>,
) -> Result<Json<RouteResponse>, (StatusCode, Json<ApiError>)> {
    if req.waypoints.len() < 2 {
        return Err(api_error(RouteError::NotEnoughPoints(req.waypoints.len())));
    }
    tracing::info!("Multi-point route request with {} points", req.waypoints.len());

    let route = state
        .router
        .route(&req.waypoints)
        .await
        .ok_or_else(|| api_error(RouteError::NoRoute))?;

    let start = req.waypoints[0];
    let end = req.waypoints[req.waypoints.len() - 1];
    build_route_response(route, start, end, "route")
        .map(Json)
        .map_err(api_error)
}

async fn geocode_handler(
    State(state): State<AppState>,
    Json(req): Json<GeocodeRequest>,
) -> Result<Json<GeocodeResponse>, (StatusCode, Json<ApiError>)> {
    let coordinate = state
        .geocoder
        .geocode(&req.address)
        .await
        .ok_or_else(|| api_error(RouteError::NotGeocoded(req.address.clone())))?;
    Ok(Json(GeocodeResponse { coordinate }))
}

pub fn directions_response(directions: Directions) -> Result<DirectionsResponse, RouteError> {
    let Directions {
        start,
        end,
        fastest,
        longest,
    } = directions;

    let longest = match longest {
        None => None,
        Some(LongestSearch::Exhausted { attempts }) => Some(LongestOutcome::Exhausted { attempts }),
        Some(LongestSearch::Found(found)) => Some(LongestOutcome::Found {
            route: build_route_response(found.route, start, end, "longest")?,
            attempts: found.attempts,
        }),
    };

    Ok(DirectionsResponse {
        start,
        end,
        fastest: build_route_response(fastest, start, end, "fastest")?,
        longest,
    })
}

pub fn build_route_response(
    route: Route,
    start: Coordinate,
    end: Coordinate,
    name: &str,
) -> Result<RouteResponse, RouteError> {
    let gpx_base64 = encode_route_as_gpx(&route, name)?;
    let metadata = build_metadata(&route, start, end);
    Ok(RouteResponse {
        distance_km: route.distance_m / 1000.0,
        route,
        gpx_base64,
        metadata,
    })
}

pub fn build_metadata(route: &Route, start: Coordinate, end: Coordinate) -> Option<RouteMetadata> {
    Some(RouteMetadata {
        point_count: route.point_count(),
        bounds: route.bounds()?,
        start,
        end,
    })
}

fn api_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!("{err}");
    } else {
        tracing::debug!("request failed ({status}): {err}");
    }
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}

use axum::http::StatusCode;
use thiserror::Error;

use crate::directions::DirectionsError;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("failed to write GPX file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Directions(#[from] DirectionsError),
    #[error("a route needs at least two points, got {0}")]
    NotEnoughPoints(usize),
    #[error("No route found.")]
    NoRoute,
    #[error("Could not geocode {0:?}.")]
    NotGeocoded(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Gpx(_) | RouteError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouteError::Directions(err) => err.status(),
            RouteError::NotEnoughPoints(_) => StatusCode::BAD_REQUEST,
            RouteError::NoRoute | RouteError::NotGeocoded(_) => StatusCode::NOT_FOUND,
        }
    }
}

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::Coordinate;

/// Resolves a free-text address to a coordinate.
///
/// Returns the best match, or `None` when nothing matched or the lookup
/// failed for any reason. Callers own the user-facing message.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<Coordinate>;
}

/// Client for the Nominatim `search` endpoint.
#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: Degrees,
    lon: Degrees,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim sends degrees as strings; be tolerant of plain numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Degrees::Number(value) => *value,
            Degrees::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl NominatimClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, reqwest::Error> {
        self.client
            .get(format!("{}/search", self.base_url.trim_end_matches('/')))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<SearchHit>>()
            .await
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Option<Coordinate> {
        let query = address.trim();
        if query.is_empty() {
            return None;
        }

        let hits = match self.search(query).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!("geocoding request failed: {err}");
                return None;
            }
        };

        let Some(hit) = hits.first() else {
            tracing::info!("no geocoding match");
            return None;
        };
        let coordinate = coordinate_of(hit);
        match coordinate {
            Some(c) => tracing::debug!(
                "resolved to {:.5},{:.5} ({})",
                c.lat,
                c.lon,
                hit.display_name.as_deref().unwrap_or("unnamed")
            ),
            None => tracing::warn!("geocoding match carried unparsable coordinates"),
        }
        coordinate
    }
}

fn coordinate_of(hit: &SearchHit) -> Option<Coordinate> {
    Some(Coordinate {
        lat: hit.lat.value()?,
        lon: hit.lon.value()?,
    })
}

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use crate::{longest::LongestRouteParams, waypoints::WaypointSettings};

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_OSRM_PROFILE: &str = "driving";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("detour/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("{key} {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },
}

/// Service endpoints and search tuning, read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub osrm_url: String,
    pub osrm_profile: String,
    pub nominatim_url: String,
    pub user_agent: String,
    pub http_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub search: LongestRouteParams,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            osrm_profile: DEFAULT_OSRM_PROFILE.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            search: LongestRouteParams::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
        };

        let waypoints = WaypointSettings {
            min_count: parse_or(&lookup, "WAYPOINT_MIN_COUNT", defaults.search.waypoints.min_count)?,
            max_count: parse_or(&lookup, "WAYPOINT_MAX_COUNT", defaults.search.waypoints.max_count)?,
            max_deviation: parse_or(
                &lookup,
                "WAYPOINT_MAX_DEVIATION",
                defaults.search.waypoints.max_deviation,
            )?,
        };
        let search = LongestRouteParams {
            min_multiplier: parse_or(&lookup, "LONGEST_MIN_MULTIPLIER", defaults.search.min_multiplier)?,
            max_attempts: parse_or(&lookup, "LONGEST_MAX_ATTEMPTS", defaults.search.max_attempts)?,
            min_geometry_points: parse_or(
                &lookup,
                "LONGEST_MIN_GEOMETRY_POINTS",
                defaults.search.min_geometry_points,
            )?,
            waypoints,
        };

        let config = Self {
            osrm_url: text("OSRM_URL", defaults.osrm_url),
            osrm_profile: text("OSRM_PROFILE", defaults.osrm_profile),
            nominatim_url: text("NOMINATIM_URL", defaults.nominatim_url),
            user_agent: text("HTTP_USER_AGENT", defaults.user_agent),
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            search,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let search = &self.search;
        if !search.min_multiplier.is_finite() || search.min_multiplier <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "LONGEST_MIN_MULTIPLIER",
                reason: "must be a positive number",
            });
        }
        if search.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "LONGEST_MAX_ATTEMPTS",
                reason: "must be at least 1",
            });
        }
        if !search.waypoints.max_deviation.is_finite() || search.waypoints.max_deviation < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "WAYPOINT_MAX_DEVIATION",
                reason: "must be a non-negative number",
            });
        }
        if search.waypoints.min_count == 0 {
            return Err(ConfigError::OutOfRange {
                key: "WAYPOINT_MIN_COUNT",
                reason: "must be at least 1",
            });
        }
        if search.waypoints.max_count < search.waypoints.min_count {
            return Err(ConfigError::OutOfRange {
                key: "WAYPOINT_MAX_COUNT",
                reason: "must not be below WAYPOINT_MIN_COUNT",
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "HTTP_TIMEOUT_SECS",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Shared HTTP client for both upstream services.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.http_timeout)
            .build()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

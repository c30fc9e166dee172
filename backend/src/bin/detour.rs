use std::{fs::File, io::BufWriter, path::PathBuf};

use backend::{
    config::ServiceConfig,
    directions::{plan_directions, LongestSearch},
    gpx_export::write_route_gpx,
    models::{Coordinate, DeviceLocation, DirectionsRequest, RouteBounds, RouteMode},
    AppState,
};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use shared::presentation::{MapSession, MapSurface};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print fastest or longest driving directions between two places"
)]
struct Args {
    /// Start address; when omitted, --lat/--lon stand in for the device position
    #[arg(long)]
    start: Option<String>,

    /// Destination address
    #[arg(long)]
    end: String,

    #[arg(long, requires = "lon")]
    lat: Option<f64>,
    #[arg(long, requires = "lat")]
    lon: Option<f64>,

    /// Search for a route at least twice as long as the fastest one
    #[arg(long)]
    longest: bool,

    /// Write the displayed route as GPX to this path
    #[arg(long)]
    gpx: Option<PathBuf>,
}

impl Args {
    fn device_location(&self) -> DeviceLocation {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => DeviceLocation::Position(Coordinate { lat, lon }),
            _ => DeviceLocation::Unavailable {
                reason: "no --lat/--lon given".into(),
            },
        }
    }
}

/// Map surface for a terminal: logs what a map widget would draw.
#[derive(Default)]
struct LogSurface {
    next_layer: usize,
}

impl MapSurface for LogSurface {
    type Layer = usize;

    fn add_route_layer(&mut self, geometry: &[Coordinate]) -> usize {
        self.next_layer += 1;
        tracing::debug!("layer {}: route with {} points", self.next_layer, geometry.len());
        self.next_layer
    }

    fn add_marker(&mut self, at: Coordinate) -> usize {
        self.next_layer += 1;
        tracing::debug!("layer {}: marker at {:.5},{:.5}", self.next_layer, at.lat, at.lon);
        self.next_layer
    }

    fn remove_layer(&mut self, layer: usize) {
        tracing::debug!("layer {layer} removed");
    }

    fn fit_bounds(&mut self, bounds: RouteBounds) {
        tracing::debug!(
            "viewport [{:.4}..{:.4}] lat, [{:.4}..{:.4}] lon",
            bounds.min_lat,
            bounds.max_lat,
            bounds.min_lon,
            bounds.max_lon
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ServiceConfig::from_env()?;
    let state = AppState::from_config(&config)?;

    let req = DirectionsRequest {
        start: args.start.clone(),
        end: args.end.clone(),
        device_location: Some(args.device_location()),
        mode: if args.longest {
            RouteMode::Longest
        } else {
            RouteMode::Fastest
        },
    };

    let mut rng = StdRng::from_entropy();
    let directions = plan_directions(
        state.geocoder.as_ref(),
        state.router.as_ref(),
        &state.search,
        &req,
        &mut rng,
    )
    .await?;

    let mut session = MapSession::new(LogSurface::default());
    session.show_route(&directions.fastest, directions.start, directions.end);
    match &directions.longest {
        Some(LongestSearch::Found(found)) => {
            tracing::info!("longer route found on attempt {}", found.attempts);
            session.show_route(&found.route, directions.start, directions.end);
        }
        Some(LongestSearch::Exhausted { attempts }) => {
            eprintln!(
                "Could not find a longer route within the specified distance range ({attempts} attempts)."
            );
        }
        None => {}
    }

    let route = directions.displayed();
    println!(
        "{:.2} miles, about {:.0} min",
        shared::presentation::meters_to_miles(route.distance_m),
        route.duration_s / 60.0
    );
    for (idx, item) in session.directions().iter().enumerate() {
        println!("{:>3}. {item}", idx + 1);
    }

    if let Some(path) = &args.gpx {
        let name = match directions.longest {
            Some(LongestSearch::Found(_)) => "longest",
            _ => "fastest",
        };
        write_route_gpx(route, name, BufWriter::new(File::create(path)?))?;
        tracing::info!("wrote GPX to {}", path.display());
    }

    Ok(())
}

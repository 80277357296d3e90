use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use scenicroute::store::{MemoryStore, SpatialStore};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct StoreLoadError(PathBuf, #[source] scenicroute::osm::Error);

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct PhotoLoadError(PathBuf, #[source] csv::Error);

#[derive(Parser)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// The path to the OSM file
    osm_file: PathBuf,

    /// The path to a CSV file with photo locations (`lat` and `lon` columns)
    photos_csv: PathBuf,

    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// Longitude of the end point
    end_lon: f64,

    /// Trade-off between distance and scenic score; negative values prefer scenic ways
    #[arg(long, default_value_t = -0.5)]
    alpha: f64,

    /// Only import nodes within min_lon,min_lat,max_lon,max_lat
    #[arg(long, value_delimiter = ',', num_args = 4)]
    bbox: Option<Vec<f64>>,

    /// Remove nodes without any ways after the import
    #[arg(long)]
    prune: bool,

    /// Number of elements written, or nodes scored, per commit
    #[arg(long, default_value_t = 10_000)]
    batch_size: usize,

    /// Maximum distance (in meters) from the start and end points to the network
    #[arg(long, default_value_t = 500.0)]
    snap_radius: f64,

    /// Seed for the order of scoring nodes
    #[arg(long)]
    seed: Option<u64>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let bbox = match cli.bbox.as_deref() {
        None => [0.0; 4],
        Some(&[min_lon, min_lat, max_lon, max_lat]) => [min_lon, min_lat, max_lon, max_lat],
        Some(_) => return Err("--bbox expects exactly 4 values".into()),
    };

    let import_options = scenicroute::osm::Options {
        bbox,
        batch_size: cli.batch_size,
        prune: cli.prune,
        ..Default::default()
    };
    let mut store = load_store(&cli.osm_file, &import_options)?;

    let photos = scenicroute::score::read_photo_locations_from_file(&cli.photos_csv)
        .map_err(|e| PhotoLoadError(cli.photos_csv.clone(), e))?;
    let model = scenicroute::score::GaussianKde::fit(photos.iter().map(|p| p.xy()))?;

    let score_options = scenicroute::score::ScoreOptions {
        batch_size: cli.batch_size,
        seed: cli.seed,
        ..Default::default()
    };
    store.update_scores(&model, &score_options)?;

    let route_options = scenicroute::route::RouteOptions {
        alpha: cli.alpha,
        snap_radius: cli.snap_radius,
        ..Default::default()
    };
    let route = scenicroute::route::plan_route(
        &store,
        (cli.start_lat, cli.start_lon),
        (cli.end_lat, cli.end_lon),
        &route_options,
    )?;

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{");
    println!("        \"distance\": {},", route.total_distance);
    println!("        \"score\": {}", route.total_score);
    println!("      }},");

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut points = route.points.iter().peekable();
    while let Some(point) = points.next() {
        let suffix = if points.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", point.lon, point.lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

fn load_store<P: AsRef<Path>>(
    path: P,
    options: &scenicroute::osm::Options,
) -> Result<MemoryStore, StoreLoadError> {
    let mut store = MemoryStore::default();
    match scenicroute::osm::import_from_file(&mut store, options, path.as_ref()) {
        Ok(_) => Ok(store),
        Err(e) => Err(StoreLoadError(PathBuf::from(path.as_ref()), e)),
    }
}

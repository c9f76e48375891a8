#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for mapping amenities inside a place boundary.
//!
//! ```text
//! amenity_map resolve --address "San Francisco, CA"
//! amenity_map resolve --lat 37.0 --lon -122.0
//! amenity_map amenities --address "Oakland, CA" --category Civic --specific Libraries
//! amenity_map categories
//! ```
//!
//! Running `amenity_map` with no subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`amenity_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;

use std::io::Write as _;
use std::sync::Arc;

use amenity_map_amenity::fetcher::FeatureFetcher;
use amenity_map_amenity::output::{write_geojson, write_heat_points, write_json_lines};
use amenity_map_amenity::pipeline::{Pipeline, PipelineOutcome};
use amenity_map_amenity::registry::{AmenityCatalog, DEFAULT_CATEGORIES, DEFAULT_SPECIFIC, Selection};
use amenity_map_boundary::resolver::{LocationResolver, ResolverConfig};
use amenity_map_boundary::serializer::serialize;
use amenity_map_boundary_models::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LON, DEFAULT_FALLBACK_RADIUS_DEGREES, LocationQuery,
};
use amenity_map_cli_utils::IndicatifProgress;
use amenity_map_osm::nominatim::NominatimGeocoder;
use amenity_map_osm::overpass::OverpassClient;
use amenity_map_osm::service_registry;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "amenity_map",
    about = "Resolve a place to a boundary and map the amenities inside it"
)]
struct Cli {
    #[command(flatten)]
    services: ServiceArgs,

    #[command(flatten)]
    resolver: ResolverArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ServiceArgs {
    /// Override the Nominatim search endpoint
    #[arg(long, global = true)]
    nominatim_url: Option<String>,

    /// Override the Overpass interpreter endpoint
    #[arg(long, global = true)]
    overpass_url: Option<String>,
}

#[derive(Args)]
struct ResolverArgs {
    /// Latitude of the fallback center used when an address is not found
    #[arg(long, global = true, default_value_t = DEFAULT_CENTER_LAT, allow_negative_numbers = true)]
    default_lat: f64,

    /// Longitude of the fallback center used when an address is not found
    #[arg(long, global = true, default_value_t = DEFAULT_CENTER_LON, allow_negative_numbers = true)]
    default_lon: f64,

    /// Radius of the fallback circle in degrees
    #[arg(long, global = true, default_value_t = DEFAULT_FALLBACK_RADIUS_DEGREES)]
    radius: f64,
}

#[derive(Args)]
struct LocationArgs {
    /// Address, city, or neighborhood to search
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    address: Option<String>,

    /// Latitude of a point to search around
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of a point to search around
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn query(&self) -> Option<LocationQuery> {
        if let Some(address) = &self.address {
            return Some(LocationQuery::Address(address.clone()));
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LocationQuery::Point { lat, lon }),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// GeoJSON `FeatureCollection` of amenity points
    #[default]
    Geojson,
    /// One JSON object per amenity
    Lines,
    /// `[lat, lon]` pairs for a heatmap
    Heat,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a location and print its boundary as GeoJSON
    Resolve {
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Resolve a location and print the selected amenities inside it
    Amenities {
        #[command(flatten)]
        location: LocationArgs,

        /// Category to include (repeatable)
        #[arg(long = "category", default_values = DEFAULT_CATEGORIES)]
        categories: Vec<String>,

        /// Specific amenity to include
        #[arg(long, default_value = DEFAULT_SPECIFIC)]
        specific: String,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// List the available categories and specific amenities
    Categories,
}

fn build_pipeline(cli: &Cli) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let mut nominatim = service_registry::nominatim().ok_or("Nominatim service is disabled")?;
    if let Some(url) = &cli.services.nominatim_url {
        nominatim.set_base_url(url.as_str());
    }

    let mut overpass = service_registry::overpass().ok_or("Overpass service is disabled")?;
    if let Some(url) = &cli.services.overpass_url {
        overpass.set_base_url(url.as_str());
    }

    log::debug!(
        "Using {} at {} and {} at {}",
        nominatim.name,
        nominatim.base_url(),
        overpass.name,
        overpass.base_url()
    );

    let geocoder = Arc::new(NominatimGeocoder::from_service(&nominatim)?);
    let overpass = Arc::new(OverpassClient::from_service(&overpass)?);

    let config = ResolverConfig {
        default_lat: cli.resolver.default_lat,
        default_lon: cli.resolver.default_lon,
        fallback_radius_degrees: cli.resolver.radius,
    };
    let resolver = LocationResolver::new(geocoder, overpass.clone(), config);
    let fetcher = Arc::new(FeatureFetcher::new(overpass));

    Ok(Pipeline::new(resolver, fetcher, AmenityCatalog::embedded()))
}

fn print_categories(catalog: &AmenityCatalog) {
    println!("Categories:");
    for category in catalog.categories() {
        println!("  {:<24} {}", category.name, category.filter);
    }
    println!();
    println!("Specific amenities:");
    for specific in catalog.specific_amenities() {
        println!("  {:<24} {}", specific.name, specific.filter);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = amenity_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let pipeline = build_pipeline(&cli)?;

    let Some(command) = cli.command else {
        return interactive::run(&pipeline, &multi).await;
    };

    match command {
        Commands::Resolve { location } => {
            let query = location
                .query()
                .ok_or("Provide --address or both --lat and --lon")?;
            let progress = IndicatifProgress::spinner(&multi, &format!("Resolving {query}"));
            let resolution = pipeline.resolve(&query).await;
            progress.finish(resolution.source.to_string());
            eprintln!("{}", resolution.status);
            eprintln!(
                "{} part(s), {} vertices",
                resolution.boundary.polygons().count(),
                resolution.boundary.vertex_count()
            );
            println!("{}", serialize(&resolution.boundary)?);
        }
        Commands::Amenities {
            location,
            categories,
            specific,
            format,
        } => {
            let selection = Selection {
                categories,
                specific,
            };
            let progress = IndicatifProgress::steps_bar(&multi, "Fetching amenities");
            let outcome = pipeline
                .run(location.query().as_ref(), &selection, progress.as_ref())
                .await?;

            let PipelineOutcome::Completed(result) = outcome else {
                eprintln!("No location given. Provide --address or both --lat and --lon.");
                return Ok(());
            };

            eprintln!("{}", result.resolution.status);
            for warning in &result.aggregation.warnings {
                eprintln!("{warning}");
            }
            for (category, count) in result.aggregation.collection.category_counts() {
                eprintln!("  {category}: {count}");
            }

            let collection = &result.aggregation.collection;
            let mut out = std::io::stdout().lock();
            match format {
                OutputFormat::Geojson => write_geojson(collection, &mut out)?,
                OutputFormat::Lines => write_json_lines(collection, &mut out)?,
                OutputFormat::Heat => write_heat_points(collection, &mut out)?,
            }
            out.flush()?;
        }
        Commands::Categories => print_categories(pipeline.catalog()),
    }

    Ok(())
}

// src/main.rs
// =============================================================================
// This is the entry point of the panorama crawler.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) once
// 3. Dispatch to the subcommand handler
// 4. Print results as a table or JSON
// 5. Exit with a proper code:
//      0 = success
//      1 = fatal setup error (no boundary, no centerpoint, no seed)
//      2 = anything else (storage, bad config, I/O)
// =============================================================================

// Module declarations
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - typed settings
mod crawl; // src/crawl/ - frontier, expansion and the crawl loop
mod error; // src/error.rs - error enums
mod geometry; // src/geometry/ - boundary polygons and the containment gate
mod lookup; // src/lookup/ - panorama lookup service client
mod store; // src/store/ - SQLite node store
#[cfg(test)]
mod testing; // src/testing.rs - canned HTTP responses for tests

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{BoundaryArgs, Cli, Commands, DbArgs, LookupArgs};
use config::CrawlConfig;
use crawl::{CrawlSummary, Crawler, TracingReporter};
use error::CrawlError;
use geometry::{load_boundary, save_boundary, BoundaryGate};
use lookup::{HttpPanoramaLookup, PanoramaLookup, PanoramaMetadata, PanoramaRecord};
use store::{NodeStore, StoreStats};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = success
//   Ok(1) = fatal setup error, already reported
//   Err   = unexpected error (exit code 2)
async fn run() -> Result<i32> {
    let args = Cli::parse();
    init_tracing(args.json_logs)?;

    match args.command {
        Commands::Crawl {
            db,
            max_new,
            radius,
            extra_radii,
            frontier_order,
            progress_every,
            boundary,
            lookup,
            json,
        } => {
            let config = cli::crawl_config(&db, max_new, radius, extra_radii, frontier_order, progress_every);
            handle_crawl(&config, &boundary, &lookup, json).await
        }
        Commands::Boundary { boundary, output } => handle_boundary(&boundary, output.as_deref()).await,
        Commands::Panorama {
            boundary,
            lookup,
            radius,
            output,
        } => handle_panorama(&boundary, &lookup, radius, &output).await,
        Commands::Stats { db, json } => handle_stats(&db, json),
    }
}

// Logs go to stderr so that --json output on stdout stays machine-readable.
// RUST_LOG overrides the default `panorama_crawler=info`.
fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("panorama_crawler=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

// Handles the 'crawl' subcommand
// Parameters:
//   config: budget, radii, frontier order and database path
//   boundary_args / lookup_args: where the boundary and panoramas come from
//   json: whether to print the summary as JSON
async fn handle_crawl(
    config: &CrawlConfig,
    boundary_args: &BoundaryArgs,
    lookup_args: &LookupArgs,
    json: bool,
) -> Result<i32> {
    let lookup = HttpPanoramaLookup::new(&lookup_args.to_config())?;

    match crawl_once(config, boundary_args, &lookup).await {
        Ok(summary) => {
            print_summary(&summary, json)?;
            Ok(0)
        }
        Err(e) if e.is_setup_failure() => {
            error!(error = %e, "crawl could not start");
            eprintln!("Error: {}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

async fn crawl_once(
    config: &CrawlConfig,
    boundary_args: &BoundaryArgs,
    lookup: &dyn PanoramaLookup,
) -> Result<CrawlSummary, CrawlError> {
    let boundary = load_boundary(&boundary_args.to_config()).await?;
    info!(
        features = boundary.feature_count(),
        polygons = boundary.polygon_count(),
        "boundary loaded"
    );
    let gate = BoundaryGate::new(boundary);

    let mut store = NodeStore::open(&config.db_path)?;
    if store.is_degraded() {
        info!("node store is running without the metadata table");
    }

    let mut reporter = TracingReporter;
    Crawler::new(&mut store, &gate, lookup, config)
        .run(&mut reporter)
        .await
}

// Handles the 'boundary' subcommand
async fn handle_boundary(boundary_args: &BoundaryArgs, output: Option<&Path>) -> Result<i32> {
    let boundary = match load_boundary(&boundary_args.to_config()).await {
        Ok(boundary) => boundary,
        Err(e) => {
            eprintln!("Error: boundary unavailable: {}", e);
            return Ok(1);
        }
    };

    println!("Features: {}", boundary.feature_count());
    println!("Polygons: {}", boundary.polygon_count());
    match boundary.centerpoint() {
        Some(center) => println!("Centerpoint: {:.6}, {:.6}", center.lat, center.lon),
        None => println!("Centerpoint: (none)"),
    }

    if let Some(dir) = output {
        let path = save_boundary(&boundary, dir)?;
        println!("Saved boundary to {}", path.display());
    }
    Ok(0)
}

// What `panorama` writes to panorama.json
#[derive(Debug, Serialize)]
struct PanoramaReport {
    id: String,
    lat: f64,
    lon: f64,
    #[serde(flatten)]
    metadata: PanoramaMetadata,
}

impl From<&PanoramaRecord> for PanoramaReport {
    fn from(record: &PanoramaRecord) -> Self {
        PanoramaReport {
            id: record.id.clone(),
            lat: record.lat,
            lon: record.lon,
            metadata: PanoramaMetadata::from(record),
        }
    }
}

// Handles the 'panorama' subcommand
// Parameters:
//   radius: single search radius around the centerpoint (no fallbacks)
//   output: directory for panorama.json
async fn handle_panorama(
    boundary_args: &BoundaryArgs,
    lookup_args: &LookupArgs,
    radius: u32,
    output: &Path,
) -> Result<i32> {
    let boundary = match load_boundary(&boundary_args.to_config()).await {
        Ok(boundary) => boundary,
        Err(e) => {
            eprintln!("Error: boundary unavailable: {}", e);
            return Ok(1);
        }
    };
    let Some(center) = boundary.centerpoint() else {
        eprintln!("Error: {}", CrawlError::NoCenterpoint);
        return Ok(1);
    };

    let lookup = HttpPanoramaLookup::new(&lookup_args.to_config())?;
    let Some(record) = lookup.find(center.lat, center.lon, radius).await? else {
        eprintln!(
            "Error: {}",
            CrawlError::NoSeed {
                lat: center.lat,
                lon: center.lon,
                radii: vec![radius],
            }
        );
        return Ok(1);
    };

    let report = PanoramaReport::from(&record);
    let path = write_panorama(&report, output)?;

    print_attributes(&report)?;
    println!("\nSaved panorama to {}", path.display());
    Ok(0)
}

fn write_panorama(report: &PanoramaReport, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create output directory {}", dir.display()))?;
    let path = dir.join("panorama.json");
    let text = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, text).with_context(|| format!("could not write {}", path.display()))?;
    Ok(path)
}

// One line per attribute, in the order they are serialized
fn print_attributes(report: &PanoramaReport) -> Result<()> {
    let value = serde_json::to_value(report)?;
    let fields = value
        .as_object()
        .ok_or_else(|| anyhow!("panorama report did not serialize to an object"))?;

    println!("{:<20} {}", "ATTRIBUTE", "VALUE");
    println!("{}", "=".repeat(60));
    for (name, value) in fields {
        let shown = match value {
            serde_json::Value::Null => "-".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        println!("{:<20} {}", name, shown);
    }
    Ok(())
}

// Handles the 'stats' subcommand
fn handle_stats(db: &DbArgs, json: bool) -> Result<i32> {
    let store = NodeStore::open(&db.path)
        .with_context(|| format!("could not open database {}", db.path.display()))?;
    let stats = store.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats_table(&stats);
    }
    Ok(0)
}

// Prints the crawl summary either as a table or JSON
fn print_summary(summary: &CrawlSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Crawl summary:");
    println!("   Seeded this run:    {}", if summary.seeded { "yes" } else { "no" });
    println!("   Processed:          {}", summary.processed);
    println!("   Skipped:            {}", summary.skipped);
    println!("   New nodes:          {}", summary.new_nodes);
    println!(
        "   Stopped because:    {}",
        if summary.frontier_exhausted {
            "frontier exhausted"
        } else {
            "budget reached"
        }
    );
    println!();
    print_stats_table(&summary.stats);
    Ok(())
}

fn print_stats_table(stats: &StoreStats) {
    println!("{:<22} {:>10} {:>9}", "NODES", "COUNT", "PERCENT");
    println!("{}", "=".repeat(43));

    let rows = [
        ("Total", stats.total),
        ("Metadata populated", stats.metadata_populated),
        ("Within boundary", stats.within_boundary),
        ("Outside boundary", stats.outside_boundary),
        ("Boundary unchecked", stats.unchecked),
        ("Neighbors expanded", stats.neighbors_expanded),
    ];
    for (label, count) in rows {
        println!("{:<22} {:>10} {:>8.1}%", label, count, stats.percent(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::NeighborRecord;

    #[test]
    fn test_panorama_report_flattens_metadata() {
        let mut record = PanoramaRecord::new("abc", 43.65, -79.38)
            .with_neighbors(vec![NeighborRecord::new("def", 43.66, -79.38)]);
        record.address = Some("100 Queen St W".to_string());

        let value = serde_json::to_value(PanoramaReport::from(&record)).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["address"], "100 Queen St W");
        assert_eq!(value["neighbor_count"], 1);
    }

    #[test]
    fn test_write_panorama_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");

        let report = PanoramaReport::from(&PanoramaRecord::new("abc", 1.0, 2.0));
        let path = write_panorama(&report, &out).unwrap();

        assert_eq!(path, out.join("panorama.json"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["lat"], 1.0);
    }
}

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the CLI structure is written as Rust structs and
// enums, and clap generates the parsing code.
//
// Options shared by several subcommands (database, boundary source, lookup
// service) live in their own #[derive(Args)] structs and get flattened into
// each subcommand that needs them. Each of those structs knows how to turn
// itself into the matching config struct from config.rs.
// =============================================================================

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{BoundaryConfig, CrawlConfig, LookupConfig};
use crate::crawl::FrontierOrder;

#[derive(Parser, Debug)]
#[command(
    name = "panorama-crawler",
    version,
    about = "Crawl street-level panorama metadata inside a municipal boundary",
    long_about = "panorama-crawler discovers panoramas by walking the neighbor graph outward \
                  from a seed near the boundary's center. Progress is stored in SQLite, so \
                  repeated runs continue where the last one stopped."
)]
pub struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one crawl: seed if needed, then process up to --max-new nodes
    ///
    /// Example: panorama-crawler crawl --max-new 200 --boundary toronto.geojson
    Crawl {
        #[command(flatten)]
        db: DbArgs,

        /// Maximum number of nodes to process in this run
        #[arg(long, default_value_t = 50)]
        max_new: usize,

        /// Initial seed search radius in meters
        #[arg(long, default_value_t = 50)]
        radius: u32,

        /// Fallback seed radii, tried in order (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "100,200")]
        extra_radii: Vec<u32>,

        /// Order in which frontier nodes are processed
        #[arg(long, value_enum, default_value_t = FrontierOrder::RecentFirst)]
        frontier_order: FrontierOrder,

        /// Log progress every N processed nodes (0 = never)
        #[arg(long, default_value_t = 25)]
        progress_every: usize,

        #[command(flatten)]
        boundary: BoundaryArgs,

        #[command(flatten)]
        lookup: LookupArgs,

        /// Output the run summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load the boundary and describe it; optionally save it as GeoJSON
    Boundary {
        #[command(flatten)]
        boundary: BoundaryArgs,

        /// Directory to write boundary.geojson into
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Look up the panorama nearest the boundary's centerpoint
    Panorama {
        #[command(flatten)]
        boundary: BoundaryArgs,

        #[command(flatten)]
        lookup: LookupArgs,

        /// Search radius in meters
        #[arg(long, default_value_t = 50)]
        radius: u32,

        /// Directory to write panorama.json into
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Print counts from the node store
    Stats {
        #[command(flatten)]
        db: DbArgs,

        /// Output statistics as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// SQLite database holding crawl progress
    #[arg(long = "db", env = "PANORAMA_CRAWLER_DB", default_value = "streetview.db")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct BoundaryArgs {
    /// Local boundary GeoJSON file (skips the open-data portal)
    #[arg(long = "boundary")]
    pub file: Option<PathBuf>,

    /// CKAN open-data portal to download the boundary from
    #[arg(long, default_value = "https://ckan0.cf.opendata.inter.prod-toronto.ca/")]
    pub portal_url: String,

    /// CKAN dataset id of the boundary
    #[arg(long, default_value = "841fb820-46d0-46ac-8dcb-d20f27e57bcc")]
    pub dataset_id: String,

    /// Where downloaded boundaries are cached
    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Never download the boundary; use the cached copy only
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Base URL of the panorama lookup service
    #[arg(long, default_value = "http://127.0.0.1:8765/")]
    pub lookup_url: String,

    /// HTTP timeout in seconds for the lookup service
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

impl BoundaryArgs {
    pub fn to_config(&self) -> BoundaryConfig {
        BoundaryConfig {
            file: self.file.clone(),
            portal_url: self.portal_url.clone(),
            dataset_id: self.dataset_id.clone(),
            cache_dir: self.cache_dir.clone(),
            offline: self.offline,
            ..BoundaryConfig::default()
        }
    }
}

impl LookupArgs {
    pub fn to_config(&self) -> LookupConfig {
        LookupConfig {
            base_url: self.lookup_url.clone(),
            timeout_secs: self.timeout,
            ..LookupConfig::default()
        }
    }
}

// Builds the crawl config from the `crawl` subcommand's flags
pub fn crawl_config(
    db: &DbArgs,
    max_new: usize,
    radius: u32,
    extra_radii: Vec<u32>,
    frontier_order: FrontierOrder,
    progress_every: usize,
) -> CrawlConfig {
    CrawlConfig {
        db_path: db.path.clone(),
        max_new,
        radius,
        extra_radii,
        frontier_order,
        progress_every,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It splices the fields of another #[derive(Args)] struct into this
//      subcommand, as if they were written inline
//    - That's how `crawl` and `panorama` share the boundary options
//
// 2. What does env = "PANORAMA_CRAWLER_DB" do?
//    - If --db isn't given, clap reads the environment variable instead
//    - If neither is set, the default_value is used
//    - Needs clap's "env" feature (see Cargo.toml)
//
// 3. What is value_delimiter = ','?
//    - Lets one flag carry a list: --extra-radii 100,200,400
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from(["panorama-crawler", "crawl", "--db", "test.db"]);
        let Commands::Crawl {
            db,
            max_new,
            radius,
            extra_radii,
            frontier_order,
            progress_every,
            boundary,
            json,
            ..
        } = cli.command
        else {
            panic!("expected crawl subcommand");
        };

        let config = crawl_config(&db, max_new, radius, extra_radii, frontier_order, progress_every);
        assert_eq!(
            config,
            CrawlConfig {
                db_path: PathBuf::from("test.db"),
                ..CrawlConfig::default()
            }
        );
        assert_eq!(boundary.to_config(), BoundaryConfig::default());
        assert!(!json);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_crawl_flags() {
        let cli = Cli::parse_from([
            "panorama-crawler",
            "crawl",
            "--max-new",
            "5",
            "--extra-radii",
            "150,400",
            "--frontier-order",
            "boundary-priority",
            "--boundary",
            "city.geojson",
            "--offline",
            "--lookup-url",
            "http://lookup.local/api/",
            "--json-logs",
        ]);
        assert!(cli.json_logs);

        let Commands::Crawl {
            max_new,
            extra_radii,
            frontier_order,
            boundary,
            lookup,
            ..
        } = cli.command
        else {
            panic!("expected crawl subcommand");
        };
        assert_eq!(max_new, 5);
        assert_eq!(extra_radii, vec![150, 400]);
        assert_eq!(frontier_order, FrontierOrder::BoundaryPriority);

        let boundary = boundary.to_config();
        assert_eq!(boundary.file, Some(PathBuf::from("city.geojson")));
        assert!(boundary.offline);
        assert_eq!(lookup.to_config().base_url, "http://lookup.local/api/");
    }

    #[test]
    fn test_boundary_output_is_optional() {
        let cli = Cli::parse_from(["panorama-crawler", "boundary"]);
        assert!(matches!(cli.command, Commands::Boundary { output: None, .. }));
    }
}

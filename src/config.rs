// src/config.rs
// =============================================================================
// Typed configuration for each part of the crawler.
//
// cli.rs parses the command line; the handlers in main.rs turn those
// arguments into these structs. Every field has a serde default so a config
// can also be built from partial JSON (handy in tests and for --json output).
// =============================================================================

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::crawl::FrontierOrder;

/// Settings for one crawl run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Maximum number of nodes fully processed in one run
    #[serde(default = "default_max_new")]
    pub max_new: usize,

    /// Initial seed search radius in meters
    #[serde(default = "default_radius")]
    pub radius: u32,

    /// Radii tried in order when the initial search finds nothing
    #[serde(default = "default_extra_radii")]
    pub extra_radii: Vec<u32>,

    #[serde(default)]
    pub frontier_order: FrontierOrder,

    /// Report progress every N processed nodes (0 disables it)
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl CrawlConfig {
    /// The initial radius followed by the fallbacks.
    pub fn search_radii(&self) -> Vec<u32> {
        std::iter::once(self.radius)
            .chain(self.extra_radii.iter().copied())
            .collect()
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_new: default_max_new(),
            radius: default_radius(),
            extra_radii: default_extra_radii(),
            frontier_order: FrontierOrder::default(),
            progress_every: default_progress_every(),
        }
    }
}

/// Settings for the HTTP panorama lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_lookup_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: default_lookup_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Where to get the boundary polygon from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Local GeoJSON file; skips the portal entirely when set
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Base URL of the CKAN open-data portal
    #[serde(default = "default_portal_url")]
    pub portal_url: String,

    #[serde(default = "default_dataset_id")]
    pub dataset_id: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Never download; only use the cache
    #[serde(default)]
    pub offline: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BoundaryConfig {
    /// `{cache_dir}/{dataset_id}/boundary.geojson`
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(&self.dataset_id).join("boundary.geojson")
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            file: None,
            portal_url: default_portal_url(),
            dataset_id: default_dataset_id(),
            cache_dir: default_cache_dir(),
            offline: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("streetview.db")
}

fn default_max_new() -> usize {
    50
}

fn default_radius() -> u32 {
    50
}

fn default_extra_radii() -> Vec<u32> {
    vec![100, 200]
}

fn default_progress_every() -> usize {
    25
}

fn default_lookup_url() -> String {
    String::from("http://127.0.0.1:8765/")
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("panorama-crawler/{}", env!("CARGO_PKG_VERSION"))
}

// City of Toronto open data portal and its municipal boundary dataset.
fn default_portal_url() -> String {
    String::from("https://ckan0.cf.opendata.inter.prod-toronto.ca/")
}

fn default_dataset_id() -> String {
    String::from("841fb820-46d0-46ac-8dcb-d20f27e57bcc")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

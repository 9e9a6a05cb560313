// src/geometry/source.rs
// =============================================================================
// Where the boundary comes from.
//
// Order of preference:
// 1. An explicit --boundary file (GeoJSON)
// 2. A fresh download from a CKAN open-data portal, written to the cache
// 3. The cached copy from an earlier download
//
// CKAN is the catalogue software behind most municipal open-data portals.
// Its package_show action lists a dataset's resources; we pick the GeoJSON
// one and download it.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::boundary::Boundary;
use crate::config::BoundaryConfig;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("boundary contains no polygons")]
    Empty,

    #[error("download failed: {0}")]
    Download(String),

    #[error("dataset {0} has no GeoJSON resource")]
    NoGeoJsonResource(String),

    #[error("no cached boundary at {} and no download available", .0.display())]
    NotCached(PathBuf),
}

impl From<reqwest::Error> for BoundaryError {
    fn from(err: reqwest::Error) -> Self {
        BoundaryError::Download(err.to_string())
    }
}

impl From<url::ParseError> for BoundaryError {
    fn from(err: url::ParseError) -> Self {
        BoundaryError::Download(format!("bad portal URL: {}", err))
    }
}

/// Loads the boundary following the file → download → cache order.
pub async fn load_boundary(config: &BoundaryConfig) -> Result<Boundary, BoundaryError> {
    if let Some(file) = &config.file {
        info!(path = %file.display(), "loading boundary from file");
        return read_geojson_file(file);
    }

    let cache_path = config.cache_path();

    if !config.offline {
        info!(dataset = %config.dataset_id, portal = %config.portal_url, "downloading boundary dataset");
        match download_geojson(config).await {
            // Only a download that parses may replace the cache.
            Ok(text) => match Boundary::from_geojson_str(&text) {
                Ok(boundary) => {
                    match write_cache(&cache_path, &text) {
                        Ok(()) => info!(path = %cache_path.display(), "boundary cached"),
                        Err(e) => warn!(error = %e, "could not cache downloaded boundary"),
                    }
                    return Ok(boundary);
                }
                Err(e) => warn!(error = %e, "downloaded boundary is not usable, trying cache"),
            },
            Err(e) => warn!(error = %e, "boundary download failed, trying cache"),
        }
    }

    if cache_path.exists() {
        info!(path = %cache_path.display(), "loading boundary from cache");
        return read_geojson_file(&cache_path);
    }

    Err(BoundaryError::NotCached(cache_path))
}

/// Reads and parses a GeoJSON file from disk.
pub fn read_geojson_file(path: &Path) -> Result<Boundary, BoundaryError> {
    let text = std::fs::read_to_string(path).map_err(|source| BoundaryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Boundary::from_geojson_str(&text)
}

/// Writes the boundary as `boundary.geojson` inside `output_dir`.
pub fn save_boundary(boundary: &Boundary, output_dir: &Path) -> Result<PathBuf, BoundaryError> {
    let path = output_dir.join("boundary.geojson");
    let text = serde_json::to_string_pretty(&boundary.to_geojson())?;
    write_cache(&path, &text)?;
    Ok(path)
}

fn write_cache(path: &Path, text: &str) -> Result<(), BoundaryError> {
    let io_err = |source: std::io::Error| BoundaryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, text).map_err(io_err)
}

// Response shape of CKAN's package_show action (only the parts we read).
#[derive(Debug, Deserialize)]
struct PackageShow {
    success: bool,
    result: Option<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
struct Resource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    format: String,
    url: String,
}

async fn download_geojson(config: &BoundaryConfig) -> Result<String, BoundaryError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut package_url = Url::parse(&config.portal_url)?.join("api/3/action/package_show")?;
    package_url
        .query_pairs_mut()
        .append_pair("id", &config.dataset_id);

    let response = client.get(package_url).send().await?;
    if !response.status().is_success() {
        return Err(BoundaryError::Download(format!(
            "package_show returned HTTP {}",
            response.status()
        )));
    }
    let package: PackageShow = response.json().await?;

    let resources = match package.result {
        Some(result) if package.success => result.resources,
        _ => return Err(BoundaryError::Download("package_show was not successful".to_string())),
    };

    let resource = pick_geojson_resource(&resources)
        .ok_or_else(|| BoundaryError::NoGeoJsonResource(config.dataset_id.clone()))?;
    info!(resource = %resource.name, url = %resource.url, "fetching boundary resource");

    let response = client.get(&resource.url).send().await?;
    if !response.status().is_success() {
        return Err(BoundaryError::Download(format!(
            "resource download returned HTTP {}",
            response.status()
        )));
    }
    Ok(response.text().await?)
}

// Prefer the WGS84 (EPSG:4326) rendition when a dataset ships several.
fn pick_geojson_resource(resources: &[Resource]) -> Option<&Resource> {
    let geojson: Vec<&Resource> = resources
        .iter()
        .filter(|r| r.format.eq_ignore_ascii_case("geojson"))
        .collect();

    geojson
        .iter()
        .find(|r| {
            let name = r.name.to_lowercase();
            name.contains("4326") || name.contains("wgs84")
        })
        .or_else(|| geojson.first())
        .copied()
}

// src/lookup/record.rs
// =============================================================================
// The data a panorama lookup returns, and the slice of it we keep.
//
// PanoramaRecord mirrors the lookup service's JSON. Only id/lat/lon are
// required; everything else is optional because providers leave fields out
// freely (third-party uploads have no street names, old captures have no
// elevation, and so on).
//
// PanoramaMetadata is the projection we persist: every field is listed
// explicitly with its optionality, so the store schema and this struct can
// be read side by side.
// =============================================================================

use serde::{Deserialize, Serialize};

/// A panorama as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    /// Capture date as reported by the provider (e.g. "2023-08")
    pub date: Option<String>,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub elevation: Option<f64>,
    pub address: Option<String>,
    pub country_code: Option<String>,
    pub source: Option<String>,
    pub is_third_party: Option<bool>,
    pub copyright_message: Option<String>,
    pub permalink: Option<String>,
    #[serde(default)]
    pub street_names: Vec<String>,
    /// Panoramas adjacent to this one; this is what drives expansion
    #[serde(default)]
    pub neighbors: Vec<NeighborRecord>,
    /// Navigation arrows shown in the viewer; kept for metadata only
    #[serde(default)]
    pub links: Vec<PanoramaLink>,
}

impl PanoramaRecord {
    /// A record with only the required fields set.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        PanoramaRecord {
            id: id.into(),
            lat,
            lon,
            date: None,
            heading: None,
            pitch: None,
            roll: None,
            elevation: None,
            address: None,
            country_code: None,
            source: None,
            is_third_party: None,
            copyright_message: None,
            permalink: None,
            street_names: Vec::new(),
            neighbors: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_neighbors(mut self, neighbors: Vec<NeighborRecord>) -> Self {
        self.neighbors = neighbors;
        self
    }
}

/// A neighboring panorama: just enough to insert it into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub date: Option<String>,
}

impl NeighborRecord {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        NeighborRecord {
            id: id.into(),
            lat,
            lon,
            date: None,
        }
    }
}

/// A viewer navigation link to another panorama.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaLink {
    pub pano_id: String,
    /// Heading in degrees
    pub direction: Option<f64>,
}

/// Attributes persisted when a node's metadata is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanoramaMetadata {
    pub captured_on: Option<String>,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub elevation: Option<f64>,
    pub address: Option<String>,
    pub country_code: Option<String>,
    pub source: Option<String>,
    pub is_third_party: Option<bool>,
    pub copyright_message: Option<String>,
    pub permalink: Option<String>,
    pub street_names: Vec<String>,
    pub neighbor_count: usize,
    pub link_count: usize,
}

impl From<&PanoramaRecord> for PanoramaMetadata {
    fn from(record: &PanoramaRecord) -> Self {
        PanoramaMetadata {
            captured_on: record.date.clone(),
            heading: record.heading,
            pitch: record.pitch,
            roll: record.roll,
            elevation: record.elevation,
            address: record.address.as_deref().map(clean_address),
            country_code: record.country_code.clone(),
            source: record.source.clone(),
            is_third_party: record.is_third_party,
            copyright_message: record.copyright_message.clone(),
            permalink: record.permalink.clone(),
            street_names: record.street_names.clone(),
            neighbor_count: record.neighbors.len(),
            link_count: record.links.len(),
        }
    }
}

// Some providers return localized strings like "[en:'123 Queen St W']".
fn clean_address(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => {
            let inner = inner.split_once(':').map_or(inner, |(_, rest)| rest);
            inner.trim().trim_matches('\'').to_string()
        }
        None => trimmed.to_string(),
    }
}

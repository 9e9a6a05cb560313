// src/lookup/mod.rs
// =============================================================================
// This module is the crawler's window onto the panorama provider.
//
// Submodules:
// - record: PanoramaRecord (what a lookup returns) and PanoramaMetadata
//   (the typed projection we persist)
// - http: HttpPanoramaLookup, the reqwest-backed client
// - mock: an in-memory lookup used by tests
//
// The crawler only ever sees the PanoramaLookup trait, never the HTTP client.
// =============================================================================

mod http;
#[cfg(test)]
pub mod mock;
mod record;

use async_trait::async_trait;

use crate::error::LookupError;

pub use http::HttpPanoramaLookup;
pub use record::{NeighborRecord, PanoramaLink, PanoramaMetadata, PanoramaRecord};

/// Finds panoramas by coordinate or by identifier.
#[async_trait]
pub trait PanoramaLookup: Send + Sync {
    /// Nearest panorama within `radius` meters of (lat, lon), if any.
    async fn find(&self, lat: f64, lon: f64, radius: u32)
        -> Result<Option<PanoramaRecord>, LookupError>;

    /// The panorama with this id, if the provider still knows it.
    async fn find_by_id(&self, id: &str) -> Result<Option<PanoramaRecord>, LookupError>;
}

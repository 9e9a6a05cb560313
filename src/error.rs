// src/error.rs
// =============================================================================
// Error types shared across the crawler.
//
// There are two layers of errors:
// - CrawlError: fatal for a run (boundary missing, no seed, storage failure)
// - LookupError: a single lookup failed; the driver records it in the skip
//   set and moves on
//
// main.rs still uses anyhow::Result for the application layer, like before.
// These typed enums live at the seams where callers need to tell errors apart.
// =============================================================================

use thiserror::Error;

pub use crate::geometry::BoundaryError;

/// Errors that end a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("boundary unavailable: {0}")]
    BoundaryUnavailable(#[from] BoundaryError),

    #[error("could not compute a centerpoint for the boundary")]
    NoCenterpoint,

    #[error("no starting panorama found near {lat:.6}, {lon:.6} (radii tried: {radii:?})")]
    NoSeed { lat: f64, lon: f64, radii: Vec<u32> },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
}

impl CrawlError {
    /// Fatal setup errors map to exit code 1 in main.rs.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            CrawlError::BoundaryUnavailable(_) | CrawlError::NoCenterpoint | CrawlError::NoSeed { .. }
        )
    }
}

/// Errors from the panorama lookup service.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("lookup service returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not parse lookup response: {0}")]
    Parse(String),

    #[error("invalid lookup URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Parse(err.to_string())
        } else {
            LookupError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failures_are_flagged() {
        assert!(CrawlError::NoCenterpoint.is_setup_failure());
        assert!(CrawlError::NoSeed { lat: 0.0, lon: 0.0, radii: vec![50] }.is_setup_failure());
        assert!(!CrawlError::Storage(rusqlite::Error::InvalidQuery).is_setup_failure());
    }

    #[test]
    fn test_no_seed_message_lists_radii() {
        let err = CrawlError::NoSeed { lat: 43.7, lon: -79.4, radii: vec![50, 100] };
        assert_eq!(
            err.to_string(),
            "no starting panorama found near 43.700000, -79.400000 (radii tried: [50, 100])"
        );
    }
}

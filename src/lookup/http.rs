// src/lookup/http.rs
// =============================================================================
// This module talks to the panorama metadata service over HTTP.
//
// Endpoints (JSON in, JSON out):
// - GET {base}/panoramas/nearest?lat=..&lon=..&radius=..
// - GET {base}/panoramas/{id}
//
// Status handling:
// - 200: the body is a PanoramaRecord
// - 404: no panorama there (Ok(None), not an error)
// - anything else: LookupError::Status
//
// The crawler never retries a failed lookup inside one run, so this client
// stays simple: one request, one answer, a timeout on the client.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::record::PanoramaRecord;
use super::PanoramaLookup;
use crate::config::LookupConfig;
use crate::error::LookupError;

/// Lookup client backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpPanoramaLookup {
    client: Client,
    base: Url,
}

impl HttpPanoramaLookup {
    // Builds the client from config
    //
    // Parameters:
    //   config: base URL, timeout and user agent
    //
    // Returns: the client, or an error if the base URL can't take paths
    //   (e.g. "mailto:someone")
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let base = Url::parse(&config.base_url)?;
        if base.cannot_be_a_base() {
            return Err(LookupError::Parse(format!(
                "lookup base URL cannot have paths: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(HttpPanoramaLookup { client, base })
    }

    // Example:
    //   base = "http://localhost:8765/api"
    //   -> "http://localhost:8765/api/panoramas/nearest?lat=43.7&lon=-79.4&radius=50"
    fn nearest_url(&self, lat: f64, lon: f64, radius: u32) -> Result<Url, LookupError> {
        let mut url = self.endpoint(&["panoramas", "nearest"])?;
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            .append_pair("radius", &radius.to_string());
        Ok(url)
    }

    // Panorama ids are opaque, so they go in as a single encoded path segment
    fn by_id_url(&self, id: &str) -> Result<Url, LookupError> {
        self.endpoint(&["panoramas", id])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, LookupError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::Parse(format!("lookup base URL cannot have paths: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // Fetches one record
    //
    // Returns:
    //   Ok(Some(record)) on 200
    //   Ok(None) on 404
    //   Err(...) for network trouble, other statuses or bad JSON
    async fn fetch_record(&self, url: Url) -> Result<Option<PanoramaRecord>, LookupError> {
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            status => Err(LookupError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PanoramaLookup for HttpPanoramaLookup {
    async fn find(
        &self,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<Option<PanoramaRecord>, LookupError> {
        let url = self.nearest_url(lat, lon, radius)?;
        self.fetch_record(url).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PanoramaRecord>, LookupError> {
        let url = self.by_id_url(id)?;
        self.fetch_record(url).await
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Result<Option<T>, E>?
//    - Two different "nothing" cases need to stay apart
//    - Ok(None) = the service answered: there is no panorama
//    - Err(e) = we couldn't get an answer at all
//    - The crawler treats both as "skip this node for now", but logs them
//      differently
//
// 2. What is #[async_trait]?
//    - Traits with async methods can't be used as trait objects (dyn Trait)
//      on their own
//    - The async-trait crate rewrites them to return boxed futures
//    - That lets the crawler hold a &dyn PanoramaLookup and swap in a
//      mock during tests
//
// 3. What does path_segments_mut() do?
//    - Lets us append path pieces to a URL
//    - Each piece is percent-encoded for us, so an id like "a/b" can't
//      escape its segment
//    - pop_if_empty() removes the empty segment a trailing slash leaves
// -----------------------------------------------------------------------------

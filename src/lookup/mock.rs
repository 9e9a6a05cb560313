// In-memory PanoramaLookup for tests.
//
// Builder style:
//   MockLookup::new()
//       .with_seed(50, record)      // find() answers at this radius
//       .with_panorama(record)      // find_by_id() answers for record.id
//       .failing("x")               // find_by_id("x") returns an error
//
// Unregistered ids and radii answer Ok(None). Every call is recorded so
// tests can assert on what the crawler asked for.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{PanoramaLookup, PanoramaRecord};
use crate::error::LookupError;

#[derive(Debug, Default)]
pub struct MockLookup {
    seeds: HashMap<u32, PanoramaRecord>,
    panoramas: HashMap<String, PanoramaRecord>,
    failing: HashSet<String>,
    find_calls: Mutex<Vec<u32>>,
    by_id_calls: Mutex<Vec<String>>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, radius: u32, record: PanoramaRecord) -> Self {
        self.seeds.insert(radius, record);
        self
    }

    pub fn with_panorama(mut self, record: PanoramaRecord) -> Self {
        self.panoramas.insert(record.id.clone(), record);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Radii passed to find(), in call order.
    pub fn find_calls(&self) -> Vec<u32> {
        self.find_calls.lock().unwrap().clone()
    }

    /// Ids passed to find_by_id(), in call order.
    pub fn by_id_calls(&self) -> Vec<String> {
        self.by_id_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PanoramaLookup for MockLookup {
    async fn find(
        &self,
        _lat: f64,
        _lon: f64,
        radius: u32,
    ) -> Result<Option<PanoramaRecord>, LookupError> {
        self.find_calls.lock().unwrap().push(radius);
        Ok(self.seeds.get(&radius).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PanoramaRecord>, LookupError> {
        self.by_id_calls.lock().unwrap().push(id.to_string());
        if self.failing.contains(id) {
            return Err(LookupError::Network(format!("connection reset while fetching {id}")));
        }
        Ok(self.panoramas.get(id).cloned())
    }
}

// src/crawl/report.rs
// =============================================================================
// Progress reporting for a crawl.
//
// The driver never logs directly. It emits CrawlEvents to a CrawlReporter,
// which decides what to do with them:
// - TracingReporter turns them into tracing log lines (the CLI default)
// - RecordingReporter (tests only) keeps them in a Vec for assertions
// =============================================================================

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::driver::{CrawlState, CrawlSummary};
use crate::store::BoundaryStatus;

/// Which step of an iteration gave up on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Boundary,
    Metadata,
    Expansion,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipStage::Boundary => "boundary",
            SkipStage::Metadata => "metadata",
            SkipStage::Expansion => "expansion",
        };
        f.write_str(name)
    }
}

/// Something that happened during a crawl.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    StateChanged { state: CrawlState },
    SearchingSeed { lat: f64, lon: f64, radius: u32 },
    SeedLookupFailed { radius: u32, error: String },
    Seeded { id: String, within_boundary: BoundaryStatus },
    /// The store already had nodes, so seeding was skipped
    Resumed { nodes: u64 },
    BoundaryChecked { id: String, within_boundary: BoundaryStatus },
    MetadataPopulated { id: String },
    Expanded { id: String, neighbors: usize, new_nodes: usize },
    Skipped { id: String, stage: SkipStage, reason: String },
    Progress { processed: usize, max_new: usize },
    FrontierExhausted,
    Finished { summary: CrawlSummary },
}

/// Receives crawl events as they happen.
pub trait CrawlReporter {
    fn on_event(&mut self, event: &CrawlEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl CrawlReporter for TracingReporter {
    fn on_event(&mut self, event: &CrawlEvent) {
        match event {
            CrawlEvent::StateChanged { state } => debug!(?state, "crawl state changed"),
            CrawlEvent::SearchingSeed { lat, lon, radius } => {
                info!(lat, lon, radius, "searching for seed panorama")
            }
            CrawlEvent::SeedLookupFailed { radius, error } => {
                warn!(radius, %error, "seed lookup failed")
            }
            CrawlEvent::Seeded { id, within_boundary } => {
                info!(panorama_id = %id, ?within_boundary, "seeded crawl")
            }
            CrawlEvent::Resumed { nodes } => info!(nodes, "resuming existing crawl"),
            CrawlEvent::BoundaryChecked { id, within_boundary } => {
                debug!(panorama_id = %id, ?within_boundary, "checked boundary")
            }
            CrawlEvent::MetadataPopulated { id } => debug!(panorama_id = %id, "populated metadata"),
            CrawlEvent::Expanded { id, neighbors, new_nodes } => {
                debug!(panorama_id = %id, neighbors, new_nodes, "expanded neighbors")
            }
            CrawlEvent::Skipped { id, stage, reason } => {
                warn!(panorama_id = %id, %stage, %reason, "skipping node for this run")
            }
            CrawlEvent::Progress { processed, max_new } => {
                info!(processed, max_new, "crawl progress")
            }
            CrawlEvent::FrontierExhausted => info!("no more nodes to process"),
            CrawlEvent::Finished { summary } => info!(
                processed = summary.processed,
                skipped = summary.skipped,
                new_nodes = summary.new_nodes,
                total = summary.stats.total,
                "crawl finished"
            ),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<CrawlEvent>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn states(&self) -> Vec<CrawlState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CrawlEvent::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_ids(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CrawlEvent::Skipped { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl CrawlReporter for RecordingReporter {
    fn on_event(&mut self, event: &CrawlEvent) {
        self.events.push(event.clone());
    }
}

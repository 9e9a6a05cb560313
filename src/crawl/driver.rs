// src/crawl/driver.rs
// =============================================================================
// The crawl loop.
//
// A run moves through three states:
//
//   SEEDING    if the store is empty, find a first panorama near the
//              boundary's centerpoint (trying each search radius in turn)
//   ITERATING  repeatedly take the next frontier node and finish it:
//              1. decide within_boundary if it's still unknown
//              2. fetch metadata if it's missing
//              3. expand neighbors if that hasn't happened yet
//   DONE       the budget is spent or the frontier is empty
//
// A node that fails at any step goes into the skip set and the loop moves
// on. The skip set only lives for one run, so the next run retries it.
//
// Everything the driver writes is committed before the next step starts.
// Killing the process at any point loses at most the step in flight.
// =============================================================================

use serde::Serialize;

use super::expand::expand_node;
use super::frontier::{FrontierSelector, SkipSet};
use super::report::{CrawlEvent, CrawlReporter, SkipStage};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::geometry::BoundaryGate;
use crate::lookup::{PanoramaLookup, PanoramaRecord};
use crate::store::{BoundaryStatus, Node, NodeStore, StoreStats};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Seeding,
    Iterating,
    Done,
}

/// What one run did, plus the store totals afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    /// True when this run created the seed node
    pub seeded: bool,
    /// Nodes that finished an iteration without being skipped
    pub processed: usize,
    pub skipped: usize,
    /// Rows created this run, the seed included
    pub new_nodes: usize,
    /// True when the run stopped because nothing was left to do
    pub frontier_exhausted: bool,
    pub stats: StoreStats,
}

// Result of one iteration
enum Step {
    Processed,
    Skipped,
}

/// Drives one crawl run over a store.
pub struct Crawler<'a> {
    store: &'a mut NodeStore,
    gate: &'a BoundaryGate,
    lookup: &'a dyn PanoramaLookup,
    config: &'a CrawlConfig,
    selector: FrontierSelector,
    skipped: SkipSet,
    state: CrawlState,
    new_nodes: usize,
}

impl<'a> Crawler<'a> {
    pub fn new(
        store: &'a mut NodeStore,
        gate: &'a BoundaryGate,
        lookup: &'a dyn PanoramaLookup,
        config: &'a CrawlConfig,
    ) -> Self {
        Crawler {
            store,
            gate,
            lookup,
            config,
            selector: FrontierSelector::new(config.frontier_order),
            skipped: SkipSet::default(),
            state: CrawlState::Seeding,
            new_nodes: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CrawlState {
        self.state
    }

    /// Nodes abandoned during the last run.
    #[cfg(test)]
    pub(crate) fn skipped(&self) -> &SkipSet {
        &self.skipped
    }

    // Runs SEEDING -> ITERATING -> DONE once.
    //
    // Returns: the run summary, or an error when no seed can be found or
    // the store fails. Lookup failures never end a run; they only skip nodes.
    pub async fn run(&mut self, reporter: &mut dyn CrawlReporter) -> Result<CrawlSummary, CrawlError> {
        self.skipped.clear();
        self.new_nodes = 0;

        self.transition(CrawlState::Seeding, reporter);
        let seeded = self.seed_if_empty(reporter).await?;

        self.transition(CrawlState::Iterating, reporter);
        let mut processed = 0;
        let mut frontier_exhausted = false;

        while processed < self.config.max_new {
            let Some(node) = self.selector.next(self.store, &self.skipped)? else {
                frontier_exhausted = true;
                reporter.on_event(&CrawlEvent::FrontierExhausted);
                break;
            };
            debug_assert!(node.needs_work(), "frontier returned finished node {}", node.id);

            if let Step::Processed = self.process(node, reporter).await? {
                processed += 1;
                let every = self.config.progress_every;
                if every > 0 && processed % every == 0 {
                    reporter.on_event(&CrawlEvent::Progress {
                        processed,
                        max_new: self.config.max_new,
                    });
                }
            }
        }

        self.transition(CrawlState::Done, reporter);

        let summary = CrawlSummary {
            seeded,
            processed,
            skipped: self.skipped.len(),
            new_nodes: self.new_nodes,
            frontier_exhausted,
            stats: self.store.stats()?,
        };
        reporter.on_event(&CrawlEvent::Finished { summary: summary.clone() });
        Ok(summary)
    }

    // Returns: true if a seed was inserted, false if the store already had
    // nodes (a resumed crawl never re-seeds)
    async fn seed_if_empty(&mut self, reporter: &mut dyn CrawlReporter) -> Result<bool, CrawlError> {
        let existing = self.store.count()?;
        if existing > 0 {
            reporter.on_event(&CrawlEvent::Resumed { nodes: existing });
            return Ok(false);
        }

        let center = self.gate.centerpoint().ok_or(CrawlError::NoCenterpoint)?;
        let radii = self.config.search_radii();

        for &radius in &radii {
            reporter.on_event(&CrawlEvent::SearchingSeed {
                lat: center.lat,
                lon: center.lon,
                radius,
            });

            match self.lookup.find(center.lat, center.lon, radius).await {
                Ok(Some(record)) => {
                    let within = BoundaryStatus::from(self.gate.contains(record.lat, record.lon));
                    if self.store.insert_if_absent(&record.id, record.lat, record.lon, within)? {
                        self.new_nodes += 1;
                    }
                    reporter.on_event(&CrawlEvent::Seeded {
                        id: record.id,
                        within_boundary: within,
                    });
                    return Ok(true);
                }
                Ok(None) => {}
                Err(e) => reporter.on_event(&CrawlEvent::SeedLookupFailed {
                    radius,
                    error: e.to_string(),
                }),
            }
        }

        Err(CrawlError::NoSeed {
            lat: center.lat,
            lon: center.lon,
            radii,
        })
    }

    async fn process(&mut self, node: Node, reporter: &mut dyn CrawlReporter) -> Result<Step, CrawlError> {
        let id = node.id;

        // 1. Boundary, decided just in time for nodes inserted without one
        let mut within = node.within_boundary;
        if within == BoundaryStatus::Unknown {
            within = BoundaryStatus::from(self.gate.contains(node.lat, node.lon));
            if within == BoundaryStatus::Unknown {
                self.skip(&id, SkipStage::Boundary, "containment is indeterminate", reporter);
                return Ok(Step::Skipped);
            }
            self.store.set_boundary(&id, within)?;
            reporter.on_event(&CrawlEvent::BoundaryChecked {
                id: id.clone(),
                within_boundary: within,
            });
        }
        if within == BoundaryStatus::Outside {
            self.skip(&id, SkipStage::Boundary, "outside boundary", reporter);
            return Ok(Step::Skipped);
        }

        // 2. Metadata; the record is reused for expansion below
        let mut fetched: Option<PanoramaRecord> = None;
        if !node.metadata_populated {
            let Some(record) = self.fetch(&id, SkipStage::Metadata, reporter).await else {
                return Ok(Step::Skipped);
            };
            self.store.record_metadata(&id, &record)?;
            reporter.on_event(&CrawlEvent::MetadataPopulated { id: id.clone() });
            fetched = Some(record);
        }

        // 3. Expansion
        if !node.neighbors_expanded {
            let record = match fetched {
                Some(record) => record,
                None => match self.fetch(&id, SkipStage::Expansion, reporter).await {
                    Some(record) => record,
                    None => return Ok(Step::Skipped),
                },
            };
            let created = expand_node(self.store, self.gate, &id, &record.neighbors)?;
            self.new_nodes += created;
            reporter.on_event(&CrawlEvent::Expanded {
                id,
                neighbors: record.neighbors.len(),
                new_nodes: created,
            });
        }

        Ok(Step::Processed)
    }

    // Looks a node up by id, skipping it when the lookup errors or the
    // provider no longer knows it.
    async fn fetch(
        &mut self,
        id: &str,
        stage: SkipStage,
        reporter: &mut dyn CrawlReporter,
    ) -> Option<PanoramaRecord> {
        match self.lookup.find_by_id(id).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                self.skip(id, stage, "panorama not found", reporter);
                None
            }
            Err(e) => {
                self.skip(id, stage, &e.to_string(), reporter);
                None
            }
        }
    }

    fn skip(&mut self, id: &str, stage: SkipStage, reason: &str, reporter: &mut dyn CrawlReporter) {
        self.skipped.insert(id);
        reporter.on_event(&CrawlEvent::Skipped {
            id: id.to_string(),
            stage,
            reason: reason.to_string(),
        });
    }

    fn transition(&mut self, state: CrawlState, reporter: &mut dyn CrawlReporter) {
        self.state = state;
        reporter.on_event(&CrawlEvent::StateChanged { state });
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does Crawler borrow everything instead of owning it?
//    - main.rs owns the store, gate and lookup and may use them after the run
//      (e.g. to print stats)
//    - The lifetime 'a says: the Crawler can't outlive any of them
//
// 2. What is `let Some(x) = ... else { ... };`?
//    - "let-else": bind x if the pattern matches, otherwise run the block
//    - The block must leave the function or loop (return, break, continue)
//
// 3. Why &dyn PanoramaLookup?
//    - The driver works with any lookup: the HTTP client in production,
//      MockLookup in tests
// -----------------------------------------------------------------------------

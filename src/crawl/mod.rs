// src/crawl/mod.rs
// =============================================================================
// This module handles the boundary-restricted crawl.
//
// Features:
// - Seeds an empty store from the boundary's centerpoint
// - Walks the panorama neighbor graph, never expanding outside the boundary
// - Resumes where the last run stopped (all progress lives in the store)
// - Per-run skip set so one bad node can't stall a run
//
// Submodules:
// - frontier: which node to work on next
// - expand: neighbor insertion with boundary classification
// - driver: the SEEDING -> ITERATING -> DONE loop
// - report: events emitted along the way
// =============================================================================

mod driver;
mod expand;
mod frontier;
mod report;

pub use driver::{CrawlSummary, Crawler};
pub use frontier::FrontierOrder;
pub use report::TracingReporter;

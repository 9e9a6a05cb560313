// src/crawl/frontier.rs
// =============================================================================
// Picks the next node to work on.
//
// A node is on the frontier while it still has work left:
// - its boundary status is unknown, or
// - it is inside the boundary and is missing metadata or expansion
//
// Outside nodes are never on the frontier. They stay in the store only so
// we don't rediscover them over and over.
//
// The order in which frontier nodes come out is a strategy (FrontierOrder).
// Nodes the current run gave up on live in the SkipSet and are excluded in
// the query itself, so SQLite stops at the first eligible row.
// =============================================================================

use std::collections::HashSet;

use clap::ValueEnum;
use rusqlite::{params_from_iter, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::store::{Node, NodeStore, NODE_COLUMNS};

const FRONTIER_FILTER: &str = "within_boundary IS NULL
    OR (within_boundary = 1
        AND (COALESCE(metadata_populated, 0) = 0 OR COALESCE(neighbors_expanded, 0) = 0))";

/// Order in which frontier nodes are handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FrontierOrder {
    /// Newest nodes first (created, then updated); crawls outward depth-first
    #[default]
    RecentFirst,
    /// Inside-boundary nodes first, then oldest first; crawls breadth-first
    BoundaryPriority,
}

impl FrontierOrder {
    fn order_by(self) -> &'static str {
        match self {
            FrontierOrder::RecentFirst => "created_at DESC, updated_at DESC, rowid DESC",
            FrontierOrder::BoundaryPriority => "within_boundary DESC, created_at ASC, rowid ASC",
        }
    }
}

/// Ids abandoned for the current run. Never persisted.
#[derive(Debug, Default, Clone)]
pub struct SkipSet {
    ids: HashSet<String>,
}

impl SkipSet {
    /// Returns false when the id was already skipped.
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Hands out one frontier node at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontierSelector {
    order: FrontierOrder,
}

impl FrontierSelector {
    pub fn new(order: FrontierOrder) -> Self {
        FrontierSelector { order }
    }

    // Returns: the first frontier node (in strategy order) that isn't in
    // the skip set, or None when the frontier is exhausted for this run
    pub fn next(&self, store: &NodeStore, skipped: &SkipSet) -> rusqlite::Result<Option<Node>> {
        let mut sql = format!("SELECT {NODE_COLUMNS} FROM panoramas WHERE ({FRONTIER_FILTER})");
        if !skipped.is_empty() {
            let placeholders = vec!["?"; skipped.len()].join(", ");
            sql.push_str(&format!(" AND id NOT IN ({placeholders})"));
        }
        sql.push_str(&format!(" ORDER BY {} LIMIT 1", self.order.order_by()));

        store
            .connection()
            .query_row(&sql, params_from_iter(skipped.iter()), Node::from_row)
            .optional()
    }
}

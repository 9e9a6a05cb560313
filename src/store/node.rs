// src/store/node.rs
// =============================================================================
// Row types for the panoramas table.
//
// within_boundary is tri-state in SQL (NULL / 1 / 0). BoundaryStatus gives
// it a name on the Rust side so nobody has to remember what NULL means.
// =============================================================================

use rusqlite::Row;
use serde::Serialize;

/// Columns in the order Node::from_row expects them.
pub const NODE_COLUMNS: &str =
    "id, lat, lon, within_boundary, metadata_populated, neighbors_expanded, created_at, updated_at";

/// Whether a node lies inside the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStatus {
    /// Not evaluated yet (NULL)
    Unknown,
    /// Inside (1)
    Inside,
    /// Outside (0)
    Outside,
}

impl BoundaryStatus {
    pub fn from_column(value: Option<i64>) -> Self {
        match value {
            None => BoundaryStatus::Unknown,
            Some(0) => BoundaryStatus::Outside,
            Some(_) => BoundaryStatus::Inside,
        }
    }

    pub fn to_column(self) -> Option<i64> {
        match self {
            BoundaryStatus::Unknown => None,
            BoundaryStatus::Inside => Some(1),
            BoundaryStatus::Outside => Some(0),
        }
    }
}

impl From<Option<bool>> for BoundaryStatus {
    fn from(containment: Option<bool>) -> Self {
        match containment {
            Some(true) => BoundaryStatus::Inside,
            Some(false) => BoundaryStatus::Outside,
            None => BoundaryStatus::Unknown,
        }
    }
}

/// One discovered panorama location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub within_boundary: BoundaryStatus,
    pub metadata_populated: bool,
    pub neighbors_expanded: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Node {
    // Legacy rows may carry NULL coordinates or timestamps. NaN coordinates
    // make the boundary gate answer "indeterminate" instead of guessing.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Node {
            id: row.get(0)?,
            lat: row.get::<_, Option<f64>>(1)?.unwrap_or(f64::NAN),
            lon: row.get::<_, Option<f64>>(2)?.unwrap_or(f64::NAN),
            within_boundary: BoundaryStatus::from_column(row.get(3)?),
            metadata_populated: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
            neighbors_expanded: row.get::<_, Option<i64>>(5)?.unwrap_or(0) != 0,
            created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            updated_at: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        })
    }

    /// True while the node is still part of the frontier.
    pub fn needs_work(&self) -> bool {
        match self.within_boundary {
            BoundaryStatus::Unknown => true,
            BoundaryStatus::Inside => !self.metadata_populated || !self.neighbors_expanded,
            BoundaryStatus::Outside => false,
        }
    }
}

/// A node about to be inserted by the expansion step.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredNode {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub within_boundary: BoundaryStatus,
}

/// Counts over the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: u64,
    pub metadata_populated: u64,
    pub within_boundary: u64,
    pub outside_boundary: u64,
    pub unchecked: u64,
    pub neighbors_expanded: u64,
}

impl StoreStats {
    /// `count` as a percentage of the total (0 for an empty store).
    pub fn percent(&self, count: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_status_columns() {
        for status in [BoundaryStatus::Unknown, BoundaryStatus::Inside, BoundaryStatus::Outside] {
            assert_eq!(BoundaryStatus::from_column(status.to_column()), status);
        }
        assert_eq!(BoundaryStatus::from(None), BoundaryStatus::Unknown);
        assert_eq!(BoundaryStatus::from(Some(false)), BoundaryStatus::Outside);
    }

    #[test]
    fn test_needs_work() {
        let mut node = Node {
            id: "a".into(),
            lat: 0.5,
            lon: 0.5,
            within_boundary: BoundaryStatus::Unknown,
            metadata_populated: false,
            neighbors_expanded: false,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(node.needs_work());

        node.within_boundary = BoundaryStatus::Outside;
        assert!(!node.needs_work());

        node.within_boundary = BoundaryStatus::Inside;
        node.metadata_populated = true;
        assert!(node.needs_work());

        node.neighbors_expanded = true;
        assert!(!node.needs_work());
    }

    #[test]
    fn test_percent() {
        let stats = StoreStats { total: 8, within_boundary: 2, ..StoreStats::default() };
        assert_eq!(stats.percent(stats.within_boundary), 25.0);
        assert_eq!(StoreStats::default().percent(0), 0.0);
    }
}

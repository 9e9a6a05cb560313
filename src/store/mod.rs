// src/store/mod.rs
// =============================================================================
// This module is the node store: one SQLite table of discovered panoramas.
//
// Every method that changes state commits before returning. A crash between
// two calls leaves the database consistent, and the next run picks up where
// this one stopped.
//
// Submodules:
// - node: row types (Node, BoundaryStatus, StoreStats)
// - schema: versioned migrations run once when the store is opened
// =============================================================================

mod node;
mod schema;

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::CrawlError;
use crate::lookup::{PanoramaMetadata, PanoramaRecord};

pub use node::{BoundaryStatus, DiscoveredNode, Node, StoreStats, NODE_COLUMNS};

/// SQLite-backed store of panorama nodes.
#[derive(Debug)]
pub struct NodeStore {
    conn: Connection,
    degraded: bool,
}

impl NodeStore {
    /// Opens (or creates) the database file and migrates it.
    pub fn open(path: &Path) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!(error = %e, "could not enable WAL journal mode");
        }
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, CrawlError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, CrawlError> {
        let degraded = schema::initialize(&mut conn)?;
        Ok(NodeStore { conn, degraded })
    }

    /// True when migrations failed and only the bare panoramas table exists.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count(&self) -> rusqlite::Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM panoramas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn get(&self, id: &str) -> rusqlite::Result<Option<Node>> {
        self.conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM panoramas WHERE id = ?1"),
                [id],
                Node::from_row,
            )
            .optional()
    }

    /// Inserts a fresh node unless the id is already known.
    ///
    /// Returns `true` when a row was created.
    pub fn insert_if_absent(
        &self,
        id: &str,
        lat: f64,
        lon: f64,
        within: BoundaryStatus,
    ) -> rusqlite::Result<bool> {
        let now = timestamp();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO panoramas
                 (id, lat, lon, metadata_populated, within_boundary, neighbors_expanded, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, 0, ?5, ?5)",
            params![id, lat, lon, within.to_column(), now],
        )?;
        Ok(inserted == 1)
    }

    pub fn set_boundary(&self, id: &str, within: BoundaryStatus) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE panoramas SET within_boundary = ?1, updated_at = ?2 WHERE id = ?3",
            params![within.to_column(), timestamp(), id],
        )?;
        Ok(())
    }

    /// Refreshes coordinates, stores the metadata projection and sets
    /// `metadata_populated`, all in one transaction.
    pub fn record_metadata(&mut self, id: &str, record: &PanoramaRecord) -> rusqlite::Result<()> {
        let now = timestamp();
        let metadata = PanoramaMetadata::from(record);
        let street_names = serde_json::to_string(&metadata.street_names)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE panoramas
             SET lat = ?1, lon = ?2, metadata_populated = 1, updated_at = ?3
             WHERE id = ?4",
            params![record.lat, record.lon, now, id],
        )?;

        if !self.degraded {
            tx.execute(
                "INSERT OR REPLACE INTO panorama_metadata
                     (id, captured_on, heading, pitch, roll, elevation, address, country_code,
                      source, is_third_party, copyright_message, permalink, street_names,
                      neighbor_count, link_count, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    id,
                    metadata.captured_on,
                    metadata.heading,
                    metadata.pitch,
                    metadata.roll,
                    metadata.elevation,
                    metadata.address,
                    metadata.country_code,
                    metadata.source,
                    metadata.is_third_party,
                    metadata.copyright_message,
                    metadata.permalink,
                    street_names,
                    metadata.neighbor_count as i64,
                    metadata.link_count as i64,
                    now,
                ],
            )?;
        }

        tx.commit()
    }

    /// Inserts discovered neighbors (if absent) and marks the source as
    /// expanded, in one transaction.
    ///
    /// The source is only marked when it is inside the boundary. Returns the
    /// number of rows created.
    pub fn expand(&mut self, source_id: &str, discovered: &[DiscoveredNode]) -> rusqlite::Result<usize> {
        let now = timestamp();
        let tx = self.conn.transaction()?;

        let mut created = 0;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR IGNORE INTO panoramas
                     (id, lat, lon, metadata_populated, within_boundary, neighbors_expanded, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, 0, ?5, ?5)",
            )?;
            for node in discovered {
                created += insert.execute(params![
                    node.id,
                    node.lat,
                    node.lon,
                    node.within_boundary.to_column(),
                    now
                ])?;
            }
        }

        tx.execute(
            "UPDATE panoramas SET neighbors_expanded = 1, updated_at = ?1
             WHERE id = ?2 AND within_boundary = 1",
            params![now, source_id],
        )?;
        tx.commit()?;

        Ok(created)
    }

    pub fn stats(&self) -> rusqlite::Result<StoreStats> {
        self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(metadata_populated = 1), 0),
                    COALESCE(SUM(within_boundary = 1), 0),
                    COALESCE(SUM(within_boundary = 0), 0),
                    COALESCE(SUM(within_boundary IS NULL), 0),
                    COALESCE(SUM(neighbors_expanded = 1), 0)
             FROM panoramas",
            [],
            |row| {
                Ok(StoreStats {
                    total: row.get::<_, i64>(0)? as u64,
                    metadata_populated: row.get::<_, i64>(1)? as u64,
                    within_boundary: row.get::<_, i64>(2)? as u64,
                    outside_boundary: row.get::<_, i64>(3)? as u64,
                    unchecked: row.get::<_, i64>(4)? as u64,
                    neighbors_expanded: row.get::<_, i64>(5)? as u64,
                })
            },
        )
    }
}

// RFC 3339 with microseconds so timestamps sort as text.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does INSERT OR IGNORE do?
//    - Tries to insert a row
//    - If the primary key (id) already exists, silently does nothing
//    - execute() returns how many rows changed: 1 = new, 0 = already known
//    - That's how the expansion step counts genuinely new neighbors
//
// 2. Why does record_metadata take &mut self?
//    - Connection::transaction() needs exclusive access to the connection
//    - The borrow checker then guarantees nobody else uses the connection
//      while the transaction is open
//
// 3. What is .optional()?
//    - query_row() returns an error when no row matches
//    - OptionalExtension::optional() turns that one error into Ok(None)
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::NeighborRecord;

    fn discovered(id: &str, within: BoundaryStatus) -> DiscoveredNode {
        DiscoveredNode {
            id: id.to_string(),
            lat: 0.5,
            lon: 0.5,
            within_boundary: within,
        }
    }

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let store = NodeStore::open_in_memory().unwrap();
        assert!(store.insert_if_absent("a", 0.5, 0.5, BoundaryStatus::Inside).unwrap());
        assert!(!store.insert_if_absent("a", 9.0, 9.0, BoundaryStatus::Outside).unwrap());

        assert_eq!(store.count().unwrap(), 1);
        let node = store.get("a").unwrap().unwrap();
        assert_eq!(node.lat, 0.5);
        assert_eq!(node.within_boundary, BoundaryStatus::Inside);
        assert!(!node.metadata_populated);
        assert!(!node.neighbors_expanded);
        assert!(!node.created_at.is_empty());
    }

    #[test]
    fn test_get_missing_node() {
        let store = NodeStore::open_in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_boundary() {
        let store = NodeStore::open_in_memory().unwrap();
        store.insert_if_absent("a", 0.5, 0.5, BoundaryStatus::Unknown).unwrap();
        store.set_boundary("a", BoundaryStatus::Outside).unwrap();
        assert_eq!(
            store.get("a").unwrap().unwrap().within_boundary,
            BoundaryStatus::Outside
        );
    }

    #[test]
    fn test_record_metadata_refreshes_coordinates() {
        let mut store = NodeStore::open_in_memory().unwrap();
        store.insert_if_absent("a", 0.5, 0.5, BoundaryStatus::Inside).unwrap();

        let mut record = PanoramaRecord::new("a", 0.51, 0.49)
            .with_neighbors(vec![NeighborRecord::new("b", 0.6, 0.6)]);
        record.street_names = vec!["Queen St W".to_string()];
        store.record_metadata("a", &record).unwrap();

        let node = store.get("a").unwrap().unwrap();
        assert!(node.metadata_populated);
        assert_eq!((node.lat, node.lon), (0.51, 0.49));

        let (names, neighbors): (String, i64) = store
            .connection()
            .query_row(
                "SELECT street_names, neighbor_count FROM panorama_metadata WHERE id = 'a'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(names, r#"["Queen St W"]"#);
        assert_eq!(neighbors, 1);
    }

    #[test]
    fn test_expand_counts_only_new_rows() {
        let mut store = NodeStore::open_in_memory().unwrap();
        store.insert_if_absent("src", 0.5, 0.5, BoundaryStatus::Inside).unwrap();
        store.insert_if_absent("known", 0.5, 0.5, BoundaryStatus::Inside).unwrap();

        let created = store
            .expand(
                "src",
                &[
                    discovered("known", BoundaryStatus::Inside),
                    discovered("new", BoundaryStatus::Outside),
                    discovered("new", BoundaryStatus::Outside),
                    discovered("src", BoundaryStatus::Inside),
                ],
            )
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.get("src").unwrap().unwrap().neighbors_expanded);
    }

    #[test]
    fn test_expand_never_marks_outside_source() {
        let mut store = NodeStore::open_in_memory().unwrap();
        store.insert_if_absent("out", 2.0, 2.0, BoundaryStatus::Outside).unwrap();

        store.expand("out", &[discovered("x", BoundaryStatus::Inside)]).unwrap();
        assert!(!store.get("out").unwrap().unwrap().neighbors_expanded);
    }

    #[test]
    fn test_stats() {
        let mut store = NodeStore::open_in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), StoreStats::default());

        store.insert_if_absent("a", 0.5, 0.5, BoundaryStatus::Inside).unwrap();
        store.insert_if_absent("b", 2.0, 2.0, BoundaryStatus::Outside).unwrap();
        store.insert_if_absent("c", 0.5, 0.5, BoundaryStatus::Unknown).unwrap();
        store.record_metadata("a", &PanoramaRecord::new("a", 0.5, 0.5)).unwrap();
        store.expand("a", &[]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                total: 3,
                metadata_populated: 1,
                within_boundary: 1,
                outside_boundary: 1,
                unchecked: 1,
                neighbors_expanded: 1,
            }
        );
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panoramas.db");

        {
            let store = NodeStore::open(&path).unwrap();
            store.insert_if_absent("a", 0.5, 0.5, BoundaryStatus::Inside).unwrap();
        }

        let store = NodeStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.is_degraded());
    }
}

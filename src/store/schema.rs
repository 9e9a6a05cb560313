// src/store/schema.rs
// =============================================================================
// Schema versions and the migrator that walks a database up to the latest.
//
// Versions (stored in PRAGMA user_version):
//   0  empty database
//   1  legacy layout: panoramas + neighbors + links edge tables, never
//      versioned (user_version still 0, detected by the panoramas table)
//   2  flags-only panoramas table with neighbors_expanded and indexes
//   3  panorama_metadata table for the typed metadata projection
//   4  composite indexes matching the frontier orderings
//
// Each step runs in its own transaction and bumps user_version on commit.
// A failed step rolls back; initialize() then patches the panoramas table
// just enough for the crawler to run (degraded mode).
// =============================================================================

use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::{info, warn};

use crate::error::CrawlError;

pub const SCHEMA_VERSION: i64 = 4;
const LEGACY_VERSION: i64 = 1;

const PANORAMAS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS panoramas (
        id TEXT PRIMARY KEY,
        lat REAL,
        lon REAL,
        metadata_populated INTEGER DEFAULT 0,
        within_boundary INTEGER,
        neighbors_expanded INTEGER DEFAULT 0,
        created_at TEXT,
        updated_at TEXT
    );";

const PANORAMAS_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_panoramas_metadata ON panoramas (metadata_populated);
    CREATE INDEX IF NOT EXISTS idx_panoramas_boundary ON panoramas (within_boundary);
    CREATE INDEX IF NOT EXISTS idx_panoramas_expanded ON panoramas (neighbors_expanded);
    CREATE INDEX IF NOT EXISTS idx_panoramas_created ON panoramas (created_at);";

const FRONTIER_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_panoramas_recent ON panoramas (created_at DESC, updated_at DESC);
    CREATE INDEX IF NOT EXISTS idx_panoramas_priority ON panoramas (within_boundary DESC, created_at);";

// Every column NODE_COLUMNS reads, with the type used when it must be added.
const REQUIRED_COLUMNS: &[(&str, &str)] = &[
    ("lat", "REAL"),
    ("lon", "REAL"),
    ("within_boundary", "INTEGER"),
    ("metadata_populated", "INTEGER DEFAULT 0"),
    ("neighbors_expanded", "INTEGER DEFAULT 0"),
    ("created_at", "TEXT"),
    ("updated_at", "TEXT"),
];

const METADATA_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS panorama_metadata (
        id TEXT PRIMARY KEY REFERENCES panoramas (id),
        captured_on TEXT,
        heading REAL,
        pitch REAL,
        roll REAL,
        elevation REAL,
        address TEXT,
        country_code TEXT,
        source TEXT,
        is_third_party INTEGER,
        copyright_message TEXT,
        permalink TEXT,
        street_names TEXT,
        neighbor_count INTEGER NOT NULL,
        link_count INTEGER NOT NULL,
        fetched_at TEXT NOT NULL
    );";

/// Brings the schema up to date, falling back to a bare panoramas table
/// (no new indexes, no metadata table) if migration fails.
///
/// Returns `true` when the store runs in that degraded mode.
pub fn initialize(conn: &mut Connection) -> Result<bool, CrawlError> {
    match migrate(conn) {
        Ok(()) => Ok(false),
        Err(e @ CrawlError::UnsupportedSchema { .. }) => Err(e),
        Err(e) => {
            warn!(error = %e, "schema migration failed, falling back to minimal panoramas table");
            ensure_minimal_table(conn)?;
            Ok(true)
        }
    }
}

// Creates the panoramas table if missing and adds any column the node
// queries need. Runs outside a transaction, after the failed step rolled back.
fn ensure_minimal_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(PANORAMAS_TABLE)?;
    for (column, definition) in REQUIRED_COLUMNS {
        if !column_exists(conn, "panoramas", column)? {
            warn!(column, "adding missing column to panoramas");
            conn.execute(
                &format!("ALTER TABLE panoramas ADD COLUMN {column} {definition}"),
                [],
            )?;
        }
    }
    Ok(())
}

/// Detected schema version of an open database.
pub fn detect_version(conn: &Connection) -> rusqlite::Result<i64> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > 0 {
        return Ok(version);
    }
    if table_exists(conn, "panoramas")? {
        Ok(LEGACY_VERSION)
    } else {
        Ok(0)
    }
}

pub fn migrate(conn: &mut Connection) -> Result<(), CrawlError> {
    let mut version = detect_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(CrawlError::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    while version < SCHEMA_VERSION {
        let tx = conn.transaction()?;
        let next = match version {
            0 => {
                tx.execute_batch(PANORAMAS_TABLE)?;
                tx.execute_batch(PANORAMAS_INDEXES)?;
                2
            }
            LEGACY_VERSION => {
                upgrade_legacy(&tx)?;
                2
            }
            2 => {
                tx.execute_batch(METADATA_TABLE)?;
                3
            }
            3 => {
                tx.execute_batch(FRONTIER_INDEXES)?;
                4
            }
            other => {
                return Err(CrawlError::UnsupportedSchema {
                    found: other,
                    supported: SCHEMA_VERSION,
                })
            }
        };
        tx.pragma_update(None, "user_version", next)?;
        tx.commit()?;

        info!(from = version, to = next, "migrated database schema");
        version = next;
    }

    Ok(())
}

// Legacy databases tracked expansion through the neighbors edge table.
// Any in-boundary panorama with an outgoing edge counts as expanded.
fn upgrade_legacy(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    if !column_exists(tx, "panoramas", "neighbors_expanded")? {
        tx.execute(
            "ALTER TABLE panoramas ADD COLUMN neighbors_expanded INTEGER DEFAULT 0",
            [],
        )?;
    }

    if table_exists(tx, "neighbors")? {
        tx.execute(
            "UPDATE panoramas SET neighbors_expanded = 1
             WHERE within_boundary = 1
               AND id IN (SELECT from_pano_id FROM neighbors)",
            [],
        )?;
    }

    tx.execute_batch(
        "DROP TABLE IF EXISTS neighbors;
         DROP TABLE IF EXISTS links;",
    )?;
    tx.execute_batch(PANORAMAS_INDEXES)
}

pub fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::PanoramaRecord;
    use crate::store::{BoundaryStatus, NodeStore};

    // A legacy neighbors table without the column the upgrade reads, so the
    // legacy step always fails.
    const BROKEN_LEGACY_SCHEMA: &str = "
        CREATE TABLE panoramas (id TEXT PRIMARY KEY, lat REAL, lon REAL,
            metadata_populated INTEGER DEFAULT 0, within_boundary INTEGER,
            created_at TEXT, updated_at TEXT);
        CREATE TABLE neighbors (source TEXT, target TEXT);";

    const LEGACY_SCHEMA: &str = "
        CREATE TABLE panoramas (
            id TEXT PRIMARY KEY, lat REAL, lon REAL,
            metadata_populated INTEGER DEFAULT 0, within_boundary INTEGER,
            created_at TEXT, updated_at TEXT
        );
        CREATE TABLE neighbors (
            from_pano_id TEXT, to_pano_id TEXT, created_at TEXT,
            PRIMARY KEY (from_pano_id, to_pano_id)
        );
        CREATE TABLE links (
            from_pano_id TEXT, to_pano_id TEXT, direction TEXT, created_at TEXT,
            PRIMARY KEY (from_pano_id, to_pano_id)
        );";

    #[test]
    fn test_fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(detect_version(&conn).unwrap(), 0);

        migrate(&mut conn).unwrap();
        assert_eq!(detect_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(table_exists(&conn, "panorama_metadata").unwrap());
        assert!(column_exists(&conn, "panoramas", "neighbors_expanded").unwrap());

        // Running again is a no-op.
        migrate(&mut conn).unwrap();
        assert_eq!(detect_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_legacy_edges_become_expanded_flags() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO panoramas (id, lat, lon, metadata_populated, within_boundary)
                 VALUES ('in', 0.5, 0.5, 1, 1), ('out', 2.0, 2.0, 1, 0), ('fresh', 0.6, 0.6, 0, NULL);
             INSERT INTO neighbors (from_pano_id, to_pano_id) VALUES ('in', 'fresh'), ('out', 'in');",
        )
        .unwrap();
        assert_eq!(detect_version(&conn).unwrap(), LEGACY_VERSION);

        migrate(&mut conn).unwrap();

        let expanded = |id: &str| -> i64 {
            conn.query_row(
                "SELECT neighbors_expanded FROM panoramas WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(expanded("in"), 1);
        // Outside nodes never count as expanded, even with a legacy edge.
        assert_eq!(expanded("out"), 0);
        assert_eq!(expanded("fresh"), 0);

        assert!(!table_exists(&conn, "neighbors").unwrap());
        assert!(!table_exists(&conn, "links").unwrap());
        assert_eq!(detect_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();

        let err = initialize(&mut conn).unwrap_err();
        assert!(matches!(err, CrawlError::UnsupportedSchema { found: 5, supported: 4 }));
    }

    #[test]
    fn test_failed_migration_falls_back_to_minimal_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BROKEN_LEGACY_SCHEMA).unwrap();

        let degraded = initialize(&mut conn).unwrap();
        assert!(degraded);
        // The failed step rolled back, so nothing was dropped or versioned.
        assert!(table_exists(&conn, "neighbors").unwrap());
        assert_eq!(detect_version(&conn).unwrap(), LEGACY_VERSION);
        // ...but the columns the crawler reads were added afterwards.
        assert!(column_exists(&conn, "panoramas", "neighbors_expanded").unwrap());
    }

    #[test]
    fn test_degraded_store_is_usable() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BROKEN_LEGACY_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO panoramas (id, lat, lon, metadata_populated, within_boundary)
                 VALUES ('old', 0.5, 0.5, 1, 1)",
        )
        .unwrap();

        let mut store = NodeStore::from_connection(conn).unwrap();
        assert!(store.is_degraded());

        assert!(store.insert_if_absent("new", 0.6, 0.6, BoundaryStatus::Inside).unwrap());
        let old = store.get("old").unwrap().unwrap();
        assert!(old.metadata_populated);
        assert!(!old.neighbors_expanded);

        store
            .record_metadata("new", &PanoramaRecord::new("new", 0.6, 0.6))
            .unwrap();
        assert_eq!(store.expand("old", &[]).unwrap(), 0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.metadata_populated, 2);
        assert_eq!(stats.neighbors_expanded, 1);
    }

    #[test]
    fn test_degraded_fallback_is_repeatable() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(BROKEN_LEGACY_SCHEMA).unwrap();

        assert!(initialize(&mut conn).unwrap());
        // The next open retries the upgrade, fails the same way, and degrades again.
        assert!(initialize(&mut conn).unwrap());
    }

    #[test]
    fn test_v3_database_gains_frontier_indexes() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(PANORAMAS_TABLE).unwrap();
        conn.execute_batch(PANORAMAS_INDEXES).unwrap();
        conn.execute_batch(METADATA_TABLE).unwrap();
        conn.pragma_update(None, "user_version", 3).unwrap();

        migrate(&mut conn).unwrap();

        let index_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name IN ('idx_panoramas_recent', 'idx_panoramas_priority')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 2);
        assert_eq!(detect_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}

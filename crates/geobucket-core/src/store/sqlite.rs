// crates/geobucket-core/src/store/sqlite.rs

//! SQLite-backed bucket store.
//!
//! The unique index on `geo_buckets.bucket_key` is what makes bucket
//! creation race-free, including between separate processes that open the
//! same database file. Alias appends and count changes are single SQL
//! statements, so no read-modify-write ever happens in Rust.

use crate::error::{GeoBucketError, Result};
use crate::grid::GeoPoint;
use crate::model::{BucketId, BucketKey, GeoBucket, InsertOutcome, NewBucket};
use crate::traits::{AliasAppend, BucketStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS geo_buckets (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    bucket_key     TEXT    NOT NULL UNIQUE,
    canonical_name TEXT    NOT NULL,
    centroid_lat   REAL    NOT NULL,
    centroid_lng   REAL    NOT NULL,
    listing_count  INTEGER NOT NULL DEFAULT 0 CHECK (listing_count >= 0),
    created_at     TEXT    NOT NULL,
    updated_at     TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_geo_buckets_canonical ON geo_buckets(lower(canonical_name));
CREATE TABLE IF NOT EXISTS bucket_aliases (
    bucket_id INTEGER NOT NULL REFERENCES geo_buckets(id) ON DELETE CASCADE,
    position  INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT    NOT NULL,
    UNIQUE (bucket_id, name)
);
CREATE INDEX IF NOT EXISTS idx_bucket_aliases_name ON bucket_aliases(name);
";

const BUCKET_COLUMNS: &str =
    "id, bucket_key, canonical_name, centroid_lat, centroid_lng, listing_count, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file. Several processes may open the same path.
    ///
    /// A file that cannot be created or opened is reported as
    /// [`GeoBucketError::StoreUnavailable`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GeoBucketError::StoreUnavailable(format!("{}: {e}", parent.display()))
                })?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs `f` in a DEFERRED transaction so a bucket row and its aliases
    /// come from one snapshot even while other processes write.
    fn with_read_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` in an IMMEDIATE transaction so the write lock is taken up front
    /// and busy waits go through the busy timeout.
    fn with_tx<T>(&self, f: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn load_where(
        conn: &Connection,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<GeoBucket>> {
        let sql = format!("SELECT {BUCKET_COLUMNS} FROM geo_buckets {clause} ORDER BY bucket_key");
        let mut stmt = conn.prepare(&sql)?;
        let heads = stmt
            .query_map(params, read_head)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        heads
            .into_iter()
            .map(|head| head.into_bucket(conn))
            .collect()
    }
}

/// Bucket row without its aliases.
struct BucketHead {
    id: i64,
    bucket_key: String,
    canonical_name: String,
    centroid_lat: f64,
    centroid_lng: f64,
    listing_count: i64,
    created_at: String,
    updated_at: String,
}

fn read_head(row: &Row<'_>) -> rusqlite::Result<BucketHead> {
    Ok(BucketHead {
        id: row.get(0)?,
        bucket_key: row.get(1)?,
        canonical_name: row.get(2)?,
        centroid_lat: row.get(3)?,
        centroid_lng: row.get(4)?,
        listing_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl BucketHead {
    fn into_bucket(self, conn: &Connection) -> Result<GeoBucket> {
        let mut stmt =
            conn.prepare_cached("SELECT name FROM bucket_aliases WHERE bucket_id = ?1 ORDER BY position")?;
        let aliases = stmt
            .query_map(params![self.id], |r| r.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let centroid = GeoPoint::new(self.centroid_lat, self.centroid_lng).map_err(|e| {
            GeoBucketError::InvalidData(format!("bucket {} has a bad centroid: {e}", self.id))
        })?;
        Ok(GeoBucket {
            id: BucketId(self.id as u64),
            bucket_key: BucketKey::from_stored(self.bucket_key),
            canonical_name: self.canonical_name,
            centroid,
            aliases,
            listing_count: self.listing_count as u64,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GeoBucketError::InvalidData(format!("bad timestamp {raw:?}: {e}")))
}

impl BucketStore for SqliteStore {
    fn insert_if_absent(&self, draft: &NewBucket) -> Result<InsertOutcome> {
        let now = Utc::now().to_rfc3339();
        self.with_tx(|tx| {
            let inserted = tx.execute(
                r"
                INSERT INTO geo_buckets(bucket_key, canonical_name, centroid_lat, centroid_lng,
                                        listing_count, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                ON CONFLICT(bucket_key) DO NOTHING
                ",
                params![
                    draft.bucket_key.as_str(),
                    draft.canonical_name,
                    draft.centroid.lat(),
                    draft.centroid.lng(),
                    now
                ],
            )?;
            if inserted == 0 {
                return Ok(InsertOutcome::Conflict);
            }
            let id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO bucket_aliases(bucket_id, name) VALUES (?1, ?2)",
                params![id, draft.canonical_name],
            )?;
            Ok(InsertOutcome::Inserted(BucketId(id as u64)))
        })
    }

    fn find_by_key(&self, key: &BucketKey) -> Result<Option<GeoBucket>> {
        self.with_read_tx(|conn| {
            let mut found = Self::load_where(conn, "WHERE bucket_key = ?1", params![key.as_str()])?;
            Ok(found.pop())
        })
    }

    fn get(&self, id: BucketId) -> Result<Option<GeoBucket>> {
        self.with_read_tx(|conn| {
            let mut found = Self::load_where(conn, "WHERE id = ?1", params![id.0 as i64])?;
            Ok(found.pop())
        })
    }

    fn append_alias(&self, id: BucketId, alias: &str) -> Result<AliasAppend> {
        let now = Utc::now().to_rfc3339();
        self.with_tx(|tx| {
            let inserted = tx.execute(
                r"
                INSERT OR IGNORE INTO bucket_aliases(bucket_id, name)
                SELECT id, ?2 FROM geo_buckets WHERE id = ?1
                ",
                params![id.0 as i64, alias],
            )?;
            if inserted == 1 {
                tx.execute(
                    "UPDATE geo_buckets SET updated_at = ?2 WHERE id = ?1",
                    params![id.0 as i64, now],
                )?;
                return Ok(AliasAppend::Appended);
            }
            let exists = tx
                .query_row(
                    "SELECT 1 FROM geo_buckets WHERE id = ?1",
                    params![id.0 as i64],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            Ok(if exists {
                AliasAppend::AlreadyPresent
            } else {
                AliasAppend::Missing
            })
        })
    }

    fn adjust_listing_count(&self, id: BucketId, delta: i64) -> Result<Option<u64>> {
        let now = Utc::now().to_rfc3339();
        self.with_tx(|tx| {
            let updated: Option<i64> = tx
                .query_row(
                    r"
                    UPDATE geo_buckets
                    SET listing_count = listing_count + ?2, updated_at = ?3
                    WHERE id = ?1 AND listing_count + ?2 >= 0
                    RETURNING listing_count
                    ",
                    params![id.0 as i64, delta, now],
                    |r| r.get(0),
                )
                .optional()?;
            if let Some(count) = updated {
                return Ok(Some(count as u64));
            }
            let exists = tx
                .query_row(
                    "SELECT 1 FROM geo_buckets WHERE id = ?1",
                    params![id.0 as i64],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                Err(GeoBucketError::InvalidData(format!(
                    "listing count of bucket {id} would drop below zero"
                )))
            } else {
                Ok(None)
            }
        })
    }

    fn delete_if_empty(&self, id: BucketId) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM geo_buckets WHERE id = ?1 AND listing_count = 0",
                params![id.0 as i64],
            )?;
            Ok(deleted == 1)
        })
    }

    fn find_by_canonical_name(&self, name: &str) -> Result<Vec<GeoBucket>> {
        self.with_read_tx(|conn| {
            Self::load_where(conn, "WHERE lower(canonical_name) = lower(?1)", params![name])
        })
    }

    fn find_by_alias(&self, alias: &str) -> Result<Vec<GeoBucket>> {
        self.with_read_tx(|conn| {
            Self::load_where(
                conn,
                "WHERE id IN (SELECT bucket_id FROM bucket_aliases WHERE name = ?1)",
                params![alias],
            )
        })
    }

    fn all_buckets(&self) -> Result<Vec<GeoBucket>> {
        self.with_read_tx(|conn| Self::load_where(conn, "", params![]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::quantize;

    fn draft(lat: f64, lng: f64, name: &str) -> NewBucket {
        let cell = quantize(lat, lng, 0.005);
        NewBucket {
            centroid: cell.centroid(),
            bucket_key: cell.key,
            canonical_name: name.into(),
        }
    }

    #[test]
    fn unique_key_reports_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = store.insert_if_absent(&draft(6.4698, 3.6285, "sangotedo")).unwrap();
        let InsertOutcome::Inserted(id) = first else {
            panic!("expected insert, got {first:?}");
        };
        assert_eq!(
            store.insert_if_absent(&draft(6.4705, 3.6290, "other")).unwrap(),
            InsertOutcome::Conflict
        );
        let b = store.find_by_key(&quantize(6.47, 3.63, 0.005).key).unwrap().unwrap();
        assert_eq!(b.id, id);
        assert_eq!(b.aliases, vec!["sangotedo"]);
    }

    #[test]
    fn alias_and_count_updates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let InsertOutcome::Inserted(id) =
            store.insert_if_absent(&draft(6.4698, 3.6285, "sangotedo")).unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(store.append_alias(id, "ajah sangotedo").unwrap(), AliasAppend::Appended);
        assert_eq!(store.append_alias(id, "sangotedo").unwrap(), AliasAppend::AlreadyPresent);
        assert_eq!(store.append_alias(BucketId(77), "x").unwrap(), AliasAppend::Missing);
        assert_eq!(store.adjust_listing_count(id, 1).unwrap(), Some(1));
        assert_eq!(store.adjust_listing_count(id, 1).unwrap(), Some(2));
        assert!(store.adjust_listing_count(id, -3).is_err());
        assert_eq!(store.adjust_listing_count(BucketId(77), 1).unwrap(), None);

        let b = store.get(id).unwrap().unwrap();
        assert_eq!(b.aliases, vec!["sangotedo", "ajah sangotedo"]);
        assert_eq!(b.listing_count, 2);
        assert_eq!(store.find_by_alias("ajah sangotedo").unwrap().len(), 1);
        assert_eq!(store.find_by_canonical_name("SangoTedo").unwrap().len(), 1);
    }

    #[test]
    fn delete_cascades_aliases_and_frees_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let d = draft(1.0, 1.0, "x");
        let InsertOutcome::Inserted(id) = store.insert_if_absent(&d).unwrap() else {
            panic!("expected insert");
        };
        store.adjust_listing_count(id, 1).unwrap();
        assert!(!store.delete_if_empty(id).unwrap());
        store.adjust_listing_count(id, -1).unwrap();
        assert!(store.delete_if_empty(id).unwrap());
        assert!(store.find_by_alias("x").unwrap().is_empty());
        assert!(matches!(store.insert_if_absent(&d).unwrap(), InsertOutcome::Inserted(_)));
    }

    #[test]
    fn reads_see_aliases_committed_by_another_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buckets.db");
        let writer = SqliteStore::open(&path).unwrap();
        let reader = SqliteStore::open(&path).unwrap();
        let InsertOutcome::Inserted(id) =
            writer.insert_if_absent(&draft(6.4698, 3.6285, "sangotedo")).unwrap()
        else {
            panic!("expected insert");
        };
        writer.append_alias(id, "ajah sangotedo").unwrap();

        let b = reader.get(id).unwrap().unwrap();
        assert_eq!(b.aliases, vec!["sangotedo", "ajah sangotedo"]);
        assert_eq!(reader.all_buckets().unwrap().len(), 1);
        // The read transaction is closed again, so the reader does not block writers.
        writer.adjust_listing_count(id, 1).unwrap();
        assert_eq!(reader.get(id).unwrap().unwrap().listing_count, 1);
    }

    #[test]
    fn unopenable_path_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").unwrap();

        let err = SqliteStore::open(blocker.join("buckets.db")).unwrap_err();
        assert!(
            matches!(err, GeoBucketError::StoreUnavailable(_)),
            "expected StoreUnavailable, got {err:?}"
        );
    }
}

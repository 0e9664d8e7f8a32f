//! SQLite-backed storage for scheduled deletions.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::ExpiryRecord;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Persistent store for [`ExpiryRecord`]s.
///
/// One owned connection with internal synchronization; calls run on the
/// blocking pool so the async executor is never tied up by SQLite.
pub struct ExpiryStore {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scheduled_deletions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id INTEGER NOT NULL,
        message_id INTEGER NOT NULL,
        delete_at TEXT NOT NULL,
        label TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_scheduled_deletions_due
        ON scheduled_deletions(delete_at);";

/// Deadlines are stored as RFC 3339 text with fixed microsecond precision
/// and a `Z` suffix, so the SQL `<=` text comparison in `due` is exactly
/// chronological. Variable-precision `to_rfc3339()` would not sort.
fn encode_deadline(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_deadline(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl ExpiryStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Expiry store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record a message for deletion at `delete_at`. Returns the fresh
    /// record ID.
    pub async fn insert(
        &self,
        chat_id: i64,
        message_id: i64,
        delete_at: DateTime<Utc>,
        label: &str,
    ) -> Result<i64> {
        let conn = self.conn.clone();
        let delete_at = encode_deadline(&delete_at);
        let label = label.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO scheduled_deletions (chat_id, message_id, delete_at, label)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![chat_id, message_id, delete_at, label],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await?
    }

    /// Every record whose deadline has passed at `now` (boundary
    /// inclusive), in insertion order. Freshly computed on each call.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ExpiryRecord>> {
        let conn = self.conn.clone();
        let now = encode_deadline(&now);
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, message_id, delete_at, label
                 FROM scheduled_deletions WHERE delete_at <= ?1 ORDER BY id",
            )?;
            let records = stmt
                .query_map(rusqlite::params![now], |row| {
                    Ok(ExpiryRecord {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        message_id: row.get(2)?,
                        delete_at: decode_deadline(3, row.get(3)?)?,
                        label: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await?
    }

    /// Delete the record with this ID. Removing an absent ID is a no-op,
    /// which defends against double-sweep races.
    pub async fn remove(&self, id: i64) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM scheduled_deletions WHERE id = ?1",
                rusqlite::params![id],
            )?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_monotonic_ids() {
        let store = ExpiryStore::open_in_memory().unwrap();
        let now = ts(1_700_000_000);
        let a = store.insert(-100, 1, now, "del_after_1.0h").await.unwrap();
        let b = store.insert(-100, 2, now, "del_after_1.0h").await.unwrap();
        let c = store.insert(42, 3, now, "del_after_2.0h").await.unwrap();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_due_boundary_inclusive() {
        let store = ExpiryStore::open_in_memory().unwrap();
        let deadline = ts(1_700_000_000);
        store
            .insert(-100, 7, deadline, "del_after_1.0h")
            .await
            .unwrap();

        let before = store.due(deadline - Duration::seconds(1)).await.unwrap();
        assert!(before.is_empty());

        let at = store.due(deadline).await.unwrap();
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].chat_id, -100);
        assert_eq!(at[0].message_id, 7);
        assert_eq!(at[0].label, "del_after_1.0h");
        assert_eq!(at[0].delete_at, deadline);
    }

    #[tokio::test]
    async fn test_due_returns_insertion_order() {
        let store = ExpiryStore::open_in_memory().unwrap();
        let now = ts(1_700_000_000);
        // Later deadline inserted first; order must follow insertion, not deadline.
        store
            .insert(-1, 10, now - Duration::minutes(1), "a")
            .await
            .unwrap();
        store
            .insert(-1, 20, now - Duration::minutes(5), "b")
            .await
            .unwrap();

        let due = store.due(now).await.unwrap();
        let ids: Vec<i64> = due.iter().map(|r| r.message_id).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_due_sub_second_deadlines_compare_correctly() {
        let store = ExpiryStore::open_in_memory().unwrap();
        let base = ts(1_700_000_000);
        store
            .insert(-1, 1, base + Duration::milliseconds(500), "frac")
            .await
            .unwrap();

        assert!(store.due(base + Duration::milliseconds(499)).await.unwrap().is_empty());
        assert_eq!(store.due(base + Duration::seconds(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = ExpiryStore::open_in_memory().unwrap();
        let now = ts(1_700_000_000);
        let id = store.insert(-1, 1, now, "x").await.unwrap();

        store.remove(id).await.unwrap();
        store.remove(id).await.unwrap();
        store.remove(9999).await.unwrap();

        assert!(store.due(now + Duration::hours(1)).await.unwrap().is_empty());
    }
}

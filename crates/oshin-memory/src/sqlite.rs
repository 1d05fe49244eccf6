//! SQLite status item store.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oshin_core::error::{OshinError, Result};
use oshin_core::traits::RecordStore;
use oshin_core::types::{DigestWindow, StatusItem};
use rusqlite::Connection;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS status_items (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        owner_name TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_status_items_owner_time
        ON status_items (owner_id, created_at);";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|e| OshinError::persistence(e.to_string()))?;
        tracing::info!("Status store opened at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| OshinError::persistence(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| OshinError::persistence(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

// Timestamps are stored as microseconds since the epoch so range queries
// compare integers.
fn to_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

fn from_micros(v: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(v).ok_or(rusqlite::Error::IntegralValueOutOfRange(4, v))
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, item: &StatusItem) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OshinError::persistence(e.to_string()))?;
        conn.execute(
            "INSERT INTO status_items (id, owner_id, owner_name, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                item.id,
                item.owner_id,
                item.owner_name,
                item.text,
                to_micros(item.created_at),
            ],
        )
        .map_err(|e| OshinError::persistence(e.to_string()))?;
        Ok(())
    }

    async fn query_by_owner(
        &self,
        owner_id: &str,
        window: &DigestWindow,
    ) -> Result<Vec<StatusItem>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| OshinError::persistence(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, owner_name, text, created_at FROM status_items
                 WHERE owner_id = ?1 AND created_at >= ?2 AND created_at < ?3
                 ORDER BY rowid",
            )
            .map_err(|e| OshinError::persistence(e.to_string()))?;

        let rows = stmt
            .query_map(
                rusqlite::params![owner_id, to_micros(window.start), to_micros(window.end)],
                |row| {
                    Ok(StatusItem {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        owner_name: row.get(2)?,
                        text: row.get(3)?,
                        created_at: from_micros(row.get(4)?)?,
                    })
                },
            )
            .map_err(|e| OshinError::persistence(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| OshinError::persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(owner: &str, text: &str, at: DateTime<Utc>) -> StatusItem {
        StatusItem {
            id: format!("{owner}-{text}"),
            owner_id: owner.into(),
            owner_name: format!("name-{owner}"),
            text: text.into(),
            created_at: at,
        }
    }

    fn window() -> DigestWindow {
        DigestWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_query_window_bounds_and_owner() {
        let store = SqliteStore::open_in_memory().unwrap();
        let w = window();
        store.insert(&item("U1", "at-start", w.start)).await.unwrap();
        store.insert(&item("U1", "at-end", w.end)).await.unwrap();
        store
            .insert(&item("U1", "before", w.start - chrono::Duration::microseconds(1)))
            .await
            .unwrap();
        store
            .insert(&item("U2", "other owner", w.start + chrono::Duration::hours(1)))
            .await
            .unwrap();

        let found = store.query_by_owner("U1", &w).await.unwrap();
        let texts: Vec<_> = found.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["at-start"]);
        assert_eq!(found[0].created_at, w.start);
        assert_eq!(found[0].owner_name, "name-U1");
    }

    #[tokio::test]
    async fn test_query_keeps_insertion_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let w = window();
        // Later timestamp inserted first.
        store
            .insert(&item("U1", "second", w.start + chrono::Duration::hours(5)))
            .await
            .unwrap();
        store
            .insert(&item("U1", "first", w.start + chrono::Duration::hours(1)))
            .await
            .unwrap();
        let texts: Vec<_> = store
            .query_by_owner("U1", &w)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let it = item("U1", "x", window().start);
        store.insert(&it).await.unwrap();
        let err = store.insert(&it).await.unwrap_err();
        assert!(matches!(err, OshinError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oshin.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert(&item("U1", "kept", window().start)).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.query_by_owner("U1", &window()).await.unwrap().len(), 1);
    }
}

//! Durable record store keyed by permalink.
//!
//! One SQLite table, `records(username, text, date, permalink PRIMARY KEY)`.
//! Rows are only ever inserted; a second insert of the same permalink is a
//! no-op reported as [`InsertOutcome::Skipped`]. Deduplication relies on the
//! primary key and `INSERT OR IGNORE`, so overlapping runs cannot produce two
//! rows for one permalink.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::record::Record;

/// SQL schema for the record store
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    username TEXT NOT NULL,
    text TEXT NOT NULL,
    date TEXT NOT NULL,
    permalink TEXT PRIMARY KEY
);
"#;

/// Result of a single insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same permalink already existed
    Skipped,
}

/// Result of persisting a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistSummary {
    /// Records stored for the first time, in input order
    pub inserted: Vec<Record>,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Open the store at `db_path`, creating the file and table if needed.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create store directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        // Idempotent: CREATE IF NOT EXISTS
        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to initialize database schema")?;

        tracing::info!(path = %db_path.display(), "Record store ready");

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Whether a record with this permalink has been stored
    pub async fn exists(&self, permalink: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM records WHERE permalink = ?")
            .bind(permalink)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query record existence")?;
        Ok(row.is_some())
    }

    /// Insert the record unless its permalink is already present.
    pub async fn insert_if_absent(&self, record: &Record) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO records (username, text, date, permalink) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.username)
        .bind(&record.text)
        .bind(&record.timestamp)
        .bind(&record.permalink)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert record {}", record.permalink))?;

        Ok(if result.rows_affected() > 0 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Skipped
        })
    }

    /// Insert every record in order, collecting the ones that were new.
    ///
    /// Stops at the first database error; records before it stay stored.
    pub async fn persist_all(&self, records: &[Record]) -> Result<PersistSummary> {
        let mut summary = PersistSummary::default();
        for record in records {
            match self.insert_if_absent(record).await? {
                InsertOutcome::Inserted => summary.inserted.push(record.clone()),
                InsertOutcome::Skipped => summary.skipped += 1,
            }
        }
        tracing::debug!(
            inserted = summary.inserted.len(),
            skipped = summary.skipped,
            "Persisted records"
        );
        Ok(summary)
    }

    pub async fn get(&self, permalink: &str) -> Result<Option<Record>> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT username, text, date, permalink FROM records WHERE permalink = ?",
        )
        .bind(permalink)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load record")?;

        Ok(row.map(|(username, text, timestamp, permalink)| Record {
            username,
            text,
            timestamp,
            permalink,
        }))
    }

    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count records")?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Most recently inserted records, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<Record>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT username, text, date, permalink FROM records ORDER BY rowid DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("Failed to load recent records")?;

        Ok(rows
            .into_iter()
            .map(|(username, text, timestamp, permalink)| Record {
                username,
                text,
                timestamp,
                permalink,
            })
            .collect())
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(n: u32) -> Record {
        Record::new(
            format!("user{n}"),
            format!("text {n}"),
            "2024-03-01T10:00:00.000Z",
            format!("https://twitter.com/user{n}/status/{n}"),
        )
    }

    #[tokio::test]
    async fn test_insert_twice_keeps_one_row() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;

        assert_eq!(store.insert_if_absent(&record(1)).await?, InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(&record(1)).await?, InsertOutcome::Skipped);
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_exists() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;

        assert!(!store.exists("https://twitter.com/user1/status/1").await?);
        store.insert_if_absent(&record(1)).await?;
        assert!(store.exists("https://twitter.com/user1/status/1").await?);
        assert!(!store.exists("https://twitter.com/user2/status/2").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_keeps_first_version() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;

        let original = record(1);
        let mut edited = original.clone();
        edited.text = "edited".to_string();

        store.insert_if_absent(&original).await?;
        store.insert_if_absent(&edited).await?;
        assert_eq!(store.get(&original.permalink).await?, Some(original));
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_all_reports_new_records() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;
        store.insert_if_absent(&record(2)).await?;

        let summary = store.persist_all(&[record(1), record(2), record(3)]).await?;
        assert_eq!(summary.inserted, vec![record(1), record(3)]);
        assert_eq!(summary.skipped, 1);

        let recent = store.recent(2).await?;
        assert_eq!(recent, vec![record(3), record(1)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_schema_survives_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("records.sqlite");

        let store = RecordStore::open(&path).await?;
        store.insert_if_absent(&record(1)).await?;
        store.close().await;

        let reopened = RecordStore::open(&path).await?;
        assert_eq!(reopened.count().await?, 1);
        assert_eq!(reopened.insert_if_absent(&record(1)).await?, InsertOutcome::Skipped);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_inserts_store_one_row() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RecordStore::open(&dir.path().join("records.sqlite")).await?;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_if_absent(&record(7)).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await?? == InsertOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.count().await?, 1);
        Ok(())
    }
}

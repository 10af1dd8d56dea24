mod overlay;
mod store;

pub use overlay::OverlayTable;
pub use store::{Store, Table};

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// One `(id -> text)` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: i64,
    pub text: String,
}

impl Entry {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// Errors raised by the local database and snapshot files.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Relation `{0}` is missing")]
    MissingRelation(&'static str),
}

/// Open the local store, creating it if needed, and run migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
    }

    // WAL lets readers keep seeing the last committed table while a
    // replacement transaction is in progress.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Open a snapshot file read-only.
///
/// Fails with [`StoreError::MissingRelation`] if the file has no base relation.
pub async fn open_snapshot(path: &Path) -> Result<SqlitePool, StoreError> {
    if !path.exists() {
        return Err(StoreError::Io(
            path.to_path_buf(),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let base = Store::new(pool.clone(), Table::Base);
    if !base.exists().await? {
        pool.close().await;
        return Err(StoreError::MissingRelation(Table::Base.name()));
    }

    Ok(pool)
}

/// Write `entries` into a fresh snapshot file at `path`.
///
/// Snapshots are produced out of band; this is the minimal writer used by
/// the mirror tooling and tests.
pub async fn write_snapshot(path: &Path, entries: &[Entry]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(&store::create_table_sql(Table::Base))
        .execute(&pool)
        .await?;
    Store::new(pool.clone(), Table::Base)
        .replace_all(entries)
        .await?;

    pool.close().await;
    Ok(())
}

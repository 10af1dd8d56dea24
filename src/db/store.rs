use sqlx::SqlitePool;

use super::{Entry, StoreError};
use crate::fingerprint::Fingerprint;

/// The two relations of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Synchronized base data
    Base,
    /// Local user edits
    Override,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Base => "Emoji",
            Table::Override => "MyEmoji",
        }
    }
}

pub(super) fn create_table_sql(table: Table) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (eid INTEGER PRIMARY KEY, text VARCHAR NOT NULL)",
        table.name()
    )
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    eid: i64,
    text: String,
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Entry::new(row.eid, row.text)
    }
}

/// A single `(id -> text)` relation.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    table: Table,
}

impl Store {
    pub fn new(pool: SqlitePool, table: Table) -> Self {
        Self { pool, table }
    }

    pub async fn get(&self, id: i64) -> Result<Option<String>, StoreError> {
        let sql = format!("SELECT text FROM {} WHERE eid = ?", self.table.name());
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(text,)| text))
    }

    /// Insert or replace the text for `id`.
    pub async fn put(&self, id: i64, text: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&self.upsert_sql())
            .bind(id)
            .bind(text)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// All entries, sorted by ascending id.
    pub async fn entries(&self) -> Result<Vec<Entry>, StoreError> {
        let sql = format!("SELECT eid, text FROM {} ORDER BY eid", self.table.name());
        let rows: Vec<EntryRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.name());
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn fingerprint(&self) -> Result<Fingerprint, StoreError> {
        let entries = self.entries().await?;
        Ok(Fingerprint::of_sorted(entries.iter()))
    }

    /// Discard every entry and install `entries`, in one transaction.
    ///
    /// If `entries` repeats an id, the last occurrence wins.
    pub async fn replace_all(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DELETE FROM {}", self.table.name()))
            .execute(&mut *tx)
            .await?;

        let upsert = self.upsert_sql();
        for entry in entries {
            sqlx::query(&upsert)
                .bind(entry.id)
                .bind(&entry.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            "Replaced {} with {} entries",
            self.table.name(),
            entries.len()
        );
        Ok(())
    }

    /// Whether the relation exists in the database schema.
    pub async fn exists(&self) -> Result<bool, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(self.table.name())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (eid, text) VALUES (?, ?) ON CONFLICT(eid) DO UPDATE SET text = excluded.text",
            self.table.name()
        )
    }
}

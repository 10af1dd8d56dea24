use std::collections::BTreeMap;

use sqlx::SqlitePool;

use super::{Entry, Store, StoreError, Table};

/// Read-through view over the base and override relations.
///
/// Lookups prefer the override relation. Writes from users only ever land in
/// the override relation; the base relation is replaced wholesale by the
/// synchronizer.
#[derive(Debug, Clone)]
pub struct OverlayTable {
    base: Store,
    overrides: Store,
}

impl OverlayTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: Store::new(pool.clone(), Table::Base),
            overrides: Store::new(pool, Table::Override),
        }
    }

    pub fn base(&self) -> &Store {
        &self.base
    }

    pub fn overrides(&self) -> &Store {
        &self.overrides
    }

    pub async fn query(&self, id: i64) -> Result<Option<String>, StoreError> {
        if let Some(text) = self.overrides.get(id).await? {
            return Ok(Some(text));
        }
        self.base.get(id).await
    }

    pub async fn set(&self, id: i64, text: &str) -> Result<(), StoreError> {
        self.overrides.put(id, text).await
    }

    pub async fn replace_base(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.base.replace_all(entries).await
    }

    /// True when both relations are present.
    pub async fn integrity_check(&self) -> Result<bool, StoreError> {
        Ok(self.base.exists().await? && self.overrides.exists().await?)
    }

    /// Base entries overlaid with override entries, keyed by id.
    pub async fn merged(&self) -> Result<BTreeMap<i64, String>, StoreError> {
        let mut merged: BTreeMap<i64, String> = self
            .base
            .entries()
            .await?
            .into_iter()
            .map(|e| (e.id, e.text))
            .collect();

        for entry in self.overrides.entries().await? {
            merged.insert(entry.id, entry.text);
        }

        Ok(merged)
    }
}

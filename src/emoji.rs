//! The user-facing handle.
//!
//! ```no_run
//! # async fn demo() -> qzemoji::Result<()> {
//! use qzemoji::{resolve_url, Config, Fallback, QzEmoji};
//!
//! let emoji = QzEmoji::new(Config::load(None)?);
//! let id = resolve_url("http://qzonestyle.gtimg.cn/qzone/em/e400343.gif")?;
//! assert_eq!(emoji.query(id, &Fallback::Id).await?, "🐷");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::db::{init_db, OverlayTable};
use crate::error::{Error, Result};
use crate::export::write_yaml;
use crate::fingerprint::Fingerprint;
use crate::snapshot::SnapshotSource;
use crate::sync::{merge_snapshot, SyncOutcome, Synchronizer};

/// Text returned by [`QzEmoji::query`] for ids with no entry.
#[derive(Clone, Default)]
pub enum Fallback {
    /// The id itself, as a string
    #[default]
    Id,
    /// A fixed text
    Text(String),
    /// Computed from the id
    With(Arc<dyn Fn(i64) -> String + Send + Sync>),
}

impl Fallback {
    pub fn with(f: impl Fn(i64) -> String + Send + Sync + 'static) -> Self {
        Fallback::With(Arc::new(f))
    }

    pub fn apply(&self, id: i64) -> String {
        match self {
            Fallback::Id => id.to_string(),
            Fallback::Text(text) => text.clone(),
            Fallback::With(f) => f(id),
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Id => write!(f, "Id"),
            Fallback::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Fallback::With(_) => write!(f, "With(..)"),
        }
    }
}

impl From<&str> for Fallback {
    fn from(text: &str) -> Self {
        Fallback::Text(text.to_string())
    }
}

struct Ready {
    table: OverlayTable,
    sync: Synchronizer,
}

/// Lookup handle over the local store, synchronized at most once.
///
/// Construction does no I/O; the store is opened, checked and seeded on the
/// first call that needs it.
pub struct QzEmoji {
    config: Config,
    ready: OnceCell<Ready>,
}

impl QzEmoji {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ready: OnceCell::new(),
        }
    }

    async fn ready(&self) -> Result<&Ready> {
        self.ready.get_or_try_init(|| self.open()).await
    }

    async fn open(&self) -> Result<Ready> {
        let layout = self.config.layout();
        let pool = init_db(&layout.store).await?;
        let table = OverlayTable::new(pool);

        if !table.integrity_check().await? {
            return Err(Error::Corrupt(layout.store));
        }

        let source = SnapshotSource::from_config(&self.config)?;

        if table.base().count().await? == 0 {
            if let Some(snapshot) = source.locate() {
                match merge_snapshot(&table, &snapshot, None).await {
                    Ok(_) => tracing::info!("Seeded base table from {}", snapshot.display()),
                    Err(e) => tracing::warn!(
                        "Failed to seed base table from {}: {}",
                        snapshot.display(),
                        e
                    ),
                }
            }
        }

        let sync = Synchronizer::new(
            source,
            table.clone(),
            Some(env!("CARGO_PKG_VERSION").to_string()),
        );

        tracing::debug!("Opened emoji store {}", layout.store.display());
        Ok(Ready { table, sync })
    }

    /// Synchronize once if auto-update is enabled.
    ///
    /// Returns `None` when auto-update is disabled. Network failures show up
    /// as [`SyncOutcome::Failed`], never as an error.
    pub async fn auto_update(&self) -> Result<Option<SyncOutcome>> {
        let ready = self.ready().await?;
        if !self.config.auto_update.value {
            return Ok(None);
        }
        Ok(Some(ready.sync.sync_once().await))
    }

    /// Synchronize now, even if an earlier attempt already ran.
    pub async fn update(&self) -> Result<SyncOutcome> {
        let ready = self.ready().await?;
        ready.sync.reset();
        Ok(ready.sync.sync_once().await)
    }

    /// Replace the base table from a local snapshot file.
    pub async fn update_from(&self, snapshot: &Path) -> Result<SyncOutcome> {
        let ready = self.ready().await?;
        Ok(merge_snapshot(&ready.table, snapshot, None).await?)
    }

    pub async fn lookup(&self, id: i64) -> Result<Option<String>> {
        self.auto_update().await?;
        Ok(self.ready().await?.table.query(id).await?)
    }

    pub async fn query(&self, id: i64, default: &Fallback) -> Result<String> {
        Ok(self
            .lookup(id)
            .await?
            .unwrap_or_else(|| default.apply(id)))
    }

    pub async fn set(&self, id: i64, text: &str) -> Result<()> {
        self.auto_update().await?;
        Ok(self.ready().await?.table.set(id, text).await?)
    }

    /// Write the merged view to `path` as YAML and return the path.
    pub async fn export(&self, path: &Path) -> Result<PathBuf> {
        self.auto_update().await?;
        let merged = self.ready().await?.table.merged().await?;
        write_yaml(path, &merged).await?;
        tracing::info!("Exported {} entries to {}", merged.len(), path.display());
        Ok(path.to_path_buf())
    }

    /// Fingerprints of the base and override relations.
    pub async fn fingerprints(&self) -> Result<(Fingerprint, Fingerprint)> {
        let table = &self.ready().await?.table;
        Ok((
            table.base().fingerprint().await?,
            table.overrides().fingerprint().await?,
        ))
    }
}

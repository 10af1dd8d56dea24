//! Locating and fetching published snapshots of the base table.
//!
//! A snapshot is an SQLite file holding the `Emoji` relation. The remote
//! side publishes an index page linking to the latest asset, optionally
//! annotated with its fingerprint (`.../v2.2.0/emoji.db#sha256=<hex>`).
//!
//! Local layout under the data directory:
//! - `qzemoji.db`: the local store (base and override relations)
//! - `emoji.db`: the adopted snapshot
//! - `emoji.db.part`: staging slot for an in-progress download

mod index;
mod source;
mod version;

pub use index::{parse_index, AssetLink};
pub use source::{snapshot_fingerprint, FetchOutcome, SnapshotSource};
pub use version::Version;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::db::StoreError;
use crate::fingerprint::Fingerprint;

const STORE_FILE: &str = "qzemoji.db";
const STAGING_SUFFIX: &str = "part";
const VERSION_SUFFIX: &str = "version";

/// Well-known file slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub store: PathBuf,
    pub adopted: PathBuf,
    pub staging: PathBuf,
    /// Release tag of the adopted snapshot, when known.
    pub adopted_version: PathBuf,
}

impl Layout {
    pub fn new(data_dir: &Path, asset_name: &str) -> Self {
        Self {
            store: data_dir.join(STORE_FILE),
            adopted: data_dir.join(asset_name),
            staging: data_dir.join(format!("{}.{}", asset_name, STAGING_SUFFIX)),
            adopted_version: data_dir.join(format!("{}.{}", asset_name, VERSION_SUFFIX)),
        }
    }
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error for {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch {
        expected: Fingerprint,
        actual: Fingerprint,
    },
}

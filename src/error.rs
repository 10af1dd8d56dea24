use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::resolve::ResolveError;
use crate::snapshot::SnapshotError;
use crate::sync::SyncError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Local store {} is corrupt: expected relations are missing", .0.display())]
    Corrupt(PathBuf),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to write {}: {}", .0.display(), .1)]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

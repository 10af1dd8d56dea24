//! YAML export of the merged emoji table, for review and contribution.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Render `entries` as a YAML mapping, ids ascending.
pub fn to_yaml(entries: &BTreeMap<i64, String>) -> Result<String> {
    Ok(serde_yaml::to_string(entries)?)
}

/// Write `entries` to `path`, replacing any previous export in one rename.
pub async fn write_yaml(path: &Path, entries: &BTreeMap<i64, String>) -> Result<()> {
    let doc = to_yaml(entries)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Write(parent.to_path_buf(), e))?;
    }

    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, doc)
        .await
        .map_err(|e| Error::Write(temp_path.clone(), e))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::Write(path.to_path_buf(), e))?;

    Ok(())
}

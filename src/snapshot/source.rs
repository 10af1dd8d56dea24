use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Url;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::index::{parse_index, AssetLink};
use super::{Layout, SnapshotError, Version};
use crate::config::Config;
use crate::db::{open_snapshot, Store, StoreError, Table};
use crate::fingerprint::Fingerprint;

/// Result of [`SnapshotSource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local snapshot is already current; nothing was adopted.
    Unchanged,
    /// A new snapshot was downloaded, validated and adopted at `path`.
    Updated {
        path: PathBuf,
        fingerprint: Fingerprint,
        version: Option<String>,
    },
}

/// Finds the local snapshot and fetches newer ones from the remote index.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    client: reqwest::Client,
    layout: Layout,
    index_url: String,
    fallback_url: String,
    asset_name: String,
    seed: Option<PathBuf>,
    timeout: Duration,
}

impl SnapshotSource {
    pub fn from_config(config: &Config) -> Result<Self, SnapshotError> {
        // Total transfer time is bounded per request, see `resolve_index`
        // and `download`.
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .user_agent(concat!("qzemoji/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &config.proxy.value {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            layout: config.layout(),
            index_url: config.index_url.value.clone(),
            fallback_url: config.fallback_url.value.clone(),
            asset_name: config.asset_name.value.clone(),
            seed: config.seed_snapshot.value.clone(),
            timeout: config.timeout(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The snapshot to trust locally: the adopted one, else the shipped seed.
    ///
    /// The staging slot is never returned.
    pub fn locate(&self) -> Option<PathBuf> {
        if self.layout.adopted.exists() {
            return Some(self.layout.adopted.clone());
        }
        self.seed.as_ref().filter(|p| p.exists()).cloned()
    }

    /// Resolve the latest asset from the index, or the fallback asset.
    pub async fn resolve(&self) -> Result<AssetLink, SnapshotError> {
        match self.resolve_index().await {
            Ok(link) => Ok(link),
            Err(e) => {
                tracing::warn!(
                    "Failed to resolve snapshot index {}: {}; using fallback {}",
                    self.index_url,
                    e,
                    self.fallback_url
                );
                AssetLink::parse(&self.fallback_url)
            }
        }
    }

    async fn resolve_index(&self) -> Result<AssetLink, SnapshotError> {
        let base = Url::parse(&self.index_url)
            .map_err(|e| SnapshotError::InvalidIndex(e.to_string()))?;

        let response = self
            .client
            .get(base.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SnapshotError::Status {
                url: base.to_string(),
                status: response.status(),
            });
        }

        let body = response.text().await?;
        let link = parse_index(&body, &base, &self.asset_name)?;
        tracing::debug!(
            "Index points at {} (version {:?}, fingerprint {:?})",
            link.url,
            link.version,
            link.fingerprint
        );
        Ok(link)
    }

    /// Fetch the latest snapshot if it differs from the local one.
    ///
    /// `current_version` is compared against the remote release tag when the
    /// index carries no fingerprint. On error the adopted snapshot is left
    /// untouched and no staging file remains.
    pub async fn fetch(&self, current_version: Option<&str>) -> Result<FetchOutcome, SnapshotError> {
        let link = self.resolve().await?;
        let local = self.local_fingerprint().await;

        if let (Some(remote), Some(local)) = (&link.fingerprint, &local) {
            if remote == local {
                tracing::info!("Local snapshot is up to date ({})", local);
                return Ok(FetchOutcome::Unchanged);
            }
        }

        if link.fingerprint.is_none() && local.is_some() {
            let adopted = self.adopted_version().await;
            if is_not_newer(&link, current_version) || is_not_newer(&link, adopted.as_deref()) {
                tracing::info!(
                    "Remote snapshot {:?} is not newer than {:?} (adopted {:?})",
                    link.version,
                    current_version,
                    adopted
                );
                return Ok(FetchOutcome::Unchanged);
            }
        }

        self.download(&link.url).await?;

        let fingerprint = match self.validate_staged(&link).await {
            Ok(fp) => fp,
            Err(e) => {
                self.discard_staging().await;
                return Err(e);
            }
        };

        if local.as_ref() == Some(&fingerprint) {
            tracing::info!("Downloaded snapshot matches local content, discarding");
            self.discard_staging().await;
            return Ok(FetchOutcome::Unchanged);
        }

        tokio::fs::rename(&self.layout.staging, &self.layout.adopted)
            .await
            .map_err(|e| SnapshotError::Io(self.layout.adopted.clone(), e))?;

        self.record_version(link.version.as_deref()).await;

        tracing::info!(
            "Adopted snapshot {} ({})",
            self.layout.adopted.display(),
            fingerprint
        );

        Ok(FetchOutcome::Updated {
            path: self.layout.adopted.clone(),
            fingerprint,
            version: link.version,
        })
    }

    /// Release tag recorded when the adopted snapshot was fetched.
    async fn adopted_version(&self) -> Option<String> {
        if !self.layout.adopted.exists() {
            return None;
        }
        let tag = tokio::fs::read_to_string(&self.layout.adopted_version)
            .await
            .ok()?;
        let tag = tag.trim();
        (!tag.is_empty()).then(|| tag.to_string())
    }

    async fn record_version(&self, version: Option<&str>) {
        let path = &self.layout.adopted_version;
        let result = match version {
            Some(tag) => tokio::fs::write(path, tag).await,
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            tracing::warn!("Failed to record snapshot version in {}: {}", path.display(), e);
        }
    }

    async fn local_fingerprint(&self) -> Option<Fingerprint> {
        let path = self.locate()?;
        match snapshot_fingerprint(&path).await {
            Ok(fp) => Some(fp),
            Err(e) => {
                tracing::warn!("Ignoring unreadable local snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stream `url` into the staging slot, all or nothing.
    async fn download(&self, url: &Url) -> Result<(), SnapshotError> {
        if let Some(parent) = self.layout.staging.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotError::Io(parent.to_path_buf(), e))?;
        }

        let result = match timeout(self.timeout, self.stream_to_staging(url)).await {
            Ok(result) => result,
            Err(_) => Err(SnapshotError::Timeout(self.timeout)),
        };

        if let Err(e) = result {
            self.discard_staging().await;
            return Err(e);
        }
        Ok(())
    }

    async fn stream_to_staging(&self, url: &Url) -> Result<(), SnapshotError> {
        let staging = &self.layout.staging;
        let io_err = |e| SnapshotError::Io(staging.clone(), e);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SnapshotError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        tracing::debug!("Downloading {} to {}", url, staging.display());

        let mut file = tokio::fs::File::create(staging).await.map_err(io_err)?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len();
        }

        file.flush().await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;

        tracing::debug!("Received {} bytes", written);
        Ok(())
    }

    async fn validate_staged(&self, link: &AssetLink) -> Result<Fingerprint, SnapshotError> {
        let actual = snapshot_fingerprint(&self.layout.staging).await?;

        if let Some(expected) = &link.fingerprint {
            if *expected != actual {
                return Err(SnapshotError::FingerprintMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(actual)
    }

    async fn discard_staging(&self) {
        match tokio::fs::remove_file(&self.layout.staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove staging file {}: {}",
                self.layout.staging.display(),
                e
            ),
        }
    }
}

/// Fingerprint of the base relation in a snapshot file.
pub async fn snapshot_fingerprint(path: &Path) -> Result<Fingerprint, StoreError> {
    let pool = open_snapshot(path).await?;
    let result = Store::new(pool.clone(), Table::Base).fingerprint().await;
    pool.close().await;
    result
}

fn is_not_newer(link: &AssetLink, current_version: Option<&str>) -> bool {
    let remote = link.version.as_deref().and_then(Version::parse);
    let current = current_version.and_then(Version::parse);
    matches!((remote, current), (Some(remote), Some(current)) if remote <= current)
}

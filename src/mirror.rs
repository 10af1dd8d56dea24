//! HTTP mirror publishing a snapshot as an index page plus a download.
//!
//! The index links the asset as `/download/<version>/<asset>#sha256=<hex>`,
//! which is the shape [`crate::snapshot::SnapshotSource`] consumes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::db::StoreError;
use crate::fingerprint::Fingerprint;
use crate::snapshot::snapshot_fingerprint;

/// Request counters, shared with the running router.
#[derive(Debug, Default)]
pub struct MirrorStats {
    index_requests: AtomicU64,
    asset_requests: AtomicU64,
}

impl MirrorStats {
    pub fn index_requests(&self) -> u64 {
        self.index_requests.load(Ordering::SeqCst)
    }

    pub fn asset_requests(&self) -> u64 {
        self.asset_requests.load(Ordering::SeqCst)
    }
}

/// A published snapshot.
#[derive(Debug, Clone)]
pub struct Mirror {
    snapshot: PathBuf,
    asset_name: String,
    version: String,
    fingerprint: Fingerprint,
    stats: Arc<MirrorStats>,
}

impl Mirror {
    /// Publish `snapshot` under `version`. The file is validated up front.
    pub async fn load(
        snapshot: &Path,
        asset_name: &str,
        version: &str,
    ) -> Result<Self, StoreError> {
        let fingerprint = snapshot_fingerprint(snapshot).await?;
        Ok(Self {
            snapshot: snapshot.to_path_buf(),
            asset_name: asset_name.to_string(),
            version: version.to_string(),
            fingerprint,
            stats: Arc::new(MirrorStats::default()),
        })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn stats(&self) -> Arc<MirrorStats> {
        self.stats.clone()
    }

    /// Path of the asset link, fingerprint annotation included.
    pub fn asset_href(&self) -> String {
        format!(
            "/download/{}/{}#sha256={}",
            self.version, self.asset_name, self.fingerprint
        )
    }

    pub fn index_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html><head><title>QzEmoji {version}</title></head>\n<body>\n\
             <h1>QzEmoji {version}</h1>\n<ul><li><a href=\"{href}\">{asset}</a></li></ul>\n\
             </body></html>\n",
            version = self.version,
            href = self.asset_href(),
            asset = self.asset_name,
        )
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/index.html", get(index))
            .route("/download/{version}/{asset}", get(download))
            .route("/health", get(health))
            .with_state(Arc::new(self))
    }
}

async fn index(State(mirror): State<Arc<Mirror>>) -> Html<String> {
    mirror.stats.index_requests.fetch_add(1, Ordering::SeqCst);
    Html(mirror.index_html())
}

async fn download(
    State(mirror): State<Arc<Mirror>>,
    UrlPath((_version, asset)): UrlPath<(String, String)>,
) -> Response {
    if asset != mirror.asset_name {
        return StatusCode::NOT_FOUND.into_response();
    }

    mirror.stats.asset_requests.fetch_add(1, Ordering::SeqCst);

    match tokio::fs::read(&mirror.snapshot).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(
                "Failed to read snapshot {}: {}",
                mirror.snapshot.display(),
                e
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    snapshot_version: String,
    fingerprint: String,
    index_requests: u64,
    asset_requests: u64,
}

async fn health(State(mirror): State<Arc<Mirror>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        snapshot_version: mirror.version.clone(),
        fingerprint: mirror.fingerprint.to_string(),
        index_requests: mirror.stats.index_requests(),
        asset_requests: mirror.stats.asset_requests(),
    })
}

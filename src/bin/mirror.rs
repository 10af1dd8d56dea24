//! QzEmoji Snapshot Mirror
//!
//! Publishes a snapshot file as a release index page plus a download, so
//! clients can point `index_url` at it instead of the upstream release page.
//!
//! # Configuration
//!
//! Environment variables:
//! - `QZEMOJI_MIRROR_PORT`: Port to listen on (default: 8080)
//! - `QZEMOJI_MIRROR_SNAPSHOT`: Snapshot to publish (default: ~/.local/share/qzemoji/emoji.db)
//! - `QZEMOJI_MIRROR_VERSION`: Version tag used in the download path (default: crate version)
//!
//! # Endpoints
//!
//! - `GET /`: Index page linking the asset with its fingerprint
//! - `GET /download/{version}/{asset}`: Snapshot bytes
//! - `GET /health`: Health check with request counters

use std::net::SocketAddr;
use std::path::PathBuf;

use qzemoji::config::{Config, DEFAULT_ASSET_NAME};
use qzemoji::mirror::Mirror;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mirror configuration
#[derive(Debug, Clone)]
struct MirrorConfig {
    /// Port to listen on
    port: u16,
    /// Snapshot file to publish
    snapshot: PathBuf,
    /// Version segment of the download path
    version: String,
}

impl MirrorConfig {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("QZEMOJI_MIRROR_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let snapshot = std::env::var("QZEMOJI_MIRROR_SNAPSHOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Config::default_data_dir().join(DEFAULT_ASSET_NAME));

        let version = std::env::var("QZEMOJI_MIRROR_VERSION")
            .unwrap_or_else(|_| qzemoji::version().to_string());

        Self {
            port,
            snapshot,
            version,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qzemoji=info,qzemoji_mirror=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MirrorConfig::from_env();

    let mirror = match Mirror::load(&config.snapshot, DEFAULT_ASSET_NAME, &config.version).await
    {
        Ok(mirror) => mirror,
        Err(e) => {
            tracing::error!(
                "Failed to load snapshot {}: {}",
                config.snapshot.display(),
                e
            );
            std::process::exit(1);
        }
    };

    tracing::info!("Snapshot: {}", config.snapshot.display());
    tracing::info!("Version: {}", config.version);
    tracing::info!("Fingerprint: {}", mirror.fingerprint());

    let app = mirror.router().layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting mirror on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

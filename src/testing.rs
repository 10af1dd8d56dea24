//! Local HTTP fixtures for tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;

use crate::mirror::{Mirror, MirrorStats};

pub struct TestServer {
    addr: SocketAddr,
    stats: Arc<MirrorStats>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn_router(router: Router) -> TestServer {
    spawn(router, Arc::new(MirrorStats::default())).await
}

/// Publish `snapshot` through a [`Mirror`] on an ephemeral local port.
pub async fn spawn_mirror(snapshot: &Path, version: &str) -> TestServer {
    let mirror = Mirror::load(snapshot, "emoji.db", version).await.unwrap();
    let stats = mirror.stats();
    spawn(mirror.router(), stats).await
}

async fn spawn(router: Router, stats: Arc<MirrorStats>) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    TestServer { addr, stats }
}

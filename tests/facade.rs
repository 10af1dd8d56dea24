use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use qzemoji::db::{init_db, write_snapshot, Entry};
use qzemoji::mirror::{Mirror, MirrorStats};
use qzemoji::{Config, Error, Fallback, Fingerprint, QzEmoji, SyncOutcome};
use tempfile::TempDir;

struct Published {
    addr: SocketAddr,
    stats: Arc<MirrorStats>,
}

impl Published {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn publish(snapshot: &Path, version: &str) -> Published {
    let mirror = Mirror::load(snapshot, "emoji.db", version).await.unwrap();
    let stats = mirror.stats();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = mirror.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Published { addr, stats }
}

fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/emoji.db", addr)
}

fn offline_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::with_data_dir(temp_dir.path().join("data"));
    config.auto_update.value = false;
    config.index_url.value = unreachable_url();
    config.fallback_url.value = unreachable_url();
    config.timeout_secs.value = 5;
    config
}

fn shipped_entries() -> Vec<Entry> {
    vec![Entry::new(400343, "🐷"), Entry::new(125, "困")]
}

async fn shipped_snapshot(temp_dir: &TempDir) -> PathBuf {
    let path = temp_dir.path().join("shipped").join("emoji.db");
    write_snapshot(&path, &shipped_entries()).await.unwrap();
    path
}

#[tokio::test]
async fn test_override_on_empty_base() {
    let temp_dir = TempDir::new().unwrap();
    let emoji = QzEmoji::new(offline_config(&temp_dir));

    emoji.set(100, "ok").await.unwrap();

    assert_eq!(emoji.query(100, &Fallback::Id).await.unwrap(), "ok");
    assert_eq!(emoji.query(1, &Fallback::Id).await.unwrap(), "1");
    assert_eq!(emoji.query(1, &Fallback::from("?")).await.unwrap(), "?");
    assert_eq!(emoji.lookup(1).await.unwrap(), None);
}

#[tokio::test]
async fn test_seeded_base_and_export() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = offline_config(&temp_dir);
    config.seed_snapshot.value = Some(shipped_snapshot(&temp_dir).await);
    let emoji = QzEmoji::new(config);

    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
    assert_eq!(emoji.query(125, &Fallback::Id).await.unwrap(), "困");

    let path = emoji
        .export(&temp_dir.path().join("out").join("emoji.yml"))
        .await
        .unwrap();
    let exported: BTreeMap<i64, String> =
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(
        exported,
        BTreeMap::from([(125, "困".to_string()), (400343, "🐷".to_string())])
    );
}

#[tokio::test]
async fn test_override_wins_over_base_in_export() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = offline_config(&temp_dir);
    config.seed_snapshot.value = Some(shipped_snapshot(&temp_dir).await);
    let emoji = QzEmoji::new(config);

    emoji.set(125, "sleepy").await.unwrap();
    emoji.set(7, "new").await.unwrap();

    assert_eq!(emoji.query(125, &Fallback::Id).await.unwrap(), "sleepy");

    let path = emoji.export(&temp_dir.path().join("emoji.yml")).await.unwrap();
    let exported: BTreeMap<i64, String> =
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(exported.len(), 3);
    assert_eq!(exported[&125], "sleepy");
    assert_eq!(exported[&7], "new");
}

#[tokio::test]
async fn test_corrupt_store_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = offline_config(&temp_dir);

    let pool = init_db(&config.layout().store).await.unwrap();
    sqlx::query("DROP TABLE MyEmoji").execute(&pool).await.unwrap();
    pool.close().await;

    let emoji = QzEmoji::new(config);
    let result = emoji.query(1, &Fallback::Id).await;
    assert!(matches!(result, Err(Error::Corrupt(_))));
}

#[tokio::test]
async fn test_auto_update_fetches_at_most_once() {
    let temp_dir = TempDir::new().unwrap();
    let published_path = temp_dir.path().join("published.db");
    write_snapshot(&published_path, &shipped_entries()).await.unwrap();
    let server = publish(&published_path, "2.2.0").await;

    let mut config = Config::with_data_dir(temp_dir.path().join("data"));
    config.index_url.value = server.url("/");
    config.fallback_url.value = server.url("/download/2.2.0/emoji.db");
    let emoji = QzEmoji::new(config);

    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
    assert_eq!(emoji.query(125, &Fallback::Id).await.unwrap(), "困");
    emoji.set(1, "one").await.unwrap();

    assert_eq!(server.stats.index_requests(), 1);
    assert_eq!(server.stats.asset_requests(), 1);

    let (base, _) = emoji.fingerprints().await.unwrap();
    assert_eq!(base, Fingerprint::of_entries(&shipped_entries()));
}

#[tokio::test]
async fn test_matching_fingerprint_skips_download() {
    let temp_dir = TempDir::new().unwrap();
    let shipped = shipped_snapshot(&temp_dir).await;
    let server = publish(&shipped, "2.2.0").await;

    let mut config = Config::with_data_dir(temp_dir.path().join("data"));
    config.index_url.value = server.url("/");
    config.seed_snapshot.value = Some(shipped);
    let emoji = QzEmoji::new(config);

    assert_eq!(emoji.auto_update().await.unwrap(), Some(SyncOutcome::Unchanged));
    assert_eq!(server.stats.index_requests(), 1);
    assert_eq!(server.stats.asset_requests(), 0);
    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
}

#[tokio::test]
async fn test_network_failure_is_invisible() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = offline_config(&temp_dir);
    config.auto_update.value = true;
    config.seed_snapshot.value = Some(shipped_snapshot(&temp_dir).await);
    let emoji = QzEmoji::new(config);

    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
    assert!(matches!(
        emoji.auto_update().await.unwrap(),
        Some(SyncOutcome::Failed(_))
    ));
    emoji.set(1, "still writable").await.unwrap();
    assert_eq!(
        emoji.query(1, &Fallback::Id).await.unwrap(),
        "still writable"
    );
}

#[tokio::test]
async fn test_disabled_auto_update_makes_no_requests() {
    let temp_dir = TempDir::new().unwrap();
    let published_path = temp_dir.path().join("published.db");
    write_snapshot(&published_path, &shipped_entries()).await.unwrap();
    let server = publish(&published_path, "2.2.0").await;

    let mut config = Config::with_data_dir(temp_dir.path().join("data"));
    config.index_url.value = server.url("/");
    config.auto_update.value = false;
    let emoji = QzEmoji::new(config);

    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "400343");
    assert_eq!(emoji.auto_update().await.unwrap(), None);
    assert_eq!(server.stats.index_requests(), 0);

    // An explicit update still goes out
    assert!(matches!(
        emoji.update().await.unwrap(),
        SyncOutcome::Updated { entries: 2, .. }
    ));
    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
}

#[tokio::test]
async fn test_update_from_keeps_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let emoji = QzEmoji::new(offline_config(&temp_dir));
    emoji.set(125, "mine").await.unwrap();

    let outcome = emoji
        .update_from(&shipped_snapshot(&temp_dir).await)
        .await
        .unwrap();

    assert!(matches!(outcome, SyncOutcome::Updated { entries: 2, .. }));
    assert_eq!(emoji.query(125, &Fallback::Id).await.unwrap(), "mine");
    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "🐷");
}

#[tokio::test]
async fn test_update_from_rejects_foreign_database() {
    let temp_dir = TempDir::new().unwrap();
    let emoji = QzEmoji::new(offline_config(&temp_dir));

    let foreign = temp_dir.path().join("foreign.db");
    std::fs::write(&foreign, b"not a database").unwrap();

    assert!(emoji.update_from(&foreign).await.is_err());
    assert_eq!(emoji.query(400343, &Fallback::Id).await.unwrap(), "400343");
}

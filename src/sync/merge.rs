use std::path::Path;

use crate::db::{open_snapshot, OverlayTable, Store, Table};
use crate::fingerprint::Fingerprint;
use crate::snapshot::SnapshotError;

use super::{SyncError, SyncOutcome};

/// Replace the base relation of `table` with the content of a snapshot file.
///
/// The snapshot is fully loaded (and checked against `expected`, if given)
/// before the base relation is touched. A base relation that already holds
/// the same content is left alone.
pub async fn merge_snapshot(
    table: &OverlayTable,
    snapshot: &Path,
    expected: Option<&Fingerprint>,
) -> Result<SyncOutcome, SyncError> {
    let pool = open_snapshot(snapshot).await?;
    let entries = Store::new(pool.clone(), Table::Base).entries().await;
    pool.close().await;
    let entries = entries?;

    let incoming = Fingerprint::of_sorted(entries.iter());
    if let Some(expected) = expected {
        if *expected != incoming {
            return Err(SnapshotError::FingerprintMismatch {
                expected: expected.clone(),
                actual: incoming,
            }
            .into());
        }
    }

    if table.base().fingerprint().await? == incoming {
        tracing::info!("Base table already matches {}", incoming);
        return Ok(SyncOutcome::Unchanged);
    }

    table.replace_base(&entries).await?;

    let stored = table.base().fingerprint().await?;
    if stored != incoming {
        return Err(SnapshotError::FingerprintMismatch {
            expected: incoming,
            actual: stored,
        }
        .into());
    }

    tracing::info!(
        "Replaced base table with {} entries from {} ({})",
        entries.len(),
        snapshot.display(),
        incoming
    );

    Ok(SyncOutcome::Updated {
        entries: entries.len(),
        fingerprint: incoming,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, write_snapshot, Entry};
    use tempfile::TempDir;

    struct TestContext {
        table: OverlayTable,
        temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("qzemoji.db")).await.unwrap();
        TestContext {
            table: OverlayTable::new(pool),
            temp_dir,
        }
    }

    #[tokio::test]
    async fn test_merge_replaces_base_and_keeps_overrides() {
        let ctx = setup().await;
        ctx.table.replace_base(&[Entry::new(1, "stale")]).await.unwrap();
        ctx.table.set(125, "mine").await.unwrap();

        let snapshot = ctx.temp_dir.path().join("emoji.db");
        let entries = vec![Entry::new(125, "困"), Entry::new(400343, "🐷")];
        write_snapshot(&snapshot, &entries).await.unwrap();

        let outcome = merge_snapshot(&ctx.table, &snapshot, None).await.unwrap();

        let fingerprint = Fingerprint::of_entries(&entries);
        assert_eq!(
            outcome,
            SyncOutcome::Updated {
                entries: 2,
                fingerprint: fingerprint.clone()
            }
        );
        assert_eq!(ctx.table.base().fingerprint().await.unwrap(), fingerprint);
        assert_eq!(ctx.table.query(1).await.unwrap(), None);
        assert_eq!(ctx.table.query(125).await.unwrap().as_deref(), Some("mine"));
        assert_eq!(ctx.table.query(400343).await.unwrap().as_deref(), Some("🐷"));
    }

    #[tokio::test]
    async fn test_merge_same_content_is_unchanged() {
        let ctx = setup().await;
        let entries = vec![Entry::new(125, "困")];
        ctx.table.replace_base(&entries).await.unwrap();

        let snapshot = ctx.temp_dir.path().join("emoji.db");
        write_snapshot(&snapshot, &entries).await.unwrap();

        let outcome = merge_snapshot(&ctx.table, &snapshot, None).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_merge_rejects_unexpected_content() {
        let ctx = setup().await;
        ctx.table.replace_base(&[Entry::new(1, "keep")]).await.unwrap();

        let snapshot = ctx.temp_dir.path().join("emoji.db");
        write_snapshot(&snapshot, &[Entry::new(2, "new")]).await.unwrap();
        let wrong = Fingerprint::of_entries(&[Entry::new(3, "other")]);

        let result = merge_snapshot(&ctx.table, &snapshot, Some(&wrong)).await;

        assert!(matches!(
            result,
            Err(SyncError::Snapshot(SnapshotError::FingerprintMismatch { .. }))
        ));
        assert_eq!(ctx.table.base().get(1).await.unwrap().as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn test_merge_invalid_file_leaves_base_alone() {
        let ctx = setup().await;
        ctx.table.replace_base(&[Entry::new(1, "keep")]).await.unwrap();

        let snapshot = ctx.temp_dir.path().join("garbage.db");
        std::fs::write(&snapshot, b"definitely not sqlite").unwrap();

        assert!(merge_snapshot(&ctx.table, &snapshot, None).await.is_err());
        assert_eq!(ctx.table.base().get(1).await.unwrap().as_deref(), Some("keep"));
    }
}

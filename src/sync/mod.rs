//! One-shot synchronization of the base table from the remote snapshot.
//!
//! The synchronizer moves through `Unsynced -> Syncing -> Synced` once per
//! handle. Concurrent callers share the in-flight attempt, and the attempt
//! runs on its own task so a caller that stops waiting does not abandon a
//! half-finished replacement. A failed attempt is terminal as well: the
//! remote is contacted at most once unless [`Synchronizer::reset`] is called.

mod merge;

pub use merge::merge_snapshot;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

use crate::db::{OverlayTable, StoreError};
use crate::fingerprint::Fingerprint;
use crate::snapshot::{FetchOutcome, SnapshotError, SnapshotSource};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a synchronization attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local data is current.
    Unchanged,
    /// The base table was replaced.
    Updated {
        entries: usize,
        fingerprint: Fingerprint,
    },
    /// The attempt failed; the base table is as it was.
    Failed(String),
}

/// Observable state of a [`Synchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Unsynced,
    Syncing,
    Synced,
}

type InFlight = Shared<BoxFuture<'static, SyncOutcome>>;

enum SyncState {
    Unsynced,
    Syncing(InFlight),
    Synced(SyncOutcome),
}

struct Inner {
    source: SnapshotSource,
    table: OverlayTable,
    current_version: Option<String>,
    state: Mutex<SyncState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, outcome: &SyncOutcome) {
        let mut state = self.state();
        if matches!(*state, SyncState::Syncing(_)) {
            *state = SyncState::Synced(outcome.clone());
        }
    }

    async fn attempt(&self) -> SyncOutcome {
        match self.try_attempt().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Failed to synchronize emoji snapshot: {}", e);
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_attempt(&self) -> Result<SyncOutcome, SyncError> {
        match self.source.fetch(self.current_version.as_deref()).await? {
            FetchOutcome::Unchanged => self.catch_up().await,
            FetchOutcome::Updated {
                path, fingerprint, ..
            } => merge_snapshot(&self.table, &path, Some(&fingerprint)).await,
        }
    }

    /// The local snapshot is current, but the base relation may still lag
    /// behind it if an earlier merge never committed.
    async fn catch_up(&self) -> Result<SyncOutcome, SyncError> {
        match self.source.locate() {
            Some(path) => merge_snapshot(&self.table, &path, None).await,
            None => Ok(SyncOutcome::Unchanged),
        }
    }
}

/// Single-flight, run-once synchronizer for an [`OverlayTable`].
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    /// `current_version` is the release the local data is known to be at,
    /// used when the remote index carries no fingerprint.
    pub fn new(
        source: SnapshotSource,
        table: OverlayTable,
        current_version: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                table,
                current_version,
                state: Mutex::new(SyncState::Unsynced),
            }),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        match *self.inner.state() {
            SyncState::Unsynced => SyncPhase::Unsynced,
            SyncState::Syncing(_) => SyncPhase::Syncing,
            SyncState::Synced(_) => SyncPhase::Synced,
        }
    }

    /// Outcome of the finished attempt, if any.
    pub fn outcome(&self) -> Option<SyncOutcome> {
        match &*self.inner.state() {
            SyncState::Synced(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Synchronize unless an attempt already happened on this handle.
    pub async fn sync_once(&self) -> SyncOutcome {
        let in_flight = {
            let mut state = self.inner.state();
            match &*state {
                SyncState::Synced(outcome) => return outcome.clone(),
                SyncState::Syncing(in_flight) => in_flight.clone(),
                SyncState::Unsynced => {
                    let in_flight = self.start();
                    *state = SyncState::Syncing(in_flight.clone());
                    in_flight
                }
            }
        };

        in_flight.await
    }

    /// Allow another attempt. Has no effect while an attempt is running.
    ///
    /// Returns true if the state went back to `Unsynced`.
    pub fn reset(&self) -> bool {
        let mut state = self.inner.state();
        match *state {
            SyncState::Syncing(_) => false,
            _ => {
                *state = SyncState::Unsynced;
                true
            }
        }
    }

    fn start(&self) -> InFlight {
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            tracing::debug!("Starting emoji snapshot synchronization");
            let outcome = inner.attempt().await;
            inner.finish(&outcome);
            outcome
        });

        let inner = self.inner.clone();
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome = SyncOutcome::Failed(format!("synchronization task failed: {}", e));
                    inner.finish(&outcome);
                    outcome
                }
            }
        }
        .boxed()
        .shared()
    }
}

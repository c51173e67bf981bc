//! Catalog synchronizer
//!
//! Orchestrates "is there anything new?" against the remote version
//! descriptor, then fetch → decode → batched upsert → watermark advance.
//! The watermark only moves after at least one record lands, so a failed
//! or cancelled run is always safe to retry: batches are upserts by
//! reference, and the unadvanced watermark makes the next run redo them.

use crate::db::{
    Database, ProductRepository, SqliteProductRepository, SqliteWatermarkRepository,
    WatermarkRepository,
};
use crate::decode::decode_document;
use crate::error::{Error, Result};
use crate::models::Watermark;
use crate::remote::RemoteCatalog;
use crate::state::SyncStatus;
use chrono::Utc;
use tokio::sync::{watch, Mutex};

/// Records written to the store per transaction, bounding peak memory on
/// large datasets
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Summary of a committed sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Records upserted into the store
    pub applied: usize,
    /// Records skipped by the decoder
    pub rejected: usize,
    /// Write transactions issued
    pub batches: usize,
    /// Rows removed by the full-dataset sweep
    pub swept: usize,
    /// Whether the full-dataset path was taken (first install)
    pub full_dataset: bool,
    /// Watermark timestamp recorded for this run
    pub timestamp: i64,
}

/// Result of a sync attempt that did not error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Local watermark is current; nothing fetched
    UpToDate,
    /// Dataset applied and watermark advanced
    Completed(SyncReport),
    /// Another sync held the guard; this request was dropped
    AlreadyRunning,
}

/// The catalog synchronizer.
///
/// Constructed once at process start and threaded by reference to the
/// scheduler and any UI; status is observable through a watch channel
/// rather than shared global flags.
pub struct Synchronizer<R> {
    remote: R,
    batch_size: usize,
    guard: Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

impl<R: RemoteCatalog> Synchronizer<R> {
    pub fn new(remote: R) -> Self {
        Self::with_batch_size(remote, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(remote: R, batch_size: usize) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            remote,
            batch_size: batch_size.max(1),
            guard: Mutex::new(()),
            status,
        }
    }

    /// Subscribe to status updates (e.g. to suppress UI interaction while
    /// a sync is in flight)
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Whether a sync currently holds the guard
    pub fn is_running(&self) -> bool {
        self.guard.try_lock().is_err()
    }

    /// Run one synchronization attempt.
    ///
    /// At most one attempt runs at a time; a request arriving while one is
    /// in flight returns `Outcome::AlreadyRunning` instead of queueing.
    pub async fn run(&self, db: &Database) -> Result<Outcome> {
        let Ok(_guard) = self.guard.try_lock() else {
            tracing::debug!("sync already in flight, dropping request");
            return Ok(Outcome::AlreadyRunning);
        };

        let result = self.run_locked(db).await;
        self.status.send_replace(match &result {
            Ok(Outcome::Completed(_)) => SyncStatus::Committed,
            Ok(Outcome::UpToDate) => SyncStatus::UpToDate,
            Ok(Outcome::AlreadyRunning) => SyncStatus::Idle,
            Err(_) => SyncStatus::Failed,
        });
        result
    }

    async fn run_locked(&self, db: &Database) -> Result<Outcome> {
        self.status.send_replace(SyncStatus::CheckingVersion);

        let watermark_repo = SqliteWatermarkRepository::new(db.connection());
        let local_timestamp = watermark_repo.last_timestamp()?;
        let first_install = local_timestamp == 0;

        let descriptor = self.remote.fetch_version().await?;

        // Strictly newer triggers a sync; the zero sentinel bypasses the
        // comparison so an empty store is always populated, whatever the
        // remote timestamp says
        if !first_install && descriptor.timestamp <= local_timestamp {
            tracing::debug!(
                remote = descriptor.timestamp,
                local = local_timestamp,
                "catalog is up to date"
            );
            return Ok(Outcome::UpToDate);
        }

        self.status.send_replace(SyncStatus::Downloading);
        let body = if first_install {
            tracing::info!(version = %descriptor.version, "first install, fetching full dataset");
            self.remote.fetch_full().await?
        } else {
            tracing::info!(
                version = %descriptor.version,
                since = local_timestamp,
                "fetching changes"
            );
            self.remote.fetch_changes_since(local_timestamp).await?
        };

        self.status.send_replace(SyncStatus::Applying);
        let document = decode_document(&body)?;
        if document.products.is_empty() {
            return Err(Error::EmptyDocument);
        }

        let generation = Utc::now().timestamp_millis();
        let repo = SqliteProductRepository::new(db.connection());

        let mut applied = 0;
        let mut batches = 0;
        for chunk in document.products.chunks(self.batch_size) {
            applied += repo.upsert_batch(chunk, generation)?;
            batches += 1;
            tracing::debug!(batch = batches, records = chunk.len(), "batch written");
        }

        // Only the full dataset is known to be complete, so only that path
        // may treat an untouched row as deleted upstream
        let swept = if first_install {
            repo.prune_generations_before(generation)?
        } else {
            0
        };

        let timestamp = if descriptor.timestamp > 0 {
            descriptor.timestamp
        } else {
            Utc::now().timestamp_millis()
        };
        watermark_repo.set(&Watermark::new(timestamp, descriptor.version))?;

        tracing::info!(
            applied,
            rejected = document.rejected.len(),
            swept,
            batches,
            "sync committed"
        );

        Ok(Outcome::Completed(SyncReport {
            applied,
            rejected: document.rejected.len(),
            batches,
            swept,
            full_dataset: first_install,
            timestamp,
        }))
    }
}

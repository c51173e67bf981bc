//! Periodic sync scheduling
//!
//! First launch syncs immediately (gated by a settings flag so later
//! launches skip it); after that, runs fire at the top of every hour.
//! Transient failures retry with a linearly growing delay; anything else
//! aborts the cycle and waits for the next slot.

use std::time::Duration;

use chrono::{Timelike, Utc};
use pricebook_core::db::{Database, SettingsRepository, SqliteSettingsRepository};
use pricebook_core::remote::RemoteCatalog;
use pricebook_core::sync::{Outcome, Synchronizer};
use pricebook_core::Result;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(30);

pub struct Scheduler<'a, R> {
    sync: &'a Synchronizer<R>,
    retry_base: Duration,
    max_attempts: u32,
}

impl<'a, R: RemoteCatalog> Scheduler<'a, R> {
    pub const fn new(sync: &'a Synchronizer<R>) -> Self {
        Self {
            sync,
            retry_base: RETRY_BASE_DELAY,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    #[cfg(test)]
    const fn with_retry_base(sync: &'a Synchronizer<R>, retry_base: Duration) -> Self {
        Self {
            sync,
            retry_base,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Run one sync cycle, retrying transient failures with a linear
    /// backoff (base delay times the attempt number).
    pub async fn run_with_retry(&self, db: &Database) -> Result<Outcome> {
        let mut attempt = 1;
        loop {
            match self.sync.run(db).await {
                Ok(outcome) => return Ok(outcome),
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = self.retry_base * attempt;
                    tracing::warn!(attempt, ?delay, %error, "sync failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Sync immediately if this install has never attempted one.
    ///
    /// The flag is only set after a committed or up-to-date run, so a
    /// launch that fails outright will try again next time.
    pub async fn ensure_first_run(&self, db: &Database) -> Result<Option<Outcome>> {
        let settings = SqliteSettingsRepository::new(db.connection());
        if settings.first_run_completed()? {
            return Ok(None);
        }

        tracing::info!("first launch, syncing catalog now");
        let outcome = self.run_with_retry(db).await?;
        settings.mark_first_run_completed()?;
        Ok(Some(outcome))
    }

    /// Watch loop: first-run sync, then one cycle at the top of every hour.
    pub async fn watch(&self, db: &Database) -> Result<()> {
        if let Err(error) = self.ensure_first_run(db).await {
            tracing::error!(%error, "first-launch sync failed");
        }

        loop {
            let delay = delay_until_next_hour();
            tracing::debug!(?delay, "sleeping until next sync slot");
            tokio::time::sleep(delay).await;

            match self.run_with_retry(db).await {
                Ok(Outcome::Completed(report)) => {
                    tracing::info!(applied = report.applied, swept = report.swept, "sync cycle done");
                }
                Ok(Outcome::UpToDate) => tracing::info!("catalog is up to date"),
                Ok(Outcome::AlreadyRunning) => tracing::debug!("sync cycle skipped, already running"),
                Err(error) => tracing::error!(%error, "sync cycle failed"),
            }
        }
    }
}

/// Time left until the next top of the hour, minimum one second so a
/// cycle finishing exactly on the boundary cannot spin.
fn delay_until_next_hour() -> Duration {
    let now = Utc::now();
    let seconds_into_hour = u64::from(now.minute()) * 60 + u64::from(now.second());
    Duration::from_secs((3600 - seconds_into_hour).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricebook_core::remote::VersionDescriptor;
    use pricebook_core::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyRemote {
        failures_before_success: u32,
        version_calls: Arc<AtomicU32>,
        transient: bool,
    }

    impl FlakyRemote {
        fn new(failures_before_success: u32, transient: bool) -> (Self, Arc<AtomicU32>) {
            let version_calls = Arc::new(AtomicU32::new(0));
            let remote = Self {
                failures_before_success,
                version_calls: Arc::clone(&version_calls),
                transient,
            };
            (remote, version_calls)
        }
    }

    impl RemoteCatalog for FlakyRemote {
        async fn fetch_version(&self) -> Result<VersionDescriptor> {
            let call = self.version_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(if self.transient {
                    Error::Transport("connection reset".into())
                } else {
                    Error::Decode("not json".into())
                });
            }
            Ok(VersionDescriptor {
                version: "2.0.0".to_string(),
                timestamp: 2000,
                change_count: 1,
            })
        }

        async fn fetch_full(&self) -> Result<String> {
            Ok(r#"[{"referencia": "REF-1", "descripcion": "Taladro"}]"#.to_string())
        }

        async fn fetch_changes_since(&self, _since: i64) -> Result<String> {
            self.fetch_full().await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failures_retry_until_success() {
        let db = Database::open_in_memory().unwrap();
        let (remote, calls) = FlakyRemote::new(2, true);
        let sync = Synchronizer::new(remote);
        let scheduler = Scheduler::with_retry_base(&sync, Duration::from_millis(1));

        let outcome = scheduler.run_with_retry(&db).await.unwrap();
        assert!(matches!(outcome, Outcome::Completed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_transient_failures_abort_immediately() {
        let db = Database::open_in_memory().unwrap();
        let (remote, calls) = FlakyRemote::new(2, false);
        let sync = Synchronizer::new(remote);
        let scheduler = Scheduler::with_retry_base(&sync, Duration::from_millis(1));

        let error = scheduler.run_with_retry(&db).await.unwrap_err();
        assert!(!error.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retries_are_bounded() {
        let db = Database::open_in_memory().unwrap();
        let (remote, calls) = FlakyRemote::new(u32::MAX, true);
        let sync = Synchronizer::new(remote);
        let scheduler = Scheduler::with_retry_base(&sync, Duration::from_millis(1));

        let error = scheduler.run_with_retry(&db).await.unwrap_err();
        assert!(error.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_run_only_syncs_once() {
        let db = Database::open_in_memory().unwrap();
        let (remote, calls) = FlakyRemote::new(0, true);
        let sync = Synchronizer::new(remote);
        let scheduler = Scheduler::with_retry_base(&sync, Duration::from_millis(1));

        let first = scheduler.ensure_first_run(&db).await.unwrap();
        assert!(matches!(first, Some(Outcome::Completed(_))));

        let second = scheduler.ensure_first_run(&db).await.unwrap();
        assert!(second.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_first_run_leaves_flag_unset() {
        let db = Database::open_in_memory().unwrap();
        let (remote, _calls) = FlakyRemote::new(u32::MAX, false);
        let sync = Synchronizer::new(remote);
        let scheduler = Scheduler::with_retry_base(&sync, Duration::from_millis(1));

        assert!(scheduler.ensure_first_run(&db).await.is_err());

        let settings = SqliteSettingsRepository::new(db.connection());
        assert!(!settings.first_run_completed().unwrap());
    }

    #[test]
    fn delay_until_next_hour_is_within_one_hour() {
        let delay = delay_until_next_hour();
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_secs(3600));
    }
}

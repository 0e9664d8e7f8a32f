//! Periodic reconciliation of due deletion records.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::store::ExpiryStore;

/// Capability to delete a message on the remote transport.
///
/// Failures are opaque to the sweeper (already deleted, permission
/// revoked, network error all look the same); the record is purged either
/// way so a dead target cannot resurface on every tick.
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()>;
}

const FAST_POLL: Duration = Duration::from_secs(10);
const COARSE_POLL: Duration = Duration::from_secs(60);
const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Sweep timing.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Time before the first tick after startup.
    pub initial_delay: Duration,
}

impl SweepConfig {
    /// Pick a sweep interval for the configured default deletion delay.
    ///
    /// Sub-minute default delays mean sub-minute deadlines are in active
    /// use, and those need fine-grained sweeps to stay accurate.
    pub fn for_default_delay(default_hours: f64) -> Self {
        let interval = if default_hours < 1.0 / 60.0 {
            FAST_POLL
        } else {
            COARSE_POLL
        };
        Self {
            interval,
            initial_delay: INITIAL_DELAY,
        }
    }
}

/// Drives the recurring due-check-and-purge cycle.
pub struct Sweeper {
    store: Arc<ExpiryStore>,
    deleter: Arc<dyn MessageDeleter>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(store: Arc<ExpiryStore>, deleter: Arc<dyn MessageDeleter>, config: SweepConfig) -> Self {
        Self {
            store,
            deleter,
            config,
        }
    }

    /// Run sweep ticks until `cancel` fires.
    ///
    /// A tick already in progress finishes; no new tick starts after
    /// cancellation is observed.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "Sweep loop started"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Sweep loop stopped");
                return;
            }
            _ = tokio::time::sleep(self.config.initial_delay) => {}
        }

        loop {
            self.sweep().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("Sweep loop stopped");
    }

    /// One tick against the current clock.
    pub async fn sweep(&self) {
        self.sweep_at(Utc::now()).await;
    }

    /// One tick: fetch records due at `now`, attempt each deletion, and
    /// purge the record regardless of the outcome.
    ///
    /// Nothing here propagates an error: a failed due-fetch skips the tick
    /// (retried on the next one), and per-record failures are logged and
    /// swallowed.
    pub async fn sweep_at(&self, now: DateTime<Utc>) {
        let due = match self.store.due(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!("Skipping sweep tick, due query failed: {e}");
                return;
            }
        };

        if !due.is_empty() {
            debug!(count = due.len(), "Processing due deletion records");
        }

        for record in due {
            match self
                .deleter
                .delete_message(record.chat_id, record.message_id)
                .await
            {
                Ok(()) => info!(
                    chat_id = record.chat_id,
                    message_id = record.message_id,
                    "Deleted scheduled message"
                ),
                Err(e) => error!(
                    chat_id = record.chat_id,
                    message_id = record.message_id,
                    "Failed to delete message: {e}"
                ),
            }

            // Purge even after a failed deletion; a record left behind
            // would be retried on every tick forever.
            if let Err(e) = self.store.remove(record.id).await {
                warn!(record_id = record.id, "Failed to remove deletion record: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedDeleter {
        calls: Mutex<Vec<(i64, i64)>>,
        fail: bool,
    }

    impl ScriptedDeleter {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<(i64, i64)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageDeleter for ScriptedDeleter {
        async fn delete_message(&self, chat_id: i64, message_id: i64) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push((chat_id, message_id));
            if self.fail {
                anyhow::bail!("simulated transport failure");
            }
            Ok(())
        }
    }

    fn sweeper(deleter: Arc<ScriptedDeleter>) -> (Arc<ExpiryStore>, Sweeper) {
        let store = Arc::new(ExpiryStore::open_in_memory().unwrap());
        let sweeper = Sweeper::new(
            store.clone(),
            deleter,
            SweepConfig::for_default_delay(24.0),
        );
        (store, sweeper)
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_due_records() {
        let deleter = Arc::new(ScriptedDeleter::default());
        let (store, sweeper) = sweeper(deleter.clone());

        let now = Utc::now();
        store
            .insert(-100, 7, now + ChronoDuration::hours(1), "del_after_1.0h")
            .await
            .unwrap();

        // Half an hour in: nothing due yet.
        sweeper.sweep_at(now + ChronoDuration::minutes(30)).await;
        assert!(deleter.calls().is_empty());

        // Past the deadline: deleted and purged.
        sweeper.sweep_at(now + ChronoDuration::minutes(61)).await;
        assert_eq!(deleter.calls(), vec![(-100, 7)]);

        // Next tick finds nothing.
        sweeper.sweep_at(now + ChronoDuration::minutes(62)).await;
        assert_eq!(deleter.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_deletion_still_purges_record() {
        let deleter = Arc::new(ScriptedDeleter::failing());
        let (store, sweeper) = sweeper(deleter.clone());

        let now = Utc::now();
        store
            .insert(-100, 9, now - ChronoDuration::minutes(5), "del_after_0.1h")
            .await
            .unwrap();

        sweeper.sweep_at(now).await;
        assert_eq!(deleter.calls(), vec![(-100, 9)]);
        assert!(store.due(now + ChronoDuration::hours(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_records_processed_in_order() {
        let deleter = Arc::new(ScriptedDeleter::default());
        let (store, sweeper) = sweeper(deleter.clone());

        let now = Utc::now();
        store.insert(-1, 1, now, "a").await.unwrap();
        store.insert(-2, 2, now, "b").await.unwrap();
        store.insert(-3, 3, now, "c").await.unwrap();

        sweeper.sweep_at(now).await;
        assert_eq!(deleter.calls(), vec![(-1, 1), (-2, 2), (-3, 3)]);
    }

    #[tokio::test]
    async fn test_run_exits_promptly_on_cancel() {
        let deleter = Arc::new(ScriptedDeleter::default());
        let (_store, sweeper) = sweeper(deleter);

        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), Arc::new(sweeper).run(cancel))
            .await
            .expect("sweep loop should exit promptly on cancel");
    }

    #[test]
    fn test_interval_selection() {
        // Sub-minute default delay switches to the fast poll interval.
        assert_eq!(
            SweepConfig::for_default_delay(0.01).interval,
            Duration::from_secs(10)
        );
        assert_eq!(
            SweepConfig::for_default_delay(24.0).interval,
            Duration::from_secs(60)
        );
        assert_eq!(
            SweepConfig::for_default_delay(1.0 / 60.0).interval,
            Duration::from_secs(60)
        );
    }
}

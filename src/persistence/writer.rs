//! Debounced background snapshot writer
//!
//! Every applied adjustment pokes a [`PersistTrigger`]; the writer waits out
//! the debounce window so a burst of updates costs one write, then saves a
//! fresh ledger snapshot. Write failures are logged and the in-memory state
//! stays authoritative.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::snapshot::SnapshotStore;
use crate::trust::{TrustLedger, TrustUpdate, TrustUpdateSink};

/// Ledger sink that schedules a snapshot write
#[derive(Clone, Default)]
pub struct PersistTrigger {
    notify: Arc<Notify>,
}

impl PersistTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.notify.notify_one();
    }
}

impl TrustUpdateSink for PersistTrigger {
    fn publish(&self, _update: &TrustUpdate) {
        self.request();
    }
}

pub struct SnapshotWriter {
    ledger: Arc<TrustLedger>,
    store: SnapshotStore,
    debounce: Duration,
    trigger: PersistTrigger,
}

impl SnapshotWriter {
    pub fn new(
        ledger: Arc<TrustLedger>,
        store: SnapshotStore,
        debounce: Duration,
        trigger: PersistTrigger,
    ) -> Self {
        Self {
            ledger,
            store,
            debounce,
            trigger,
        }
    }

    /// Write the current ledger state immediately
    pub async fn flush(&self) -> Result<()> {
        self.store.save(&self.ledger.snapshot()).await
    }

    async fn flush_logged(&self) {
        if let Err(e) = self.flush().await {
            error!(
                dir = %self.store.dir().display(),
                error = %e,
                cause = %e.root_cause(),
                "Failed to persist trust snapshot"
            );
        }
    }

    /// Run until `shutdown` flips to true, then write one final snapshot
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                dir = %self.store.dir().display(),
                debounce_ms = self.debounce.as_millis() as u64,
                "Trust snapshot writer started"
            );

            loop {
                tokio::select! {
                    _ = self.trigger.notify.notified() => {
                        tokio::time::sleep(self.debounce).await;
                        self.flush_logged().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            self.flush_logged().await;
            info!("Trust snapshot writer stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrustConfig;
    use crate::trust::CasinoCategory;

    #[tokio::test]
    async fn test_burst_is_written_after_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "casino.json", "degen.json");
        let trigger = PersistTrigger::new();
        let ledger = Arc::new(
            TrustLedger::new(TrustConfig::default()).with_sink(Arc::new(trigger.clone())),
        );

        let (tx, rx) = watch::channel(false);
        let handle = SnapshotWriter::new(
            ledger.clone(),
            store.clone(),
            Duration::from_millis(20),
            trigger,
        )
        .spawn(rx);

        for _ in 0..10 {
            ledger.apply_casino_delta("acme", CasinoCategory::Support, -1.0, "slow", None);
        }

        let mut written = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let snapshot = store.load().await.unwrap();
            if snapshot
                .casinos
                .get("acme")
                .map_or(false, |r| r.history.len() == 10)
            {
                written = true;
                break;
            }
        }
        assert!(written);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), "casino.json", "degen.json");
        let trigger = PersistTrigger::new();
        let ledger = Arc::new(TrustLedger::new(TrustConfig::default()));
        ledger.apply_casino_delta("acme", CasinoCategory::Bonus, -2.0, "nerf", Some(1));

        let (tx, rx) = watch::channel(false);
        let handle = SnapshotWriter::new(ledger, store.clone(), Duration::from_secs(60), trigger)
            .spawn(rx);
        tx.send(true).unwrap();
        handle.await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert!(snapshot.casinos.contains_key("acme"));
    }
}

//! Periodic tilt recovery
//!
//! Wakes on a fixed interval and decays every user's tilt indicators in
//! proportion to the time since their last update. Each user is recovered
//! under their own entry lock and the task yields between users, so a pass
//! never stalls event handling.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ledger::TrustLedger;

pub struct RecoveryScheduler {
    ledger: Arc<TrustLedger>,
    interval: Duration,
}

impl RecoveryScheduler {
    pub fn new(ledger: Arc<TrustLedger>, interval: Duration) -> Self {
        Self { ledger, interval }
    }

    /// One recovery pass over every user with outstanding tilt
    pub async fn run_once(&self) -> usize {
        let candidates = self.ledger.recovery_candidates();
        let mut recovered = 0;

        for user_id in candidates {
            if let Some(update) = self.ledger.recover_entity_at(&user_id, Utc::now()) {
                debug!(user_id = %user_id, delta = update.delta, "Tilt recovered");
                recovered += 1;
            }
            tokio::task::yield_now().await;
        }

        recovered
    }

    /// Run passes until `shutdown` flips to true. The first pass happens one
    /// full interval after start.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            info!(interval_secs = self.interval.as_secs(), "Trust recovery scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let recovered = self.run_once().await;
                        info!(recovered, "Trust recovery pass complete");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Trust recovery scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrustConfig;
    use crate::trust::record::DegenCategory;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_run_once_recovers_only_tilted_users() {
        let ledger = Arc::new(TrustLedger::new(TrustConfig::default()));
        let earlier = Utc::now() - ChronoDuration::hours(2);
        ledger.apply_degen_delta_at("tilted", DegenCategory::Tilt, 3.0, "tilt", None, earlier);
        ledger.apply_degen_delta_at("calm", DegenCategory::Behavior, 1.0, "tip", None, earlier);

        let scheduler = RecoveryScheduler::new(ledger.clone(), Duration::from_secs(3600));
        assert_eq!(scheduler.run_once().await, 1);

        let record = ledger.degen_breakdown("tilted");
        assert!(record.tilt_indicators < 3.0);
        assert!(record.tilt_indicators >= 1.9);
        assert_eq!(ledger.degen_breakdown("calm").history.len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_scheduler_stops_on_shutdown() {
        let ledger = Arc::new(TrustLedger::new(TrustConfig::default()));
        let (tx, rx) = watch::channel(false);
        let handle = RecoveryScheduler::new(ledger, Duration::from_secs(3600)).spawn(rx);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}

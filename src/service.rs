//! Service lifecycle
//!
//! Wires the ledger, detector, grader, bus and background tasks together.
//!
//! Startup: load snapshot → build ledger → spawn dispatcher, snapshot
//! writer and recovery scheduler. Shutdown runs in reverse: stop recovery,
//! drain queued events, then let the writer flush one final snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::bus::{Dispatcher, EventBus};
use crate::config::OracleConfig;
use crate::gameplay::AnomalyDetector;
use crate::grading::{CasinoTelemetry, CompositeGrader, GradingReport};
use crate::persistence::{PersistTrigger, SnapshotStore, SnapshotWriter};
use crate::trust::{RecoveryScheduler, TrustLedger};

/// A background task plus its stop signal
struct Worker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    async fn stop(self, name: &str) -> Result<()> {
        // The task may already be gone; awaiting the handle still reports a panic
        let _ = self.stop.send(true);
        self.handle
            .await
            .with_context(|| format!("{} task failed", name))
    }
}

pub struct TrustService {
    ledger: Arc<TrustLedger>,
    detector: Arc<AnomalyDetector>,
    grader: CompositeGrader,
    bus: EventBus,
    dispatcher: Worker,
    writer: Option<Worker>,
    recovery: Option<Worker>,
}

impl TrustService {
    /// Load persisted state and start the background tasks. Events are only
    /// accepted once the snapshot is in place.
    pub async fn start(config: OracleConfig) -> Result<Self> {
        config.validate().context("Invalid oracle configuration")?;

        let store = SnapshotStore::from_config(&config.persistence);
        let snapshot = match &store {
            Some(store) => Some(store.load().await.context("Failed to load trust snapshot")?),
            None => {
                info!("Trust persistence disabled");
                None
            }
        };

        let (bus, inbound) = EventBus::new(&config.bus);
        let trigger = PersistTrigger::new();
        let mut ledger = TrustLedger::new(config.trust.clone()).with_sink(Arc::new(bus.update_sink()));
        if store.is_some() {
            ledger = ledger.with_sink(Arc::new(trigger.clone()));
        }
        let ledger = Arc::new(ledger);
        if let Some(snapshot) = snapshot {
            ledger.restore(snapshot);
        }

        let detector = Arc::new(AnomalyDetector::new(&config.gameplay));

        let (stop, rx) = watch::channel(false);
        let dispatcher = Worker {
            handle: Dispatcher::new(ledger.clone(), detector.clone()).spawn(inbound, rx),
            stop,
        };

        let writer = store.map(|store| {
            let (stop, rx) = watch::channel(false);
            let debounce = Duration::from_millis(config.persistence.debounce_ms);
            Worker {
                handle: SnapshotWriter::new(ledger.clone(), store, debounce, trigger).spawn(rx),
                stop,
            }
        });

        let recovery = config.recovery.enabled.then(|| {
            let (stop, rx) = watch::channel(false);
            let interval = Duration::from_secs(config.recovery.interval_secs);
            Worker {
                handle: RecoveryScheduler::new(ledger.clone(), interval).spawn(rx),
                stop,
            }
        });

        info!(
            casinos = ledger.casino_ids().len(),
            degens = ledger.degen_ids().len(),
            persistence = writer.is_some(),
            recovery = recovery.is_some(),
            "Trust service started"
        );

        Ok(Self {
            ledger,
            detector,
            grader: CompositeGrader::new(config.grading.clone()),
            bus,
            dispatcher,
            writer,
            recovery,
        })
    }

    pub fn ledger(&self) -> &Arc<TrustLedger> {
        &self.ledger
    }

    pub fn detector(&self) -> &Arc<AnomalyDetector> {
        &self.detector
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn grade(&self, telemetry: &CasinoTelemetry) -> GradingReport {
        self.grader.grade(telemetry)
    }

    pub async fn shutdown(self) -> Result<()> {
        info!("Trust service shutting down");

        if let Some(recovery) = self.recovery {
            recovery.stop("Recovery scheduler").await?;
        }
        self.dispatcher.stop("Event dispatcher").await?;
        if let Some(writer) = self.writer {
            writer.stop("Snapshot writer").await?;
        }

        info!("Trust service stopped");
        Ok(())
    }
}

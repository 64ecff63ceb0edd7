//! Event Bus Adapter
//!
//! In-process transport between producers and the trust/gameplay engines.
//! Inbound messages arrive as `{ "topic": ..., "data": ... }` envelopes on a
//! bounded mpsc channel and are handled in arrival order by one dispatcher
//! task. Score updates fan out to subscribers over a broadcast channel.
//!
//! ```text
//!  publish() ──mpsc──► Dispatcher ──► TrustLedger ──► BroadcastSink ──broadcast──► subscribe()
//!                          │
//!                          └── spin.recorded ──► AnomalyDetector
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BusConfig;
use crate::gameplay::{AnomalyDetector, SpinEvent};
use crate::trust::{TrustEvent, TrustLedger, TrustUpdate, TrustUpdateSink};

pub const SPIN_RECORDED_TOPIC: &str = "spin.recorded";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, data: Value) -> Self {
        Self {
            topic: topic.into(),
            data,
        }
    }
}

/// Producer/subscriber handle. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    inbound: mpsc::Sender<BusMessage>,
    outbound: broadcast::Sender<TrustUpdate>,
}

impl EventBus {
    /// Create the bus and the inbound receiver for the dispatcher
    pub fn new(config: &BusConfig) -> (Self, mpsc::Receiver<BusMessage>) {
        let (inbound, receiver) = mpsc::channel(config.inbound_capacity.max(1));
        let (outbound, _) = broadcast::channel(config.outbound_capacity.max(1));
        (Self { inbound, outbound }, receiver)
    }

    pub async fn publish(&self, topic: impl Into<String>, data: Value) -> Result<()> {
        self.send(BusMessage::new(topic, data)).await
    }

    pub async fn send(&self, message: BusMessage) -> Result<()> {
        self.inbound
            .send(message)
            .await
            .map_err(|e| anyhow!("Event bus closed, dropped {}", e.0.topic))
    }

    /// Publish a raw JSON envelope
    pub async fn publish_json(&self, raw: &str) -> Result<()> {
        let message: BusMessage = serde_json::from_str(raw).context("Invalid bus envelope")?;
        self.send(message).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrustUpdate> {
        self.outbound.subscribe()
    }

    pub fn update_sink(&self) -> BroadcastSink {
        BroadcastSink {
            sender: self.outbound.clone(),
        }
    }
}

/// Ledger sink that republishes updates to bus subscribers
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<TrustUpdate>,
}

impl TrustUpdateSink for BroadcastSink {
    fn publish(&self, update: &TrustUpdate) {
        // No subscribers is not an error
        let _ = self.sender.send(update.clone());
    }
}

pub struct Dispatcher {
    ledger: Arc<TrustLedger>,
    detector: Arc<AnomalyDetector>,
}

impl Dispatcher {
    pub fn new(ledger: Arc<TrustLedger>, detector: Arc<AnomalyDetector>) -> Self {
        Self { ledger, detector }
    }

    /// Route one message. Unknown topics and malformed payloads are logged and dropped.
    pub fn dispatch(&self, message: BusMessage) {
        let BusMessage { topic, data } = message;

        if topic == SPIN_RECORDED_TOPIC {
            match serde_json::from_value::<SpinEvent>(data) {
                Ok(spin) => self.detector.record_spin(spin),
                Err(e) => warn!(topic = %topic, error = %e, "Dropping malformed spin event"),
            }
            return;
        }

        if !TrustEvent::TOPICS.contains(&topic.as_str()) {
            debug!(topic = %topic, "Ignoring unhandled topic");
            return;
        }

        match TrustEvent::decode(&topic, data) {
            Ok(event) => self.ledger.handle_event(&event),
            Err(e) => warn!(topic = %topic, error = %e.root_cause(), "Dropping malformed trust event"),
        }
    }

    /// Handle messages in arrival order until shutdown, then drain what is
    /// already queued
    pub fn spawn(
        self,
        mut inbound: mpsc::Receiver<BusMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Event dispatcher started");
            loop {
                tokio::select! {
                    message = inbound.recv() => match message {
                        Some(message) => self.dispatch(message),
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            inbound.close();
                            while let Some(message) = inbound.recv().await {
                                self.dispatch(message);
                            }
                            break;
                        }
                    }
                }
            }
            info!("Event dispatcher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameplayConfig, TrustConfig};
    use serde_json::json;

    fn dispatcher() -> (Dispatcher, Arc<TrustLedger>, Arc<AnomalyDetector>) {
        let ledger = Arc::new(TrustLedger::new(TrustConfig::default()));
        let detector = Arc::new(AnomalyDetector::new(&GameplayConfig::default()));
        (Dispatcher::new(ledger.clone(), detector.clone()), ledger, detector)
    }

    #[test]
    fn test_routes_trust_events() {
        let (dispatcher, ledger, _) = dispatcher();
        dispatcher.dispatch(BusMessage::new(
            "bonus.nerf.detected",
            json!({ "casinoName": "acme", "percentDrop": -0.3 }),
        ));
        assert_eq!(ledger.casino_breakdown("acme").bonus_score, 67.0);
    }

    #[test]
    fn test_routes_spins_to_detector() {
        let (dispatcher, _, detector) = dispatcher();
        dispatcher.dispatch(BusMessage::new(
            SPIN_RECORDED_TOPIC,
            json!({
                "timestamp": 1_700_000_000_000i64,
                "sessionId": "s1",
                "casinoId": "acme",
                "gameId": "starburst",
                "userId": "u1",
                "bet": 1.0,
                "payout": 0.0
            }),
        ));
        assert_eq!(detector.active_sessions(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_malformed_payloads_are_dropped() {
        let (dispatcher, ledger, detector) = dispatcher();
        dispatcher.dispatch(BusMessage::new("bonus.nerf.detected", json!({ "casinoName": 5 })));
        dispatcher.dispatch(BusMessage::new(SPIN_RECORDED_TOPIC, json!("nope")));
        dispatcher.dispatch(BusMessage::new("unrelated.topic", json!({})));
        assert!(ledger.casino_ids().is_empty());
        assert!(detector.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_updates_reach_subscribers() {
        let (bus, inbound) = EventBus::new(&BusConfig::default());
        let ledger = Arc::new(TrustLedger::new(TrustConfig::default()).with_sink(Arc::new(bus.update_sink())));
        let detector = Arc::new(AnomalyDetector::new(&GameplayConfig::default()));
        let mut updates = bus.subscribe();

        let (tx, rx) = watch::channel(false);
        let handle = Dispatcher::new(ledger, detector).spawn(inbound, rx);

        bus.publish_json(r#"{"topic":"tilt.detected","data":{"userId":"u1","severity":3}}"#)
            .await
            .unwrap();

        match updates.recv().await.unwrap() {
            TrustUpdate::Degen(update) => {
                assert_eq!(update.user_id, "u1");
                assert_eq!(update.new_score, 55.0);
            }
            other => panic!("unexpected update: {:?}", other),
        }

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (bus, inbound) = EventBus::new(&BusConfig::default());
        let (dispatcher, ledger, _) = dispatcher();

        for _ in 0..5 {
            bus.publish("cooldown.violated", json!({ "userId": "u1" }))
                .await
                .unwrap();
        }
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        dispatcher.spawn(inbound, rx).await.unwrap();

        assert_eq!(ledger.degen_breakdown("u1").history.len(), 5);
        assert!(bus.publish("cooldown.violated", json!({})).await.is_err());
    }
}

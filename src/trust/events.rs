//! Trust Event Payloads
//!
//! Inbound behavioural events and outbound score updates. Both travel as a
//! `{ "topic": ..., "data": { ... } }` envelope; payload fields are camelCase.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::record::TrustLevel;

pub const CASINO_UPDATE_SOURCE: &str = "trust-engine-casino";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFlagged {
    pub url: String,
    pub risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusNerfDetected {
    pub casino_name: String,
    /// Fractional change, e.g. -0.30 for a 30% cut
    pub percent_drop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupAggregate {
    pub total_delta: f64,
    pub events: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRollupAggregate {
    pub total_delta: f64,
    pub events: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_severity: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasinoRollup {
    #[serde(default)]
    pub casinos: BTreeMap<String, RollupAggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRollup {
    #[serde(default)]
    pub domains: BTreeMap<String, DomainRollupAggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipCompleted {
    #[serde(default)]
    pub from_user_id: Option<String>,
    #[serde(default)]
    pub to_user_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Shared shape of `tilt.detected` and `cooldown.violated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSeverity {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamReported {
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default)]
    pub accused_id: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub false_report: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountabilitySuccess {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub action: String,
}

/// Events the trust ledger reacts to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum TrustEvent {
    #[serde(rename = "link.flagged")]
    LinkFlagged(LinkFlagged),
    #[serde(rename = "bonus.nerf.detected")]
    BonusNerfDetected(BonusNerfDetected),
    #[serde(rename = "trust.casino.rollup")]
    CasinoRollup(CasinoRollup),
    #[serde(rename = "trust.domain.rollup")]
    DomainRollup(DomainRollup),
    #[serde(rename = "tip.completed")]
    TipCompleted(TipCompleted),
    #[serde(rename = "tilt.detected")]
    TiltDetected(UserSeverity),
    #[serde(rename = "cooldown.violated")]
    CooldownViolated(UserSeverity),
    #[serde(rename = "scam.reported")]
    ScamReported(ScamReported),
    #[serde(rename = "accountability.success")]
    AccountabilitySuccess(AccountabilitySuccess),
}

impl TrustEvent {
    pub const TOPICS: [&'static str; 9] = [
        "link.flagged",
        "bonus.nerf.detected",
        "trust.casino.rollup",
        "trust.domain.rollup",
        "tip.completed",
        "tilt.detected",
        "cooldown.violated",
        "scam.reported",
        "accountability.success",
    ];

    /// Decode a payload delivered under `topic`
    pub fn decode(topic: &str, data: serde_json::Value) -> Result<Self> {
        serde_json::from_value(serde_json::json!({ "topic": topic, "data": data }))
            .with_context(|| format!("Invalid payload for topic {}", topic))
    }

    pub fn topic(&self) -> &'static str {
        match self {
            TrustEvent::LinkFlagged(_) => "link.flagged",
            TrustEvent::BonusNerfDetected(_) => "bonus.nerf.detected",
            TrustEvent::CasinoRollup(_) => "trust.casino.rollup",
            TrustEvent::DomainRollup(_) => "trust.domain.rollup",
            TrustEvent::TipCompleted(_) => "tip.completed",
            TrustEvent::TiltDetected(_) => "tilt.detected",
            TrustEvent::CooldownViolated(_) => "cooldown.violated",
            TrustEvent::ScamReported(_) => "scam.reported",
            TrustEvent::AccountabilitySuccess(_) => "accountability.success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasinoTrustUpdate {
    pub casino_name: String,
    pub previous_score: f64,
    pub new_score: f64,
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    pub reason: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegenTrustUpdate {
    pub user_id: String,
    pub previous_score: f64,
    pub new_score: f64,
    pub delta: f64,
    pub level: TrustLevel,
    pub reason: String,
}

/// Published after every applied adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data")]
pub enum TrustUpdate {
    #[serde(rename = "trust.casino.updated")]
    Casino(CasinoTrustUpdate),
    #[serde(rename = "trust.degen.updated")]
    Degen(DegenTrustUpdate),
}

impl TrustUpdate {
    pub fn delta(&self) -> f64 {
        match self {
            TrustUpdate::Casino(u) => u.delta,
            TrustUpdate::Degen(u) => u.delta,
        }
    }
}

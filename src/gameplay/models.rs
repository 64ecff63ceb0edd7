//! Gameplay Data Models
//!
//! Wire shapes for spin telemetry and the derived session views produced by
//! the anomaly detector. Field names follow the upstream camelCase contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single bet/payout record captured from a live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinEvent {
    /// Capture time (Unix milliseconds)
    pub timestamp: i64,
    pub session_id: String,
    pub casino_id: String,
    pub game_id: String,
    pub user_id: String,
    pub bet: f64,
    pub payout: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_round: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_spins: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

impl SpinEvent {
    /// Net result of the spin (payout minus stake)
    pub fn net(&self) -> f64 {
        self.payout - self.bet
    }

    /// Net result relative to the stake. Zero-stake spins (free spins) count as break-even.
    pub fn relative_return(&self) -> f64 {
        if self.bet > 0.0 {
            self.net() / self.bet
        } else {
            0.0
        }
    }

    pub fn is_win(&self) -> bool {
        self.payout > self.bet
    }

    pub fn triggered_bonus(&self) -> bool {
        self.bonus_round.unwrap_or(false) || self.free_spins.unwrap_or(false)
    }

    /// Canonical symbol combination string, if the spin reported symbols
    pub fn symbol_key(&self) -> Option<String> {
        match &self.symbols {
            Some(symbols) if !symbols.is_empty() => Some(symbols.join(",")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    Win,
    Loss,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStats {
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
    pub current_streak: u32,
    pub current_streak_type: StreakType,
}

/// Aggregated view over one session's spins. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: String,
    pub user_id: String,
    pub casino_id: String,
    pub game_id: String,
    pub start_time: i64,
    pub end_time: i64,
    pub total_spins: usize,
    pub total_wagered: f64,
    pub total_payout: f64,
    #[serde(rename = "actualRTP")]
    pub actual_rtp: f64,
    pub biggest_win: f64,
    pub biggest_loss: f64,
    pub streaks: StreakStats,
    /// Population standard deviation of per-spin relative returns
    pub volatility: f64,
}

/// RTP deviation against the game's published return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpAnalysis {
    #[serde(rename = "expectedRTP")]
    pub expected_rtp: f64,
    #[serde(rename = "actualRTP")]
    pub actual_rtp: f64,
    pub deviation: f64,
    pub deviation_percent: f64,
    pub is_significant: bool,
    pub sample_size: usize,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    RtpDrift,
    PumpAndDump,
    Compression,
    Clustering,
    ImpossibleOdds,
    BonusSuppression,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::RtpDrift => "rtp_drift",
            AnomalyType::PumpAndDump => "pump_and_dump",
            AnomalyType::Compression => "compression",
            AnomalyType::Clustering => "clustering",
            AnomalyType::ImpossibleOdds => "impossible_odds",
            AnomalyType::BonusSuppression => "bonus_suppression",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    /// Contribution of one anomaly to the session risk score, before confidence
    pub fn risk_weight(&self) -> f64 {
        match self {
            AnomalySeverity::Low => 10.0,
            AnomalySeverity::Medium => 25.0,
            AnomalySeverity::High => 50.0,
            AnomalySeverity::Critical => 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyDetection {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: AnomalySeverity,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub recommendation: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Fair,
    Suspicious,
    Unfair,
    Rigged,
}

impl Verdict {
    pub fn from_risk_score(risk_score: f64) -> Self {
        if risk_score < 20.0 {
            Verdict::Fair
        } else if risk_score < 50.0 {
            Verdict::Suspicious
        } else if risk_score < 80.0 {
            Verdict::Unfair
        } else {
            Verdict::Rigged
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessReport {
    pub session_stats: Option<SessionStats>,
    pub rtp_analysis: Option<RtpAnalysis>,
    pub anomalies: Vec<AnomalyDetection>,
    pub verdict: Verdict,
    /// 0-100
    pub risk_score: f64,
    pub recommendations: Vec<String>,
}

//! Trust Record Types
//!
//! Casino records carry seven weighted sub-scores; degen (user) records carry
//! behaviour signals with a penalty model. Aggregate scores are always
//! recomputed from sub-scores, never adjusted directly.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sub-score every new casino record starts from
pub const CASINO_SUBSCORE_BASELINE: f64 = 75.0;

/// Behaviour score every new degen record starts from
pub const DEGEN_BEHAVIOR_BASELINE: f64 = 70.0;

// =============================================================================
// Categories
// =============================================================================

/// Casino sub-score keys (wire names match the persisted record fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CasinoCategory {
    #[serde(rename = "fairnessScore")]
    Fairness,
    #[serde(rename = "payoutScore")]
    Payout,
    #[serde(rename = "bonusScore")]
    Bonus,
    #[serde(rename = "userReportScore")]
    UserReport,
    #[serde(rename = "freespinScore")]
    Freespin,
    #[serde(rename = "complianceScore")]
    Compliance,
    #[serde(rename = "supportScore")]
    Support,
}

impl CasinoCategory {
    pub const ALL: [CasinoCategory; 7] = [
        CasinoCategory::Fairness,
        CasinoCategory::Payout,
        CasinoCategory::Bonus,
        CasinoCategory::UserReport,
        CasinoCategory::Freespin,
        CasinoCategory::Compliance,
        CasinoCategory::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CasinoCategory::Fairness => "fairnessScore",
            CasinoCategory::Payout => "payoutScore",
            CasinoCategory::Bonus => "bonusScore",
            CasinoCategory::UserReport => "userReportScore",
            CasinoCategory::Freespin => "freespinScore",
            CasinoCategory::Compliance => "complianceScore",
            CasinoCategory::Support => "supportScore",
        }
    }

    /// Share of the aggregate casino score
    pub fn weight(&self) -> f64 {
        match self {
            CasinoCategory::Fairness => 0.30,
            CasinoCategory::Payout => 0.20,
            CasinoCategory::Bonus => 0.15,
            CasinoCategory::UserReport => 0.15,
            CasinoCategory::Freespin => 0.10,
            CasinoCategory::Compliance => 0.05,
            CasinoCategory::Support => 0.05,
        }
    }
}

impl fmt::Display for CasinoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CasinoCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match CasinoCategory::ALL.iter().find(|c| c.as_str() == s) {
            Some(category) => Ok(*category),
            None => bail!("unknown casino trust category: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegenCategory {
    Tilt,
    Behavior,
    Scam,
    Accountability,
    Community,
}

impl DegenCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegenCategory::Tilt => "tilt",
            DegenCategory::Behavior => "behavior",
            DegenCategory::Scam => "scam",
            DegenCategory::Accountability => "accountability",
            DegenCategory::Community => "community",
        }
    }
}

impl fmt::Display for DegenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegenCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "tilt" => DegenCategory::Tilt,
            "behavior" => DegenCategory::Behavior,
            "scam" => DegenCategory::Scam,
            "accountability" => DegenCategory::Accountability,
            "community" => DegenCategory::Community,
            other => bail!("unknown degen trust category: {}", other),
        })
    }
}

// =============================================================================
// History
// =============================================================================

/// One applied adjustment. `delta` is the change in the aggregate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<C> {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub delta: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    pub category: C,
}

/// Append, evicting the oldest entries beyond `limit`
pub fn push_capped<T>(history: &mut VecDeque<T>, entry: T, limit: usize) {
    history.push_back(entry);
    while history.len() > limit {
        history.pop_front();
    }
}

// =============================================================================
// Casino record
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasinoTrustRecord {
    pub score: f64,
    pub fairness_score: f64,
    pub payout_score: f64,
    pub bonus_score: f64,
    pub user_report_score: f64,
    pub freespin_score: f64,
    pub compliance_score: f64,
    pub support_score: f64,
    pub history: VecDeque<HistoryEntry<CasinoCategory>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl Default for CasinoTrustRecord {
    fn default() -> Self {
        Self::new(CASINO_SUBSCORE_BASELINE, Utc::now())
    }
}

impl CasinoTrustRecord {
    /// Fresh record with every sub-score at `starting_score`. The weights sum
    /// to one, so the aggregate starts at the same value.
    pub fn new(starting_score: f64, now: DateTime<Utc>) -> Self {
        let baseline = starting_score.clamp(0.0, 100.0);
        let mut record = Self {
            score: 0.0,
            fairness_score: baseline,
            payout_score: baseline,
            bonus_score: baseline,
            user_report_score: baseline,
            freespin_score: baseline,
            compliance_score: baseline,
            support_score: baseline,
            history: VecDeque::new(),
            last_updated: now,
        };
        record.score = record.aggregate();
        record
    }

    pub fn sub_score(&self, category: CasinoCategory) -> f64 {
        match category {
            CasinoCategory::Fairness => self.fairness_score,
            CasinoCategory::Payout => self.payout_score,
            CasinoCategory::Bonus => self.bonus_score,
            CasinoCategory::UserReport => self.user_report_score,
            CasinoCategory::Freespin => self.freespin_score,
            CasinoCategory::Compliance => self.compliance_score,
            CasinoCategory::Support => self.support_score,
        }
    }

    fn sub_score_mut(&mut self, category: CasinoCategory) -> &mut f64 {
        match category {
            CasinoCategory::Fairness => &mut self.fairness_score,
            CasinoCategory::Payout => &mut self.payout_score,
            CasinoCategory::Bonus => &mut self.bonus_score,
            CasinoCategory::UserReport => &mut self.user_report_score,
            CasinoCategory::Freespin => &mut self.freespin_score,
            CasinoCategory::Compliance => &mut self.compliance_score,
            CasinoCategory::Support => &mut self.support_score,
        }
    }

    /// Weighted, rounded aggregate of the current sub-scores
    pub fn aggregate(&self) -> f64 {
        CasinoCategory::ALL
            .iter()
            .map(|c| self.sub_score(*c) * c.weight())
            .sum::<f64>()
            .round()
    }

    /// Nudge one sub-score (clamped to 0..=100) and recompute the aggregate
    pub fn adjust(&mut self, category: CasinoCategory, delta: f64) {
        let slot = self.sub_score_mut(category);
        *slot = (*slot + delta).clamp(0.0, 100.0);
        self.score = self.aggregate();
    }
}

// =============================================================================
// Degen record
// =============================================================================

pub const MAX_TILT_PENALTY: f64 = 30.0;
pub const TILT_PENALTY_PER_INDICATOR: f64 = 5.0;
pub const SCAM_PENALTY_PER_FLAG: f64 = 15.0;
pub const MAX_ACCOUNTABILITY_BONUS: f64 = 20.0;
pub const COMMUNITY_REPORTS_RANGE: (f64, f64) = (-20.0, 10.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DegenTrustRecord {
    pub score: f64,
    pub tilt_indicators: f64,
    pub behavior_score: f64,
    pub scam_flags: u32,
    pub accountability_bonus: f64,
    pub community_reports: f64,
    pub history: VecDeque<HistoryEntry<DegenCategory>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub recovery_scheduled_at: Option<DateTime<Utc>>,
}

impl Default for DegenTrustRecord {
    fn default() -> Self {
        Self::new(DEGEN_BEHAVIOR_BASELINE, Utc::now())
    }
}

impl DegenTrustRecord {
    /// Fresh record whose behaviour signal starts at `starting_score`
    pub fn new(starting_score: f64, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            score: 0.0,
            tilt_indicators: 0.0,
            behavior_score: starting_score.clamp(0.0, 100.0),
            scam_flags: 0,
            accountability_bonus: 0.0,
            community_reports: 0.0,
            history: VecDeque::new(),
            last_updated: now,
            recovery_scheduled_at: None,
        };
        record.score = record.aggregate();
        record
    }

    /// Behaviour plus credits, minus tilt and scam penalties, clamped to 0..=100
    pub fn aggregate(&self) -> f64 {
        let tilt_penalty = (self.tilt_indicators * TILT_PENALTY_PER_INDICATOR).min(MAX_TILT_PENALTY);
        let scam_penalty = self.scam_flags as f64 * SCAM_PENALTY_PER_FLAG;
        (self.behavior_score + self.accountability_bonus + self.community_reports
            - tilt_penalty
            - scam_penalty)
            .clamp(0.0, 100.0)
    }

    /// Apply a delta to one signal and recompute the aggregate. The scam
    /// category ignores the delta and always adds one flag.
    pub fn adjust(&mut self, category: DegenCategory, delta: f64) {
        match category {
            DegenCategory::Tilt => {
                self.tilt_indicators = (self.tilt_indicators + delta).max(0.0);
            }
            DegenCategory::Behavior => {
                self.behavior_score = (self.behavior_score + delta).clamp(0.0, 100.0);
            }
            DegenCategory::Scam => {
                self.scam_flags = self.scam_flags.saturating_add(1);
            }
            DegenCategory::Accountability => {
                self.accountability_bonus =
                    (self.accountability_bonus + delta).clamp(0.0, MAX_ACCOUNTABILITY_BONUS);
            }
            DegenCategory::Community => {
                let (low, high) = COMMUNITY_REPORTS_RANGE;
                self.community_reports = (self.community_reports + delta).clamp(low, high);
            }
        }
        self.score = self.aggregate();
    }
}

// =============================================================================
// Trust level
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustLevel {
    VeryHigh,
    High,
    Neutral,
    Low,
    HighRisk,
}

impl TrustLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            TrustLevel::VeryHigh
        } else if score >= 80.0 {
            TrustLevel::High
        } else if score >= 60.0 {
            TrustLevel::Neutral
        } else if score >= 40.0 {
            TrustLevel::Low
        } else {
            TrustLevel::HighRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::VeryHigh => "very-high",
            TrustLevel::High => "high",
            TrustLevel::Neutral => "neutral",
            TrustLevel::Low => "low",
            TrustLevel::HighRisk => "high-risk",
        }
    }

    /// Upper-case display form, e.g. "HIGH RISK"
    pub fn label(&self) -> String {
        self.as_str().to_uppercase().replace('-', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casino_aggregate_at_baseline() {
        let record = CasinoTrustRecord::new(75.0, Utc::now());
        assert_eq!(record.aggregate(), 75.0);
    }

    #[test]
    fn test_starting_score_sets_every_baseline() {
        let casino = CasinoTrustRecord::new(90.0, Utc::now());
        assert_eq!(casino.fairness_score, 90.0);
        assert_eq!(casino.support_score, 90.0);
        assert_eq!(casino.score, casino.aggregate());
        assert_eq!(casino.score, 90.0);

        let degen = DegenTrustRecord::new(50.0, Utc::now());
        assert_eq!(degen.behavior_score, 50.0);
        assert_eq!(degen.score, degen.aggregate());
        assert_eq!(degen.score, 50.0);
    }

    #[test]
    fn test_casino_weights_sum_to_one() {
        let total: f64 = CasinoCategory::ALL.iter().map(CasinoCategory::weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_casino_sub_scores_are_clamped() {
        let mut record = CasinoTrustRecord::new(75.0, Utc::now());
        record.adjust(CasinoCategory::Support, 500.0);
        assert_eq!(record.support_score, 100.0);
        record.adjust(CasinoCategory::Fairness, -500.0);
        assert_eq!(record.fairness_score, 0.0);
        // 0*.30 + 75*.60 + 100*.05 + 75*.05
        assert_eq!(record.score, 54.0);
    }

    #[test]
    fn test_degen_penalties() {
        let mut record = DegenTrustRecord::new(70.0, Utc::now());
        record.adjust(DegenCategory::Tilt, 3.0);
        assert_eq!(record.score, 55.0);

        record.adjust(DegenCategory::Tilt, 10.0);
        // tilt penalty caps at 30
        assert_eq!(record.score, 40.0);

        record.adjust(DegenCategory::Scam, 0.0);
        assert_eq!(record.scam_flags, 1);
        assert_eq!(record.score, 25.0);

        record.adjust(DegenCategory::Tilt, -100.0);
        assert_eq!(record.tilt_indicators, 0.0);
    }

    #[test]
    fn test_degen_signal_ranges() {
        let mut record = DegenTrustRecord::new(70.0, Utc::now());
        record.adjust(DegenCategory::Accountability, 50.0);
        assert_eq!(record.accountability_bonus, 20.0);
        record.adjust(DegenCategory::Community, -50.0);
        assert_eq!(record.community_reports, -20.0);
        record.adjust(DegenCategory::Community, 100.0);
        assert_eq!(record.community_reports, 10.0);
        record.adjust(DegenCategory::Behavior, 100.0);
        assert_eq!(record.behavior_score, 100.0);
        assert_eq!(record.score, 100.0);
    }

    #[test]
    fn test_history_is_capped_oldest_first() {
        let mut history = VecDeque::new();
        for i in 0..105 {
            push_capped(&mut history, i, 100);
        }
        assert_eq!(history.len(), 100);
        assert_eq!(history.front(), Some(&5));
        assert_eq!(history.back(), Some(&104));
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!("bonusScore".parse::<CasinoCategory>().unwrap(), CasinoCategory::Bonus);
        assert!("bonus".parse::<CasinoCategory>().is_err());
        assert_eq!("tilt".parse::<DegenCategory>().unwrap(), DegenCategory::Tilt);
        assert!("tiltScore".parse::<DegenCategory>().is_err());
        assert_eq!(
            serde_json::to_value(CasinoCategory::UserReport).unwrap(),
            serde_json::json!("userReportScore")
        );
    }

    #[test]
    fn test_trust_levels() {
        assert_eq!(TrustLevel::from_score(95.0), TrustLevel::VeryHigh);
        assert_eq!(TrustLevel::from_score(80.0), TrustLevel::High);
        assert_eq!(TrustLevel::from_score(79.9), TrustLevel::Neutral);
        assert_eq!(TrustLevel::from_score(40.0), TrustLevel::Low);
        assert_eq!(TrustLevel::from_score(39.0), TrustLevel::HighRisk);
        assert_eq!(TrustLevel::HighRisk.label(), "HIGH RISK");
    }

    #[test]
    fn test_record_loads_with_missing_fields() {
        let json = r#"{"score": 60, "bonusScore": 40, "history": [], "lastUpdated": 1700000000000}"#;
        let record: CasinoTrustRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.score, 60.0);
        assert_eq!(record.bonus_score, 40.0);
        assert_eq!(record.support_score, CASINO_SUBSCORE_BASELINE);
        assert_eq!(record.last_updated.timestamp_millis(), 1_700_000_000_000);
    }
}

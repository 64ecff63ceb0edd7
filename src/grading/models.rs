//! Grading Data Models
//!
//! Telemetry batches submitted for a casino, and the graded output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRecord {
    pub ts: i64,
    /// Net result relative to stake
    pub net_win: f64,
    /// Symbol -> occurrences on this spin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_freq: Option<BTreeMap<String, u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_triggered: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedRotation {
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusEvent {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureChecklist {
    pub rtp_version_published: bool,
    pub audit_report_present: bool,
    #[serde(default, rename = "fairnessPolicyURL", skip_serializing_if = "Option::is_none")]
    pub fairness_policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator_license: Option<String>,
}

impl DisclosureChecklist {
    /// Number of checklist items satisfied, out of `DisclosureChecklist::ITEMS`
    pub fn satisfied(&self) -> usize {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        [
            self.rtp_version_published,
            self.audit_report_present,
            present(&self.fairness_policy_url),
            present(&self.regulator_license),
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }

    pub const ITEMS: usize = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashVerificationResult {
    pub verified: bool,
    pub ts: i64,
}

/// Everything known about one casino for a grading run. Missing sections
/// degrade confidence rather than failing the grade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasinoTelemetry {
    pub casino: String,
    #[serde(default)]
    pub spins: Vec<SpinRecord>,
    /// Symbol -> expected probability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paytable_baseline: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_bonus_per_spins: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_rotations: Option<Vec<SeedRotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_events: Option<Vec<BonusEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosures: Option<DisclosureChecklist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_verifications: Option<Vec<HashVerificationResult>>,
    /// Per-spin theoretical net return; falls back to the grading config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theoretical_return: Option<f64>,
}

/// Normalised anomaly magnitude for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResult {
    /// 0 (nominal) to 1 (maximally anomalous)
    pub value: f64,
    /// 0 to 1, damped for undersized samples
    pub confidence: f64,
    pub sample_size: usize,
}

impl MetricResult {
    pub fn new(value: f64, confidence: f64, sample_size: usize) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            sample_size,
        }
    }

    /// No usable data: contributes nothing
    pub fn empty(sample_size: usize) -> Self {
        Self::new(0.0, 0.0, sample_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// 0-100
    pub score: u32,
    /// Metric name -> value rounded to two decimals
    pub metrics: BTreeMap<String, f64>,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub rng_integrity: CategoryScore,
    pub rtp_transparency: CategoryScore,
    pub volatility_consistency: CategoryScore,
    pub session_behavior: CategoryScore,
    pub transparency_ethics: CategoryScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    pub casino: String,
    pub categories: CategoryScores,
    /// 0-100
    pub composite_score: u32,
    pub disclaimer: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disclosure_blank_strings_do_not_count() {
        let checklist = DisclosureChecklist {
            rtp_version_published: true,
            audit_report_present: false,
            fairness_policy_url: Some(String::new()),
            regulator_license: Some("MGA/B2C/123".to_string()),
        };
        assert_eq!(checklist.satisfied(), 2);
    }

    #[test]
    fn test_metric_result_is_clamped() {
        let m = MetricResult::new(1.7, -0.2, 3);
        assert_eq!(m.value, 1.0);
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn test_telemetry_wire_shape() {
        let json = r#"{
            "casino": "acme",
            "spins": [{"ts": 1, "netWin": -1.0, "symbolFreq": {"A": 2}}],
            "bonusEvents": [{"ts": 5, "type": "free_spins"}],
            "disclosures": {
                "rtpVersionPublished": true,
                "auditReportPresent": true,
                "fairnessPolicyURL": "https://acme.example/fair"
            }
        }"#;
        let data: CasinoTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(data.spins.len(), 1);
        assert_eq!(data.bonus_events.as_ref().unwrap()[0].kind, "free_spins");
        assert_eq!(data.disclosures.as_ref().unwrap().satisfied(), 3);
        assert!(data.seed_rotations.is_none());
    }
}

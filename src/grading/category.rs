//! Category Scorer
//!
//! Each grading category is a fixed table of weighted metrics. A category
//! starts at 100 and loses `value * weight * confidence` per metric.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metrics;
use super::models::{CasinoTelemetry, CategoryScore, MetricResult};
use crate::config::GradingConfig;

/// One row of a category table
pub struct MetricSpec {
    pub name: &'static str,
    pub weight: f64,
    /// Rationale switches to `flagged` once the value exceeds this
    pub threshold: f64,
    pub flagged: &'static str,
    pub nominal: &'static str,
    pub compute: fn(&CasinoTelemetry, &GradingConfig) -> MetricResult,
}

impl MetricSpec {
    pub fn rationale(&self, value: f64) -> &'static str {
        if value > self.threshold {
            self.flagged
        } else {
            self.nominal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    RngIntegrity,
    RtpTransparency,
    VolatilityConsistency,
    SessionBehavior,
    TransparencyEthics,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::RngIntegrity,
        Category::RtpTransparency,
        Category::VolatilityConsistency,
        Category::SessionBehavior,
        Category::TransparencyEthics,
    ];

    /// Share of the composite grade, out of 100
    pub fn weight(&self) -> u32 {
        match self {
            Category::RngIntegrity => 15,
            Category::RtpTransparency => 25,
            Category::VolatilityConsistency => 20,
            Category::SessionBehavior => 20,
            Category::TransparencyEthics => 20,
        }
    }

    pub fn metrics(&self) -> &'static [MetricSpec] {
        match self {
            Category::RngIntegrity => RNG_INTEGRITY,
            Category::RtpTransparency => RTP_TRANSPARENCY,
            Category::VolatilityConsistency => VOLATILITY_CONSISTENCY,
            Category::SessionBehavior => SESSION_BEHAVIOR,
            Category::TransparencyEthics => TRANSPARENCY_ETHICS,
        }
    }

    pub fn score(&self, data: &CasinoTelemetry, config: &GradingConfig) -> CategoryScore {
        score_category(self.metrics(), data, config)
    }
}

// =============================================================================
// Metric tables
// =============================================================================

static RNG_INTEGRITY: &[MetricSpec] = &[
    MetricSpec {
        name: "hashVerification",
        weight: 10.0,
        threshold: 0.1,
        flagged: "Some hash verifications failed",
        nominal: "All hash verifications passed",
        compute: |d, _| metrics::hash_verification(d.hash_verifications.as_deref()),
    },
    MetricSpec {
        name: "rotationRegularity",
        weight: 5.0,
        threshold: 0.3,
        flagged: "Irregular seed rotation intervals",
        nominal: "Regular seed rotations",
        compute: |d, _| metrics::rotation_regularity(d.seed_rotations.as_deref()),
    },
    MetricSpec {
        name: "seedIntervalCV",
        weight: 5.0,
        threshold: 0.8,
        flagged: "High seed interval variability (CV > 0.8)",
        nominal: "Consistent seed rotation timing",
        compute: |d, _| metrics::seed_interval_cv(d.seed_rotations.as_deref()),
    },
];

static RTP_TRANSPARENCY: &[MetricSpec] = &[
    MetricSpec {
        name: "payoutDrift",
        weight: 8.0,
        threshold: 0.3,
        flagged: "Outcome distribution diverges from baseline paytable",
        nominal: "Distribution aligns with paytable",
        compute: |d, _| metrics::payout_drift(&d.spins, d.paytable_baseline.as_ref()),
    },
    MetricSpec {
        name: "rtpDriftScore",
        weight: 8.0,
        threshold: 0.2,
        flagged: "Observed RTP deviates from theoretical",
        nominal: "RTP within expected range",
        compute: |d, c| {
            metrics::rtp_drift_score(&d.spins, d.theoretical_return.unwrap_or(c.theoretical_return))
        },
    },
];

static VOLATILITY_CONSISTENCY: &[MetricSpec] = &[
    MetricSpec {
        name: "volatilityShift",
        weight: 8.0,
        threshold: 0.4,
        flagged: "Variance spikes after large win",
        nominal: "Stable volatility profile",
        compute: |d, _| metrics::volatility_shift(&d.spins),
    },
    MetricSpec {
        name: "bonusLatency",
        weight: 6.0,
        threshold: 0.15,
        flagged: "Bonus intervals slower than expected",
        nominal: "Bonus frequency as expected",
        compute: |d, _| {
            metrics::bonus_latency(&d.spins, d.bonus_events.as_deref(), d.expected_bonus_per_spins)
        },
    },
    MetricSpec {
        name: "featureIntervalVariance",
        weight: 6.0,
        threshold: 0.3,
        flagged: "High variance in bonus intervals",
        nominal: "Consistent bonus spacing",
        compute: |d, _| {
            metrics::feature_interval_variance(d.bonus_events.as_deref(), d.expected_bonus_per_spins)
        },
    },
];

static SESSION_BEHAVIOR: &[MetricSpec] = &[
    MetricSpec {
        name: "seedRotationCorrelation",
        weight: 6.0,
        threshold: 0.25,
        flagged: "Payout shifts near seed rotations",
        nominal: "No rotation-payout correlation",
        compute: |d, _| metrics::seed_rotation_correlation(&d.spins, d.seed_rotations.as_deref()),
    },
    MetricSpec {
        name: "streakClusterZ",
        weight: 7.0,
        threshold: 0.35,
        flagged: "Extended loss streak clusters detected",
        nominal: "Normal streak distribution",
        compute: |d, _| metrics::streak_cluster_z(&d.spins),
    },
    MetricSpec {
        name: "postBonusSlopeScore",
        weight: 7.0,
        threshold: 0.3,
        flagged: "Downward trend after bonuses",
        nominal: "No post-bonus downturn",
        compute: |d, _| metrics::post_bonus_slope_score(&d.spins, d.bonus_events.as_deref()),
    },
];

static TRANSPARENCY_ETHICS: &[MetricSpec] = &[
    MetricSpec {
        name: "disclosureCompleteness",
        weight: 10.0,
        threshold: 0.5,
        flagged: "Missing key disclosures (RTP/audit)",
        nominal: "Complete transparency checklist",
        compute: |d, _| metrics::disclosure_completeness(d.disclosures.as_ref()),
    },
    MetricSpec {
        name: "auditPresenceFlag",
        weight: 5.0,
        threshold: 0.5,
        flagged: "No external audit report",
        nominal: "External audit present",
        compute: |d, _| metrics::audit_presence_flag(d.disclosures.as_ref()),
    },
];

// =============================================================================
// Scoring
// =============================================================================

/// Score one category table against a telemetry batch.
///
/// `score = max(0, round(100 - Σ value·weight·confidence))`. The rationale
/// is rendered for the two metrics with the largest `value·weight`; ties keep
/// table order.
pub fn score_category(
    specs: &[MetricSpec],
    data: &CasinoTelemetry,
    config: &GradingConfig,
) -> CategoryScore {
    let results: Vec<(&MetricSpec, MetricResult)> = specs
        .iter()
        .map(|spec| (spec, (spec.compute)(data, config)))
        .collect();

    let penalty: f64 = results
        .iter()
        .map(|(spec, r)| r.value * spec.weight * r.confidence)
        .sum();
    let score = (100.0 - penalty).round().clamp(0.0, 100.0) as u32;

    let mut ranked: Vec<&(&MetricSpec, MetricResult)> = results.iter().collect();
    ranked.sort_by(|a, b| {
        let impact_a = a.1.value * a.0.weight;
        let impact_b = b.1.value * b.0.weight;
        impact_b.partial_cmp(&impact_a).unwrap_or(Ordering::Equal)
    });
    let rationale = ranked
        .iter()
        .take(2)
        .map(|(spec, r)| spec.rationale(r.value).to_string())
        .collect();

    let metrics: BTreeMap<String, f64> = results
        .iter()
        .map(|(spec, r)| (spec.name.to_string(), (r.value * 100.0).round() / 100.0))
        .collect();

    CategoryScore {
        score,
        metrics,
        rationale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::models::DisclosureChecklist;

    fn full_disclosures() -> DisclosureChecklist {
        DisclosureChecklist {
            rtp_version_published: true,
            audit_report_present: true,
            fairness_policy_url: Some("https://acme.example/fairness".to_string()),
            regulator_license: Some("MGA/B2C/394".to_string()),
        }
    }

    #[test]
    fn test_category_weights_sum_to_100() {
        let total: u32 = Category::ALL.iter().map(Category::weight).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_complete_disclosures_cost_nothing() {
        let data = CasinoTelemetry {
            casino: "acme".to_string(),
            disclosures: Some(full_disclosures()),
            ..Default::default()
        };
        let score = Category::TransparencyEthics.score(&data, &GradingConfig::default());

        assert_eq!(score.score, 100);
        assert_eq!(score.metrics["disclosureCompleteness"], 0.0);
        assert_eq!(score.metrics["auditPresenceFlag"], 0.0);
        assert_eq!(
            score.rationale,
            vec!["Complete transparency checklist", "External audit present"]
        );
    }

    #[test]
    fn test_missing_disclosures_are_penalised() {
        let data = CasinoTelemetry {
            casino: "acme".to_string(),
            ..Default::default()
        };
        let score = Category::TransparencyEthics.score(&data, &GradingConfig::default());

        // 0.7 * 10 + 1.0 * 5
        assert_eq!(score.score, 88);
        assert_eq!(
            score.rationale,
            vec!["Missing key disclosures (RTP/audit)", "No external audit report"]
        );
    }

    #[test]
    fn test_zero_confidence_metrics_only_shape_rationale() {
        let data = CasinoTelemetry {
            casino: "acme".to_string(),
            ..Default::default()
        };
        let score = Category::RngIntegrity.score(&data, &GradingConfig::default());

        // hash verification is unknown (0.5, no confidence); rotation regularity 0.3 * 5 * 0.3
        assert_eq!(score.score, 100);
        assert_eq!(score.metrics["hashVerification"], 0.5);
        assert_eq!(score.rationale[0], "Some hash verifications failed");
        assert_eq!(score.rationale.len(), 2);
    }

    #[test]
    fn test_rationale_threshold_is_exclusive() {
        let spec = &RNG_INTEGRITY[0];
        assert_eq!(spec.rationale(0.1), "All hash verifications passed");
        assert_eq!(spec.rationale(0.11), "Some hash verifications failed");
    }
}

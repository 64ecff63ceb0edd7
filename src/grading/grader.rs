//! Composite Grader

use tracing::info;

use super::category::Category;
use super::models::{CasinoTelemetry, CategoryScores, GradingReport};
use crate::config::GradingConfig;

pub const GRADING_VERSION: &str = "0.1.0";

pub const DISCLAIMER: &str = "Advisory, data-driven anomaly-based grading. High anomaly values \
indicate statistical deviations requiring cautious interpretation, not definitive misconduct.";

pub struct CompositeGrader {
    config: GradingConfig,
}

impl CompositeGrader {
    pub fn new(config: GradingConfig) -> Self {
        Self { config }
    }

    /// Grade every category and fold them into the composite score
    pub fn grade(&self, data: &CasinoTelemetry) -> GradingReport {
        let score = |category: Category| category.score(data, &self.config);
        let categories = CategoryScores {
            rng_integrity: score(Category::RngIntegrity),
            rtp_transparency: score(Category::RtpTransparency),
            volatility_consistency: score(Category::VolatilityConsistency),
            session_behavior: score(Category::SessionBehavior),
            transparency_ethics: score(Category::TransparencyEthics),
        };
        let composite_score = composite_score(&categories);

        info!(
            casino = %data.casino,
            composite = composite_score,
            spins = data.spins.len(),
            "Casino graded"
        );

        GradingReport {
            casino: data.casino.clone(),
            categories,
            composite_score,
            disclaimer: DISCLAIMER.to_string(),
            version: GRADING_VERSION.to_string(),
        }
    }
}

/// `round(Σ score_i · weight_i / 100)`
pub fn composite_score(categories: &CategoryScores) -> u32 {
    let weighted: u32 = [
        (categories.rng_integrity.score, Category::RngIntegrity),
        (categories.rtp_transparency.score, Category::RtpTransparency),
        (categories.volatility_consistency.score, Category::VolatilityConsistency),
        (categories.session_behavior.score, Category::SessionBehavior),
        (categories.transparency_ethics.score, Category::TransparencyEthics),
    ]
    .iter()
    .map(|(score, category)| score * category.weight())
    .sum();

    (weighted as f64 / 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::models::CategoryScore;
    use std::collections::BTreeMap;

    fn category(score: u32) -> CategoryScore {
        CategoryScore {
            score,
            metrics: BTreeMap::new(),
            rationale: Vec::new(),
        }
    }

    #[test]
    fn test_composite_formula() {
        let categories = CategoryScores {
            rng_integrity: category(80),
            rtp_transparency: category(90),
            volatility_consistency: category(70),
            session_behavior: category(100),
            transparency_ethics: category(55),
        };
        // (1200 + 2250 + 1400 + 2000 + 1100) / 100 = 79.5
        assert_eq!(composite_score(&categories), 80);
    }

    #[test]
    fn test_empty_telemetry_grades_within_bounds() {
        let grader = CompositeGrader::new(GradingConfig::default());
        let report = grader.grade(&CasinoTelemetry {
            casino: "acme".to_string(),
            ..Default::default()
        });

        assert_eq!(report.casino, "acme");
        assert_eq!(report.version, GRADING_VERSION);
        assert!(report.disclaimer.contains("not definitive misconduct"));
        assert!(report.composite_score <= 100);
        assert_eq!(report.categories.transparency_ethics.score, 88);
    }
}

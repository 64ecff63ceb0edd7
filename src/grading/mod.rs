//! Casino Grading Engine
//!
//! Telemetry batches are scored in five categories, then folded into one
//! composite grade.
//!
//! ## Categories
//!
//! | category              | weight | metrics                                                |
//! |-----------------------|--------|--------------------------------------------------------|
//! | rngIntegrity          | 15     | hashVerification, rotationRegularity, seedIntervalCV    |
//! | rtpTransparency       | 25     | payoutDrift, rtpDriftScore                             |
//! | volatilityConsistency | 20     | volatilityShift, bonusLatency, featureIntervalVariance |
//! | sessionBehavior       | 20     | seedRotationCorrelation, streakClusterZ, postBonusSlopeScore |
//! | transparencyEthics    | 20     | disclosureCompleteness, auditPresenceFlag              |
//!
//! Grades are advisory: a low score flags statistical deviation, not proven
//! misconduct.

mod category;
mod grader;
pub mod metrics;
mod models;
mod stats;

pub use category::{score_category, Category, MetricSpec};
pub use grader::{composite_score, CompositeGrader, DISCLAIMER, GRADING_VERSION};
pub use models::{
    BonusEvent, CasinoTelemetry, CategoryScore, CategoryScores, DisclosureChecklist,
    GradingReport, HashVerificationResult, MetricResult, SeedRotation, SpinRecord,
};
pub use stats::confidence_scaling;

//! Gameplay Fairness Analysis
//!
//! Session-scoped statistics over raw bet/payout telemetry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ SpinEvent   │────►│ SpinBuffer       │────►│ SessionStats    │
//! │ (telemetry) │     │ (per session)    │     │ (pure aggregate)│
//! └─────────────┘     └──────────────────┘     └─────────────────┘
//!                              │                        │
//!                              ▼                        ▼
//!                      ┌──────────────────────────────────────┐
//!                      │ AnomalyDetector                      │
//!                      │ rtp drift, pump-and-dump, compression│
//!                      │ clustering, bonus suppression,       │
//!                      │ impossible odds -> FairnessReport    │
//!                      └──────────────────────────────────────┘
//! ```
//!
//! Spins within a session keep arrival order; different sessions are
//! independent.

mod buffer;
mod detector;
mod models;
mod stats;

pub use buffer::SpinBuffer;
pub use detector::{
    confidence_level, detect_bonus_suppression, detect_clustering, detect_compression,
    detect_impossible_odds, detect_pump_and_dump, detect_rtp_drift, risk_score, runs_test,
    AnomalyDetector, Finding, RunsTest,
};
pub use models::{
    AnomalyDetection, AnomalySeverity, AnomalyType, FairnessReport, RtpAnalysis, SessionStats,
    SpinEvent, StreakStats, StreakType, Verdict,
};
pub use stats::{calculate_session_stats, return_variance, rtp_for_spins};

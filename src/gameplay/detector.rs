//! Anomaly Detector - Session Fairness Orchestrator
//!
//! Owns the spin buffer and runs six independent statistical checks over a
//! session. Every check is a pure function of the session's spins, so the
//! order they run in does not matter and repeated calls agree.
//!
//! Undersized sessions never error: a check that lacks its minimum sample
//! simply does not fire.

use std::collections::HashMap;

use chrono::Utc;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};

use super::buffer::SpinBuffer;
use super::models::{
    AnomalyDetection, AnomalySeverity, AnomalyType, FairnessReport, RtpAnalysis, SessionStats,
    SpinEvent, Verdict,
};
use super::stats::{self, rtp_for_spins};
use crate::config::GameplayConfig;

// =============================================================================
// Thresholds
// =============================================================================

const PUMP_MIN_SPINS: usize = 50;
const PUMP_EARLY_FRACTION: f64 = 0.2;
const PUMP_DROP_THRESHOLD: f64 = 0.15;

const COMPRESSION_MIN_SPINS: usize = 100;
const COMPRESSION_BAND: f64 = 0.1;
const COMPRESSION_RATE_THRESHOLD: f64 = 0.6;
const COMPRESSION_MAX_VARIANCE: f64 = 0.5;

const CLUSTERING_MIN_SPINS: usize = 100;
const CLUSTERING_Z_THRESHOLD: f64 = 2.5;

const BONUS_MIN_SPINS: usize = 200;

/// A combination seen this many times (the first plus more than three repeats)
const IMPOSSIBLE_ODDS_MIN_OCCURRENCES: usize = 5;

/// Output of a check that fired, before it is stamped into an `AnomalyDetection`
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub severity: AnomalySeverity,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Wald-Wolfowitz runs test over a win/loss sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunsTest {
    pub expected_runs: f64,
    pub actual_runs: usize,
    /// Absolute z-score
    pub z_score: f64,
    /// Two-sided p-value under the normal approximation
    pub p_value: f64,
}

/// Session-scoped fairness analysis
pub struct AnomalyDetector {
    buffer: SpinBuffer,
    game_rtps: HashMap<String, f64>,
    default_rtp: f64,
    expected_bonus_rate: f64,
}

impl AnomalyDetector {
    pub fn new(config: &GameplayConfig) -> Self {
        Self {
            buffer: SpinBuffer::new(),
            game_rtps: config.game_rtps.clone(),
            default_rtp: config.default_rtp,
            expected_bonus_rate: config.expected_bonus_rate,
        }
    }

    /// Published RTP for a game, falling back to the default entry
    pub fn expected_rtp(&self, game_id: &str) -> f64 {
        self.game_rtps
            .get(game_id)
            .copied()
            .unwrap_or(self.default_rtp)
    }

    pub fn record_spin(&self, event: SpinEvent) {
        self.buffer.push(event);
    }

    pub fn calculate_session_stats(&self, session_id: &str) -> Option<SessionStats> {
        self.buffer
            .with_spins(session_id, |spins| stats::calculate_session_stats(session_id, spins))
            .flatten()
    }

    pub fn analyze_rtp(&self, session_id: &str) -> Option<RtpAnalysis> {
        let stats = self.calculate_session_stats(session_id)?;
        Some(self.rtp_analysis_for(&stats))
    }

    fn rtp_analysis_for(&self, stats: &SessionStats) -> RtpAnalysis {
        let expected_rtp = self.expected_rtp(&stats.game_id);
        let deviation = stats.actual_rtp - expected_rtp;
        let deviation_percent = deviation / expected_rtp * 100.0;
        let sample_size = stats.total_spins;
        let confidence_level = confidence_level(sample_size, deviation.abs());

        RtpAnalysis {
            expected_rtp,
            actual_rtp: stats.actual_rtp,
            deviation,
            deviation_percent,
            is_significant: deviation_percent.abs() > 5.0
                && sample_size > 50
                && confidence_level > 0.95,
            sample_size,
            confidence_level,
        }
    }

    /// Run every check against the session. Empty or unknown sessions yield nothing.
    pub fn detect_anomalies(&self, session_id: &str) -> Vec<AnomalyDetection> {
        self.analyze(session_id)
            .map(|(_, _, anomalies)| anomalies)
            .unwrap_or_default()
    }

    pub fn generate_fairness_report(&self, session_id: &str) -> FairnessReport {
        let (session_stats, rtp_analysis, anomalies) = match self.analyze(session_id) {
            Some((stats, rtp, anomalies)) => (Some(stats), Some(rtp), anomalies),
            None => (None, None, Vec::new()),
        };

        let risk_score = risk_score(&anomalies);
        let verdict = Verdict::from_risk_score(risk_score);
        let recommendations =
            recommendations(&anomalies, session_stats.as_ref(), rtp_analysis.as_ref());

        if !anomalies.is_empty() {
            info!(
                session_id = %session_id,
                anomalies = anomalies.len(),
                risk_score = risk_score,
                verdict = ?verdict,
                "Fairness report flagged session"
            );
        }

        FairnessReport {
            session_stats,
            rtp_analysis,
            anomalies,
            verdict,
            risk_score,
            recommendations,
        }
    }

    /// Stats, RTP and every check computed from one read of the session, so a
    /// spin recorded concurrently is either seen by all of them or by none.
    fn analyze(&self, session_id: &str) -> Option<(SessionStats, RtpAnalysis, Vec<AnomalyDetection>)> {
        self.buffer
            .with_spins(session_id, |spins| {
                let stats = stats::calculate_session_stats(session_id, spins)?;
                let rtp = self.rtp_analysis_for(&stats);
                let anomalies = self.run_checks(spins, &rtp);
                Some((stats, rtp, anomalies))
            })
            .flatten()
    }

    fn run_checks(&self, spins: &[SpinEvent], rtp: &RtpAnalysis) -> Vec<AnomalyDetection> {
        let mut anomalies = Vec::new();
        let now = Utc::now();
        let mut push = |anomaly_type: AnomalyType, finding: Option<Finding>, recommendation: &str| {
            if let Some(finding) = finding {
                anomalies.push(AnomalyDetection {
                    anomaly_type,
                    severity: finding.severity,
                    confidence: finding.confidence,
                    evidence: finding.evidence,
                    recommendation: recommendation.to_string(),
                    detected_at: now,
                });
            }
        };

        let drift_recommendation = if rtp.deviation < 0.0 {
            "Player is experiencing significantly below-expected returns. Consider investigating game fairness."
        } else {
            "Player is experiencing above-expected returns (rare but possible). Monitor for compensation later."
        };
        push(AnomalyType::RtpDrift, detect_rtp_drift(rtp), drift_recommendation);
        push(
            AnomalyType::PumpAndDump,
            detect_pump_and_dump(spins),
            "Classic \"hook and hold\" pattern detected. Game may be engineered to give early wins followed by sustained losses.",
        );
        push(
            AnomalyType::Compression,
            detect_compression(spins),
            "Payouts are suspiciously compressed around break-even. This reduces variance and limits big win potential.",
        );
        push(
            AnomalyType::Clustering,
            detect_clustering(spins),
            "Non-random clustering of wins/losses detected. May indicate predetermined outcome sequences.",
        );
        push(
            AnomalyType::BonusSuppression,
            detect_bonus_suppression(spins, self.expected_bonus_rate),
            "Bonus rounds are triggering significantly below expected frequency. This is a common rigging technique.",
        );
        push(
            AnomalyType::ImpossibleOdds,
            detect_impossible_odds(spins),
            "CRITICAL: Mathematically impossible outcomes detected. Game is likely rigged or malfunctioning.",
        );

        anomalies
    }

    /// Release a finished session's spins
    pub fn clear_session(&self, session_id: &str) {
        let released = self.buffer.clear(session_id);
        debug!(session_id = %session_id, spins = released, "Cleared session");
    }

    pub fn active_sessions(&self) -> Vec<String> {
        self.buffer.session_ids()
    }
}

/// Sample-size driven confidence in an observed RTP deviation
pub fn confidence_level(sample_size: usize, abs_deviation: f64) -> f64 {
    if sample_size < 30 {
        0.5
    } else if sample_size < 100 {
        0.8
    } else if sample_size < 500 {
        0.9
    } else if sample_size >= 1000 && abs_deviation > 0.05 {
        0.99
    } else {
        0.95
    }
}

/// Capped sum of severity weight times confidence
pub fn risk_score(anomalies: &[AnomalyDetection]) -> f64 {
    anomalies
        .iter()
        .map(|a| a.severity.risk_weight() * a.confidence)
        .sum::<f64>()
        .min(100.0)
}

fn recommendations(
    anomalies: &[AnomalyDetection],
    stats: Option<&SessionStats>,
    rtp: Option<&RtpAnalysis>,
) -> Vec<String> {
    if anomalies.is_empty() {
        return vec![
            "No significant anomalies detected. Game appears to be functioning normally.".to_string(),
        ];
    }

    let fired = |t: AnomalyType| anomalies.iter().any(|a| a.anomaly_type == t);
    let noun = if anomalies.len() > 1 { "anomalies" } else { "anomaly" };
    let mut out = vec![format!(
        "{} {} detected. Review detailed findings.",
        anomalies.len(),
        noun
    )];

    if anomalies
        .iter()
        .any(|a| a.anomaly_type == AnomalyType::RtpDrift && a.severity == AnomalySeverity::Critical)
    {
        out.push("CRITICAL: Severe RTP drift detected. Consider stopping play immediately.".to_string());
    }
    if fired(AnomalyType::ImpossibleOdds) {
        out.push("CRITICAL: Impossible outcomes detected. Game is likely malfunctioning or rigged.".to_string());
    }
    if fired(AnomalyType::PumpAndDump) {
        out.push(
            "Pump and dump pattern detected. This is a known rigging technique to maximize player losses."
                .to_string(),
        );
    }
    if let (Some(stats), Some(rtp)) = (stats, rtp) {
        if stats.total_spins > 500 && rtp.actual_rtp < 0.85 {
            out.push(
                "Sustained below-expected RTP over large sample. Consider reporting to casino and/or regulators."
                    .to_string(),
            );
        }
    }

    out
}

// =============================================================================
// Checks
// =============================================================================

pub fn detect_rtp_drift(rtp: &RtpAnalysis) -> Option<Finding> {
    if !rtp.is_significant {
        return None;
    }
    let magnitude = rtp.deviation_percent.abs();
    let severity = if magnitude > 15.0 {
        AnomalySeverity::Critical
    } else if magnitude > 10.0 {
        AnomalySeverity::High
    } else if magnitude > 7.0 {
        AnomalySeverity::Medium
    } else {
        AnomalySeverity::Low
    };

    Some(Finding {
        severity,
        confidence: rtp.confidence_level,
        evidence: vec![
            format!("Expected RTP: {:.2}%", rtp.expected_rtp * 100.0),
            format!("Actual RTP: {:.2}%", rtp.actual_rtp * 100.0),
            format!("Deviation: {:.2}%", rtp.deviation_percent),
            format!("Sample size: {} spins", rtp.sample_size),
        ],
    })
}

/// Early returns well above late returns ("hook and hold")
pub fn detect_pump_and_dump(spins: &[SpinEvent]) -> Option<Finding> {
    if spins.len() < PUMP_MIN_SPINS {
        return None;
    }
    let split = (spins.len() as f64 * PUMP_EARLY_FRACTION).floor() as usize;
    let (early, late) = spins.split_at(split);
    let early_rtp = rtp_for_spins(early);
    let late_rtp = rtp_for_spins(late);
    let drop = early_rtp - late_rtp;

    if drop <= PUMP_DROP_THRESHOLD {
        return None;
    }
    let severity = if drop > 0.25 {
        AnomalySeverity::Critical
    } else if drop > 0.20 {
        AnomalySeverity::High
    } else {
        AnomalySeverity::Medium
    };

    Some(Finding {
        severity,
        confidence: 0.85,
        evidence: vec![
            format!("Early phase RTP: {:.2}%", early_rtp * 100.0),
            format!("Late phase RTP: {:.2}%", late_rtp * 100.0),
            format!("RTP drop: {:.2}%", drop * 100.0),
            "Classic \"hook\" pattern: high early returns to keep player engaged, then sustained losses"
                .to_string(),
        ],
    })
}

/// Returns bunched around break-even with little spread
pub fn detect_compression(spins: &[SpinEvent]) -> Option<Finding> {
    if spins.len() < COMPRESSION_MIN_SPINS {
        return None;
    }
    let compressed = spins
        .iter()
        .filter(|s| s.relative_return().abs() < COMPRESSION_BAND)
        .count();
    let rate = compressed as f64 / spins.len() as f64;
    let variance = stats::return_variance(spins);

    if rate <= COMPRESSION_RATE_THRESHOLD || variance >= COMPRESSION_MAX_VARIANCE {
        return None;
    }

    Some(Finding {
        severity: if rate > 0.75 {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        },
        confidence: 0.8,
        evidence: vec![
            format!("{:.1}% of spins near break-even", rate * 100.0),
            format!("Variance: {:.3} (unusually low)", variance),
            "Expected: More distributed wins/losses with higher variance".to_string(),
            "Actual: Artificially compressed payouts limiting big win potential".to_string(),
        ],
    })
}

/// Runs test over a boolean sequence. `None` when the sequence is too short
/// or all one outcome, since the runs variance is then zero.
pub fn runs_test(outcomes: &[bool]) -> Option<RunsTest> {
    let n = outcomes.len();
    if n < 2 {
        return None;
    }
    let actual_runs = 1 + outcomes.windows(2).filter(|w| w[0] != w[1]).count();

    let n = n as f64;
    let wins = outcomes.iter().filter(|w| **w).count() as f64;
    let product = 2.0 * wins * (n - wins);
    let expected_runs = product / n + 1.0;
    let variance = product * (product - n) / (n * n * (n - 1.0));
    if variance <= 0.0 {
        return None;
    }

    let z_score = ((actual_runs as f64 - expected_runs) / variance.sqrt()).abs();
    let p_value = Normal::new(0.0, 1.0)
        .map(|normal| 2.0 * (1.0 - normal.cdf(z_score)))
        .unwrap_or(f64::NAN);

    Some(RunsTest {
        expected_runs,
        actual_runs,
        z_score,
        p_value,
    })
}

/// Win/loss sequence that is too streaky or too alternating to be random
pub fn detect_clustering(spins: &[SpinEvent]) -> Option<Finding> {
    if spins.len() < CLUSTERING_MIN_SPINS {
        return None;
    }
    let outcomes: Vec<bool> = spins.iter().map(SpinEvent::is_win).collect();
    let test = runs_test(&outcomes)?;
    if test.z_score <= CLUSTERING_Z_THRESHOLD {
        return None;
    }

    let pattern = if (test.actual_runs as f64) < test.expected_runs {
        "Too much clustering (streaky)"
    } else {
        "Too alternating (artificial variance)"
    };

    Some(Finding {
        severity: if test.z_score > 4.0 {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        },
        confidence: (test.z_score / 5.0).min(0.99),
        evidence: vec![
            format!("Expected runs: {:.1}", test.expected_runs),
            format!("Actual runs: {}", test.actual_runs),
            format!("Z-score: {:.2} (indicates non-randomness)", test.z_score),
            format!("p-value: {:.5}", test.p_value),
            pattern.to_string(),
        ],
    })
}

/// Bonus features triggering far below the baseline rate
pub fn detect_bonus_suppression(spins: &[SpinEvent], expected_rate: f64) -> Option<Finding> {
    if spins.len() < BONUS_MIN_SPINS || expected_rate <= 0.0 {
        return None;
    }
    let bonuses = spins.iter().filter(|s| s.triggered_bonus()).count();
    let rate = bonuses as f64 / spins.len() as f64;
    if rate >= expected_rate * 0.3 {
        return None;
    }

    Some(Finding {
        severity: if rate < expected_rate * 0.1 {
            AnomalySeverity::Critical
        } else {
            AnomalySeverity::High
        },
        confidence: 0.9,
        evidence: vec![
            format!("Bonus trigger rate: {:.3}%", rate * 100.0),
            format!("Expected rate: ~{:.2}%", expected_rate * 100.0),
            format!("Suppression factor: {:.1}%", (1.0 - rate / expected_rate) * 100.0),
            format!("Sample size: {} spins", spins.len()),
        ],
    })
}

/// Exact symbol combinations recurring far too often. One evidence line per
/// combination, in first-seen order.
pub fn detect_impossible_odds(spins: &[SpinEvent]) -> Option<Finding> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in spins.iter().filter_map(SpinEvent::symbol_key) {
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let evidence: Vec<String> = order
        .into_iter()
        .filter_map(|key| {
            let count = counts.get(&key).copied().unwrap_or(0);
            (count >= IMPOSSIBLE_ODDS_MIN_OCCURRENCES)
                .then(|| format!("Exact symbol combination repeated {} times: {}", count, key))
        })
        .collect();

    if evidence.is_empty() {
        return None;
    }
    Some(Finding {
        severity: AnomalySeverity::Critical,
        confidence: 0.95,
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spin(session: &str, game: &str, bet: f64, payout: f64) -> SpinEvent {
        SpinEvent {
            timestamp: 0,
            session_id: session.to_string(),
            casino_id: "acme".to_string(),
            game_id: game.to_string(),
            user_id: "u1".to_string(),
            bet,
            payout,
            symbols: None,
            bonus_round: None,
            free_spins: None,
            multiplier: None,
        }
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(&GameplayConfig::default())
    }

    #[test]
    fn test_expected_rtp_lookup_falls_back_to_default() {
        let d = detector();
        assert!((d.expected_rtp("sugar-rush") - 0.965).abs() < 1e-12);
        assert!((d.expected_rtp("unknown-game") - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_level_steps() {
        assert_eq!(confidence_level(10, 0.5), 0.5);
        assert_eq!(confidence_level(50, 0.5), 0.8);
        assert_eq!(confidence_level(200, 0.5), 0.9);
        assert_eq!(confidence_level(700, 0.5), 0.95);
        assert_eq!(confidence_level(1000, 0.06), 0.99);
        assert_eq!(confidence_level(1000, 0.01), 0.95);
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let d = detector();
        assert!(d.calculate_session_stats("nope").is_none());
        assert!(d.analyze_rtp("nope").is_none());
        assert!(d.detect_anomalies("nope").is_empty());

        let report = d.generate_fairness_report("nope");
        assert_eq!(report.verdict, Verdict::Fair);
        assert_eq!(report.risk_score, 0.0);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_rtp_drift_requires_high_confidence() {
        let d = detector();
        // 600 spins at 50% RTP: large deviation but confidence tops out at 0.95
        for _ in 0..600 {
            d.record_spin(spin("s1", "default", 1.0, 0.5));
        }
        let rtp = d.analyze_rtp("s1").unwrap();
        assert!(rtp.deviation_percent < -40.0);
        assert!(!rtp.is_significant);

        for _ in 0..400 {
            d.record_spin(spin("s1", "default", 1.0, 0.5));
        }
        let rtp = d.analyze_rtp("s1").unwrap();
        assert!(rtp.is_significant);
        let finding = detect_rtp_drift(&rtp).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::Critical);
        assert_eq!(finding.confidence, 0.99);
    }

    #[test]
    fn test_pump_and_dump_below_minimum_sample() {
        let mut spins = vec![spin("s", "g", 1.0, 3.0); 10];
        spins.extend(vec![spin("s", "g", 1.0, 0.0); 39]);
        assert!(detect_pump_and_dump(&spins).is_none());
    }

    #[test]
    fn test_pump_and_dump_severity_bands() {
        let mut spins = vec![spin("s", "g", 1.0, 1.5); 12];
        spins.extend(vec![spin("s", "g", 1.0, 0.2); 48]);
        let finding = detect_pump_and_dump(&spins).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::Critical);
        assert_eq!(finding.confidence, 0.85);
        assert_eq!(finding.evidence[0], "Early phase RTP: 150.00%");
    }

    #[test]
    fn test_compression_fires_on_break_even_payouts() {
        let mut spins = vec![spin("s", "g", 1.0, 1.05); 80];
        spins.extend(vec![spin("s", "g", 1.0, 0.0); 20]);
        let finding = detect_compression(&spins).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::High);
        assert!(finding.evidence[0].starts_with("80.0%"));
    }

    #[test]
    fn test_compression_ignores_volatile_sessions() {
        let mut spins = vec![spin("s", "g", 1.0, 1.0); 70];
        spins.extend(vec![spin("s", "g", 1.0, 10.0); 30]);
        assert!(detect_compression(&spins).is_none());
    }

    #[test]
    fn test_runs_test_is_deterministic() {
        let outcomes: Vec<bool> = (0..120).map(|i| (i / 10) % 2 == 0).collect();
        let first = runs_test(&outcomes).unwrap();
        let second = runs_test(&outcomes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.actual_runs, 12);
        assert!(first.z_score > 2.5);
        assert!(first.p_value < 0.01);
    }

    #[test]
    fn test_runs_test_degenerate_sequence() {
        assert!(runs_test(&[true; 50]).is_none());
        assert!(runs_test(&[false]).is_none());
    }

    #[test]
    fn test_clustering_flags_alternating_sequence() {
        let spins: Vec<SpinEvent> = (0..100)
            .map(|i| spin("s", "g", 1.0, if i % 2 == 0 { 2.0 } else { 0.0 }))
            .collect();
        let finding = detect_clustering(&spins).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::High);
        assert_eq!(finding.confidence, 0.99);
        assert_eq!(
            finding.evidence.last().map(String::as_str),
            Some("Too alternating (artificial variance)")
        );
    }

    #[test]
    fn test_bonus_suppression() {
        let spins = vec![spin("s", "g", 1.0, 0.9); 250];
        let finding = detect_bonus_suppression(&spins, 0.01).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::Critical);

        let mut with_bonus = spins.clone();
        for s in with_bonus.iter_mut().step_by(100) {
            s.bonus_round = Some(true);
        }
        // 3 / 250 = 1.2% is above the suppression threshold
        assert!(detect_bonus_suppression(&with_bonus, 0.01).is_none());
    }

    #[test]
    fn test_impossible_odds_counts_each_combination_once() {
        let mut spins = Vec::new();
        for _ in 0..5 {
            let mut s = spin("s", "g", 1.0, 0.0);
            s.symbols = Some(vec!["7".into(), "7".into(), "7".into()]);
            spins.push(s);
        }
        for _ in 0..4 {
            let mut s = spin("s", "g", 1.0, 0.0);
            s.symbols = Some(vec!["A".into(), "B".into()]);
            spins.push(s);
        }

        let finding = detect_impossible_odds(&spins).unwrap();
        assert_eq!(finding.severity, AnomalySeverity::Critical);
        assert_eq!(
            finding.evidence,
            vec!["Exact symbol combination repeated 5 times: 7,7,7".to_string()]
        );
    }

    #[test]
    fn test_report_risk_score_and_recommendations() {
        let d = detector();
        for i in 0..60 {
            let payout = if i < 12 { 1.5 } else { 0.2 };
            d.record_spin(spin("s1", "default", 1.0, payout));
        }

        let report = d.generate_fairness_report("s1");
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.anomaly_type == AnomalyType::PumpAndDump));
        assert!(report.risk_score > 0.0 && report.risk_score <= 100.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("Pump and dump pattern detected")));
    }

    #[test]
    fn test_clear_session() {
        let d = detector();
        d.record_spin(spin("s1", "g", 1.0, 0.0));
        d.record_spin(spin("s2", "g", 1.0, 0.0));
        d.clear_session("s1");
        assert_eq!(d.active_sessions(), vec!["s2".to_string()]);
        assert!(d.calculate_session_stats("s1").is_none());
    }

    #[test]
    fn test_report_sees_one_view_under_concurrent_spins() {
        let d = detector();
        for _ in 0..1000 {
            d.record_spin(spin("s1", "default", 1.0, 0.0));
        }

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..500 {
                    d.record_spin(spin("s1", "default", 1.0, 0.0));
                }
            });
            for _ in 0..50 {
                let report = d.generate_fairness_report("s1");
                let stats = report.session_stats.unwrap();
                let drift = report
                    .anomalies
                    .iter()
                    .find(|a| a.anomaly_type == AnomalyType::RtpDrift)
                    .unwrap();
                let expected = format!("Sample size: {} spins", stats.total_spins);
                assert!(drift.evidence.contains(&expected));
                assert_eq!(report.rtp_analysis.unwrap().sample_size, stats.total_spins);
            }
        });
    }
}

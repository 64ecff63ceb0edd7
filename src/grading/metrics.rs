//! Metric Calculators
//!
//! Pure functions from one slice of telemetry to a `MetricResult`. A missing
//! or undersized input never errors; it returns a neutral-leaning value with
//! reduced confidence.

use std::collections::BTreeMap;

use super::models::{
    BonusEvent, DisclosureChecklist, HashVerificationResult, MetricResult, SeedRotation,
    SpinRecord,
};
use super::stats::{
    coefficient_of_variation, confidence_scaling, mean, percentile, regression_slope, safe_div,
    sorted_intervals, std_dev, variance,
};

// Minimum samples before a metric speaks with full confidence
pub const MIN_ROTATION_INTERVALS: usize = 5;
pub const MIN_PAYTABLE_SYMBOLS: usize = 1000;
pub const MIN_RTP_SPINS: usize = 1000;
pub const MIN_VOLATILITY_SPINS: usize = 300;
pub const MIN_BONUS_INTERVALS: usize = 3;
pub const MIN_FEATURE_INTERVALS: usize = 5;
pub const MIN_ROTATION_EPOCHS: usize = 5;
pub const MIN_LOSS_STREAKS: usize = 10;
pub const MIN_POST_BONUS_WINDOWS: usize = 3;

const POST_BONUS_WINDOW: usize = 20;

// =============================================================================
// RNG integrity
// =============================================================================

/// Share of failed provably-fair hash checks. Unknown is a mid anomaly with no weight.
pub fn hash_verification(verifications: Option<&[HashVerificationResult]>) -> MetricResult {
    let Some(verifications) = verifications.filter(|v| !v.is_empty()) else {
        return MetricResult::new(0.5, 0.0, 0);
    };
    let failed = verifications.iter().filter(|v| !v.verified).count();
    MetricResult::new(
        failed as f64 / verifications.len() as f64,
        1.0,
        verifications.len(),
    )
}

fn rotation_intervals(rotations: &[SeedRotation]) -> Vec<f64> {
    sorted_intervals(rotations.iter().map(|r| r.ts).collect())
}

/// Irregular seed rotation spacing (half the interval CV)
pub fn rotation_regularity(rotations: Option<&[SeedRotation]>) -> MetricResult {
    let rotations = rotations.unwrap_or_default();
    if rotations.len() < 3 {
        return MetricResult::new(0.3, 0.3, rotations.len());
    }
    let intervals = rotation_intervals(rotations);
    let cv = coefficient_of_variation(&intervals);
    MetricResult::new(
        (cv / 2.0).min(1.0),
        confidence_scaling(intervals.len(), MIN_ROTATION_INTERVALS),
        intervals.len(),
    )
}

pub fn seed_interval_cv(rotations: Option<&[SeedRotation]>) -> MetricResult {
    let rotations = rotations.unwrap_or_default();
    if rotations.len() < 3 {
        return MetricResult::empty(rotations.len());
    }
    let intervals = rotation_intervals(rotations);
    MetricResult::new(
        coefficient_of_variation(&intervals).min(1.0),
        confidence_scaling(intervals.len(), MIN_ROTATION_INTERVALS),
        intervals.len(),
    )
}

// =============================================================================
// RTP transparency
// =============================================================================

/// Chi-square distance of observed symbol frequencies from the paytable baseline
pub fn payout_drift(spins: &[SpinRecord], baseline: Option<&BTreeMap<String, f64>>) -> MetricResult {
    let Some(baseline) = baseline.filter(|b| !b.is_empty()) else {
        return MetricResult::empty(0);
    };

    let mut observed: BTreeMap<&str, u64> = BTreeMap::new();
    let mut total: u64 = 0;
    for freq in spins.iter().filter_map(|s| s.symbol_freq.as_ref()) {
        for (symbol, count) in freq {
            let slot = observed.entry(symbol.as_str()).or_insert(0);
            *slot = slot.saturating_add(*count);
            total = total.saturating_add(*count);
        }
    }
    if total == 0 {
        return MetricResult::empty(0);
    }

    let chi: f64 = observed
        .iter()
        .filter_map(|(symbol, &count)| {
            let expected = baseline.get(*symbol).copied().unwrap_or(0.0) * total as f64;
            (expected > 0.0).then(|| (count as f64 - expected).powi(2) / expected)
        })
        .sum();
    let df = observed.len().saturating_sub(1).max(1) as f64;
    let total = usize::try_from(total).unwrap_or(usize::MAX);

    MetricResult::new(
        (chi / (df * 10.0)).min(1.0),
        confidence_scaling(total, MIN_PAYTABLE_SYMBOLS),
        total,
    )
}

/// Mean net return outside an IQR band around the theoretical return
pub fn rtp_drift_score(spins: &[SpinRecord], theoretical: f64) -> MetricResult {
    if theoretical == 0.0 || !theoretical.is_finite() || spins.is_empty() {
        return MetricResult::empty(0);
    }
    let returns: Vec<f64> = spins.iter().map(|s| s.net_win).collect();
    let observed = mean(&returns);
    let iqr = percentile(&returns, 0.75) - percentile(&returns, 0.25);
    let lower = theoretical - 1.5 * iqr;
    let upper = theoretical + 1.5 * iqr;

    let distance = if observed < lower {
        lower - observed
    } else if observed > upper {
        observed - upper
    } else {
        0.0
    };

    MetricResult::new(
        (distance / theoretical.abs()).min(1.0),
        confidence_scaling(spins.len(), MIN_RTP_SPINS),
        spins.len(),
    )
}

// =============================================================================
// Volatility consistency
// =============================================================================

/// Variance change either side of the largest win
pub fn volatility_shift(spins: &[SpinRecord]) -> MetricResult {
    if spins.len() < 30 {
        return MetricResult::empty(spins.len());
    }
    let returns: Vec<f64> = spins.iter().map(|s| s.net_win).collect();
    let mut max_idx = 0;
    for (i, v) in returns.iter().enumerate() {
        if *v > returns[max_idx] {
            max_idx = i;
        }
    }

    let window = (spins.len() / 4).min(20);
    let pre = &returns[max_idx.saturating_sub(window)..max_idx];
    let post = &returns[(max_idx + 1).min(returns.len())..(max_idx + 1 + window).min(returns.len())];
    let pre_var = variance(pre);
    let post_var = variance(post);
    if pre_var == 0.0 && post_var == 0.0 {
        return MetricResult::new(0.0, 1.0, spins.len());
    }

    let larger = pre_var.max(post_var);
    let shift = (post_var - pre_var).abs() / if larger == 0.0 { 1.0 } else { larger };
    MetricResult::new(
        shift.min(1.0),
        confidence_scaling(spins.len(), MIN_VOLATILITY_SPINS),
        spins.len(),
    )
}

/// Bonus features arriving more slowly than advertised. Faster is not penalised.
pub fn bonus_latency(
    spins: &[SpinRecord],
    bonus_events: Option<&[BonusEvent]>,
    expected_per_spins: Option<f64>,
) -> MetricResult {
    let events = bonus_events.unwrap_or_default();
    let expected = match expected_per_spins {
        Some(e) if e > 0.0 && events.len() >= 2 => e,
        _ => return MetricResult::empty(events.len()),
    };

    let mut ts: Vec<i64> = events.iter().map(|e| e.ts).collect();
    ts.sort_unstable();
    let gaps: Vec<f64> = ts
        .windows(2)
        .map(|w| spins.iter().filter(|s| s.ts >= w[0] && s.ts < w[1]).count() as f64)
        .collect();

    let ratio = mean(&gaps) / expected;
    let value = if ratio > 1.0 {
        ((ratio - 1.0) / 2.0).min(1.0)
    } else {
        0.0
    };
    MetricResult::new(
        value,
        confidence_scaling(gaps.len(), MIN_BONUS_INTERVALS),
        gaps.len(),
    )
}

/// Bonus spacing variance against a Poisson-like expectation (variance ~ mean)
pub fn feature_interval_variance(
    bonus_events: Option<&[BonusEvent]>,
    expected_per_spins: Option<f64>,
) -> MetricResult {
    let events = bonus_events.unwrap_or_default();
    let expected = match expected_per_spins {
        Some(e) if e != 0.0 && events.len() >= 3 => e,
        _ => return MetricResult::empty(events.len()),
    };

    let intervals = sorted_intervals(events.iter().map(|e| e.ts).collect());
    let observed = variance(&intervals);
    MetricResult::new(
        ((observed - expected).abs() / expected).min(1.0),
        confidence_scaling(intervals.len(), MIN_FEATURE_INTERVALS),
        intervals.len(),
    )
}

// =============================================================================
// Session behavior
// =============================================================================

/// Payout level jumping between seed epochs
pub fn seed_rotation_correlation(
    spins: &[SpinRecord],
    rotations: Option<&[SeedRotation]>,
) -> MetricResult {
    let rotations = rotations.unwrap_or_default();
    if rotations.len() < 2 || spins.is_empty() {
        return MetricResult::empty(rotations.len());
    }

    let mut ts: Vec<i64> = rotations.iter().map(|r| r.ts).collect();
    ts.sort_unstable();
    let epoch_means: Vec<f64> = ts
        .windows(2)
        .filter_map(|w| {
            let returns: Vec<f64> = spins
                .iter()
                .filter(|s| s.ts >= w[0] && s.ts < w[1])
                .map(|s| s.net_win)
                .collect();
            (!returns.is_empty()).then(|| mean(&returns))
        })
        .collect();

    if epoch_means.len() < 3 {
        return MetricResult::empty(epoch_means.len());
    }

    let diffs: Vec<f64> = epoch_means.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let overall = mean(&epoch_means).abs();
    let metric = mean(&diffs) / if overall == 0.0 { 1.0 } else { overall };
    MetricResult::new(
        (metric / 5.0).min(1.0),
        confidence_scaling(epoch_means.len(), MIN_ROTATION_EPOCHS),
        epoch_means.len(),
    )
}

/// How far the longest losing streak sits above the typical one (z-score)
pub fn streak_cluster_z(spins: &[SpinRecord]) -> MetricResult {
    if spins.len() < 100 {
        return MetricResult::empty(spins.len());
    }

    let mut streaks: Vec<f64> = Vec::new();
    let mut current = 0u32;
    for spin in spins {
        if spin.net_win < 0.0 {
            current += 1;
        } else if current > 0 {
            streaks.push(current as f64);
            current = 0;
        }
    }
    if current > 0 {
        streaks.push(current as f64);
    }
    if streaks.len() < 5 {
        return MetricResult::new(0.0, 0.3, streaks.len());
    }

    let avg = mean(&streaks);
    let sd = std_dev(&streaks);
    let longest = streaks.iter().copied().fold(f64::MIN, f64::max);
    let z = (longest - avg) / if sd == 0.0 { 1.0 } else { sd };
    MetricResult::new(
        (z / 5.0).min(1.0),
        confidence_scaling(streaks.len(), MIN_LOSS_STREAKS),
        streaks.len(),
    )
}

/// Average downward trend over the spins following each bonus
pub fn post_bonus_slope_score(spins: &[SpinRecord], bonus_events: Option<&[BonusEvent]>) -> MetricResult {
    let events = bonus_events.unwrap_or_default();
    if events.is_empty() || spins.len() < 50 {
        return MetricResult::empty(0);
    }

    let slopes: Vec<f64> = events
        .iter()
        .filter_map(|bonus| {
            let start = spins.iter().position(|s| s.ts >= bonus.ts)?;
            let window = spins.get(start..start + POST_BONUS_WINDOW)?;
            let returns: Vec<f64> = window.iter().map(|s| s.net_win).collect();
            Some(regression_slope(&returns))
        })
        .collect();
    if slopes.is_empty() {
        return MetricResult::empty(0);
    }

    let avg = mean(&slopes);
    let value = if avg < 0.0 { (avg.abs() / 0.5).min(1.0) } else { 0.0 };
    MetricResult::new(
        value,
        confidence_scaling(slopes.len(), MIN_POST_BONUS_WINDOWS),
        slopes.len(),
    )
}

// =============================================================================
// Transparency & ethics
// =============================================================================

/// Share of the four disclosure items missing. A missing checklist is a high anomaly.
pub fn disclosure_completeness(disclosures: Option<&DisclosureChecklist>) -> MetricResult {
    match disclosures {
        None => MetricResult::new(0.7, 1.0, 1),
        Some(checklist) => MetricResult::new(
            1.0 - safe_div(checklist.satisfied() as f64, DisclosureChecklist::ITEMS as f64),
            1.0,
            DisclosureChecklist::ITEMS,
        ),
    }
}

pub fn audit_presence_flag(disclosures: Option<&DisclosureChecklist>) -> MetricResult {
    let present = disclosures.is_some_and(|d| d.audit_report_present);
    MetricResult::new(if present { 0.0 } else { 1.0 }, 1.0, 1)
}

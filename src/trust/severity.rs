//! Severity scale for casino penalties
//!
//! A bonus drop of p (fraction, e.g. 0.3 for 30%) maps to severity
//! `ceil(p * 10)` clamped to 1..=5; the severity indexes the penalty scale.

/// Default penalty per severity level (1..=5)
pub const DEFAULT_SEVERITY_SCALE: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 12.0];

pub fn compute_severity(percent_drop: f64) -> u8 {
    if !percent_drop.is_finite() || percent_drop <= 0.0 {
        return 1;
    }
    (percent_drop * 10.0).ceil().clamp(1.0, 5.0) as u8
}

/// Negative score delta for a severity. Out-of-range severities cost nothing.
pub fn penalty_for_severity(severity: u8, scale: &[f64]) -> f64 {
    match severity {
        1..=5 => scale
            .get(usize::from(severity - 1))
            .map(|penalty| -penalty)
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Accountability credit for a successful self-control action
pub fn accountability_bonus(action: &str) -> f64 {
    match action {
        "cooldown-accepted" => 2.0,
        "vault-used" => 3.0,
        "phone-a-friend" => 2.0,
        "smart-withdrawal" => 4.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_severity() {
        assert_eq!(compute_severity(0.0), 1);
        assert_eq!(compute_severity(-0.4), 1);
        assert_eq!(compute_severity(f64::NAN), 1);
        assert_eq!(compute_severity(0.05), 1);
        assert_eq!(compute_severity(0.15), 2);
        // 0.3 * 10 lands just above 3.0 in binary floating point
        assert_eq!(compute_severity(0.3), 4);
        assert_eq!(compute_severity(0.9), 5);
    }

    #[test]
    fn test_penalty_for_severity() {
        assert_eq!(penalty_for_severity(1, &DEFAULT_SEVERITY_SCALE), -2.0);
        assert_eq!(penalty_for_severity(5, &DEFAULT_SEVERITY_SCALE), -12.0);
        assert_eq!(penalty_for_severity(0, &DEFAULT_SEVERITY_SCALE), 0.0);
        assert_eq!(penalty_for_severity(6, &DEFAULT_SEVERITY_SCALE), 0.0);
    }

    #[test]
    fn test_accountability_bonus() {
        assert_eq!(accountability_bonus("smart-withdrawal"), 4.0);
        assert_eq!(accountability_bonus("something-new"), 1.0);
    }
}

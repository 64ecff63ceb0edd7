//! Sample statistics shared by the metric calculators
//!
//! All helpers are total: empty input yields 0 instead of NaN.

use statrs::statistics::Statistics;

pub fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_variance()
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Nearest-rank percentile (`p` in 0..=1) on a sorted copy
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// `min(1, sqrt(sample / min_required))`
pub fn confidence_scaling(sample_size: usize, min_required: usize) -> f64 {
    if min_required == 0 || sample_size >= min_required {
        return 1.0;
    }
    (sample_size as f64 / min_required as f64).sqrt()
}

/// Gaps between consecutive timestamps after sorting
pub fn sorted_intervals(mut timestamps: Vec<i64>) -> Vec<f64> {
    timestamps.sort_unstable();
    timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64)
        .collect()
}

/// Coefficient of variation (std / mean), 0 when the mean is 0
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    safe_div(std_dev(values), mean(values))
}

/// Least-squares slope of `values` against their index
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    safe_div(num, den)
}

//! Order statistics over f64 samples.
//!
//! Percentiles use linear interpolation between order statistics
//! (rank `p/100 * (n - 1)`), matching the convention the experiment
//! notebooks assumed. Helpers return 0.0 for empty input; callers that
//! must distinguish "no data" gate on emptiness first.

use serde::{Deserialize, Serialize};

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the median of a slice (50th percentile, interpolated).
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Calculate a percentile of a slice, sorting a copy first.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sort_samples(&mut sorted);
    percentile_sorted(&sorted, p)
}

/// Sort samples ascending, treating incomparable values as equal.
pub fn sort_samples(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Percentile of an already sorted slice, interpolating between the two
/// nearest order statistics.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = ((p / 100.0) * (n - 1) as f64).clamp(0.0, (n - 1) as f64);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let fraction = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * fraction
}

/// Median of an already sorted slice.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    percentile_sorted(sorted, 50.0)
}

/// The numbers behind a box plot of one sample set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub p90: f64,
    pub max: f64,
    pub mean: f64,
}

impl DistributionSummary {
    /// Summarize a sample set; `None` when there are no samples, so an
    /// empty distribution is an explicit state rather than a zero row.
    pub fn from_samples(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sort_samples(&mut sorted);
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            p25: percentile_sorted(&sorted, 25.0),
            median: median_sorted(&sorted),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            max: sorted[sorted.len() - 1],
            mean: mean(&sorted),
        })
    }
}

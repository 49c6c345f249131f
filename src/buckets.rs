//! Time-bucketed aggregation of (time, value) samples.
//!
//! Samples are grouped into one-second buckets by the floor of their
//! timestamp, offset so the earliest sample lands in bucket 0. The
//! series always spans `floor(max) - floor(min) + 1` consecutive
//! buckets; seconds with no samples still appear, with every statistic
//! reported as zero, so plots over the series keep a contiguous x axis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::SimTime;
use crate::stats;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no samples to aggregate for {context}")]
    EmptyDataset { context: String },
}

/// Accumulator for one time series. Samples arrive in log order, which
/// is not necessarily time order; bucketing happens in `finalize`.
#[derive(Debug, Clone, Default)]
pub struct TimeBuckets {
    samples: Vec<(SimTime, f64)>,
}

impl TimeBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: SimTime, value: f64) {
        self.samples.push((time, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Bucket the accumulated samples into a per-second series.
    /// `context` names the series in the empty-dataset error.
    pub fn finalize(&self, context: &str) -> Result<BucketSeries, AggregateError> {
        if self.samples.is_empty() {
            return Err(AggregateError::EmptyDataset {
                context: context.to_string(),
            });
        }

        let origin = self
            .samples
            .iter()
            .map(|(t, _)| t.floor() as i64)
            .min()
            .unwrap_or(0);
        let last = self
            .samples
            .iter()
            .map(|(t, _)| t.floor() as i64)
            .max()
            .unwrap_or(origin);
        let count = (last - origin + 1) as usize;

        let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); count];
        for (time, value) in &self.samples {
            let index = (time.floor() as i64 - origin) as usize;
            grouped[index].push(*value);
        }

        let buckets = grouped
            .into_iter()
            .enumerate()
            .map(|(second, mut values)| {
                if values.is_empty() {
                    return BucketStats::empty(second);
                }
                stats::sort_samples(&mut values);
                BucketStats {
                    second,
                    count: values.len(),
                    sum: values.iter().sum(),
                    min: values[0],
                    max: values[values.len() - 1],
                    median: stats::median_sorted(&values),
                    p90: stats::percentile_sorted(&values, 90.0),
                }
            })
            .collect();

        Ok(BucketSeries { origin, buckets })
    }
}

/// Statistics for one second of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    /// Offset in seconds from the series origin.
    pub second: usize,
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p90: f64,
}

impl BucketStats {
    fn empty(second: usize) -> Self {
        Self {
            second,
            count: 0,
            sum: 0.0,
            min: 0.0,
            max: 0.0,
            median: 0.0,
            p90: 0.0,
        }
    }
}

/// A contiguous per-second series. `origin` is the floor of the
/// earliest sample time; bucket `i` covers `[origin + i, origin + i + 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSeries {
    pub origin: i64,
    pub buckets: Vec<BucketStats>,
}

impl BucketSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Per-second sums, in bucket order.
    pub fn sums(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.sum).collect()
    }

    /// Total across all buckets.
    pub fn total(&self) -> f64 {
        self.buckets.iter().map(|b| b.sum).sum()
    }
}

//! Latency statistics over the successful requests of a stage.
//!
//! Percentiles use linear interpolation between the two closest ranks (the
//! R-7 / NumPy default). For `n` sorted samples and a quantile `q`:
//!
//! ```text
//! idx   = (n - 1) * q
//! lower = floor(idx), upper = ceil(idx)
//! p(q)  = data[lower] * (1 - frac) + data[upper] * frac,   frac = idx - lower
//! ```
//!
//! An empty sample yields `0.0` for every statistic. That value means "no
//! successful request yet" and is not an error.
use serde::{Deserialize, Serialize};

/// Interpolated percentile of an ascending-sorted sample.
///
/// `q` is clamped to `[0, 1]`. Returns `0.0` for an empty sample.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let idx = (sorted.len() - 1) as f64 * q;
    let lower = idx.floor();
    let upper = idx.ceil();
    if lower == upper {
        return sorted[idx as usize];
    }
    let frac = idx - lower;
    sorted[lower as usize] * (1.0 - frac) + sorted[upper as usize] * frac
}

/// Arithmetic mean, `0.0` for an empty sample.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Summary of a latency sample. Units follow the input (seconds for raw stage
/// data, milliseconds after [`LatencyStats::to_millis`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub avg: f64,
}

impl LatencyStats {
    /// Compute statistics from samples in any order.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    /// Compute statistics from an ascending-sorted sample.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p50: percentile(sorted, 0.50),
            p90: percentile(sorted, 0.90),
            p99: percentile(sorted, 0.99),
            avg: mean(sorted),
        }
    }

    /// Convert from seconds to milliseconds, rounded to two decimals.
    pub fn to_millis(self) -> Self {
        let ms = |secs: f64| round2(secs * 1000.0);
        Self {
            p50: ms(self.p50),
            p90: ms(self.p90),
            p99: ms(self.p99),
            avg: ms(self.avg),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

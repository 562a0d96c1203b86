use std::time::Duration;

use crate::metric::{Metric, RequestOutcome};

/// The `Aggregate` trait defines how raw [`Metric`] values are folded into the
/// in-flight state of a stage.
///
/// An aggregate only stores raw data (counts, samples). Derived statistics such as
/// rates and percentiles are computed afterwards from the finished
/// [`crate::StageResult`], never while workers are still producing metrics.
///
/// All workers of a stage share one aggregate behind a single lock, so `consume`
/// must stay O(1) and must never perform I/O.
///
/// # Example
/// ```rust
/// use stagebench::{Aggregate, RequestOutcome};
///
/// #[derive(Default)]
/// struct Attempts(u64);
///
/// impl Aggregate for Attempts {
///     type Metric = RequestOutcome;
///
///     fn new() -> Self {
///         Self::default()
///     }
///
///     fn consume(&mut self, _: &Self::Metric) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait Aggregate
where
    Self: Send + Sync,
{
    /// The metric type this aggregate accumulates.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);
}

/// Accumulated outcomes of one stage: success and failure counters plus the
/// latency of every successful request, in completion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTally {
    pub successes: u64,
    pub failures: u64,
    pub latencies: Vec<Duration>,
}

impl Aggregate for StageTally {
    type Metric = RequestOutcome;

    fn new() -> Self {
        StageTally::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric.latency() {
            Some(latency) => {
                self.successes += 1;
                self.latencies.push(latency);
            }
            None => self.failures += 1,
        }
    }
}

impl StageTally {
    pub fn total_requests(&self) -> u64 {
        self.successes + self.failures
    }
}

use std::time::Duration;

/// A `Metric` is the single observation produced by one execution of a worker's action.
///
/// Metrics are consumed one at a time by an [`crate::Aggregate`], which keeps whatever
/// the stage summary needs later on. They must be cheap to move between tasks.
pub trait Metric
where
    Self: PartialOrd + PartialEq + Send + Sync + Clone,
{
}

/// Outcome of one HTTP request attempt.
///
/// Only successful requests carry a latency; failures are counted but their timing
/// is discarded.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum RequestOutcome {
    Success { latency: Duration },
    Failure,
}

impl Metric for RequestOutcome {}

impl RequestOutcome {
    /// Classify a fully read response.
    ///
    /// Any status in `[200, 500)` counts as a success, redirects and client errors
    /// included. Everything else is a failure.
    pub fn classify(status: u16, latency: Duration) -> Self {
        if (200..500).contains(&status) {
            RequestOutcome::Success { latency }
        } else {
            RequestOutcome::Failure
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            RequestOutcome::Success { latency } => Some(*latency),
            RequestOutcome::Failure => None,
        }
    }
}

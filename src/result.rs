use std::time::Duration;

use crate::aggregate::StageTally;
use crate::config::Target;
use crate::executor::Stage;
use crate::stats::LatencyStats;

/// Outcome of one stage against one target.
///
/// Built once from the stage's [`StageTally`] and never modified afterwards. All
/// statistics are derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub target: Target,
    pub stage: Stage,
    pub successes: u64,
    pub failures: u64,
    /// Latency of every successful request
    pub latencies: Vec<Duration>,
}

impl StageResult {
    pub fn new(target: Target, stage: Stage, tally: StageTally) -> Self {
        Self {
            target,
            stage,
            successes: tally.successes,
            failures: tally.failures,
            latencies: tally.latencies,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.successes + self.failures
    }

    /// Successes over attempts, `0.0` when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        match self.total_requests() {
            0 => 0.0,
            total => self.successes as f64 / total as f64,
        }
    }

    /// Successful requests per second of stage duration.
    pub fn rps(&self) -> f64 {
        if self.stage.duration.is_zero() {
            return 0.0;
        }
        self.successes as f64 / self.stage.duration.as_secs_f64()
    }

    /// p50/p90/p99/avg of successful request latencies, in seconds.
    pub fn latency_stats(&self) -> LatencyStats {
        let samples: Vec<f64> = self.latencies.iter().map(Duration::as_secs_f64).collect();
        LatencyStats::from_samples(&samples)
    }
}

/// Every stage result of one target, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub target: Target,
    pub stage_results: Vec<StageResult>,
}

impl BenchmarkResult {
    pub fn total_requests(&self) -> u64 {
        self.stage_results.iter().map(StageResult::total_requests).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(successes: u64, failures: u64, duration: Duration) -> StageResult {
        StageResult::new(
            Target::new("lb", "http://127.0.0.1"),
            Stage::new(2, duration),
            StageTally {
                successes,
                failures,
                latencies: vec![Duration::from_millis(10); successes as usize],
            },
        )
    }

    #[test]
    fn empty_stage_has_zero_rates() {
        let r = result(0, 0, Duration::from_secs(10));
        assert_eq!(r.total_requests(), 0);
        assert_eq!(r.success_rate(), 0.0);
        assert_eq!(r.rps(), 0.0);
        assert_eq!(r.latency_stats(), LatencyStats::default());
    }

    #[test]
    fn rps_counts_only_successes() {
        let r = result(50, 25, Duration::from_secs(10));
        assert_eq!(r.rps(), 5.0);
        assert_eq!(r.total_requests(), 75);
        assert!((r.success_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_has_zero_rps() {
        assert_eq!(result(3, 0, Duration::ZERO).rps(), 0.0);
    }

    #[test]
    fn latency_stats_are_in_seconds() {
        let r = StageResult::new(
            Target::new("lb", "http://127.0.0.1"),
            Stage::new(1, Duration::from_secs(1)),
            StageTally {
                successes: 5,
                failures: 0,
                latencies: [5, 1, 4, 2, 3].map(Duration::from_secs).to_vec(),
            },
        );
        let stats = r.latency_stats();
        assert!((stats.p50 - 3.0).abs() < 1e-9);
        assert!((stats.p90 - 4.6).abs() < 1e-9);
        assert!((stats.avg - 3.0).abs() < 1e-9);
    }

    #[test]
    fn benchmark_total_spans_all_stages() {
        let b = BenchmarkResult {
            target: Target::new("lb", "http://127.0.0.1"),
            stage_results: vec![
                result(4, 1, Duration::from_secs(1)),
                result(10, 0, Duration::from_secs(1)),
            ],
        };
        assert_eq!(b.total_requests(), 15);
    }
}

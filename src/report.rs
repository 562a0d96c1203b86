use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;

use crate::config::{Target, TestConfig};
use crate::error::Result;
use crate::result::{BenchmarkResult, StageResult};
use crate::runner::TargetPlan;
use crate::stats::{LatencyStats, round2};

/// Presentation form of a [`StageResult`].
///
/// Rates are rounded to two decimals, the success rate is a percentage and latencies
/// are in milliseconds. Reports are plain data: building one performs no I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub target: String,
    pub concurrency: usize,
    pub duration_s: f64,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    /// Percentage of successful requests
    pub success_rate: f64,
    /// Successful requests per second
    pub success_rps: f64,
    pub latency_ms: LatencyStats,
}

impl From<&StageResult> for StageReport {
    fn from(result: &StageResult) -> Self {
        Self {
            target: result.target.name.clone(),
            concurrency: result.stage.concurrency,
            duration_s: result.stage.duration.as_secs_f64(),
            requests: result.total_requests(),
            successes: result.successes,
            failures: result.failures,
            success_rate: round2(result.success_rate() * 100.0),
            success_rps: round2(result.rps()),
            latency_ms: result.latency_stats().to_millis(),
        }
    }
}

/// Final summary of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub stages: Vec<StageReport>,
}

impl From<&BenchmarkResult> for TargetReport {
    fn from(result: &BenchmarkResult) -> Self {
        Self {
            target: result.target.name.clone(),
            stages: result.stage_results.iter().map(StageReport::from).collect(),
        }
    }
}

/// A [`Reporter`] is the output sink of a run.
///
/// It receives the plan before any traffic, one call per finished stage and the
/// final summaries. Output volume is proportional to the number of stages, never to
/// the number of requests.
pub trait Reporter {
    /// Called once before the first target runs, and as the only call of a dry run.
    fn plan(
        &self,
        test: &TestConfig,
        plans: &[TargetPlan],
        dry_run: bool,
    ) -> impl Future<Output = Result<()>>;

    fn target_started(&self, target: &Target) -> impl Future<Output = Result<()>>;

    fn stage_finished(&self, result: &StageResult) -> impl Future<Output = Result<()>>;

    fn summary(&self, reports: &[TargetReport]) -> impl Future<Output = Result<()>>;
}

/// Human-readable console output.
pub struct StdoutReporter;

impl StdoutReporter {
    pub fn progress_line(result: &StageResult) -> String {
        format!(
            "[{}] concurrency={} duration={:.0}s success={} fail={} success_rps={:.2}",
            result.target.name,
            result.stage.concurrency,
            result.stage.duration.as_secs_f64(),
            result.successes,
            result.failures,
            result.rps()
        )
    }

    pub fn summary_line(stage: &StageReport) -> String {
        let l = &stage.latency_ms;
        format!(
            "  * concurrency={} requests={} success_rate={:.2}% rps={:.2} latency(p50/p90/p99/avg)={:.2}/{:.2}/{:.2}/{:.2}ms",
            stage.concurrency,
            stage.requests,
            stage.success_rate,
            stage.success_rps,
            l.p50,
            l.p90,
            l.p99,
            l.avg
        )
    }
}

impl Reporter for StdoutReporter {
    async fn plan(&self, test: &TestConfig, plans: &[TargetPlan], dry_run: bool) -> Result<()> {
        println!("Loaded configuration:");
        println!("  Method: {}", test.method);
        println!("  Protocol: {}", test.protocol);
        println!(
            "  Concurrency range: {}-{}",
            test.min_clients, test.max_clients
        );
        println!("  Stage interval: {}s", test.stage_interval_s);
        println!("  Delay between requests: {}ms", test.request_delay_ms);
        println!("  Timeout per request: {}ms", test.request_timeout_ms);
        println!("  Number of stages: {}", test.stage_count);
        println!("  Targets:");
        for plan in plans {
            println!("    - {}: {}", plan.target.name, plan.target.url);
        }
        // The plan is identical for every target
        if let Some(plan) = plans.first() {
            println!("  Stages:");
            for (i, stage) in plan.stages.iter().enumerate() {
                println!(
                    "    {}. concurrency={} duration={}s",
                    i + 1,
                    stage.concurrency,
                    stage.duration.as_secs_f64()
                );
            }
        }
        if dry_run {
            println!("Dry run mode enabled - no requests will be sent.");
        }
        Ok(())
    }

    async fn target_started(&self, target: &Target) -> Result<()> {
        println!("\nRunning benchmark for {}...", target.name);
        Ok(())
    }

    async fn stage_finished(&self, result: &StageResult) -> Result<()> {
        println!("{}", Self::progress_line(result));
        Ok(())
    }

    async fn summary(&self, reports: &[TargetReport]) -> Result<()> {
        println!("\nBenchmark summary:");
        for report in reports {
            println!("- {}", report.target);
            for stage in &report.stages {
                println!("{}", Self::summary_line(stage));
            }
        }
        Ok(())
    }
}

/// Machine-readable output: one JSON document per line, tagged by `event`.
pub struct JsonReporter;

impl JsonReporter {
    pub fn plan_event(test: &TestConfig, plans: &[TargetPlan], dry_run: bool) -> serde_json::Value {
        let targets: Vec<_> = plans
            .iter()
            .map(|plan| {
                json!({
                    "name": plan.target.name,
                    "url": plan.target.url,
                    "endpoint": plan.endpoint,
                    "stages": plan
                        .stages
                        .iter()
                        .map(|s| json!({
                            "concurrency": s.concurrency,
                            "duration_s": s.duration.as_secs_f64(),
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({
            "event": "plan",
            "dry_run": dry_run,
            "test": test,
            "targets": targets,
        })
    }
}

impl Reporter for JsonReporter {
    async fn plan(&self, test: &TestConfig, plans: &[TargetPlan], dry_run: bool) -> Result<()> {
        let event = Self::plan_event(test, plans, dry_run);
        println!("{}", serde_json::to_string(&event)?);
        Ok(())
    }

    async fn target_started(&self, target: &Target) -> Result<()> {
        tracing::info!("Running benchmark for {}", target.name);
        Ok(())
    }

    async fn stage_finished(&self, result: &StageResult) -> Result<()> {
        let event = json!({ "event": "stage", "stage": StageReport::from(result) });
        println!("{}", serde_json::to_string(&event)?);
        Ok(())
    }

    async fn summary(&self, reports: &[TargetReport]) -> Result<()> {
        let event = json!({ "event": "summary", "targets": reports });
        println!("{}", serde_json::to_string(&event)?);
        Ok(())
    }
}

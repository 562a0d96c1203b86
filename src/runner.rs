use std::sync::Arc;

use tracing::info;
use typed_builder::TypedBuilder;

use crate::aggregate::StageTally;
use crate::client::{HttpProbe, RequestTarget};
use crate::config::{BenchConfig, Target, TestConfig};
use crate::error::{BenchError, Result};
use crate::executor::{Stage, StageExecutor};
use crate::report::{Reporter, TargetReport};
use crate::result::{BenchmarkResult, StageResult};

/// The stage plan of one target, as shown before a run or instead of it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlan {
    pub target: Target,
    /// Resolved URL requests would be sent to
    pub endpoint: String,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was sent; the plan is all there is.
    DryRun(Vec<TargetPlan>),
    /// One result per target, in configuration order.
    Completed(Vec<BenchmarkResult>),
}

impl RunOutcome {
    pub fn results(&self) -> &[BenchmarkResult] {
        match self {
            RunOutcome::DryRun(_) => &[],
            RunOutcome::Completed(results) => results,
        }
    }
}

/// Run every stage of `stages` against one target, strictly one after another.
///
/// The target is resolved and checked against the test protocol before the first
/// request. Each stage's result is handed to `reporter` as soon as the stage ends.
pub async fn run_target<R: Reporter>(
    test: &TestConfig,
    target: &Target,
    stages: &[Stage],
    reporter: &R,
) -> Result<BenchmarkResult> {
    let request = RequestTarget::resolve(target, test.protocol)?;
    let probe = Arc::new(HttpProbe::new(
        &request,
        &test.method,
        test.request_timeout(),
    )?);
    info!("Benchmarking {} at {}", target.name, probe.url());

    let j = stages.len();
    let mut stage_results = Vec::with_capacity(j);
    for (i, stage) in stages.iter().enumerate() {
        info!(
            "Starting stage {}/{j} for {}: {} workers",
            i + 1,
            target.name,
            stage.concurrency
        );
        let action = {
            let probe = Arc::clone(&probe);
            move || {
                let probe = Arc::clone(&probe);
                async move { probe.fire().await }
            }
        };
        let tally: StageTally = StageExecutor::builder()
            .stage(*stage)
            .request_delay(test.request_delay())
            .build()
            .exec(action)
            .await?;

        let result = StageResult::new(target.clone(), *stage, tally);
        info!("Finishing stage {}/{j} for {}", i + 1, target.name);
        reporter.stage_finished(&result).await?;
        stage_results.push(result);
    }

    Ok(BenchmarkResult {
        target: target.clone(),
        stage_results,
    })
}

/// Runs the whole benchmark: every target in order, never two at once.
///
/// ```rust,no_run
/// use stagebench::{BenchConfig, Benchmark, StdoutReporter};
///
/// # async fn demo() -> stagebench::Result<()> {
/// let config = BenchConfig::load("benchmark/config.toml")?;
/// let outcome = Benchmark::from_config(config, false).run(&StdoutReporter).await?;
/// println!("{} target(s) done", outcome.results().len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct Benchmark {
    pub test: TestConfig,
    pub targets: Vec<Target>,
    /// Compute and report the plan without sending any request
    #[builder(default)]
    pub dry_run: bool,
}

impl Benchmark {
    pub fn from_config(config: BenchConfig, dry_run: bool) -> Self {
        Self {
            test: config.test,
            targets: config.targets,
            dry_run,
        }
    }

    /// Resolve every target and attach the shared stage plan. Performs no I/O.
    pub fn plan(&self) -> Result<Vec<TargetPlan>> {
        if self.targets.is_empty() {
            return Err(BenchError::config("at least one target is required"));
        }
        let stages = self.test.stages();
        self.targets
            .iter()
            .map(|target| {
                let request = RequestTarget::resolve(target, self.test.protocol)?;
                Ok(TargetPlan {
                    target: target.clone(),
                    endpoint: request.endpoint(),
                    stages: stages.clone(),
                })
            })
            .collect()
    }

    pub async fn run<R: Reporter>(&self, reporter: &R) -> Result<RunOutcome> {
        // Every target is checked up front so a bad one fails before any traffic
        let plans = self.plan()?;
        reporter.plan(&self.test, &plans, self.dry_run).await?;

        if self.dry_run {
            info!("Dry run: {} target(s) planned, no traffic sent", plans.len());
            return Ok(RunOutcome::DryRun(plans));
        }

        let mut results = Vec::with_capacity(plans.len());
        for plan in &plans {
            reporter.target_started(&plan.target).await?;
            results.push(run_target(&self.test, &plan.target, &plan.stages, reporter).await?);
        }

        let reports: Vec<TargetReport> = results.iter().map(TargetReport::from).collect();
        reporter.summary(&reports).await?;
        info!("Benchmark finished for {} target(s)", results.len());
        Ok(RunOutcome::Completed(results))
    }
}

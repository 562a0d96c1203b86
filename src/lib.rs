//! Stagebench: a staged-concurrency HTTP load generator.
//!
//! Stagebench drives one or more HTTP(S) endpoints, typically load balancers or
//! reverse proxies, through a sequence of escalating concurrency stages and measures
//! throughput, success rate and latency distribution per stage.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`plan_stages`]: derives the ordered `(concurrency, duration)` stage list from a
//!   concurrency range. The plan is shared by every target.
//! - [`StageExecutor`]: runs one stage. Exactly `concurrency` workers loop over a
//!   fire-and-measure action until a shared deadline, feeding one lock-guarded
//!   [`Aggregate`].
//! - [`Metric`]: the outcome of a single request ([`RequestOutcome`]).
//! - [`HttpProbe`]: the action used for real traffic. One fresh connection per
//!   request, bounded by the per-request timeout.
//! - [`StageResult`] / [`BenchmarkResult`]: immutable results with derived
//!   statistics (success rate, successful rps, p50/p90/p99/avg latency).
//! - [`run_target`] and [`Benchmark`]: stages run one after another for a target,
//!   targets run one after another for a benchmark.
//! - [`Reporter`]: the output sink for the plan, per-stage progress and the final
//!   summary.
//!
//! # Scheduling model
//!
//! - Parallel workers within a stage.
//! - Sequential stages within a target.
//! - Sequential targets within a run.
//!
//! No state crosses a stage boundary, and the only synchronization point is the join
//! at the end of each stage.
//!
//! # Example
//!
//! ```rust,no_run
//! use stagebench::{Benchmark, StdoutReporter, Target, TestConfig};
//!
//! #[tokio::main]
//! async fn main() -> stagebench::Result<()> {
//!     let test = TestConfig {
//!         min_clients: 1,
//!         max_clients: 32,
//!         stage_count: 4,
//!         stage_interval_s: 10.0,
//!         ..TestConfig::default()
//!     };
//!     Benchmark::builder()
//!         .test(test)
//!         .targets(vec![Target::new("nginx", "http://127.0.0.1:8080/")])
//!         .build()
//!         .run(&StdoutReporter)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! - `internals`: exposes the worker-pool building blocks of the stage executor

/// Stage aggregates
pub mod aggregate;
/// HTTP target resolution and request probing
pub mod client;
/// Configuration loading and validation
pub mod config;
pub mod error;
/// Stage planning and the per-stage worker pool
pub mod executor;
/// Single request outcomes
pub mod metric;
/// Reports and Reporters
pub mod report;
/// Stage and benchmark results
pub mod result;
/// Target sequencing and the benchmark orchestrator
pub mod runner;
/// Percentiles and latency summaries
pub mod stats;

pub use aggregate::{Aggregate, StageTally};
pub use client::{HttpProbe, RequestTarget};
pub use config::{BenchConfig, Protocol, Target, TestConfig};
pub use error::{BenchError, Result};
pub use executor::{Stage, StageExecutor, plan_stages};
pub use metric::{Metric, RequestOutcome};
pub use report::{JsonReporter, Reporter, StageReport, StdoutReporter, TargetReport};
pub use result::{BenchmarkResult, StageResult};
pub use runner::{Benchmark, RunOutcome, TargetPlan, run_target};
pub use stats::{LatencyStats, percentile};

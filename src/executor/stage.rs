use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::aggregate::Aggregate;
use crate::error::{BenchError, Result};
use internals::*;

use std::{future::Future, sync::Arc, time::Duration};

/// A stage holds `concurrency` workers busy for `duration`.
///
/// Use `Stage::new(10, Duration::from_secs(30))` for ten workers during thirty seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    /// Number of concurrent workers
    pub concurrency: usize,
    pub duration: Duration,
}

impl Stage {
    pub fn new(concurrency: usize, duration: Duration) -> Self {
        Self {
            concurrency,
            duration,
        }
    }
}

/// Derive the stage sequence for a concurrency range.
///
/// With `stage_count <= 1` a single stage at `max_clients` is produced. Otherwise the
/// concurrency is linearly interpolated over `stage_count` points from `min_clients`
/// to `max_clients` inclusive, rounding half to even. Every stage runs for `interval`
/// and never has fewer than one worker.
pub fn plan_stages(
    min_clients: usize,
    max_clients: usize,
    interval: Duration,
    stage_count: usize,
) -> Vec<Stage> {
    if stage_count <= 1 {
        return vec![Stage::new(max_clients.max(1), interval)];
    }

    let step = (max_clients as f64 - min_clients as f64) / (stage_count - 1) as f64;
    (0..stage_count)
        .map(|i| {
            let concurrency = (min_clients as f64 + step * i as f64).round_ties_even();
            // Negative values saturate to 0 and are then clamped
            Stage::new((concurrency as usize).max(1), interval)
        })
        .collect()
}

/// Runs one [`Stage`]: a fixed pool of workers looping over `action` until a shared
/// deadline.
///
/// - Exactly `stage.concurrency` workers are spawned and all of them share one
///   aggregate behind a single lock.
/// - The lock is only taken to consume a finished metric, never while `action` runs.
/// - `request_delay` enforces a minimum spacing between request starts of one worker.
/// - `exec` returns only after every worker has observed the deadline and exited.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StageExecutor {
    /// The stage to run.
    pub stage: Stage,
    /// Minimum spacing between the starts of consecutive requests of a worker.
    #[builder(default = Duration::ZERO)]
    pub request_delay: Duration,
}

impl StageExecutor {
    /// Run the stage and return the aggregate of every metric the workers produced.
    pub async fn exec<A, F, Fut>(&self, action: F) -> Result<A>
    where
        A: Aggregate + 'static,
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = A::Metric> + Send + 'static,
    {
        let deadline = Instant::now()
            .checked_add(self.stage.duration)
            .ok_or_else(|| {
                BenchError::config(format!(
                    "stage duration {:?} is too long to schedule",
                    self.stage.duration
                ))
            })?;
        let aggregate = Arc::new(Mutex::new(A::new()));
        let ctx = WorkerContext {
            aggregate: Arc::clone(&aggregate),
            deadline,
            request_delay: self.request_delay,
        };

        tracing::info!(
            "Spawning {} workers for {:?}...",
            self.stage.concurrency,
            self.stage.duration
        );
        let handles = spawn_workers(ctx, self.stage.concurrency, action);

        let mut attempts = 0;
        for res in join_all(handles).await {
            match res {
                Ok(n) => attempts += n,
                // The shared aggregate survives a panicked worker, so keep what
                // the other workers recorded instead of failing the stage.
                Err(e) => tracing::error!("Worker panicked with error: {e}"),
            }
        }
        tracing::info!("All workers finished after {attempts} requests");

        let aggregate = Arc::try_unwrap(aggregate).map_err(|_| {
            BenchError::Worker("stage aggregate is still shared after all workers exited".into())
        })?;
        Ok(aggregate.into_inner())
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Worker-pool components of the `StageExecutor`.
/// Encapsulated in a module to allow conditional exposure via `#[cfg(feature = "internals")]`.
mod internals {
    use super::*;

    /// State shared by every worker of one stage.
    pub struct WorkerContext<A> {
        pub aggregate: Arc<Mutex<A>>,
        pub deadline: Instant,
        pub request_delay: Duration,
    }

    impl<A> Clone for WorkerContext<A> {
        fn clone(&self) -> Self {
            Self {
                aggregate: Arc::clone(&self.aggregate),
                deadline: self.deadline,
                request_delay: self.request_delay,
            }
        }
    }

    /// Spawns `workers` Tokio tasks running the fire-and-measure loop.
    ///
    /// Each task resolves to the number of requests its worker issued.
    pub fn spawn_workers<A, F, Fut>(
        ctx: WorkerContext<A>,
        workers: usize,
        action: F,
    ) -> Vec<JoinHandle<u64>>
    where
        A: Aggregate + 'static,
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = A::Metric> + Send + 'static,
    {
        (0..workers)
            .map(|i| {
                let ctx = ctx.clone();
                let action = action.clone();
                tokio::spawn(async move {
                    tracing::debug!("Worker {i} started.");
                    let mut attempts = 0;

                    while Instant::now() < ctx.deadline {
                        let started = Instant::now();
                        let metric = action().await;
                        ctx.aggregate.lock().await.consume(&metric);
                        attempts += 1;

                        if !ctx.request_delay.is_zero() {
                            // Sleeping past the deadline would only delay the join
                            let next_start = started
                                .checked_add(ctx.request_delay)
                                .map_or(ctx.deadline, |t| t.min(ctx.deadline));
                            tokio::time::sleep_until(next_start).await;
                        }
                    }

                    tracing::debug!("Worker {i} shutting down after {attempts} requests.");
                    attempts
                })
            })
            .collect()
    }
}

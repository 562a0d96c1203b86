//! Executor: stage planning and the per-stage worker pool
//!
//! A benchmark is a sequence of [`Stage`]s, each one a fixed concurrency held for a
//! fixed wall-clock duration. [`plan_stages`] derives that sequence from a
//! concurrency range, and [`StageExecutor`] runs a single stage.
//!
//! # High-level flow of one stage
//! 1. A single deadline is computed: `start + stage.duration`.
//! 2. Exactly `stage.concurrency` worker tasks are spawned. Each worker repeatedly:
//!    - stops if the deadline has passed,
//!    - awaits the `action()` future, which performs one request and returns a
//!      `Metric`,
//!    - locks the shared `Aggregate` just long enough to consume the metric,
//!    - sleeps for whatever is left of `request_delay` since the request started.
//! 3. The executor joins every worker and hands back the aggregate.
//!
//! # Pacing
//! `request_delay` is a minimum spacing between the *starts* of consecutive
//! requests of one worker, not a pacing clock. A request slower than the delay
//! is followed immediately by the next one.
//!
//! ```text
//! sleep = max(0, request_delay - elapsed_since_request_start)
//! ```
//!
//! # Deadline semantics
//! Workers poll the deadline before each request. There is no mid-request
//! cancellation, so a stage can overrun its duration by at most one
//! request timeout. A stage never ends early, even when every request fails.
pub mod stage;
pub use stage::{Stage, StageExecutor, plan_stages};

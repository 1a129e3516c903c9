//! Conflict-aware retry
//!
//! Mutations against a hosting API can lose a race with another writer: the
//! revision token they sent is stale by the time the host checks it. The
//! host answers with a conflict status, and the whole read-then-write
//! operation is run again with exponential backoff and jitter. Every other
//! failure is permanent and returned after the first attempt.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::error::{GitError, Result};

/// Conflict statuses for GitHub-style APIs
pub const GITHUB_CONFLICT_STATUSES: &[u16] = &[409];

/// Conflict statuses for GitLab-style APIs, which report some write races as 400
pub const GITLAB_CONFLICT_STATUSES: &[u16] = &[409, 400];

/// Backoff schedule parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// First delay between attempts, in milliseconds
    pub initial_interval_ms: u64,
    /// Upper bound for a single delay, in milliseconds
    pub max_interval_ms: u64,
    /// Growth factor applied to the delay after each attempt
    pub multiplier: f64,
    /// Jitter: each delay is drawn from `delay * (1 ± randomization_factor)`
    pub randomization_factor: f64,
    /// Stop retrying once this much time has passed; `None` retries until
    /// the context ends
    pub max_elapsed_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 60_000,
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_elapsed_ms: Some(15 * 60 * 1000),
        }
    }
}

/// Which errors to retry and how long to wait between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    conflict_statuses: Vec<u16>,
    settings: RetrySettings,
}

impl RetryPolicy {
    pub fn new(conflict_statuses: &[u16]) -> Self {
        Self {
            conflict_statuses: conflict_statuses.to_vec(),
            settings: RetrySettings::default(),
        }
    }

    pub fn github() -> Self {
        Self::new(GITHUB_CONFLICT_STATUSES)
    }

    pub fn gitlab() -> Self {
        Self::new(GITLAB_CONFLICT_STATUSES)
    }

    pub fn with_settings(mut self, settings: RetrySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn conflict_statuses(&self) -> &[u16] {
        &self.conflict_statuses
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// True if `err` is a host-reported conflict worth another attempt
    pub fn is_retryable(&self, err: &GitError) -> bool {
        err.status()
            .is_some_and(|status| self.conflict_statuses.contains(&status))
    }

    fn schedule(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.settings.initial_interval_ms);
        let mut schedule = ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            randomization_factor: self.settings.randomization_factor,
            multiplier: self.settings.multiplier,
            max_interval: Duration::from_millis(self.settings.max_interval_ms),
            max_elapsed_time: self.settings.max_elapsed_ms.map(Duration::from_millis),
            ..ExponentialBackoff::default()
        };
        schedule.reset();
        schedule
    }

    /// Run `operation` until it succeeds, fails permanently, or `ctx` ends.
    ///
    /// Each attempt calls `operation` afresh, so anything it reads (such as a
    /// revision token) is re-read on every attempt. When the context ends
    /// mid-retry, the in-flight attempt is dropped and the result is
    /// `Cancelled`/`DeadlineExceeded` carrying the last conflict seen.
    pub async fn run<T, F, Fut>(&self, ctx: &Context, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut schedule = self.schedule();
        let mut last: Option<GitError> = None;
        let mut attempt: u32 = 0;

        loop {
            if let Some(reason) = ctx.err() {
                return Err(GitError::interrupted(reason, last));
            }

            attempt += 1;
            let outcome = tokio::select! {
                outcome = operation() => outcome,
                reason = ctx.done() => return Err(GitError::interrupted(reason, last)),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                // The attempt saw the context end before this loop did
                Err(err) if err.is_cancelled() => return Err(err.or_last(last)),
                Err(err) => err,
            };

            if !self.is_retryable(&err) {
                return Err(err);
            }

            let Some(delay) = schedule.next_backoff() else {
                debug!(attempt, error = %err, "Retry budget exhausted");
                return Err(err);
            };

            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after conflict"
            );
            last = Some(err);

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                reason = ctx.done() => return Err(GitError::interrupted(reason, last)),
            }
        }
    }
}

/// Run `operation` under `policy`; see [`RetryPolicy::run`]
pub async fn with_retry<T, F, Fut>(ctx: &Context, policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    policy.run(ctx, operation).await
}

//! Backend invocation with bounded retry.
//!
//! One invocation walks the states `Attempting(0) .. Attempting(max)` and
//! ends in `Succeeded` or `Failed(kind)`:
//!
//! - success returns the raw text at once;
//! - `Throttled` sleeps `base * 2^n + jitter` and tries again;
//! - `Transient` sleeps `1 + 0.5 * n` units and tries again;
//! - `InvalidRequest` and `Fatal` fail immediately;
//! - any kind fails once attempt `max_attempts` has been used.
//!
//! Sleeping and jitter go through [`crate::providers`] so the curves can be
//! checked without waiting.

use crate::backend::{Backend, ErrorKind};
use crate::providers::{JitterSource, RandomJitter, Sleeper, TokioSleeper};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

/// Retry limits and backoff curves.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Highest attempt index; total tries are `max_attempts + 1`.
    pub max_attempts: u32,
    /// Base of the exponential curve used for throttling.
    pub throttle_base: Duration,
    /// Exclusive upper bound of the jitter added to throttle delays.
    pub max_jitter: Duration,
    /// First delay of the linear curve used for transient failures.
    pub transient_base: Duration,
    /// Increment of the linear curve per attempt.
    pub transient_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            throttle_base: Duration::from_secs(2),
            max_jitter: Duration::from_millis(500),
            transient_base: Duration::from_secs(1),
            transient_step: Duration::from_millis(500),
        }
    }
}

/// What happens after attempt `n` failed with a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Sleep, then move to `Attempting(n + 1)`.
    Retry(Duration),
    /// Stop in `Failed(kind)`.
    Fail(ErrorKind),
}

impl RetryPolicy {
    /// Decides the transition out of a failed attempt.
    pub fn on_failure(&self, attempt: u32, kind: ErrorKind, jitter: Duration) -> Transition {
        if attempt >= self.max_attempts {
            return Transition::Fail(kind);
        }
        match kind {
            ErrorKind::Throttled => {
                let factor = 2u32.saturating_pow(attempt);
                Transition::Retry(self.throttle_base.saturating_mul(factor) + jitter)
            }
            ErrorKind::Transient => {
                Transition::Retry(self.transient_base + self.transient_step.saturating_mul(attempt))
            }
            ErrorKind::InvalidRequest | ErrorKind::Fatal => Transition::Fail(kind),
        }
    }
}

/// One try inside the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub index: u32,
    pub delay_before: Duration,
}

/// Terminal failure of an invocation.
#[derive(Debug, Clone, Error)]
#[error("backend failed ({kind}) after {} attempt(s): {message}", .attempts.len())]
pub struct InvokeError {
    pub kind: ErrorKind,
    pub attempts: Vec<Attempt>,
    pub message: String,
}

/// Sends prompts to a backend under a [`RetryPolicy`].
pub struct BackendInvoker {
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl BackendInvoker {
    /// Invoker with the default policy, the tokio timer and random jitter.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_providers(
            backend,
            RetryPolicy::default(),
            Arc::new(TokioSleeper),
            Arc::new(RandomJitter),
        )
    }

    /// Invoker with injected policy and providers (for testing).
    pub fn with_providers(
        backend: Arc<dyn Backend>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            backend,
            policy,
            sleeper,
            jitter,
        }
    }

    /// Runs the retry state machine and returns the raw generated text.
    pub async fn invoke(&self, system_text: &str, user_text: &str) -> Result<String, InvokeError> {
        let mut attempts = Vec::new();
        let mut delay_before = Duration::ZERO;
        let mut index = 0;

        loop {
            attempts.push(Attempt {
                index,
                delay_before,
            });
            let started = Instant::now();

            let failure = match self.backend.generate(system_text, user_text).await {
                Ok(text) => {
                    info!(
                        "Backend call succeeded in {:.2}s on attempt {}",
                        started.elapsed().as_secs_f64(),
                        index + 1
                    );
                    return Ok(text);
                }
                Err(failure) => failure,
            };

            warn!(
                "Backend attempt {}/{} failed: {}",
                index + 1,
                self.policy.max_attempts + 1,
                failure
            );

            let jitter = match failure.kind {
                ErrorKind::Throttled => self.jitter.jitter(self.policy.max_jitter),
                _ => Duration::ZERO,
            };

            match self.policy.on_failure(index, failure.kind, jitter) {
                Transition::Retry(delay) => {
                    info!(
                        "Waiting {:.2}s before attempt {} ({})",
                        delay.as_secs_f64(),
                        index + 2,
                        failure.kind
                    );
                    self.sleeper.sleep(delay).await;
                    delay_before = delay;
                    index += 1;
                }
                Transition::Fail(kind) => {
                    error!("Backend invocation failed after {} attempt(s): {}", index + 1, kind);
                    return Err(InvokeError {
                        kind,
                        attempts,
                        message: failure.message,
                    });
                }
            }
        }
    }
}

//! Shared provider traits for dependency injection.
//!
//! The retry loop needs two ambient capabilities: waiting and randomness.
//! Both are abstracted here so the backoff curves can be asserted against
//! deterministic implementations instead of wall-clock time.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Trait for suspending the current task between attempts.
///
/// # Example
///
/// ```ignore
/// use shellmate::providers::{Sleeper, TokioSleeper};
///
/// TokioSleeper.sleep(Duration::from_secs(2)).await;
/// ```
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Trait for providing bounded random jitter.
pub trait JitterSource: Send + Sync {
    /// Returns a duration in `[0, max)`. A zero `max` yields zero.
    fn jitter(&self, max: Duration) -> Duration;
}

/// Default jitter source using the thread-local RNG.
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

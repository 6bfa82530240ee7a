//! Retry policy: attempt budget, backoff and the injectable time sources

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Total tries per call, the first attempt included
pub const MAX_ATTEMPTS: u32 = 3;

/// Source of the random part of a backoff delay
pub trait JitterSource: Send + Sync {
    /// Returns a value in `[0, 1s)`
    fn jitter(&self) -> Duration;
}

/// Uniform jitter from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(0..1000))
    }
}

/// Always returns the same jitter
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(pub Duration);

impl JitterSource for FixedJitter {
    fn jitter(&self) -> Duration {
        self.0
    }
}

/// Waits between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|slept| slept.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// How a call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, always [`MAX_ATTEMPTS`] for API calls
    pub max_attempts: u32,
    /// Upper bound for rate-limit waits; `None` means no bound
    pub max_retry_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            max_retry_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retry_delay(mut self, max: Option<Duration>) -> Self {
        self.max_retry_delay = max;
        self
    }

    /// Whether an attempt with this 0-based index may be followed by another
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Wait before the attempt that follows `attempt`
    ///
    /// # Arguments
    /// * `attempt` - 0-based index of the attempt that just failed
    /// * `jitter` - source of the random term added after the first attempt
    ///
    /// # Returns
    /// * `Duration::ZERO` for attempt 0
    /// * `2^(attempt-1)` seconds plus jitter otherwise
    pub fn backoff(&self, attempt: u32, jitter: &dyn JitterSource) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base = Duration::from_secs(1u64 << (attempt - 1).min(32));
        base + jitter.jitter()
    }

    /// Delay before retrying a 429: the server hint when positive, otherwise
    /// normal backoff, clamped to `max_retry_delay`
    pub fn rate_limit_delay(
        &self,
        attempt: u32,
        retry_after_secs: u64,
        jitter: &dyn JitterSource,
    ) -> Duration {
        let delay = if retry_after_secs > 0 {
            Duration::from_secs(retry_after_secs)
        } else {
            self.backoff(attempt, jitter)
        };
        match self.max_retry_delay {
            Some(max) if delay > max => max,
            _ => delay,
        }
    }
}

//! Retry with backoff, selected by the kind of failure observed.
//!
//! Upstream providers fail in two retryable ways: they tell us to slow down
//! (HTTP 429, quota exhausted) or they hiccup (connection reset, 5xx). A
//! [`RetryPolicy`] holds one [`Backoff`] per retryable kind, so a single loop
//! covers both strategies:
//!
//! ```text
//! RateLimited -> policy.rate_limited   (usually exponential: base * 2^attempt)
//! Transient   -> policy.transient      (usually a fixed delay, or None = give up)
//! Permanent   -> give up immediately
//! ```
//!
//! `attempt` counts failed attempts from zero, so with a 5s exponential base
//! the sleeps are 5s, 10s, 20s, ...

use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// How a failure should be treated by [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream asked us to back off.
    RateLimited,
    /// Worth another try after a pause.
    Transient,
    /// Retrying cannot help.
    Permanent,
}

/// Implemented by error types that [`retry`] can reason about.
pub trait Classify {
    fn failure_kind(&self) -> FailureKind;
}

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the failed attempt with zero-based index `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let factor = 1u32 << attempt.min(16);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// Bounded retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Schedule used when the upstream signals rate limiting.
    pub rate_limited: Backoff,
    /// Schedule for transient failures; `None` fails them immediately.
    pub transient: Option<Backoff>,
    /// Upper bound of random jitter added to every delay.
    pub jitter: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Exponential on rate limits, a fixed pause on anything transient.
    pub fn new(max_attempts: u32, base_delay: Duration, fixed_delay: Duration) -> Self {
        Self {
            max_attempts,
            rate_limited: Backoff::Exponential {
                base: base_delay,
                max: Duration::from_secs(120),
            },
            transient: Some(Backoff::Fixed(fixed_delay)),
            jitter: Duration::ZERO,
        }
    }

    /// Only rate limits are retried; any other failure ends the item.
    pub fn rate_limit_only(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            transient: None,
            ..Self::new(max_attempts, base_delay, Duration::ZERO)
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn backoff_for(&self, kind: FailureKind) -> Option<&Backoff> {
        match kind {
            FailureKind::RateLimited => Some(&self.rate_limited),
            FailureKind::Transient => self.transient.as_ref(),
            FailureKind::Permanent => None,
        }
    }

    fn jitter_sample(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = self.jitter.as_millis() as u64;
        Duration::from_millis(rng().random_range(0..=max_ms))
    }
}

/// Run `op` until it succeeds, a non-retryable failure occurs, or
/// `policy.max_attempts` is used up. The last error is returned on failure.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    E: Classify + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let total_t0 = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let attempt_t0 = Instant::now();
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = e.failure_kind();
                let used = attempt + 1;
                let backoff = match policy.backoff_for(kind) {
                    Some(backoff) if used < max_attempts => backoff,
                    _ => {
                        error!(
                            label,
                            attempt = used,
                            max = max_attempts,
                            ?kind,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "giving up"
                        );
                        return Err(e);
                    }
                };

                let delay = backoff.delay(attempt) + policy.jitter_sample();
                warn!(
                    label,
                    attempt = used,
                    max = max_attempts,
                    ?kind,
                    elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                    ?delay,
                    error = %e,
                    "attempt failed; backing off"
                );
                sleep(delay).await;
                attempt = used;
            }
        }
    }
}

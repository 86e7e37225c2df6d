//! Bounded retry with an overall deadline.

use crate::error::NotifyError;
use crate::Result;
use herald_core::config::{BackoffStrategy, RetryOptions};
use herald_core::ConfigError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

/// Shape of the delay between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Always wait the base delay.
    Constant,

    /// `base * multiplier^(attempt - 1)`, capped at `max_delay`.
    Exponential { multiplier: f64, max_delay: Duration },

    /// Uniform random between half the base delay and the doubling
    /// exponential delay, capped at `max_delay`.
    Jittered { max_delay: Duration },
}

/// Retry policy for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    overall_timeout: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy with constant backoff.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        overall_timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::validation("max_attempts must be at least 1"));
        }
        if overall_timeout.is_zero() {
            return Err(ConfigError::validation("overall_timeout must be greater than zero"));
        }

        Ok(Self {
            max_attempts,
            base_delay,
            overall_timeout,
            backoff: Backoff::Constant,
        })
    }

    /// Replace the backoff shape.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts, the first included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Time budget for a whole send, retries included.
    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Constant => self.base_delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => exponential(self.base_delay, *multiplier, attempt, *max_delay),
            Backoff::Jittered { max_delay } => {
                let upper = exponential(self.base_delay, 2.0, attempt, *max_delay);
                let lower = (self.base_delay / 2).min(upper);
                if lower >= upper {
                    upper
                } else {
                    rand::thread_rng().gen_range(lower..=upper)
                }
            }
        }
    }
}

fn exponential(base: Duration, multiplier: f64, attempt: u32, max: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let secs = base.as_secs_f64() * multiplier.powi(exp);
    // Negative or non-finite factors fall back to the base delay
    Duration::try_from_secs_f64(secs.min(max.as_secs_f64())).unwrap_or_else(|_| base.min(max))
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            overall_timeout: Duration::from_millis(30000),
            backoff: Backoff::Constant,
        }
    }
}

impl TryFrom<&RetryOptions> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(options: &RetryOptions) -> std::result::Result<Self, Self::Error> {
        let max_delay = Duration::from_millis(options.max_delay_ms);
        let backoff = match options.backoff {
            BackoffStrategy::Constant => Backoff::Constant,
            BackoffStrategy::Exponential
                if !options.multiplier.is_finite() || options.multiplier < 1.0 =>
            {
                return Err(ConfigError::validation(format!(
                    "multiplier must be at least 1.0, got {}",
                    options.multiplier
                )));
            }
            BackoffStrategy::Exponential => Backoff::Exponential {
                multiplier: options.multiplier,
                max_delay,
            },
            BackoffStrategy::Jittered => Backoff::Jittered { max_delay },
        };

        Ok(Self::new(
            options.max_retries,
            Duration::from_millis(options.delay_ms),
            Duration::from_millis(options.timeout_ms),
        )?
        .with_backoff(backoff))
    }
}

/// Drives an operation through its retry policy.
///
/// Every call to [`execute`](Self::execute) owns its own attempt counter and
/// deadline, so one executor can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently, exhausts its
    /// attempts, or runs past the overall timeout.
    ///
    /// `operation` receives the 1-based attempt number. `should_retry` is
    /// consulted for every failure; errors it rejects are returned unchanged.
    pub async fn execute<T, F, Fut, P>(&self, mut operation: F, should_retry: P) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&NotifyError) -> bool,
    {
        let deadline = Instant::now() + self.policy.overall_timeout;
        let mut attempt = 1;

        loop {
            let error = match timeout_at(deadline, operation(attempt)).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_) => {
                    warn!(
                        attempt,
                        timeout_ms = self.policy.overall_timeout.as_millis() as u64,
                        "Operation timed out during attempt"
                    );
                    return Err(self.timed_out(attempt));
                }
            };

            if !should_retry(&error) {
                return Err(error);
            }

            if attempt >= self.policy.max_attempts {
                warn!(attempts = attempt, error = %error, "Retry attempts exhausted");
                return Err(NotifyError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(attempt);
            if Instant::now() + delay >= deadline {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Next retry would pass the deadline"
                );
                return Err(self.timed_out(attempt));
            }

            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying after delay"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    fn timed_out(&self, attempts: u32) -> NotifyError {
        NotifyError::Timeout {
            timeout: self.policy.overall_timeout,
            attempts,
        }
    }
}

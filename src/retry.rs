use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::ServiceError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(20);
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Bounded retry with fixed sleeps: a long one after rate limiting, a short
/// one after other transport failures, none after an unparseable answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_backoff: RATE_LIMIT_BACKOFF,
            error_backoff: ERROR_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Same attempt bound, no sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            rate_limit_backoff: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }

    pub fn backoff_for(&self, error: &ServiceError) -> Duration {
        match error {
            e if e.is_rate_limit() => self.rate_limit_backoff,
            ServiceError::NoDecision(_) | ServiceError::Decode { .. } | ServiceError::Shape(_) => {
                Duration::ZERO
            }
            _ => self.error_backoff,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    /// `op` receives the 1-based attempt number.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut(u32) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    warn!("{} failed on final attempt {}: {}", what, attempt, e);
                    return Err(ServiceError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let pause = self.backoff_for(&e);
                    warn!(
                        attempt,
                        backoff_ms = pause.as_millis() as u64,
                        "{} failed: {}",
                        what,
                        e
                    );
                    if !pause.is_zero() {
                        thread::sleep(pause);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

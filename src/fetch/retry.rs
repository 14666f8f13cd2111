//! Retry policy for fallible operations.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use tracing::warn;

/// Blind retry: a fixed number of attempts with a constant pause between them.
///
/// No backoff growth, no jitter. The worst case per call is
/// `max_attempts × (operation time + delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// The last error once every attempt has failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    /// A policy making at most `max_attempts` attempts (at least one).
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `op` until it succeeds, `retryable` rejects its error, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. The delay is only slept
    /// between attempts, never after the last one.
    pub fn run<T, E, F, P>(&self, mut op: F, retryable: P) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "attempt failed");
                    if attempt >= self.max_attempts || !retryable(&e) {
                        return Err(Exhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                }
            }
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

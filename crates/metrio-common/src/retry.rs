use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff schedule shared by the client transport and the database
/// backend. Each entry is slept *before* the attempt it belongs to, so a
/// leading zero makes the first attempt immediate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    waits: Vec<Duration>,
}

impl RetryPolicy {
    /// Fixed schedule used for database operations: immediate, then 1s,
    /// 3s and 5s before the remaining attempts.
    pub fn fixed() -> Self {
        Self {
            waits: [0, 1, 3, 5].into_iter().map(Duration::from_secs).collect(),
        }
    }

    /// Fibonacci schedule seeded at 1s, used by the HTTP transport.
    pub fn fibonacci(max_attempts: usize) -> Self {
        let mut waits = vec![Duration::ZERO];
        let (mut a, mut b) = (1u64, 1u64);
        while waits.len() < max_attempts.max(1) {
            waits.push(Duration::from_secs(a));
            (a, b) = (b, a + b);
        }
        Self { waits }
    }

    pub fn max_attempts(&self) -> usize {
        self.waits.len()
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the schedule is exhausted. The classifier decides which errors are
    /// transient; everything else propagates immediately. The error of the
    /// final attempt is returned as-is, never swallowed.
    pub async fn run<T, E, F, Fut>(
        &self,
        what: &str,
        retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            let wait = self.waits[attempt];
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt + 1 < self.waits.len() && retryable(&err) {
                        warn!(op = what, attempt, error = %err, "attempt failed, retrying");
                        attempt += 1;
                    } else {
                        return Err(err);
                    }
                }
            }
        }
    }
}

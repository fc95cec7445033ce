// Retry policy with exponential backoff for unreliable upstream calls

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Exponential-backoff retry configuration.
///
/// The wrapped operation is always invoked `tries` times in total: the
/// loop runs `tries - 1` attempts with sleeps between them, then the final
/// attempt runs outside the loop and its outcome (success or error) is
/// returned verbatim. No jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub tries: u32,
    pub delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 3,
            delay: Duration::from_secs(5),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(tries: u32, delay: Duration, backoff: f64) -> Self {
        Self {
            tries: tries.max(1),
            delay,
            backoff,
        }
    }

    /// The exact sleep schedule: `delay, delay*backoff, delay*backoff^2, …`
    /// of length `tries - 1`.
    pub fn delays(&self) -> Vec<Duration> {
        let mut schedule = Vec::new();
        let mut delay = self.delay;
        for _ in 1..self.tries {
            schedule.push(delay);
            delay = delay.mul_f64(self.backoff);
        }
        schedule
    }

    /// Run `op` under this policy. Errors for which `exclude` returns true
    /// propagate immediately without any sleep.
    pub async fn run<T, E, F, Fut, X>(&self, mut op: F, exclude: X) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        X: Fn(&E) -> bool,
    {
        let mut remaining = self.tries.max(1);
        let mut delay = self.delay;

        while remaining > 1 {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if exclude(&err) {
                        return Err(err);
                    }
                    tracing::warn!(
                        "Retrying in {:.1} seconds... ({})",
                        delay.as_secs_f64(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.backoff);
                    remaining -= 1;
                }
            }
        }

        op().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_schedule_strictly_increasing() {
        let policy = RetryPolicy::new(4, Duration::from_secs(5), 2.0);
        let delays = policy.delays();
        assert_eq!(delays.len(), 3);
        assert_eq!(delays[0], Duration::from_secs(5));
        assert_eq!(delays[1], Duration::from_secs(10));
        assert_eq!(delays[2], Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_succeeds_after_n_minus_one_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = policy
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err(format!("attempt {} failed", n))
                        } else {
                            Ok(n)
                        }
                    }
                },
                |_| false,
            )
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_final_attempt_error_returned_verbatim() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(format!("failure {}", n)) }
                },
                |_| false,
            )
            .await;

        // Always called `tries` times; the last error is the caller's error.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "failure 3");
    }

    #[tokio::test]
    async fn test_excluded_error_propagates_on_first_failure() {
        let policy = RetryPolicy::new(5, Duration::from_secs(60), 2.0);
        let calls = AtomicU32::new(0);

        let started = std::time::Instant::now();
        let result: Result<(), String> = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal".to_string()) }
                },
                |e| e == "fatal",
            )
            .await;

        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // No sleep happened: the 60s first delay never ran.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_single_try_runs_once_without_sleep() {
        let policy = RetryPolicy::new(1, Duration::from_secs(60), 2.0);
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = policy
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(7) }
                },
                |_| false,
            )
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(policy.delays().is_empty());
    }
}

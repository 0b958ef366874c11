use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Retry a fallible operation with exponential backoff.
///
/// - `max_attempts`: Total attempts (including the first), at least one is made.
/// - `base_delay`: Delay after first failure, doubled on each subsequent failure.
/// - `label`: Description for log messages.
///
/// Only used at the connection boundary; the diff pipeline never retries.
pub fn retry<F, T>(max_attempts: u32, base_delay: Duration, label: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 1;

    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "{} failed, retrying",
                    label,
                );
                thread::sleep(delay);
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_succeeds_first_try() {
        let result = retry(3, Duration::from_millis(1), "test", || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_retry_succeeds_after_failures() {
        let mut count = 0;
        let result = retry(3, Duration::from_millis(1), "test", || {
            count += 1;
            if count < 3 {
                anyhow::bail!("not yet");
            }
            Ok(count)
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_retry_returns_last_error() {
        let mut count = 0;
        let result: Result<i32> = retry(3, Duration::from_millis(1), "test", || {
            count += 1;
            anyhow::bail!("failure {}", count);
        });
        assert_eq!(result.unwrap_err().to_string(), "failure 3");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_retry_zero_attempts_still_runs_once() {
        let mut count = 0;
        let result: Result<i32> = retry(0, Duration::from_millis(1), "test", || {
            count += 1;
            anyhow::bail!("fail");
        });
        assert!(result.is_err());
        assert_eq!(count, 1);
    }
}

//! Bounded fixed-interval retry for line execution.
//!
//! Only recoverable warnings consume attempts; any other failure
//! propagates immediately. The sleep runs on an injected [`Clock`] so
//! tests execute without real delays.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::info;

use crate::error::{Error, Result};

/// Default attempt budget per command line.
pub const DEFAULT_RETRY_COUNT: u32 = 10;

/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// Sleep seam for the retry executor and the close loop.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` against `state` until it succeeds, fails non-recoverably,
/// or the attempt budget runs out.
///
/// `op` receives `state` and `arg` reborrowed per attempt, so the
/// operation may hold exclusive access to a session between retries.
/// A recoverable warning consumes one attempt and sleeps `interval`
/// before the next; exhaustion fails with [`Error::RetryExhausted`]
/// naming `what`. No sleep happens after the final attempt.
pub async fn retry<S, A, T, F>(
    clock: &dyn Clock,
    state: &mut S,
    arg: &A,
    max_attempts: u32,
    interval: Duration,
    what: &str,
    mut op: F,
) -> Result<T>
where
    S: ?Sized,
    A: ?Sized,
    F: for<'s> FnMut(&'s mut S, &'s A) -> BoxFuture<'s, Result<T>>,
{
    let mut remaining = max_attempts;
    while remaining > 0 {
        match op(&mut *state, arg).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_recoverable_warning() => {
                info!("Need rerun of '{what}': {err}");
                remaining -= 1;
                if remaining > 0 {
                    clock.sleep(interval).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::RetryExhausted {
        command: what.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingClock;
    use super::*;
    use futures_util::FutureExt;

    fn warning(command: &str) -> Error {
        Error::RecoverableWarning {
            command: command.to_string(),
            matched: "busy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success_no_sleep() {
        let clock = RecordingClock::default();
        let mut attempts = 0u32;

        let result = retry(
            &clock,
            &mut attempts,
            "",
            10,
            Duration::from_secs(15),
            "show version",
            |attempts: &mut u32, _: &str| {
                async move {
                    *attempts += 1;
                    Ok("output".to_string())
                }
                .boxed()
            },
        )
        .await
        .unwrap();

        assert_eq!(result, "output");
        assert_eq!(attempts, 1);
        assert!(clock.slept().is_empty());
    }

    #[tokio::test]
    async fn test_two_warnings_then_success() {
        let clock = RecordingClock::default();
        let mut attempts = 0u32;
        let interval = Duration::from_secs(2);

        let result = retry(
            &clock,
            &mut attempts,
            "",
            3,
            interval,
            "copy flash",
            |attempts: &mut u32, _: &str| {
                async move {
                    *attempts += 1;
                    if *attempts <= 2 {
                        Err(warning("copy flash"))
                    } else {
                        Ok("done".to_string())
                    }
                }
                .boxed()
            },
        )
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(attempts, 3);
        assert_eq!(clock.slept(), vec![interval, interval]);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let clock = RecordingClock::default();
        let mut attempts = 0u32;

        let err = retry(
            &clock,
            &mut attempts,
            "",
            3,
            Duration::from_secs(1),
            "reload",
            |attempts: &mut u32, _: &str| {
                async move {
                    *attempts += 1;
                    Err::<String, _>(warning("reload"))
                }
                .boxed()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { ref command } if command == "reload"));
        assert_eq!(attempts, 3);
        // No sleep after the final attempt.
        assert_eq!(clock.slept().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_propagates_immediately() {
        let clock = RecordingClock::default();
        let mut attempts = 0u32;

        let err = retry(
            &clock,
            &mut attempts,
            "",
            10,
            Duration::from_secs(1),
            "write memory",
            |attempts: &mut u32, _: &str| {
                async move {
                    *attempts += 1;
                    Err::<String, _>(Error::Critical {
                        command: "write memory".to_string(),
                        matched: "flash failure".to_string(),
                    })
                }
                .boxed()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Critical { .. }));
        assert_eq!(attempts, 1);
        assert!(clock.slept().is_empty());
    }

    #[tokio::test]
    async fn test_zero_budget_is_exhausted() {
        let clock = RecordingClock::default();
        let mut attempts = 0u32;

        let err = retry(
            &clock,
            &mut attempts,
            "",
            0,
            Duration::from_secs(1),
            "noop",
            |attempts: &mut u32, _: &str| {
                async move {
                    *attempts += 1;
                    Ok(())
                }
                .boxed()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { .. }));
        assert_eq!(attempts, 0);
    }
}

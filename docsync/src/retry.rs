use std::{future::Future, time::Duration};

use log::warn;

use crate::error::{Result, SyncError};

/// How often and how patiently a failed call is repeated.
///
/// Only errors that report `is_retryable()` are repeated; anything else is
/// returned on the first failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, op: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, SyncError>>,
{
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    "{op} failed ({e}), retry {attempt}/{} in {backoff:?}",
                    policy.max_retries
                );
                tokio::time::sleep(backoff).await;

                backoff = Duration::from_millis(
                    (backoff.as_millis() as f64 * policy.backoff_multiplier)
                        .min(policy.max_backoff.as_millis() as f64) as u64,
                );
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    fn timeout() -> SyncError {
        SyncError::Timeout {
            op: "insert_one".to_string(),
            after: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&quick(3), "insert_one", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(timeout()) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry(&quick(3), "close", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(SyncError::Close("stalled".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(SyncError::Close(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_policy_makes_a_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry(&RetryPolicy::default(), "connect", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(timeout()) }
        })
        .await;

        assert!(matches!(result, Err(SyncError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

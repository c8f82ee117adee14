//! Timeout and retry wrappers for outbound LLM calls.

use crate::llm::LlmError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Bounded-call policy: one timeout per attempt, fixed delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Only transient failures are retried.
    pub max_retries: u32,
    pub delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay_ms: 500,
            timeout_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `AGENTFLOW_TIMEOUT_SECS`; everything else keeps its default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut policy = Self::default();
        if let Some(secs) = lookup("AGENTFLOW_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            policy.timeout_ms = secs.saturating_mul(1_000);
        }
        policy
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Check whether a failed attempt (0-based) should be retried.
pub fn should_retry(policy: &RetryPolicy, attempt: u32, error: &LlmError) -> bool {
    attempt < policy.max_retries && error.is_transient()
}

/// Wrap a call future with a timeout.
pub async fn with_timeout<T, F>(timeout_ms: u64, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    match timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout(timeout_ms)),
    }
}

/// Run `op` under the policy's timeout, retrying transient failures.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match with_timeout(policy.timeout_ms, op()).await {
            Ok(value) => return Ok(value),
            Err(e) if should_retry(policy, attempt, &e) => {
                tracing::warn!(attempt, "LLM call failed, retrying: {e}");
                attempt += 1;
                tokio::time::sleep(policy.delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            delay_ms: 1,
            timeout_ms: 50,
        }
    }

    #[test]
    fn retry_limit() {
        let policy = RetryPolicy::default(); // max_retries = 1
        let transport = LlmError::Transport("connection reset".into());
        assert!(should_retry(&policy, 0, &transport));
        assert!(!should_retry(&policy, 1, &transport));

        let status = LlmError::Status {
            provider: "openai",
            status: 500,
            body: String::new(),
        };
        assert!(!should_retry(&policy, 0, &status));
    }

    #[test]
    fn timeout_from_env_lookup() {
        let policy = RetryPolicy::from_lookup(|k| (k == "AGENTFLOW_TIMEOUT_SECS").then(|| "15".into()));
        assert_eq!(policy.timeout_ms, 15_000);

        let policy = RetryPolicy::from_lookup(|_| Some("soon".into()));
        assert_eq!(policy, RetryPolicy::default());
    }

    #[tokio::test]
    async fn transport_failure_is_retried_once() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LlmError::Transport("connection refused".into()))
                } else {
                    Ok("{}".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<String, _> = call_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Transport("dns failure".into())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let calls = AtomicU32::new(0);
        let result: Result<String, _> = call_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok("late".to_string())
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Timeout(50))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn status_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<String, _> = call_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LlmError::Status {
                    provider: "openai",
                    status: 401,
                    body: "bad key".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

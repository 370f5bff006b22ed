use std::time::Duration;

use super::backend::CompletionBackend;
use super::error::{CompletionError, FailureKind};

pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_FAILURE_WAIT: Duration = Duration::from_secs(10);

/// Attempt budget and waits for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait after a 429 that carries no Retry-After hint.
    pub rate_limit_wait: Duration,
    /// Wait after any other failure.
    pub failure_wait: Duration,
}

impl RetryPolicy {
    pub const fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
            failure_wait: DEFAULT_FAILURE_WAIT,
        }
    }

    pub fn backoff_for(&self, error: &CompletionError) -> Duration {
        match error.kind() {
            FailureKind::RateLimited {
                retry_after: Some(wait),
            } => wait,
            FailureKind::RateLimited { retry_after: None } => self.rate_limit_wait,
            FailureKind::Other => self.failure_wait,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed(String),
    Exhausted {
        attempts: u32,
        last_error: Option<CompletionError>,
    },
}

impl CompletionOutcome {
    /// Flattens the outcome into display text, turning exhaustion into
    /// `"<prefix> after <N> attempts: <last error>"`.
    pub fn into_text(self, failure_prefix: &str) -> String {
        match self {
            CompletionOutcome::Completed(text) => text,
            CompletionOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                let last_error = last_error
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "None".to_string());
                format!("{failure_prefix} after {attempts} attempts: {last_error}")
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionOutcome::Completed(_))
    }
}

/// Sends `prompt` until the backend answers or `policy.max_attempts` is spent.
///
/// Failed attempts are never surfaced individually; they only decide how long
/// to wait before the next try. No wait follows the final attempt.
pub async fn complete_with_retry<B>(
    backend: &B,
    operation: &str,
    prompt: &str,
    policy: &RetryPolicy,
) -> CompletionOutcome
where
    B: CompletionBackend + ?Sized,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        let error = match backend.complete(prompt).await {
            Ok(text) => {
                tracing::debug!(operation, attempt, "completion received");
                return CompletionOutcome::Completed(text);
            }
            Err(err) => err,
        };

        tracing::warn!(
            operation,
            attempt,
            max_attempts = policy.max_attempts,
            error = %error,
            "completion attempt failed"
        );

        let wait = policy.backoff_for(&error);
        if let FailureKind::RateLimited { .. } = error.kind() {
            tracing::warn!(operation, wait_secs = wait.as_secs(), "rate limited, backing off");
        }
        last_error = Some(error);

        if attempt < policy.max_attempts {
            tokio::time::sleep(wait).await;
        }
    }

    tracing::error!(
        operation,
        attempts = policy.max_attempts,
        "giving up on completion"
    );
    CompletionOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::testing::ScriptedBackend;
    use tokio::time::Instant;

    fn other_error() -> CompletionError {
        CompletionError::Request("connection reset".into())
    }

    #[test]
    fn backoff_matches_classification() {
        let policy = RetryPolicy::with_attempts(10);
        assert_eq!(
            policy.backoff_for(&CompletionError::from_message(
                "Error 429: Too Many Requests. Retry-After: 45"
            )),
            Duration::from_secs(45)
        );
        assert_eq!(
            policy.backoff_for(&CompletionError::from_message("Error 429")),
            Duration::from_secs(60)
        );
        assert_eq!(
            policy.backoff_for(&CompletionError::from_message("bad gateway")),
            Duration::from_secs(10)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let backend = ScriptedBackend::new(vec![Ok("lesson".into())]);
        let start = Instant::now();

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(5)).await;

        assert_eq!(outcome, CompletionOutcome::Completed("lesson".into()));
        assert_eq!(backend.calls(), 1);
        assert_eq!(start.elapsed().as_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_third_attempt_sleeps_twice() {
        let backend = ScriptedBackend::new(vec![
            Err(other_error()),
            Err(other_error()),
            Ok("done".into()),
        ]);
        let start = Instant::now();

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(10)).await;

        assert_eq!(outcome, CompletionOutcome::Completed("done".into()));
        assert_eq!(backend.calls(), 3);
        assert_eq!(start.elapsed().as_secs(), 20);
        assert!(backend.prompts().iter().all(|p| p == "prompt"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts_and_last_error() {
        let backend = ScriptedBackend::new(vec![
            Err(other_error()),
            Err(other_error()),
            Err(CompletionError::Request("final failure".into())),
        ]);
        let start = Instant::now();

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(3)).await;

        assert_eq!(backend.calls(), 3);
        // Two waits between three attempts, none after the last.
        assert_eq!(start.elapsed().as_secs(), 20);
        assert!(!outcome.is_completed());
        assert_eq!(
            outcome.into_text("Generation failed"),
            "Generation failed after 3 attempts: final failure"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_for_hint_then_default() {
        let backend = ScriptedBackend::new(vec![
            Err(CompletionError::from_message("429 Retry-After: 45")),
            Err(CompletionError::from_message("429 Too Many Requests")),
            Ok("ok".into()),
        ]);
        let start = Instant::now();

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(10)).await;

        assert!(outcome.is_completed());
        assert_eq!(start.elapsed().as_secs(), 45 + 60);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_budget_never_sleeps() {
        let backend = ScriptedBackend::failing(1, CompletionError::from_message("429"));
        let start = Instant::now();

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(1)).await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(start.elapsed().as_secs(), 0);
        assert!(outcome.into_text("x").starts_with("x after 1 attempts: "));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_makes_no_calls() {
        let backend = ScriptedBackend::new(vec![Ok("unused".into())]);

        let outcome =
            complete_with_retry(&backend, "test", "prompt", &RetryPolicy::with_attempts(0)).await;

        assert_eq!(backend.calls(), 0);
        assert_eq!(outcome.into_text("x"), "x after 0 attempts: None");
    }
}

use std::time::Duration;

use crate::chat::orchestrator::GenerationError;

/// How server failures are retried. Other failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// `attempt` is 1-based.
    pub fn should_retry(&self, attempt: u32, err: &GenerationError) -> bool {
        attempt < self.max_attempts && matches!(err, GenerationError::ServerError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> GenerationError {
        GenerationError::ServerError {
            status: 500,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_default_allows_one_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, &server_error()));
        assert!(!policy.should_retry(2, &server_error()));
        assert_eq!(policy.backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_only_server_errors_retry() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &GenerationError::RateLimited));
        assert!(!policy.should_retry(1, &GenerationError::NetworkError("x".into())));
        assert!(!policy.should_retry(1, &GenerationError::MissingCredential));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}

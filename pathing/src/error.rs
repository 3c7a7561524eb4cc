//! Error taxonomy for route computation.
//!
//! None of these cross the core/consumer boundary as `Err`: the engine and
//! the retry coordinator fold every error into a failed [`PathResult`].

use std::time::Duration;

use shared_types::PathResult;

/// Failure reported by a [`crate::provider::PathProvider`] itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider rejected request: {0}")]
    Rejected(String),
    #[error("unknown path handle: {0}")]
    UnknownHandle(String),
    #[error("waypoints requested before computation finished: {0}")]
    NotReady(String),
}

/// Outcome classification for one attempt or a whole retry chain.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// Rendered with `Duration`'s debug form, e.g. `40ms` or `1.5s`.
    #[error("timeout after {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("timeout after {timeout:?}: provider never progressed past no-path-yet")]
    NoPathYetExhausted { timeout: Duration },
    #[error("provider failure: {0}")]
    ProviderFailure(String),
    #[error("failed after {attempts} attempts; last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("invalid path request: {0}")]
    InvalidRequest(String),
}

impl PathError {
    /// Whether another attempt could produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::NoPathYetExhausted { .. } | Self::ProviderFailure(_)
        )
    }
}

impl From<ProviderError> for PathError {
    fn from(e: ProviderError) -> Self {
        PathError::ProviderFailure(e.to_string())
    }
}

impl From<PathError> for PathResult {
    fn from(e: PathError) -> Self {
        PathResult::failed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages_identify_timeout() {
        let timeout = Duration::from_millis(40);
        let plain = PathError::Timeout { timeout }.to_string();
        let stalled = PathError::NoPathYetExhausted { timeout }.to_string();
        assert_eq!(plain, "timeout after 40ms");
        assert!(stalled.starts_with("timeout after 40ms"));
        assert!(stalled.contains("no-path-yet"));
    }

    #[test]
    fn test_timeout_message_keeps_sub_millisecond_precision() {
        let err = PathError::Timeout {
            timeout: Duration::from_micros(500),
        };
        assert_eq!(err.to_string(), "timeout after 500µs");

        let err = PathError::Timeout {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "timeout after 1.5s");
    }

    #[test]
    fn test_exhausted_message_carries_count_and_cause() {
        let err = PathError::RetriesExhausted {
            attempts: 3,
            last_error: "provider failure: blocked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed after 3 attempts; last error: provider failure: blocked"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_error_converts_to_failure() {
        let err: PathError = ProviderError::Rejected("navmesh not ready".to_string()).into();
        assert!(err.is_retryable());
        let result: PathResult = err.into();
        assert!(!result.success);
        assert!(result.error_text().contains("navmesh not ready"));
    }
}

//! RetryCoordinator - bounded retries around the computation engine.
//!
//! Provider failures are mostly transient (navmesh not ready, timing), so the
//! policy is a fixed number of attempts with a fixed delay between them. The
//! delay only separates attempts: a success returns at once and nothing
//! waits after the final failure. Exhaustion is reported as a failed
//! [`PathResult`], never as an error or panic.

use std::sync::Arc;
use std::time::Duration;

use shared_types::{PathRequest, PathResult, RetryPolicy};

use crate::engine::ComputationEngine;
use crate::error::PathError;

/// Per-attempt wait when none is configured.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RetryCoordinator {
    engine: Arc<ComputationEngine>,
    attempt_timeout: Duration,
}

impl RetryCoordinator {
    pub fn new(engine: Arc<ComputationEngine>) -> Self {
        Self::with_attempt_timeout(engine, DEFAULT_ATTEMPT_TIMEOUT)
    }

    pub fn with_attempt_timeout(engine: Arc<ComputationEngine>, attempt_timeout: Duration) -> Self {
        Self {
            engine,
            attempt_timeout,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Compute a route, retrying failed attempts per `policy`.
    pub async fn compute_with_retry(&self, request: &PathRequest, policy: &RetryPolicy) -> PathResult {
        if let Err(reason) = request.validate() {
            tracing::warn!(reason = %reason, "Rejecting invalid path request");
            return PathError::InvalidRequest(reason).into();
        }

        let attempts = policy.attempts();
        let delay = policy.inter_attempt_delay();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.engine.try_compute(request, self.attempt_timeout).await {
                Ok(waypoints) => {
                    if attempt > 1 {
                        tracing::info!(attempt, attempts, "Path computation succeeded after retry");
                    }
                    return PathResult::succeeded(waypoints);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::warn!(attempt, error = %err, "Path attempt failed permanently");
                    return err.into();
                }
                Err(err) => last_error = err.to_string(),
            }

            if attempt < attempts {
                tracing::debug!(
                    attempt,
                    attempts,
                    delay_ms = policy.inter_attempt_delay_ms,
                    error = %last_error,
                    "Path attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        PathError::RetriesExhausted {
            attempts,
            last_error,
        }
        .into()
    }
}

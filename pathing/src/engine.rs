//! ComputationEngine - one provider request, polled to a terminal status.
//!
//! ## Lifecycle
//!
//! `Submitted -> Polling -> {Succeeded, Failed, TimedOut}`
//!
//! The poll loop and the timeout race through `tokio::time::timeout`: the
//! first to finish decides the result and the poll future is dropped, so a
//! resolved computation is never polled again.
//!
//! ## Abandoned computations
//!
//! Providers offer no cancellation. When the timeout wins, the provider keeps
//! computing and its eventual result is discarded. Each abandonment is logged
//! at `warn` with the handle; keep the attempt timeout generous relative to
//! provider latency so abandoned work stays rare.

use std::sync::Arc;
use std::time::Duration;

use shared_types::{PathRequest, PathResult, Waypoint};

use crate::error::PathError;
use crate::provider::{PathHandle, PathProvider, PathStatus};

/// Delay between two status reads of the same handle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ComputationEngine {
    provider: Arc<dyn PathProvider>,
    poll_interval: Duration,
}

impl ComputationEngine {
    pub fn new(provider: Arc<dyn PathProvider>) -> Self {
        Self::with_poll_interval(provider, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(provider: Arc<dyn PathProvider>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Compute one route, waiting at most `timeout` from submission.
    pub async fn compute(&self, request: &PathRequest, timeout: Duration) -> PathResult {
        match self.try_compute(request, timeout).await {
            Ok(waypoints) => PathResult::succeeded(waypoints),
            Err(err) => err.into(),
        }
    }

    /// Same as [`compute`](Self::compute) with the error kept typed.
    pub async fn try_compute(
        &self,
        request: &PathRequest,
        timeout: Duration,
    ) -> Result<Vec<Waypoint>, PathError> {
        let mut submitted: Option<PathHandle> = None;
        let mut last_status = PathStatus::Pending;

        let outcome = tokio::time::timeout(
            timeout,
            self.submit_and_poll(request, &mut submitted, &mut last_status),
        )
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    handle = submitted.as_ref().map(PathHandle::as_str).unwrap_or("<unsubmitted>"),
                    last_status = %last_status,
                    timeout = ?timeout,
                    "Path computation timed out; abandoning in-flight provider call"
                );
                if last_status == PathStatus::NoPathYet {
                    Err(PathError::NoPathYetExhausted { timeout })
                } else {
                    Err(PathError::Timeout { timeout })
                }
            }
        }
    }

    async fn submit_and_poll(
        &self,
        request: &PathRequest,
        submitted: &mut Option<PathHandle>,
        last_status: &mut PathStatus,
    ) -> Result<Vec<Waypoint>, PathError> {
        let handle = self.provider.submit(request).await?;
        tracing::debug!(
            provider = self.provider.name(),
            handle = %handle,
            start = %request.start,
            goal = %request.goal,
            "Submitted path request"
        );
        let handle: &PathHandle = submitted.insert(handle);

        let mut polls: u32 = 0;
        loop {
            let status = self.provider.status(handle);
            polls += 1;
            match status {
                PathStatus::Success => {
                    let waypoints = self.provider.waypoints(handle)?;
                    tracing::debug!(
                        handle = %handle,
                        polls,
                        waypoints = waypoints.len(),
                        "Path computation succeeded"
                    );
                    return Ok(waypoints);
                }
                PathStatus::Failed(reason) => {
                    tracing::debug!(handle = %handle, polls, reason = %reason, "Path computation failed");
                    return Err(PathError::ProviderFailure(format!("status failed: {reason}")));
                }
                PathStatus::Pending | PathStatus::NoPathYet => {
                    *last_status = status;
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

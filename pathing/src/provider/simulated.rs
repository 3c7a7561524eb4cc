//! SimulatedNavProvider - in-process stand-in for a navmesh path service.
//!
//! Each submission runs as its own detached tokio task: it waits the
//! configured latency, then lays a straight route from start to goal sampled
//! at the agent's waypoint spacing. Nothing can stop a computation once it
//! is submitted; callers that time out leave it running until it finishes.
//!
//! A finished entry is released as soon as its outcome is read (waypoints
//! fetched or failure reported). Entries nobody reads, typically abandoned
//! by a timed-out caller, are swept on the next submission once they have
//! been finished for longer than the retention window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::{PathRequest, Waypoint};
use tokio::time::Instant;

use super::{PathHandle, PathProvider, PathStatus};
use crate::error::ProviderError;

/// Upper bound on segments per route.
const MAX_SEGMENTS: usize = 10_000;

/// How long an unread finished computation is kept.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
enum Computation {
    Pending,
    Computing,
    Finished {
        outcome: Result<Vec<Waypoint>, String>,
        at: Instant,
    },
}

impl Computation {
    fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    fn expired(&self, now: Instant, retention: Duration) -> bool {
        match self {
            Self::Finished { at, .. } => now.saturating_duration_since(*at) >= retention,
            _ => false,
        }
    }
}

pub struct SimulatedNavProvider {
    latency: Duration,
    retention: Duration,
    computations: Arc<DashMap<PathHandle, Computation>>,
}

impl SimulatedNavProvider {
    pub fn new(latency: Duration) -> Self {
        Self::with_retention(latency, DEFAULT_RETENTION)
    }

    pub fn with_retention(latency: Duration, retention: Duration) -> Self {
        Self {
            latency,
            retention,
            computations: Arc::new(DashMap::new()),
        }
    }

    /// Computations submitted but not yet finished, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.computations
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Tracked entries, running or finished but unread.
    pub fn retained(&self) -> usize {
        self.computations.len()
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        let before = self.computations.len();
        self.computations
            .retain(|_, computation| !computation.expired(now, self.retention));
        let evicted = before.saturating_sub(self.computations.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted unread simulated computations");
        }
    }
}

#[async_trait]
impl PathProvider for SimulatedNavProvider {
    fn name(&self) -> &str {
        "simulated_nav"
    }

    async fn submit(&self, request: &PathRequest) -> Result<PathHandle, ProviderError> {
        request.validate().map_err(ProviderError::Rejected)?;
        self.sweep_expired();

        let handle = PathHandle::new();
        self.computations
            .insert(handle.clone(), Computation::Pending);

        let computations = self.computations.clone();
        let latency = self.latency;
        let request = request.clone();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            computations.insert(task_handle.clone(), Computation::Computing);
            tokio::time::sleep(latency).await;
            let outcome = plan_straight_route(&request);
            if let Err(reason) = &outcome {
                tracing::debug!(handle = %task_handle, reason = %reason, "Simulated route failed");
            }
            computations.insert(
                task_handle,
                Computation::Finished {
                    outcome,
                    at: Instant::now(),
                },
            );
        });

        Ok(handle)
    }

    fn status(&self, handle: &PathHandle) -> PathStatus {
        let status = match self.computations.get(handle).map(|entry| entry.value().clone()) {
            Some(Computation::Pending) => PathStatus::Pending,
            Some(Computation::Computing) => PathStatus::NoPathYet,
            Some(Computation::Finished { outcome: Ok(_), .. }) => PathStatus::Success,
            Some(Computation::Finished {
                outcome: Err(reason),
                ..
            }) => PathStatus::Failed(reason),
            None => return PathStatus::Failed(format!("unknown handle {handle}")),
        };
        // A reported failure is the caller's last read of this handle.
        if let PathStatus::Failed(_) = status {
            self.computations.remove(handle);
        }
        status
    }

    fn waypoints(&self, handle: &PathHandle) -> Result<Vec<Waypoint>, ProviderError> {
        let taken = self.computations.remove_if(handle, |_, computation| {
            matches!(computation, Computation::Finished { outcome: Ok(_), .. })
        });
        match taken {
            Some((_, Computation::Finished { outcome: Ok(waypoints), .. })) => Ok(waypoints),
            _ if self.computations.contains_key(handle) => {
                Err(ProviderError::NotReady(handle.to_string()))
            }
            _ => Err(ProviderError::UnknownHandle(handle.to_string())),
        }
    }
}

/// Straight route from start to goal, one waypoint per `waypoint_spacing`.
///
/// Segments steeper than the agent's max slope become jumps when the agent
/// can jump and fail the route otherwise.
fn plan_straight_route(request: &PathRequest) -> Result<Vec<Waypoint>, String> {
    let agent = &request.agent;
    let length = request.start.distance(&request.goal);
    let segments = (length / agent.waypoint_spacing).ceil().max(1.0);
    if segments > MAX_SEGMENTS as f64 {
        return Err(format!(
            "route too long: {length:.1} units at spacing {}",
            agent.waypoint_spacing
        ));
    }
    let segments = segments as usize;

    let mut waypoints = Vec::with_capacity(segments + 1);
    waypoints.push(Waypoint::walk(request.start));
    let mut previous = request.start;
    for i in 1..=segments {
        let point = request.start.lerp(&request.goal, i as f64 / segments as f64);
        let rise = (point.y - previous.y).abs();
        let run = previous.horizontal_distance(&point);
        let incline = rise.atan2(run).to_degrees();

        if incline > agent.max_slope_degrees {
            if !agent.can_jump {
                return Err(format!(
                    "slope exceeds agent max slope ({incline:.1} > {:.1} degrees)",
                    agent.max_slope_degrees
                ));
            }
            waypoints.push(Waypoint::jump(point));
        } else {
            waypoints.push(Waypoint::walk(point));
        }
        previous = point;
    }

    Ok(waypoints)
}

//! ScriptedProvider - deterministic provider driven by status scripts.
//!
//! Every submission plays one script: the n-th poll of a handle observes the
//! n-th status, and the final status repeats forever. With per-attempt
//! scripts, submission k uses script k (the last script repeats). Useful for
//! exercising the engine and coordinator without real timing noise.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::{PathRequest, Waypoint};

use super::{PathHandle, PathProvider, PathStatus};
use crate::error::ProviderError;

struct ScriptRun {
    statuses: Vec<PathStatus>,
    cursor: usize,
    succeeded: bool,
}

pub struct ScriptedProvider {
    scripts: Vec<Vec<PathStatus>>,
    waypoints: Vec<Waypoint>,
    runs: DashMap<PathHandle, ScriptRun>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedProvider {
    /// Every submission plays the same script.
    pub fn new(script: Vec<PathStatus>, waypoints: Vec<Waypoint>) -> Self {
        Self::per_attempt(vec![script], waypoints)
    }

    /// Submission k plays `scripts[k]`; the last script repeats.
    pub fn per_attempt(scripts: Vec<Vec<PathStatus>>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            scripts,
            waypoints,
            runs: DashMap::new(),
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    /// `pending_polls` polls of `NoPathYet`, then `Success`.
    pub fn succeeding_after(pending_polls: usize, waypoints: Vec<Waypoint>) -> Self {
        let mut script = vec![PathStatus::NoPathYet; pending_polls];
        script.push(PathStatus::Success);
        Self::new(script, waypoints)
    }

    pub fn always_failing(reason: impl Into<String>) -> Self {
        Self::new(vec![PathStatus::Failed(reason.into())], Vec::new())
    }

    pub fn never_finishing() -> Self {
        Self::new(vec![PathStatus::NoPathYet], Vec::new())
    }

    /// Number of `submit` calls so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Number of `status` calls so far, across all handles.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PathProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, _request: &PathRequest) -> Result<PathHandle, ProviderError> {
        let index = self.submissions.fetch_add(1, Ordering::SeqCst);
        let statuses = self
            .scripts
            .get(index)
            .or_else(|| self.scripts.last())
            .cloned()
            .unwrap_or_default();

        let handle = PathHandle::new();
        self.runs.insert(
            handle.clone(),
            ScriptRun {
                statuses,
                cursor: 0,
                succeeded: false,
            },
        );
        Ok(handle)
    }

    fn status(&self, handle: &PathHandle) -> PathStatus {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let Some(mut run) = self.runs.get_mut(handle) else {
            return PathStatus::Failed(format!("unknown handle {handle}"));
        };

        let status = run
            .statuses
            .get(run.cursor)
            .or_else(|| run.statuses.last())
            .cloned()
            .unwrap_or(PathStatus::NoPathYet);
        run.cursor += 1;
        if status == PathStatus::Success {
            run.succeeded = true;
        }
        status
    }

    fn waypoints(&self, handle: &PathHandle) -> Result<Vec<Waypoint>, ProviderError> {
        let run = self
            .runs
            .get(handle)
            .ok_or_else(|| ProviderError::UnknownHandle(handle.to_string()))?;
        if !run.succeeded {
            return Err(ProviderError::NotReady(handle.to_string()));
        }
        Ok(self.waypoints.clone())
    }
}

//! Path providers - the external service that actually computes routes.
//!
//! A provider accepts a request, computes asynchronously, and exposes a
//! status plus the finished waypoint list. Submitted computations cannot be
//! cancelled; a caller that stops waiting simply abandons the handle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{PathRequest, Waypoint};

use crate::error::ProviderError;

pub mod scripted;
pub mod simulated;

pub use scripted::ScriptedProvider;
pub use simulated::SimulatedNavProvider;

/// Opaque reference to one submitted computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandle(pub String);

impl PathHandle {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PathHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PathHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a submitted computation as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStatus {
    /// Accepted but not started.
    Pending,
    /// Computing; no route available yet.
    NoPathYet,
    Success,
    Failed(String),
}

impl std::fmt::Display for PathStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::NoPathYet => f.write_str("no_path_yet"),
            Self::Success => f.write_str("success"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Route computation service.
#[async_trait]
pub trait PathProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Start computing a route. Returns as soon as the request is accepted.
    async fn submit(&self, request: &PathRequest) -> Result<PathHandle, ProviderError>;

    /// Current status of a submitted computation. A provider may forget the
    /// handle after reporting `Failed`.
    fn status(&self, handle: &PathHandle) -> PathStatus;

    /// Finished route, ordered start to goal. Only valid once `status` is
    /// `Success`; a provider may forget the handle once this returns `Ok`.
    fn waypoints(&self, handle: &PathHandle) -> Result<Vec<Waypoint>, ProviderError>;
}

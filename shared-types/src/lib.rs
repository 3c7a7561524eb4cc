//! Shared value types for route computation
//!
//! These types are used by both:
//! - the computation engine and retry coordinator (producers of results)
//! - the route planner actor (consumer that applies results to entities)
//!
//! All of them are plain immutable values, serializable with serde.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// Point in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance ignoring the vertical (y) axis.
    pub fn horizontal_distance(&self, other: &Vec3) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn lerp(&self, other: &Vec3, t: f64) -> Vec3 {
        Vec3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Movement constraints of the agent a route is computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParameters {
    pub radius: f64,
    pub height: f64,
    /// Steepest walkable incline, in degrees.
    pub max_slope_degrees: f64,
    /// Preferred distance between consecutive waypoints.
    pub waypoint_spacing: f64,
    pub can_jump: bool,
}

impl Default for AgentParameters {
    fn default() -> Self {
        Self {
            radius: 6.0,
            height: 5.0,
            max_slope_degrees: 89.0,
            waypoint_spacing: 10.0,
            can_jump: true,
        }
    }
}

/// One route computation request. Created once per attempt chain and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    pub start: Vec3,
    pub goal: Vec3,
    pub agent: AgentParameters,
}

impl PathRequest {
    pub fn new(start: Vec3, goal: Vec3, agent: AgentParameters) -> Self {
        Self { start, goal, agent }
    }

    /// Check the request is something a provider can accept.
    pub fn validate(&self) -> Result<(), String> {
        if !self.start.is_finite() {
            return Err(format!("start position is not finite: {}", self.start));
        }
        if !self.goal.is_finite() {
            return Err(format!("goal position is not finite: {}", self.goal));
        }
        let agent = &self.agent;
        for (name, value) in [
            ("radius", agent.radius),
            ("height", agent.height),
            ("waypoint_spacing", agent.waypoint_spacing),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("agent {name} must be positive, got {value}"));
            }
        }
        if !(agent.max_slope_degrees > 0.0 && agent.max_slope_degrees <= 90.0) {
            return Err(format!(
                "agent max_slope_degrees must be in (0, 90], got {}",
                agent.max_slope_degrees
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// Movement needed to reach a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointAction {
    Walk,
    Jump,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    pub action: WaypointAction,
}

impl Waypoint {
    pub fn walk(position: Vec3) -> Self {
        Self {
            position,
            action: WaypointAction::Walk,
        }
    }

    pub fn jump(position: Vec3) -> Self {
        Self {
            position,
            action: WaypointAction::Jump,
        }
    }
}

/// Terminal outcome of a route computation.
///
/// Exactly one of `waypoints` / `error` is populated. Construct through
/// [`PathResult::succeeded`] or [`PathResult::failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Waypoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathResult {
    pub fn succeeded(waypoints: Vec<Waypoint>) -> Self {
        Self {
            success: true,
            waypoints: Some(waypoints),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            waypoints: None,
            error: Some(error.into()),
        }
    }

    /// Error text, or an empty string for a successful result.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Retry policy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub inter_attempt_delay_ms: u64,
}

impl RetryPolicy {
    /// The delay is kept in whole milliseconds; a sub-millisecond remainder
    /// rounds up so a non-zero delay never collapses to zero.
    pub fn new(max_attempts: u32, inter_attempt_delay: Duration) -> Self {
        let mut delay_ms = inter_attempt_delay.as_millis();
        if inter_attempt_delay.subsec_nanos() % 1_000_000 != 0 {
            delay_ms += 1;
        }
        Self {
            max_attempts: max_attempts.max(1),
            inter_attempt_delay_ms: u64::try_from(delay_ms).unwrap_or(u64::MAX),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn inter_attempt_delay(&self) -> Duration {
        Duration::from_millis(self.inter_attempt_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            inter_attempt_delay_ms: 200,
        }
    }
}

// ============================================================================
// Route progress
// ============================================================================

/// Per-entity progress along a computed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteProgress {
    pub waypoints: Vec<Waypoint>,
    pub current_waypoint: usize,
    pub next_waypoint: usize,
    pub goal_position: Vec3,
    pub is_arrive_next_point: bool,
    pub is_arrive_goal: bool,
    /// Request generation the route was computed for.
    pub generation: u64,
    pub computed_at: DateTime<Utc>,
}

impl RouteProgress {
    /// Initial progress for a freshly computed route.
    ///
    /// Routes with fewer than two waypoints are already complete: the goal is
    /// the last waypoint (or `fallback_goal` when empty) and both arrival
    /// flags are set.
    pub fn start(waypoints: Vec<Waypoint>, fallback_goal: Vec3, generation: u64) -> Self {
        let (next_waypoint, goal_position, arrived) = if waypoints.len() >= 2 {
            (1, waypoints[1].position, false)
        } else {
            let goal = waypoints
                .last()
                .map(|wp| wp.position)
                .unwrap_or(fallback_goal);
            (waypoints.len().saturating_sub(1), goal, true)
        };

        Self {
            waypoints,
            current_waypoint: 0,
            next_waypoint,
            goal_position,
            is_arrive_next_point: arrived,
            is_arrive_goal: arrived,
            generation,
            computed_at: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PathRequest {
        PathRequest::new(
            Vec3::ZERO,
            Vec3::new(58.727, 1.5, 25.179),
            AgentParameters::default(),
        )
    }

    #[test]
    fn test_default_request_is_valid() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite_positions() {
        let mut req = request();
        req.goal.y = f64::NAN;
        let err = req.validate().unwrap_err();
        assert!(err.contains("goal"), "unexpected error: {err}");

        let mut req = request();
        req.start.x = f64::INFINITY;
        assert!(req.validate().unwrap_err().contains("start"));
    }

    #[test]
    fn test_validate_rejects_bad_agent_parameters() {
        let mut req = request();
        req.agent.waypoint_spacing = 0.0;
        assert!(req.validate().unwrap_err().contains("waypoint_spacing"));

        let mut req = request();
        req.agent.max_slope_degrees = 120.0;
        assert!(req.validate().unwrap_err().contains("max_slope_degrees"));
    }

    #[test]
    fn test_path_result_populates_exactly_one_side() {
        let ok = PathResult::succeeded(vec![Waypoint::walk(Vec3::ZERO)]);
        assert!(ok.success);
        assert!(ok.waypoints.is_some());
        assert!(ok.error.is_none());
        assert_eq!(ok.error_text(), "");

        let failed = PathResult::failed("blocked");
        assert!(!failed.success);
        assert!(failed.waypoints.is_none());
        assert_eq!(failed.error_text(), "blocked");
    }

    #[test]
    fn test_failed_result_omits_waypoints_in_json() {
        let json = serde_json::to_value(PathResult::failed("timeout after 10ms")).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("waypoints").is_none());
        assert_eq!(json["error"], "timeout after 10ms");
    }

    #[test]
    fn test_waypoint_action_serialization() {
        let json = serde_json::to_string(&WaypointAction::Jump).unwrap();
        assert_eq!(json, "\"jump\"");
    }

    #[test]
    fn test_retry_policy_clamps_attempts() {
        let policy = RetryPolicy::new(0, Duration::from_millis(50));
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.inter_attempt_delay(), Duration::from_millis(50));

        let raw = RetryPolicy {
            max_attempts: 0,
            inter_attempt_delay_ms: 0,
        };
        assert_eq!(raw.attempts(), 1);
    }

    #[test]
    fn test_retry_policy_rounds_sub_millisecond_delay_up() {
        let policy = RetryPolicy::new(2, Duration::from_micros(500));
        assert_eq!(policy.inter_attempt_delay(), Duration::from_millis(1));

        let policy = RetryPolicy::new(2, Duration::from_micros(2_300));
        assert_eq!(policy.inter_attempt_delay(), Duration::from_millis(3));

        let policy = RetryPolicy::new(2, Duration::ZERO);
        assert_eq!(policy.inter_attempt_delay(), Duration::ZERO);
    }

    #[test]
    fn test_route_progress_targets_second_waypoint() {
        let waypoints = vec![
            Waypoint::walk(Vec3::new(0.0, 0.0, 0.0)),
            Waypoint::walk(Vec3::new(10.0, 0.0, 0.0)),
            Waypoint::jump(Vec3::new(20.0, 4.0, 0.0)),
        ];
        let progress = RouteProgress::start(waypoints, Vec3::ZERO, 7);

        assert_eq!(progress.current_waypoint, 0);
        assert_eq!(progress.next_waypoint, 1);
        assert_eq!(progress.goal_position, Vec3::new(10.0, 0.0, 0.0));
        assert!(!progress.is_arrive_next_point);
        assert!(!progress.is_arrive_goal);
        assert_eq!(progress.generation, 7);
        assert_eq!(progress.waypoints.len(), 3);
    }

    #[test]
    fn test_route_progress_short_routes_are_complete() {
        let single = RouteProgress::start(
            vec![Waypoint::walk(Vec3::new(1.0, 2.0, 3.0))],
            Vec3::ZERO,
            1,
        );
        assert_eq!(single.next_waypoint, 0);
        assert_eq!(single.goal_position, Vec3::new(1.0, 2.0, 3.0));
        assert!(single.is_arrive_next_point);
        assert!(single.is_arrive_goal);

        let empty = RouteProgress::start(Vec::new(), Vec3::new(5.0, 0.0, 5.0), 1);
        assert_eq!(empty.next_waypoint, 0);
        assert_eq!(empty.goal_position, Vec3::new(5.0, 0.0, 5.0));
        assert!(empty.is_arrive_goal);
    }

    #[test]
    fn test_vec3_lerp_and_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(a.lerp(&b, 0.5), Vec3::new(5.0, 0.0, 0.0));
        assert!((a.distance(&b) - 10.0).abs() < f64::EPSILON);
        assert!((a.horizontal_distance(&Vec3::new(3.0, 9.0, 4.0)) - 5.0).abs() < 1e-9);
    }
}

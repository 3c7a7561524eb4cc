//! End-to-end retry protocol against the simulated provider.
//!
//! Runs on paused tokio time, so latencies and timeouts are exact and the
//! tests finish instantly.

use std::sync::Arc;
use std::time::Duration;

use pathing::provider::SimulatedNavProvider;
use pathing::{ComputationEngine, RetryCoordinator};
use shared_types::{AgentParameters, PathRequest, RetryPolicy, Vec3, WaypointAction};

fn coordinator_for(provider: Arc<SimulatedNavProvider>, attempt_timeout: Duration) -> RetryCoordinator {
    let engine = Arc::new(ComputationEngine::new(provider));
    RetryCoordinator::with_attempt_timeout(engine, attempt_timeout)
}

#[tokio::test(start_paused = true)]
async fn test_route_within_timeout_succeeds_first_attempt() {
    let provider = Arc::new(SimulatedNavProvider::new(Duration::from_millis(40)));
    let coordinator = coordinator_for(provider.clone(), Duration::from_millis(500));
    let request = PathRequest::new(
        Vec3::ZERO,
        Vec3::new(20.0, 0.0, 0.0),
        AgentParameters::default(),
    );

    let started = tokio::time::Instant::now();
    let result = coordinator
        .compute_with_retry(&request, &RetryPolicy::default())
        .await;

    assert!(result.success, "unexpected failure: {}", result.error_text());
    let waypoints = result.waypoints.expect("waypoints");
    assert_eq!(waypoints.first().map(|wp| wp.position), Some(Vec3::ZERO));
    assert_eq!(
        waypoints.last().map(|wp| wp.position),
        Some(Vec3::new(20.0, 0.0, 0.0))
    );
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(provider.in_flight(), 0);
    assert_eq!(provider.retained(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_exhausts_retries_and_leaks_computations() {
    let provider = Arc::new(SimulatedNavProvider::new(Duration::from_millis(500)));
    let coordinator = coordinator_for(provider.clone(), Duration::from_millis(30));
    let request = PathRequest::new(
        Vec3::ZERO,
        Vec3::new(20.0, 0.0, 0.0),
        AgentParameters::default(),
    );
    let policy = RetryPolicy::new(3, Duration::from_millis(20));

    let started = tokio::time::Instant::now();
    let result = coordinator.compute_with_retry(&request, &policy).await;
    let elapsed = started.elapsed();

    assert!(!result.success);
    assert!(result.waypoints.is_none());
    let error = result.error_text();
    assert!(error.contains("failed after 3 attempts"), "got: {error}");
    assert!(error.contains("timeout after 30ms"), "got: {error}");
    // Three timeouts plus two delays.
    assert_eq!(elapsed, Duration::from_millis(130));

    // Timed-out computations keep running in the provider.
    assert_eq!(provider.in_flight(), 3);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.in_flight(), 0);
    // Nobody reads them, so they wait out the retention window.
    assert_eq!(provider.retained(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unjumpable_slope_fails_every_attempt() {
    let provider = Arc::new(SimulatedNavProvider::new(Duration::from_millis(10)));
    let coordinator = coordinator_for(provider, Duration::from_millis(500));
    let agent = AgentParameters {
        max_slope_degrees: 30.0,
        can_jump: false,
        ..AgentParameters::default()
    };
    let request = PathRequest::new(Vec3::ZERO, Vec3::new(4.0, 9.0, 0.0), agent);

    let result = coordinator
        .compute_with_retry(&request, &RetryPolicy::new(2, Duration::from_millis(5)))
        .await;

    assert!(!result.success);
    let error = result.error_text();
    assert!(error.starts_with("failed after 2 attempts; last error:"), "got: {error}");
    assert!(error.contains("max slope"), "got: {error}");
}

#[tokio::test(start_paused = true)]
async fn test_jumping_agent_gets_jump_waypoint() {
    let provider = Arc::new(SimulatedNavProvider::new(Duration::from_millis(10)));
    let coordinator = coordinator_for(provider, Duration::from_millis(500));
    let agent = AgentParameters {
        max_slope_degrees: 30.0,
        ..AgentParameters::default()
    };
    let request = PathRequest::new(Vec3::ZERO, Vec3::new(4.0, 9.0, 0.0), agent);

    let result = coordinator
        .compute_with_retry(&request, &RetryPolicy::default())
        .await;

    let waypoints = result.waypoints.expect("waypoints");
    assert!(waypoints
        .iter()
        .any(|wp| wp.action == WaypointAction::Jump));
}

#[tokio::test(start_paused = true)]
async fn test_non_finite_request_is_rejected_without_submission() {
    let provider = Arc::new(SimulatedNavProvider::new(Duration::from_millis(10)));
    let coordinator = coordinator_for(provider.clone(), Duration::from_millis(500));
    let request = PathRequest::new(
        Vec3::new(f64::NAN, 0.0, 0.0),
        Vec3::ZERO,
        AgentParameters::default(),
    );

    let result = coordinator
        .compute_with_retry(&request, &RetryPolicy::default())
        .await;

    assert!(!result.success);
    assert!(result.error_text().starts_with("invalid path request"));
    assert_eq!(provider.in_flight(), 0);
}

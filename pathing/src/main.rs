use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pathing::config::PathingConfig;
use pathing::markers::TracingMarkerSink;
use pathing::planner::{PlannerStats, RoutePlannerActor, RoutePlannerArguments, RoutePlannerMsg};
use pathing::provider::SimulatedNavProvider;
use pathing::world::{EntityId, NavAgent};
use pathing::{ComputationEngine, RetryCoordinator};
use ractor::{Actor, ActorRef};
use shared_types::Vec3;
use tracing_subscriber::EnvFilter;

const SETTLE_POLL: Duration = Duration::from_millis(25);

async fn spawn_entity(
    planner: &ActorRef<RoutePlannerMsg>,
    position: Option<Vec3>,
) -> anyhow::Result<EntityId> {
    ractor::call!(planner, |reply| RoutePlannerMsg::Spawn { position, reply })
        .map_err(|e| anyhow::anyhow!("spawn rpc failed: {e}"))
}

async fn stats(planner: &ActorRef<RoutePlannerMsg>) -> anyhow::Result<PlannerStats> {
    ractor::call!(planner, |reply| RoutePlannerMsg::GetStats { reply })
        .map_err(|e| anyhow::anyhow!("stats rpc failed: {e}"))
}

fn send(planner: &ActorRef<RoutePlannerMsg>, message: RoutePlannerMsg) -> anyhow::Result<()> {
    planner
        .cast(message)
        .map_err(|e| anyhow::anyhow!("planner unavailable: {e}"))
}

/// Wait until every triggered computation has been applied, discarded or failed.
async fn wait_until_settled(
    planner: &ActorRef<RoutePlannerMsg>,
    limit: Duration,
) -> anyhow::Result<PlannerStats> {
    let wait = async {
        loop {
            let current = stats(planner).await?;
            let resolved = current.applied + current.discarded + current.failed;
            if current.triggered > 0 && resolved >= current.triggered {
                return Ok::<_, anyhow::Error>(current);
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    };
    tokio::time::timeout(limit, wait)
        .await
        .context("planner did not settle in time")?
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG from .env takes effect.
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }

    let config = PathingConfig::load();
    tracing::info!(
        poll_interval_ms = config.engine.poll_interval_ms,
        attempt_timeout_ms = config.engine.attempt_timeout_ms,
        max_attempts = config.retry.max_attempts,
        inter_attempt_delay_ms = config.retry.inter_attempt_delay_ms,
        "Starting pathing demo"
    );

    let provider = Arc::new(SimulatedNavProvider::new(config.provider_latency()));
    let engine = Arc::new(ComputationEngine::with_poll_interval(
        provider.clone(),
        config.poll_interval(),
    ));
    let coordinator = Arc::new(RetryCoordinator::with_attempt_timeout(
        engine,
        config.attempt_timeout(),
    ));

    let budget = (coordinator.attempt_timeout() + config.retry.inter_attempt_delay())
        * config.retry.attempts()
        + Duration::from_secs(1);

    let mut args =
        RoutePlannerArguments::from_config(&config, coordinator, Arc::new(TracingMarkerSink));
    if args.frame_interval.is_none() {
        args.frame_interval = Some(Duration::from_millis(16));
    }
    let (planner, planner_handle) = Actor::spawn(None, RoutePlannerActor, args)
        .await
        .context("failed to spawn route planner")?;

    let walker = spawn_entity(&planner, Some(Vec3::new(0.0, 1.5, 0.0))).await?;
    let with_goal = spawn_entity(&planner, Some(Vec3::new(-20.0, 1.5, 10.0))).await?;
    let climber = spawn_entity(&planner, Some(Vec3::new(0.0, 0.0, 0.0))).await?;
    let player = spawn_entity(&planner, Some(Vec3::new(5.0, 1.5, 5.0))).await?;
    let nowhere = spawn_entity(&planner, None).await?;

    send(&planner, RoutePlannerMsg::MarkPlayerUnit { entity: player })?;

    send(&planner, RoutePlannerMsg::InsertNavAgent {
        entity: walker,
        agent: NavAgent::default(),
    })?;
    send(&planner, RoutePlannerMsg::InsertNavAgent {
        entity: with_goal,
        agent: NavAgent {
            goal: Some(Vec3::new(10.0, 1.5, -30.0)),
        },
    })?;
    // Steep enough that the route needs a jump.
    send(&planner, RoutePlannerMsg::InsertNavAgent {
        entity: climber,
        agent: NavAgent {
            goal: Some(Vec3::new(0.5, 400.0, 0.0)),
        },
    })?;
    send(&planner, RoutePlannerMsg::InsertNavAgent {
        entity: player,
        agent: NavAgent::default(),
    })?;
    send(&planner, RoutePlannerMsg::InsertNavAgent {
        entity: nowhere,
        agent: NavAgent::default(),
    })?;

    let final_stats = wait_until_settled(&planner, budget).await?;

    for entity in [walker, with_goal, climber, player, nowhere] {
        let snapshot = ractor::call!(planner, |reply| RoutePlannerMsg::GetEntity {
            entity,
            reply
        })
        .map_err(|e| anyhow::anyhow!("snapshot rpc failed: {e}"))?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    println!("{}", serde_json::to_string_pretty(&final_stats)?);

    tracing::info!(
        abandoned = provider.in_flight(),
        retained = provider.retained(),
        "Provider computations still tracked"
    );

    planner.stop(None);
    planner_handle.await.context("route planner task panicked")?;
    Ok(())
}

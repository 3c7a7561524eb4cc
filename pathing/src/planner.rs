//! RoutePlannerActor - requests routes when entities become navigation agents.
//!
//! The actor owns the [`World`] and is its only writer. Once per frame
//! (`Tick`) it drains navigation-agent changes and, for every entity that
//! went from no agent to agent, spawns one retrying route computation. The
//! task reports back with `RouteComputed`; the result is applied only if the
//! entity still exists and its request generation has not moved on.
//!
//! Generations advance on every trigger, so overlapping computations for one
//! entity resolve to the most recent request. A result whose entity lost its
//! navigation agent in the meantime is dropped as well.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::{Deserialize, Serialize};
use shared_types::{AgentParameters, PathRequest, PathResult, RetryPolicy, RouteProgress, Vec3};
use tokio::task::JoinHandle;

use crate::config::PathingConfig;
use crate::markers::MarkerSink;
use crate::retry::RetryCoordinator;
use crate::world::{EntityId, EntitySnapshot, NavAgent, World};

#[derive(Clone)]
pub struct RoutePlannerArguments {
    pub coordinator: Arc<RetryCoordinator>,
    pub retry_policy: RetryPolicy,
    pub agent: AgentParameters,
    pub default_goal: Vec3,
    /// Automatic frame ticks; `None` means the caller sends `Tick`.
    pub frame_interval: Option<Duration>,
    pub markers: Arc<dyn MarkerSink>,
}

impl RoutePlannerArguments {
    pub fn from_config(
        config: &PathingConfig,
        coordinator: Arc<RetryCoordinator>,
        markers: Arc<dyn MarkerSink>,
    ) -> Self {
        Self {
            coordinator,
            retry_policy: config.retry.clone(),
            agent: config.agent.clone(),
            default_goal: config.planner.default_goal,
            frame_interval: config.frame_interval(),
            markers,
        }
    }
}

/// Counters for observing planner activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerStats {
    /// Route computations started.
    pub triggered: u64,
    /// Successful routes attached to entities.
    pub applied: u64,
    /// Results dropped because the entity was gone, superseded or no longer an agent.
    pub discarded: u64,
    /// Failed computations for current requests.
    pub failed: u64,
}

pub struct RoutePlannerState {
    world: World,
    coordinator: Arc<RetryCoordinator>,
    retry_policy: RetryPolicy,
    agent: AgentParameters,
    default_goal: Vec3,
    markers: Arc<dyn MarkerSink>,
    stats: PlannerStats,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub enum RoutePlannerMsg {
    Spawn {
        position: Option<Vec3>,
        reply: RpcReplyPort<EntityId>,
    },
    Despawn {
        entity: EntityId,
    },
    SetPosition {
        entity: EntityId,
        position: Vec3,
    },
    InsertNavAgent {
        entity: EntityId,
        agent: NavAgent,
    },
    RemoveNavAgent {
        entity: EntityId,
    },
    MarkPlayerUnit {
        entity: EntityId,
    },
    /// Run one frame of edge detection.
    Tick,
    /// Result of a spawned route computation.
    RouteComputed {
        entity: EntityId,
        generation: u64,
        result: PathResult,
    },
    GetEntity {
        entity: EntityId,
        reply: RpcReplyPort<Option<EntitySnapshot>>,
    },
    GetStats {
        reply: RpcReplyPort<PlannerStats>,
    },
}

#[derive(Debug, Default)]
pub struct RoutePlannerActor;

#[async_trait]
impl Actor for RoutePlannerActor {
    type Msg = RoutePlannerMsg;
    type State = RoutePlannerState;
    type Arguments = RoutePlannerArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let ticker = args.frame_interval.map(|interval| {
            let tick_ref = myself.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if tick_ref.cast(RoutePlannerMsg::Tick).is_err() {
                        break;
                    }
                }
            })
        });

        Ok(RoutePlannerState {
            world: World::new(),
            coordinator: args.coordinator,
            retry_policy: args.retry_policy,
            agent: args.agent,
            default_goal: args.default_goal,
            markers: args.markers,
            stats: PlannerStats::default(),
            ticker,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RoutePlannerMsg::Spawn { position, reply } => {
                let entity = state.world.spawn(position);
                let _ = reply.send(entity);
            }
            RoutePlannerMsg::Despawn { entity } => {
                if state.world.despawn(entity) {
                    tracing::debug!(entity = %entity, "Entity despawned");
                }
            }
            RoutePlannerMsg::SetPosition { entity, position } => {
                state.world.set_position(entity, position);
            }
            RoutePlannerMsg::InsertNavAgent { entity, agent } => {
                state.world.insert_nav_agent(entity, agent);
            }
            RoutePlannerMsg::RemoveNavAgent { entity } => {
                state.world.remove_nav_agent(entity);
            }
            RoutePlannerMsg::MarkPlayerUnit { entity } => {
                state.world.mark_player_unit(entity);
            }
            RoutePlannerMsg::Tick => {
                self.run_frame(&myself, state);
            }
            RoutePlannerMsg::RouteComputed {
                entity,
                generation,
                result,
            } => {
                self.apply_route(state, entity, generation, result);
            }
            RoutePlannerMsg::GetEntity { entity, reply } => {
                let _ = reply.send(state.world.snapshot(entity));
            }
            RoutePlannerMsg::GetStats { reply } => {
                let _ = reply.send(state.stats);
            }
        }
        Ok(())
    }
}

impl RoutePlannerActor {
    fn run_frame(&self, myself: &ActorRef<RoutePlannerMsg>, state: &mut RoutePlannerState) {
        for change in state.world.drain_nav_agent_changes() {
            if !change.is_acquired() {
                continue;
            }
            let entity = change.entity;
            if !state.world.contains(entity) || state.world.is_player_unit(entity) {
                continue;
            }
            let Some(start) = state.world.position(entity) else {
                tracing::warn!(entity = %entity, "Navigation agent has no position; skipping route");
                continue;
            };
            let Some(generation) = state.world.bump_route_generation(entity) else {
                continue;
            };

            let goal = change
                .new
                .and_then(|agent| agent.goal)
                .unwrap_or(state.default_goal);
            let request = PathRequest::new(start, goal, state.agent.clone());
            state.stats.triggered += 1;
            tracing::debug!(entity = %entity, generation, start = %start, goal = %goal, "Requesting route");

            let coordinator = state.coordinator.clone();
            let policy = state.retry_policy.clone();
            let reply_to = myself.clone();
            tokio::spawn(async move {
                let result = coordinator.compute_with_retry(&request, &policy).await;
                if reply_to
                    .cast(RoutePlannerMsg::RouteComputed {
                        entity,
                        generation,
                        result,
                    })
                    .is_err()
                {
                    tracing::debug!(entity = %entity, "Planner stopped before route arrived");
                }
            });
        }
    }

    fn apply_route(
        &self,
        state: &mut RoutePlannerState,
        entity: EntityId,
        generation: u64,
        result: PathResult,
    ) {
        let Some(current) = state.world.route_generation(entity) else {
            tracing::debug!(entity = %entity, generation, "Entity gone; discarding route");
            state.stats.discarded += 1;
            return;
        };
        if current != generation {
            tracing::debug!(entity = %entity, generation, current, "Superseded route discarded");
            state.stats.discarded += 1;
            return;
        }
        if state.world.nav_agent(entity).is_none() {
            tracing::debug!(entity = %entity, generation, "Navigation agent removed; discarding route");
            state.stats.discarded += 1;
            return;
        }

        if !result.success {
            tracing::warn!(entity = %entity, error = %result.error_text(), "Route computation failed");
            state.stats.failed += 1;
            return;
        }

        let waypoints = result.waypoints.unwrap_or_default();
        state.markers.show_path(entity, &waypoints);
        let fallback_goal = state.world.position(entity).unwrap_or(state.default_goal);
        let route = RouteProgress::start(waypoints, fallback_goal, generation);
        tracing::info!(
            entity = %entity,
            generation,
            waypoints = route.waypoints.len(),
            goal = %route.goal_position,
            "Route attached"
        );
        state.world.attach_route(entity, route);
        state.stats.applied += 1;
    }
}

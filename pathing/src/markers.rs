//! Debug markers for computed routes.
//!
//! The planner hands every successful route to an injected [`MarkerSink`].
//! Rendering is out of scope; the provided sinks either drop markers or log
//! one event per waypoint.

use shared_types::{Waypoint, WaypointAction};

use crate::world::EntityId;

/// Where a marker sits along its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    Waypoint,
    Goal,
}

impl MarkerRole {
    pub fn for_index(index: usize, len: usize) -> Self {
        if index == 0 {
            Self::Start
        } else if index + 1 == len {
            Self::Goal
        } else {
            Self::Waypoint
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Waypoint => "waypoint",
            Self::Goal => "goal",
        }
    }
}

pub fn marker_name(entity: EntityId, index: usize) -> String {
    format!("PathPoint_{}_{}", entity.0, index)
}

pub trait MarkerSink: Send + Sync {
    fn show_path(&self, entity: EntityId, waypoints: &[Waypoint]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullMarkerSink;

impl MarkerSink for NullMarkerSink {
    fn show_path(&self, _entity: EntityId, _waypoints: &[Waypoint]) {}
}

/// Logs each marker at `debug` under the `pathing::markers` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMarkerSink;

impl MarkerSink for TracingMarkerSink {
    fn show_path(&self, entity: EntityId, waypoints: &[Waypoint]) {
        for (index, waypoint) in waypoints.iter().enumerate() {
            let role = MarkerRole::for_index(index, waypoints.len());
            tracing::debug!(
                target: "pathing::markers",
                marker = %marker_name(entity, index),
                role = role.as_str(),
                position = %waypoint.position,
                jump = waypoint.action == WaypointAction::Jump,
                "Path marker"
            );
        }
    }
}

//! Pathing - asynchronous route computation against a non-cancellable provider
//!
//! A request is submitted to a [`provider::PathProvider`], polled until it
//! reaches a terminal status or the attempt times out
//! ([`engine::ComputationEngine`]), and retried a bounded number of times
//! ([`retry::RetryCoordinator`]). The [`planner::RoutePlannerActor`] drives
//! this for entities that become navigation agents.

pub mod config;
pub mod engine;
pub mod error;
pub mod markers;
pub mod planner;
pub mod provider;
pub mod retry;
pub mod world;

pub use engine::ComputationEngine;
pub use error::{PathError, ProviderError};
pub use retry::RetryCoordinator;

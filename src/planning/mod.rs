//! Asynchronous planning on top of the search engine.
//!
//! This module provides:
//! - [`PlanningCoordinator`]: current/next segment pair plus one background search
//! - [`Executor`] / [`Actuator`]: the collaborators that actually move the agent
//! - [`StepExecutor`] / [`StepActuator`]: a reference executor over an [`AgentPosition`]
//! - [`PathEvent`] / [`EventBus`]: lifecycle events, delivered in emission order

mod coordinator;
mod events;
mod executor;
mod worker;

pub use coordinator::PlanningCoordinator;
pub use events::{EventBus, PathEvent};
pub use executor::{Actuator, AgentPosition, Executor, StepActuator, StepExecutor};
pub use worker::{SearchReport, spawn_search};

//! Plan-and-execute agent.
//!
//! A planner turns the user query into steps that name API endpoints, the
//! step executor runs the first step with the HTTP tools, and a replanner
//! either answers the user or rewrites the remaining plan.

pub mod executor;
pub mod graph;
pub mod planner;
pub mod state;

pub use executor::StepExecutor;
pub use graph::{should_end, LoopEvent, Node, NodeUpdate, PlanExecuteLoop, Route};
pub use planner::{Planner, Replanner};
pub use state::{Act, Action, PastStep, Plan, PlanExecuteState};

use crate::llm::LlmError;
use crate::resolver::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Recursion limit of {0} reached without hitting a stop condition")]
    RecursionLimit(usize),

    #[error("No step left to execute")]
    EmptyPlan,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

// openplan Library
// Plan-and-execute agent over OpenAPI-described web APIs

pub mod agent;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod requests;
pub mod resolver;
pub mod tools;

pub use crate::agent::{LoopEvent, PlanExecuteLoop, PlanExecuteState};
pub use crate::catalog::{Operation, OperationCatalog};
pub use crate::config::AgentConfig;
pub use crate::error::{OpenPlanError, OpenPlanResult};
pub use crate::resolver::{Anchoring, EndpointMention, EndpointResolver, HttpMethod, ResolveError};

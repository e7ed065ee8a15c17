//! Top-level error type for the openplan library.
//!
//! Each module owns a narrow error enum; `OpenPlanError` collects them so
//! callers that wire several modules together can use a single `?`.

use thiserror::Error;

use crate::agent::AgentError;
use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::resolver::ResolveError;
use crate::tools::ToolError;

#[derive(Debug, Error)]
pub enum OpenPlanError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type OpenPlanResult<T> = Result<T, OpenPlanError>;

//! Step executor: runs `plan[0]` through a tool-calling conversation.

use super::state::number_steps;
use super::AgentError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompts::{render, API_CONTROLLER_PROMPT, EXECUTE_STEP_PROMPT};
use crate::resolver::{EndpointResolver, ResolveError};
use crate::tools::Toolbox;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ITERATION_LIMIT_OUTCOME: &str = "Agent stopped due to iteration limit.";

pub struct StepExecutor {
    llm: Arc<dyn LlmProvider>,
    resolver: EndpointResolver,
    toolbox: Arc<Toolbox>,
    max_tool_iterations: usize,
}

impl StepExecutor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        resolver: EndpointResolver,
        toolbox: Arc<Toolbox>,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            llm,
            resolver,
            toolbox,
            max_tool_iterations,
        }
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Controller system prompt carrying the docs of the endpoints `task` names.
    pub fn system_prompt(&self, task: &str) -> Result<String, ResolveError> {
        let api_docs = self.resolver.api_docs(task)?;
        let api_url = self.resolver.catalog().base_url().unwrap_or_default();
        let tool_names = self.toolbox.names().join(", ");
        let tool_descriptions = self.toolbox.descriptions();

        Ok(render(
            API_CONTROLLER_PROMPT,
            &[
                ("api_url", api_url),
                ("api_docs", api_docs.as_str()),
                ("tool_names", tool_names.as_str()),
                ("tool_descriptions", tool_descriptions.as_str()),
            ],
        ))
    }

    /// Execute the first step of `plan` and return its outcome text.
    ///
    /// Unknown endpoints and tool failures become part of the outcome; only
    /// LLM failures abort.
    pub async fn execute(&self, plan: &[String]) -> Result<String, AgentError> {
        let Some(task) = plan.first() else {
            return Err(AgentError::EmptyPlan);
        };

        let system = match self.system_prompt(task) {
            Ok(system) => system,
            Err(e) => {
                warn!("Step '{}' cannot run: {}", task, e);
                return Ok(format!("Error: {}", e));
            }
        };
        let user = render(
            EXECUTE_STEP_PROMPT,
            &[("plan", number_steps(plan).as_str()), ("task", task.as_str())],
        );

        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let definitions = self.toolbox.definitions();

        for iteration in 1..=self.max_tool_iterations {
            let request = ChatRequest::new(messages.clone()).with_tools(definitions.clone());
            let response = self.llm.chat(request).await?;

            if !response.has_tool_calls() {
                info!("Step finished after {} LLM turns", iteration);
                return Ok(response.content.trim().to_string());
            }

            messages.push(ChatMessage::assistant(response.content.clone(), response.tool_calls.clone()));
            for call in &response.tool_calls {
                debug!("Tool call {} -> {}", call.id, call.name);
                let output = match self.toolbox.call(call).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("Tool {} failed: {}", call.name, e);
                        format!("Error: {}\n Please fix your mistakes.", e)
                    }
                };
                messages.push(ChatMessage::tool(call.id.clone(), output));
            }
        }

        warn!("Step hit the limit of {} LLM turns", self.max_tool_iterations);
        Ok(ITERATION_LIMIT_OUTCOME.to_string())
    }
}

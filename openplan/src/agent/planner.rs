//! LLM-driven planner and replanner nodes.

use super::state::{ActReply, Action, Plan, PlanExecuteState};
use super::AgentError;
use crate::catalog::OperationCatalog;
use crate::llm::{parse_json_output, LlmProvider};
use crate::prompts::{render, PLANNER_PROMPT, REPLANNER_PROMPT};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Planner {
    llm: Arc<dyn LlmProvider>,
    catalog: Arc<OperationCatalog>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmProvider>, catalog: Arc<OperationCatalog>) -> Self {
        Self { llm, catalog }
    }

    pub fn prompt(&self, query: &str) -> String {
        let endpoints = self
            .catalog
            .endpoint_descriptions()
            .iter()
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        render(PLANNER_PROMPT, &[("endpoints", endpoints.as_str()), ("query", query)])
    }

    pub async fn plan(&self, query: &str) -> Result<Plan, AgentError> {
        let reply = self.llm.complete(&self.prompt(query)).await?;
        debug!("Planner reply: {}", reply);
        let plan: Plan = parse_json_output(&reply)?;
        info!("Planned {} steps", plan.steps.len());
        Ok(plan)
    }
}

pub struct Replanner {
    llm: Arc<dyn LlmProvider>,
}

impl Replanner {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// `state.plan` still holds the step that just ran.
    pub fn prompt(&self, state: &PlanExecuteState) -> String {
        let plan = state.numbered_plan();
        let past_steps = state.past_steps_text();
        render(
            REPLANNER_PROMPT,
            &[
                ("input", state.input.as_str()),
                ("plan", plan.as_str()),
                ("past_steps", past_steps.as_str()),
            ],
        )
    }

    pub async fn replan(&self, state: &PlanExecuteState) -> Result<Action, AgentError> {
        let reply = self.llm.complete(&self.prompt(state)).await?;
        debug!("Replanner reply: {}", reply);
        let action: Action = parse_json_output::<ActReply>(&reply)?.into();
        match &action {
            Action::Response { .. } => info!("Replanner returned a final response"),
            Action::Plan(plan) => info!("Replanner kept {} steps", plan.steps.len()),
        }
        Ok(action)
    }
}

//! Plan → agent → replan loop.
//!
//! ```text
//! START -> planner -> [should_end] -> agent -> replan -> [should_end] -> agent ...
//!                           \                                   \
//!                            END                                 END
//! ```

use super::executor::StepExecutor;
use super::planner::{Planner, Replanner};
use super::state::{Action, PastStep, PlanExecuteState};
use super::AgentError;
use crate::catalog::OperationCatalog;
use crate::config::LoopSettings;
use crate::llm::LlmProvider;
use crate::resolver::EndpointResolver;
use crate::tools::Toolbox;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Planner,
    Agent,
    Replan,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Node::Planner => "planner",
            Node::Agent => "agent",
            Node::Replan => "replan",
        })
    }
}

/// State change produced by one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeUpdate {
    Plan(Vec<String>),
    PastStep(PastStep),
    Response(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopEvent {
    pub node: Node,
    pub update: NodeUpdate,
}

impl fmt::Display for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.update {
            NodeUpdate::Plan(steps) => {
                write!(f, "[{}] plan:", self.node)?;
                for (i, step) in steps.iter().enumerate() {
                    write!(f, "\n  {}. {}", i + 1, step)?;
                }
                Ok(())
            }
            NodeUpdate::PastStep(step) => write!(f, "[{}] {}\n  -> {}", self.node, step.task, step.outcome),
            NodeUpdate::Response(response) => write!(f, "[{}] response: {}", self.node, response),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Agent,
    End,
}

pub fn should_end(state: &PlanExecuteState) -> Route {
    let answered = state.response.as_deref().is_some_and(|r| !r.is_empty());
    if answered || state.plan.is_empty() {
        Route::End
    } else {
        Route::Agent
    }
}

pub struct PlanExecuteLoop {
    planner: Planner,
    executor: StepExecutor,
    replanner: Replanner,
    recursion_limit: usize,
}

impl PlanExecuteLoop {
    pub fn new(planner: Planner, executor: StepExecutor, replanner: Replanner, recursion_limit: usize) -> Self {
        Self {
            planner,
            executor,
            replanner,
            recursion_limit,
        }
    }

    /// Wire every node to one LLM, one catalog and one toolbox.
    pub fn build(
        llm: Arc<dyn LlmProvider>,
        catalog: Arc<OperationCatalog>,
        toolbox: Arc<Toolbox>,
        settings: &LoopSettings,
    ) -> Result<Self, AgentError> {
        let resolver = EndpointResolver::with_anchoring(catalog.clone(), settings.anchoring)?;
        Ok(Self::new(
            Planner::new(llm.clone(), catalog),
            StepExecutor::new(llm.clone(), resolver, toolbox, settings.max_tool_iterations),
            Replanner::new(llm),
            settings.recursion_limit,
        ))
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Run until the replanner answers or the plan runs out.
    ///
    /// `sink` sees every node's update as soon as the node completes.
    pub async fn run<F>(&self, input: &str, mut sink: F) -> Result<PlanExecuteState, AgentError>
    where
        F: FnMut(&LoopEvent),
    {
        let mut state = PlanExecuteState::new(input);
        let mut steps = 0usize;
        info!("Running plan-and-execute for: {}", input);

        self.enter(&mut steps)?;
        let plan = self.planner.plan(input).await?;
        state.plan = plan.steps;
        sink(&LoopEvent {
            node: Node::Planner,
            update: NodeUpdate::Plan(state.plan.clone()),
        });

        while should_end(&state) == Route::Agent {
            self.enter(&mut steps)?;
            let task = state.plan[0].clone();
            let outcome = self.executor.execute(&state.plan).await?;
            let step = PastStep { task, outcome };
            state.past_steps.push(step.clone());
            sink(&LoopEvent {
                node: Node::Agent,
                update: NodeUpdate::PastStep(step),
            });

            self.enter(&mut steps)?;
            let update = match self.replanner.replan(&state).await? {
                Action::Response { response } => {
                    state.response = Some(response.clone());
                    NodeUpdate::Response(response)
                }
                Action::Plan(plan) => {
                    state.plan = plan.steps;
                    NodeUpdate::Plan(state.plan.clone())
                }
            };
            sink(&LoopEvent {
                node: Node::Replan,
                update,
            });
        }

        info!(
            "Loop finished after {} node runs ({} steps executed)",
            steps,
            state.past_steps.len()
        );
        Ok(state)
    }

    fn enter(&self, steps: &mut usize) -> Result<(), AgentError> {
        if *steps >= self.recursion_limit {
            return Err(AgentError::RecursionLimit(self.recursion_limit));
        }
        *steps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthHeaders;
    use crate::catalog::Operation;
    use crate::llm::{LlmError, ScriptedLlmProvider};
    use crate::requests::RequestsWrapper;
    use crate::resolver::HttpMethod;
    use crate::tools::prepare_tools;
    use serde_json::json;
    use std::time::Duration;

    fn build(llm: Arc<ScriptedLlmProvider>, recursion_limit: usize) -> PlanExecuteLoop {
        let catalog = Arc::new(OperationCatalog::new(vec![Operation::new(
            "GET /me",
            "Current user",
            json!({"description": "profile"}),
        )]));
        let requests = Arc::new(RequestsWrapper::new(AuthHeaders::none(), Duration::from_secs(5)).unwrap());
        let toolbox = prepare_tools(requests, llm.clone(), true, &[HttpMethod::Get]).unwrap();
        let settings = LoopSettings {
            recursion_limit,
            ..LoopSettings::default()
        };
        PlanExecuteLoop::build(llm, catalog, Arc::new(toolbox), &settings).unwrap()
    }

    #[test]
    fn routing() {
        let mut state = PlanExecuteState::new("q");
        assert_eq!(should_end(&state), Route::End);

        state.plan = vec!["GET /me".to_string()];
        assert_eq!(should_end(&state), Route::Agent);

        state.response = Some(String::new());
        assert_eq!(should_end(&state), Route::Agent);

        state.response = Some("done".to_string());
        assert_eq!(should_end(&state), Route::End);
    }

    #[tokio::test]
    async fn runs_until_the_replanner_answers() {
        let llm = Arc::new(ScriptedLlmProvider::from_texts([
            r#"{"steps": ["GET /me to get the id", "Say the id"]}"#,
            "id is 42",
            r#"{"action": {"steps": ["Say the id"]}}"#,
            "The id is 42.",
            r#"{"action": {"response": "Your id is 42."}}"#,
        ]));
        let agent = build(llm.clone(), 50);

        let mut events = Vec::new();
        let state = agent.run("what is my id?", |e| events.push(e.clone())).await.unwrap();

        assert_eq!(state.response.as_deref(), Some("Your id is 42."));
        assert_eq!(state.plan, vec!["Say the id"]);
        assert_eq!(state.past_steps.len(), 2);
        assert_eq!(state.past_steps[0].outcome, "id is 42");

        let nodes: Vec<Node> = events.iter().map(|e| e.node).collect();
        assert_eq!(
            nodes,
            vec![Node::Planner, Node::Agent, Node::Replan, Node::Agent, Node::Replan]
        );
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn empty_plan_ends_without_response() {
        let llm = Arc::new(ScriptedLlmProvider::from_texts([r#"{"steps": []}"#]));
        let state = build(llm, 50).run("hello", |_| {}).await.unwrap();
        assert!(state.response.is_none());
        assert!(state.past_steps.is_empty());
    }

    #[tokio::test]
    async fn misshapen_replan_fails_the_run() {
        let llm = Arc::new(ScriptedLlmProvider::from_texts([
            r#"{"steps": ["GET /me"]}"#,
            "id is 42",
            r#"{"action": {"final_answer": "Your id is 42"}}"#,
        ]));
        let mut events = Vec::new();
        let err = build(llm, 50).run("what is my id?", |e| events.push(e.clone())).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(LlmError::StructuredOutput(_))));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn recursion_limit_stops_endless_replanning() {
        let llm = Arc::new(ScriptedLlmProvider::from_texts([
            r#"{"steps": ["GET /me"]}"#,
            "done",
            r#"{"action": {"steps": ["GET /me"]}}"#,
            "done",
            r#"{"action": {"steps": ["GET /me"]}}"#,
        ]));
        let mut seen = 0;
        let err = build(llm, 4).run("loop", |_| seen += 1).await.unwrap_err();
        assert!(matches!(err, AgentError::RecursionLimit(4)));
        assert_eq!(seen, 4);
    }
}

//! Loop state and the structured outputs of the planner and replanner.

use serde::{Deserialize, Serialize};

/// A finished step and what came out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastStep {
    pub task: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanExecuteState {
    pub input: String,
    /// Remaining steps; `plan[0]` runs next
    pub plan: Vec<String>,
    /// Append-only
    pub past_steps: Vec<PastStep>,
    pub response: Option<String>,
}

impl PlanExecuteState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn numbered_plan(&self) -> String {
        number_steps(&self.plan)
    }

    pub fn past_steps_text(&self) -> String {
        if self.past_steps.is_empty() {
            return "(none)".to_string();
        }
        self.past_steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}\nOutcome: {}", i + 1, s.task, s.outcome))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub fn number_steps(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Steps to follow, in order. `steps` is required; only `{"steps": []}` is an empty plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<String>,
}

/// Replanner decision: answer the user or continue with new steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    Response { response: String },
    Plan(Plan),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub action: Action,
}

/// Replanner reply, with or without the `action` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ActReply {
    Wrapped(Act),
    Bare(Action),
}

impl From<ActReply> for Action {
    fn from(reply: ActReply) -> Self {
        match reply {
            ActReply::Wrapped(act) => act.action,
            ActReply::Bare(action) => action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{parse_json_output, LlmError};

    #[test]
    fn act_accepts_both_shapes() {
        let wrapped: ActReply = parse_json_output(r#"{"action": {"response": "done"}}"#).unwrap();
        assert_eq!(Action::from(wrapped), Action::Response { response: "done".to_string() });

        let bare: ActReply = parse_json_output(r#"{"steps": ["GET /me"]}"#).unwrap();
        assert_eq!(
            Action::from(bare),
            Action::Plan(Plan {
                steps: vec!["GET /me".to_string()]
            })
        );
    }

    #[test]
    fn replies_without_the_expected_keys_are_rejected() {
        assert!(matches!(
            parse_json_output::<Plan>(r#"{"plan": ["GET /me"]}"#),
            Err(LlmError::StructuredOutput(_))
        ));
        assert!(matches!(
            parse_json_output::<ActReply>(r#"{"action": {"final_answer": "Your id is 42"}}"#),
            Err(LlmError::StructuredOutput(_))
        ));

        let empty: Plan = parse_json_output(r#"{"steps": []}"#).unwrap();
        assert!(empty.steps.is_empty());
    }

    #[test]
    fn state_renders_plan_and_history() {
        let mut state = PlanExecuteState::new("q");
        assert_eq!(state.past_steps_text(), "(none)");

        state.plan = vec!["GET /me".to_string(), "GET /me/playlists".to_string()];
        state.past_steps.push(PastStep {
            task: "GET /me".to_string(),
            outcome: "id=42".to_string(),
        });
        assert_eq!(state.numbered_plan(), "1. GET /me\n2. GET /me/playlists");
        assert_eq!(state.past_steps_text(), "1. GET /me\nOutcome: id=42");
    }
}

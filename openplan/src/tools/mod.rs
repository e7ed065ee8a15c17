//! HTTP request tools exposed to the step executor.
//!
//! One tool per HTTP verb. A tool call sends the request through
//! [`RequestsWrapper`], truncates the raw body and asks the LLM to extract
//! what the caller's `output_instructions` describe. The extracted text is
//! what goes back into the conversation, never the raw payload.

mod input;

pub use input::{parse_tool_input, ToolInput};

use crate::config::DEFAULT_RESPONSE_LENGTH;
use crate::llm::{truncate_chars, LlmError, LlmProvider, ToolCall, ToolDefinition};
use crate::prompts::{self, render};
use crate::requests::RequestsWrapper;
use crate::resolver::HttpMethod;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(
        "Requests tools can issue arbitrary HTTP calls against the API; set allow_dangerous_requests = true to enable them"
    )]
    DangerousRequestsNotAllowed,

    #[error("No tools enabled: allowed_operations is empty")]
    NoTools,

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid input for {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },

    #[error("Request failed: {0}")]
    Http(String),

    #[error("Failed to parse API response: {0}")]
    Llm(#[from] LlmError),
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::Http(e.to_string())
    }
}

/// Requests tool for a single HTTP verb.
pub struct ApiTool {
    method: HttpMethod,
    requests: Arc<RequestsWrapper>,
    llm: Arc<dyn LlmProvider>,
    response_length: usize,
}

impl ApiTool {
    pub fn new(method: HttpMethod, requests: Arc<RequestsWrapper>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            method,
            requests,
            llm,
            response_length: DEFAULT_RESPONSE_LENGTH,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn name(&self) -> &'static str {
        tool_name(self.method)
    }

    pub fn description(&self) -> &'static str {
        match self.method {
            HttpMethod::Get => prompts::REQUESTS_GET_TOOL_DESCRIPTION,
            HttpMethod::Post => prompts::REQUESTS_POST_TOOL_DESCRIPTION,
            HttpMethod::Put => prompts::REQUESTS_PUT_TOOL_DESCRIPTION,
            HttpMethod::Patch => prompts::REQUESTS_PATCH_TOOL_DESCRIPTION,
            HttpMethod::Delete => prompts::REQUESTS_DELETE_TOOL_DESCRIPTION,
        }
    }

    fn parsing_prompt(&self) -> &'static str {
        match self.method {
            HttpMethod::Get => prompts::PARSING_GET_PROMPT,
            HttpMethod::Post => prompts::PARSING_POST_PROMPT,
            HttpMethod::Put => prompts::PARSING_PUT_PROMPT,
            HttpMethod::Patch => prompts::PARSING_PATCH_PROMPT,
            HttpMethod::Delete => prompts::PARSING_DELETE_PROMPT,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        let mut properties = json!({
            "url": {"type": "string", "description": "Absolute URL of the request"},
            "output_instructions": {
                "type": "string",
                "description": "What information to extract from the response"
            }
        });
        match self.method {
            HttpMethod::Get => {
                properties["params"] = json!({"type": "object", "description": "Query parameters"});
            }
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                properties["data"] = json!({"type": "object", "description": "JSON request body"});
            }
            HttpMethod::Delete => {}
        }

        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": ["url", "output_instructions"],
            }),
        }
    }

    /// Send the request and return the LLM's reading of the response.
    pub async fn run(&self, arguments: &Value) -> Result<String, ToolError> {
        let input = parse_tool_input(arguments).map_err(|reason| ToolError::InvalidInput {
            tool: self.name().to_string(),
            reason,
        })?;

        info!("{} {}", self.method, input.url);
        let raw = match self.method {
            HttpMethod::Get => self.requests.get(&input.url, input.params.as_ref()).await?,
            HttpMethod::Post => self.requests.post(&input.url, &input.data_or_empty()).await?,
            HttpMethod::Put => self.requests.put(&input.url, &input.data_or_empty()).await?,
            HttpMethod::Patch => self.requests.patch(&input.url, &input.data_or_empty()).await?,
            HttpMethod::Delete => self.requests.delete(&input.url).await?,
        };

        let response = truncate_chars(&raw, self.response_length);
        if response.len() < raw.len() {
            debug!("Truncated {} response to {} chars", self.name(), self.response_length);
        }

        let prompt = render(
            self.parsing_prompt(),
            &[("response", response), ("instructions", input.output_instructions.as_str())],
        );
        let parsed = self.llm.complete(&prompt).await?;
        Ok(parsed.trim().to_string())
    }
}

pub fn tool_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "requests_get",
        HttpMethod::Post => "requests_post",
        HttpMethod::Put => "requests_put",
        HttpMethod::Patch => "requests_patch",
        HttpMethod::Delete => "requests_delete",
    }
}

/// The enabled tools, in verb order.
pub struct Toolbox {
    tools: Vec<ApiTool>,
}

impl Toolbox {
    /// Cut raw responses to `length` characters before parsing.
    pub fn with_response_length(mut self, length: usize) -> Self {
        for tool in &mut self.tools {
            tool.response_length = length;
        }
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ApiTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ApiTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(ApiTool::name).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ApiTool::definition).collect()
    }

    /// `name: description` blocks for the controller prompt.
    pub fn descriptions(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn call(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        tool.run(&call.arguments).await
    }
}

/// Build one tool per allowed verb.
///
/// Requests tools act on the live API with the user's token, so they are
/// only built when the caller opts in with `allow_dangerous_requests`.
pub fn prepare_tools(
    requests: Arc<RequestsWrapper>,
    llm: Arc<dyn LlmProvider>,
    allow_dangerous_requests: bool,
    allowed_operations: &[HttpMethod],
) -> Result<Toolbox, ToolError> {
    if !allow_dangerous_requests {
        return Err(ToolError::DangerousRequestsNotAllowed);
    }

    let tools: Vec<ApiTool> = HttpMethod::ALL
        .into_iter()
        .filter(|m| allowed_operations.contains(m))
        .map(|m| ApiTool::new(m, requests.clone(), llm.clone()))
        .collect();

    if tools.is_empty() {
        return Err(ToolError::NoTools);
    }
    Ok(Toolbox { tools })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthHeaders;
    use crate::llm::ScriptedLlmProvider;
    use std::time::Duration;

    fn parts() -> (Arc<RequestsWrapper>, Arc<dyn LlmProvider>) {
        let requests = RequestsWrapper::new(AuthHeaders::none(), Duration::from_secs(5)).unwrap();
        (Arc::new(requests), Arc::new(ScriptedLlmProvider::default()))
    }

    #[test]
    fn refuses_without_opt_in() {
        let (requests, llm) = parts();
        let err = prepare_tools(requests, llm, false, &HttpMethod::ALL).err().unwrap();
        assert!(matches!(err, ToolError::DangerousRequestsNotAllowed));
    }

    #[test]
    fn empty_allow_list_is_an_error() {
        let (requests, llm) = parts();
        let err = prepare_tools(requests, llm, true, &[]).err().unwrap();
        assert!(matches!(err, ToolError::NoTools));
    }

    #[test]
    fn tools_follow_verb_order_without_duplicates() {
        let (requests, llm) = parts();
        let toolbox = prepare_tools(
            requests,
            llm,
            true,
            &[HttpMethod::Delete, HttpMethod::Get, HttpMethod::Get],
        )
        .unwrap();
        assert_eq!(toolbox.names(), vec!["requests_get", "requests_delete"]);
        assert!(toolbox.get("requests_post").is_none());
    }

    #[test]
    fn definitions_describe_verb_specific_fields() {
        let (requests, llm) = parts();
        let toolbox = prepare_tools(requests, llm, true, &HttpMethod::ALL).unwrap();
        let defs = toolbox.definitions();
        assert_eq!(defs.len(), 5);

        let get = &defs[0];
        assert_eq!(get.name, "requests_get");
        assert!(get.parameters["properties"].get("params").is_some());
        assert!(get.parameters["properties"].get("data").is_none());

        let delete = defs.iter().find(|d| d.name == "requests_delete").unwrap();
        assert!(delete.parameters["properties"].get("data").is_none());
        assert!(toolbox.descriptions().contains("requests_put: Use this when you want to PUT"));
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_input_are_reported() {
        let (requests, llm) = parts();
        let toolbox = prepare_tools(requests, llm, true, &[HttpMethod::Get]).unwrap();

        let call = ToolCall {
            id: "1".to_string(),
            name: "requests_post".to_string(),
            arguments: json!({}),
        };
        assert!(matches!(toolbox.call(&call).await, Err(ToolError::UnknownTool(n)) if n == "requests_post"));

        let call = ToolCall {
            id: "2".to_string(),
            name: "requests_get".to_string(),
            arguments: json!({"output_instructions": "ids"}),
        };
        assert!(matches!(
            toolbox.call(&call).await,
            Err(ToolError::InvalidInput { tool, .. }) if tool == "requests_get"
        ));
    }
}

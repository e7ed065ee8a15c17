//! OpenAI-compatible chat completions provider (OpenAI, Groq, OpenRouter, ...)

use super::{truncate_chars, ChatMessage, ChatRequest, ChatResponse, LlmError, LlmProvider, Role, ToolCall};
use crate::config::LlmSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ERROR_BODY_PREVIEW: usize = 1000;

pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: &LlmSettings, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Build from settings, reading the key from `settings.api_key_env`.
    pub fn from_env(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(settings.api_key_env.clone()))?;
        Self::new(settings, api_key)
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_openai_json).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(|t| t.to_openai_tool_json()).collect());
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            "Sending {} messages ({} tools) to {}",
            request.messages.len(),
            request.tools.len(),
            self.model
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw_body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate_chars(&raw_body, ERROR_BODY_PREVIEW).to_string(),
            });
        }

        let parsed = parse_completion(&raw_body)?;

        info!(
            "LLM {} answered in {} ms ({} chars, {} tool calls)",
            self.model,
            start.elapsed().as_millis(),
            parsed.content.len(),
            parsed.tool_calls.len()
        );

        Ok(parsed)
    }
}

fn message_to_openai_json(message: &ChatMessage) -> Value {
    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                Value::String(message.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default(),
            "content": message.content,
        }),
        role => json!({ "role": role, "content": message.content }),
    }
}

#[derive(Deserialize)]
struct CompletionWire {
    #[serde(default)]
    choices: Vec<ChoiceWire>,
}

#[derive(Deserialize)]
struct ChoiceWire {
    message: AssistantWire,
}

#[derive(Deserialize)]
struct AssistantWire {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallWire>>,
}

#[derive(Deserialize)]
struct ToolCallWire {
    id: Option<String>,
    function: FunctionWire,
}

#[derive(Deserialize)]
struct FunctionWire {
    name: Option<String>,
    arguments: Option<String>,
}

/// First choice of a chat completions body. Calls without a function name are
/// dropped; arguments that are not JSON land under `raw_arguments`.
fn parse_completion(raw_body: &str) -> Result<ChatResponse, LlmError> {
    let completion: CompletionWire = serde_json::from_str(raw_body).map_err(|e| {
        LlmError::InvalidResponse(format!(
            "{}: {}",
            e,
            truncate_chars(raw_body, ERROR_BODY_PREVIEW)
        ))
    })?;
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| LlmError::InvalidResponse("LLM response missing choices".to_string()))?;

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(idx, call)| {
            let name = call.function.name?;
            let raw_args = call.function.arguments.unwrap_or_else(|| "{}".to_string());
            let arguments = serde_json::from_str::<Value>(&raw_args)
                .unwrap_or_else(|_| json!({ "raw_arguments": raw_args }));
            Some(ToolCall {
                id: call.id.unwrap_or_else(|| format!("tool_call_{}", idx + 1)),
                name,
                arguments,
            })
        })
        .collect();

    Ok(ChatResponse {
        content: message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(&LlmSettings::default(), "key").unwrap()
    }

    #[test]
    fn converts_tool_calls_from_openai_shape() {
        let payload = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {
                            "id": "call_1",
                            "function": {"name": "requests_get", "arguments": "{\"url\":\"https://x/me\"}"}
                        },
                        {
                            "function": {"name": "requests_delete", "arguments": "not json"}
                        }
                    ]
                }
            }]
        });

        let parsed = parse_completion(&payload.to_string()).unwrap();
        let calls = parsed.tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arguments["url"], "https://x/me");
        assert_eq!(calls[1].id, "tool_call_2");
        assert_eq!(calls[1].arguments["raw_arguments"], "not json");
        assert_eq!(parsed.content, "");
    }

    #[test]
    fn completion_without_choices_is_invalid() {
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(parse_completion("<html>"), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn request_body_carries_tools_and_tool_turns() {
        let call = ToolCall {
            id: "c1".to_string(),
            name: "requests_get".to_string(),
            arguments: json!({"url": "https://x/me"}),
        };
        let request = ChatRequest::new(vec![
            ChatMessage::system("sys"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("", vec![call]),
            ChatMessage::tool("c1", "{\"id\": 1}"),
        ])
        .with_tools(vec![ToolDefinition {
            name: "requests_get".to_string(),
            description: "GET".to_string(),
            parameters: json!({"type": "object"}),
        }]);

        let body = provider().request_body(&request);
        assert_eq!(body["model"], crate::config::DEFAULT_LLM_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][2]["content"], Value::Null);
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            "{\"url\":\"https://x/me\"}"
        );
        assert_eq!(body["messages"][3]["tool_call_id"], "c1");
        assert_eq!(body["tools"][0]["function"]["name"], "requests_get");
        assert_eq!(body["tool_choice"], "auto");
        assert!(body.get("max_tokens").is_none());
    }
}

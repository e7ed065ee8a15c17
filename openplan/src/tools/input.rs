//! Tool argument parsing.
//!
//! Models send arguments as a JSON object, as a JSON string, or as a
//! fenced block the provider could not decode (kept under `raw_arguments`).

use crate::llm::parse_json_output;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInput {
    pub url: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub output_instructions: String,
}

impl ToolInput {
    /// Request body, `{}` when none was given.
    pub fn data_or_empty(&self) -> Value {
        self.data.clone().unwrap_or_else(|| Value::Object(Map::new()))
    }
}

pub fn parse_tool_input(arguments: &Value) -> Result<ToolInput, String> {
    let input: ToolInput = match arguments {
        Value::String(text) => parse_json_output(text).map_err(|e| e.to_string())?,
        Value::Object(map) if map.len() == 1 && map.contains_key("raw_arguments") => {
            let text = map["raw_arguments"].as_str().unwrap_or_default();
            parse_json_output(text).map_err(|e| e.to_string())?
        }
        Value::Object(_) => serde_json::from_value(arguments.clone()).map_err(|e| e.to_string())?,
        other => return Err(format!("expected a JSON object, got {}", other)),
    };

    let url = url::Url::parse(input.url.trim()).map_err(|e| format!("invalid url '{}': {}", input.url, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported url scheme '{}'", url.scheme()));
    }

    Ok(ToolInput {
        url: input.url.trim().to_string(),
        ..input
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_plain_objects() {
        let input = parse_tool_input(&json!({
            "url": "https://api.spotify.com/v1/me/playlists",
            "params": {"limit": 5},
            "output_instructions": "playlist ids"
        }))
        .unwrap();
        assert_eq!(input.url, "https://api.spotify.com/v1/me/playlists");
        assert_eq!(input.params, Some(json!({"limit": 5})));
        assert_eq!(input.data_or_empty(), json!({}));
    }

    #[test]
    fn accepts_fenced_strings_and_raw_arguments() {
        let fenced = "```json\n{\"url\": \" https://x.test/a \", \"data\": {\"name\": \"n\"}, \"output_instructions\": \"id\"}\n```";
        let input = parse_tool_input(&json!(fenced)).unwrap();
        assert_eq!(input.url, "https://x.test/a");
        assert_eq!(input.data_or_empty(), json!({"name": "n"}));

        let raw = json!({"raw_arguments": "{\"url\": \"https://x.test/b\"}"});
        let input = parse_tool_input(&raw).unwrap();
        assert_eq!(input.url, "https://x.test/b");
        assert_eq!(input.output_instructions, "");
    }

    #[test]
    fn rejects_missing_or_relative_urls() {
        assert!(parse_tool_input(&json!({"output_instructions": "x"})).is_err());
        assert!(parse_tool_input(&json!({"url": "/me"})).is_err());
        assert!(parse_tool_input(&json!({"url": "ftp://x.test/f"})).is_err());
        assert!(parse_tool_input(&json!([1, 2])).is_err());
    }
}

//! Structured output parsing.
//!
//! Models asked for JSON still wrap it in Markdown fences or surround it
//! with prose. We strip fences, try the whole reply, then fall back to the
//! first balanced top-level `{...}` object.

use super::LlmError;
use serde::de::DeserializeOwned;

pub fn parse_json_output<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let unfenced = strip_code_fence(text);

    let first_err = match serde_json::from_str::<T>(unfenced) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let object = extract_json_object(unfenced)
        .ok_or_else(|| LlmError::StructuredOutput(format!("no JSON object in reply ({})", first_err)))?;
    serde_json::from_str(object).map_err(|e| LlmError::StructuredOutput(e.to_string()))
}

/// Remove a surrounding ```` ```lang ... ``` ```` fence if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` span, ignoring braces inside JSON strings.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Steps {
        steps: Vec<String>,
    }

    #[test]
    fn parses_bare_json() {
        let s: Steps = parse_json_output(r#"{"steps": ["a", "b"]}"#).unwrap();
        assert_eq!(s.steps, vec!["a", "b"]);
    }

    #[test]
    fn parses_fenced_json() {
        let s: Steps = parse_json_output("```json\n{\"steps\": [\"GET /me\"]}\n```").unwrap();
        assert_eq!(s.steps, vec!["GET /me"]);
    }

    #[test]
    fn parses_object_inside_prose_with_braces_in_strings() {
        let reply = "Sure! Here is the plan:\n{\"steps\": [\"GET /playlists/{id}/tracks\", \"say \\\"}\\\"\"]}\nGood luck.";
        let s: Steps = parse_json_output(reply).unwrap();
        assert_eq!(s.steps, vec!["GET /playlists/{id}/tracks", "say \"}\""]);
    }

    #[test]
    fn reports_missing_object() {
        let err = parse_json_output::<Steps>("I cannot help").unwrap_err();
        assert!(matches!(err, LlmError::StructuredOutput(_)));
    }
}

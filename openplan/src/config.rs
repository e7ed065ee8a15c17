//! Agent configuration.
//!
//! Loaded from a TOML file where every field has a default, then patched
//! from `OPENPLAN_*` environment variables. Secrets are never stored in the
//! file: it only names the environment variables that hold them.

use crate::resolver::{Anchoring, HttpMethod};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_RESPONSE_LENGTH: usize = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    InvalidEnv { var: String, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmSettings,
    pub api: ApiSettings,
    pub agent: LoopSettings,
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout_seconds: 60,
        }
    }
}

/// Target API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// OpenAPI document (YAML or JSON)
    pub spec_path: PathBuf,
    /// Environment variable holding the user access token
    pub access_token_env: String,
    /// Security scheme whose scopes the token needs
    pub security_scheme: String,
    pub allow_dangerous_requests: bool,
    pub allowed_operations: Vec<HttpMethod>,
    /// Raw API responses are cut to this many characters before parsing
    pub response_length: usize,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            spec_path: PathBuf::from("spotify_openapi.yaml"),
            access_token_env: "SPOTIFY_ACCESS_TOKEN".to_string(),
            security_scheme: "oauth_2_0".to_string(),
            allow_dangerous_requests: true,
            allowed_operations: HttpMethod::ALL.to_vec(),
            response_length: DEFAULT_RESPONSE_LENGTH,
            timeout_seconds: 30,
        }
    }
}

/// Plan/execute/replan loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Maximum node executions per run
    pub recursion_limit: usize,
    /// Maximum LLM turns inside one step
    pub max_tool_iterations: usize,
    pub anchoring: Anchoring,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            recursion_limit: 50,
            max_tool_iterations: 12,
            anchoring: Anchoring::Full,
        }
    }
}

impl AgentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `OPENPLAN_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENPLAN_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("OPENPLAN_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("OPENPLAN_LLM_API_KEY_ENV") {
            self.llm.api_key_env = v;
        }
        if let Some(v) = lookup("OPENPLAN_LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("OPENPLAN_LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("OPENPLAN_SPEC_PATH") {
            self.api.spec_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("OPENPLAN_ACCESS_TOKEN_ENV") {
            self.api.access_token_env = v;
        }
        if let Some(v) = lookup("OPENPLAN_ALLOWED_OPERATIONS") {
            self.api.allowed_operations = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_env::<HttpMethod>("OPENPLAN_ALLOWED_OPERATIONS", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup("OPENPLAN_RECURSION_LIMIT") {
            self.agent.recursion_limit = parse_env("OPENPLAN_RECURSION_LIMIT", &v)?;
        }
        if let Some(v) = lookup("OPENPLAN_ANCHORING") {
            self.agent.anchoring = match v.trim().to_lowercase().as_str() {
                "full" => Anchoring::Full,
                "prefix" => Anchoring::Prefix,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "OPENPLAN_ANCHORING".to_string(),
                        value: v,
                    })
                }
            };
        }
        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.api.allowed_operations.len(), 5);
        assert_eq!(config.api.response_length, 5000);
        assert_eq!(config.agent.recursion_limit, 50);
        assert_eq!(config.agent.anchoring, Anchoring::Full);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[llm]
model = "gemma2-9b-it"

[api]
spec_path = "specs/spotify.yaml"
allowed_operations = ["GET", "POST"]

[agent]
anchoring = "prefix"
"#
        )
        .unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm.model, "gemma2-9b-it");
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.api.spec_path, PathBuf::from("specs/spotify.yaml"));
        assert_eq!(config.api.allowed_operations, vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(config.agent.anchoring, Anchoring::Prefix);
        assert_eq!(config.agent.max_tool_iterations, 12);
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("OPENPLAN_LLM_MODEL", "mixtral"),
            ("OPENPLAN_ALLOWED_OPERATIONS", "get, delete"),
            ("OPENPLAN_RECURSION_LIMIT", "7"),
        ]
        .into_iter()
        .collect();

        let config = AgentConfig::default()
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.llm.model, "mixtral");
        assert_eq!(config.api.allowed_operations, vec![HttpMethod::Get, HttpMethod::Delete]);
        assert_eq!(config.agent.recursion_limit, 7);
    }

    #[test]
    fn bad_override_is_reported() {
        let err = AgentConfig::default()
            .apply_overrides(|k| (k == "OPENPLAN_RECURSION_LIMIT").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var, .. } if var == "OPENPLAN_RECURSION_LIMIT"));
    }
}

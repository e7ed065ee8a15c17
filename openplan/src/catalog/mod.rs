//! Operation Catalog
//!
//! The catalog is the reduced view of an OpenAPI document: one entry per
//! HTTP operation, named `"<METHOD> <path-template>"`, carrying the
//! documentation the step executor hands to the LLM. It is built once and
//! never mutated; share it behind an `Arc`.

pub mod reduce;

pub use reduce::{load_raw_spec, reduce_openapi_spec, ReduceOptions};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read OpenAPI document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse OpenAPI document: {0}")]
    Parse(String),

    #[error("No paths found in OpenAPI spec")]
    MissingPaths,

    #[error("Unresolvable $ref '{0}'")]
    BrokenReference(String),
}

/// One API operation as seen by the planner and the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// `"<METHOD> <path-template>"`, e.g. `GET /playlists/{playlist_id}`
    pub name: String,
    pub description: String,
    /// Opaque ordered documentation tree (parameters, bodies, responses)
    pub documentation: Value,
}

impl Operation {
    pub fn new(name: impl Into<String>, description: impl Into<String>, documentation: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            documentation,
        }
    }
}

/// Entry of the OpenAPI `servers` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiServer {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Immutable, ordered collection of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationCatalog {
    servers: Vec<ApiServer>,
    description: String,
    operations: Vec<Operation>,
}

impl OperationCatalog {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            servers: Vec::new(),
            description: String::new(),
            operations,
        }
    }

    pub fn with_servers(mut self, servers: Vec<ApiServer>) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Load an OpenAPI document from disk and reduce it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = load_raw_spec(path)?;
        reduce_openapi_spec(&raw, ReduceOptions::default())
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn servers(&self) -> &[ApiServer] {
        &self.servers
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// URL of the first declared server, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.servers.first().map(|s| s.url.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// `"<name> <description>"` lines used by the planner prompt.
    pub fn endpoint_descriptions(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| format!("{} {}", op.name, op.description))
            .collect()
    }
}

impl<'a> IntoIterator for &'a OperationCatalog {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_uses_first_server() {
        let catalog = OperationCatalog::new(vec![]).with_servers(vec![
            ApiServer {
                url: "https://api.spotify.com/v1".to_string(),
                description: None,
            },
            ApiServer {
                url: "https://backup.example.com".to_string(),
                description: None,
            },
        ]);
        assert_eq!(catalog.base_url(), Some("https://api.spotify.com/v1"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn endpoint_descriptions_keep_catalog_order() {
        let catalog = OperationCatalog::new(vec![
            Operation::new("GET /me", "Get current user", json!({})),
            Operation::new("POST /playlists", "Create playlist", json!({})),
        ]);
        assert_eq!(
            catalog.endpoint_descriptions(),
            vec!["GET /me Get current user", "POST /playlists Create playlist"]
        );
        assert_eq!(catalog.get("POST /playlists").map(|op| op.description.as_str()), Some("Create playlist"));
    }
}

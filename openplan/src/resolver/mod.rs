//! Endpoint Resolver
//!
//! Turns free text that mentions HTTP operations (`GET /me/playlists`) into
//! the documentation of the matching catalog entries. Resolution is
//! all-or-nothing: one unknown mention fails the whole call.

pub mod mention;
pub mod template;

pub use mention::{extract_mentions, EndpointMention, HttpMethod};
pub use template::{Anchoring, PathTemplate};

use crate::catalog::{Operation, OperationCatalog};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("{0} endpoint does not exist.")]
    UnknownEndpoint(EndpointMention),

    #[error("Catalog entry '{name}' is not a valid template: {reason}")]
    InvalidTemplate { name: String, reason: String },
}

/// Resolver bound to one catalog, with every template compiled up front.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    catalog: Arc<OperationCatalog>,
    templates: Vec<PathTemplate>,
    anchoring: Anchoring,
}

impl EndpointResolver {
    pub fn new(catalog: Arc<OperationCatalog>) -> Result<Self, ResolveError> {
        Self::with_anchoring(catalog, Anchoring::default())
    }

    pub fn with_anchoring(catalog: Arc<OperationCatalog>, anchoring: Anchoring) -> Result<Self, ResolveError> {
        let templates = compile_templates(&catalog, anchoring)?;
        Ok(Self {
            catalog,
            templates,
            anchoring,
        })
    }

    pub fn catalog(&self) -> &Arc<OperationCatalog> {
        &self.catalog
    }

    pub fn anchoring(&self) -> Anchoring {
        self.anchoring
    }

    pub fn extract_mentions(&self, text: &str) -> Vec<EndpointMention> {
        extract_mentions(text)
    }

    /// Documentation for every mention, in mention order.
    pub fn resolve(&self, mentions: &[EndpointMention]) -> Result<String, ResolveError> {
        resolve_with(mentions, self.catalog.operations(), &self.templates)
    }

    /// Extract mentions from `text` and resolve them.
    pub fn api_docs(&self, text: &str) -> Result<String, ResolveError> {
        let mentions = self.extract_mentions(text);
        debug!("Found {} endpoint mentions", mentions.len());
        self.resolve(&mentions)
    }
}

/// One-shot resolution with full-string anchoring.
pub fn resolve(mentions: &[EndpointMention], catalog: &OperationCatalog) -> Result<String, ResolveError> {
    let templates = compile_templates(catalog, Anchoring::Full)?;
    resolve_with(mentions, catalog.operations(), &templates)
}

fn compile_templates(catalog: &OperationCatalog, anchoring: Anchoring) -> Result<Vec<PathTemplate>, ResolveError> {
    catalog
        .iter()
        .map(|op| {
            PathTemplate::compile(&op.name, anchoring).map_err(|e| ResolveError::InvalidTemplate {
                name: op.name.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn resolve_with(
    mentions: &[EndpointMention],
    operations: &[Operation],
    templates: &[PathTemplate],
) -> Result<String, ResolveError> {
    let mut docs = String::new();

    for mention in mentions {
        let key = mention.key();
        let mut found = false;

        for (op, template) in operations.iter().zip(templates) {
            if template.matches(&key) {
                found = true;
                docs.push_str(&format!(
                    "== Docs for {} == \n{}\n",
                    key,
                    render_documentation(&op.documentation)
                ));
            }
        }

        if !found {
            return Err(ResolveError::UnknownEndpoint(mention.clone()));
        }
    }

    Ok(docs)
}

/// YAML rendering of a documentation tree, falling back to JSON.
pub fn render_documentation(documentation: &serde_json::Value) -> String {
    serde_yaml::to_string(documentation).unwrap_or_else(|_| {
        serde_json::to_string_pretty(documentation).unwrap_or_else(|_| documentation.to_string())
    })
}

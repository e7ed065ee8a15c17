//! OpenAPI document loading and reduction.
//!
//! A full OpenAPI document is far too large to hand to an LLM. Reduction keeps
//! the five verbs the tools can call, inlines local `$ref`s, and trims each
//! operation down to its description, required parameters, the happy-path
//! (`200`) response and the request body.

use super::{ApiServer, CatalogError, Operation, OperationCatalog};
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const REDUCED_METHODS: &[&str] = &["get", "post", "patch", "put", "delete"];

/// Reduction switches
#[derive(Debug, Clone)]
pub struct ReduceOptions {
    /// Inline local `$ref` pointers before trimming
    pub dereference: bool,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self { dereference: true }
    }
}

/// Read an OpenAPI document (YAML or JSON) into an ordered JSON tree.
pub fn load_raw_spec(path: impl AsRef<Path>) -> Result<Value, CatalogError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!("Loaded OpenAPI document {} ({} bytes)", path.display(), text.len());
    parse_raw_spec(&text)
}

/// Parse document text. JSON is accepted through the YAML parser.
pub fn parse_raw_spec(text: &str) -> Result<Value, CatalogError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
    yaml_to_json(yaml)
}

/// Build the catalog from a raw document.
pub fn reduce_openapi_spec(raw: &Value, options: ReduceOptions) -> Result<OperationCatalog, CatalogError> {
    let paths = raw
        .get("paths")
        .and_then(Value::as_object)
        .ok_or(CatalogError::MissingPaths)?;

    let mut operations = Vec::new();
    for (route, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (method, docs) in item {
            if !REDUCED_METHODS.contains(&method.as_str()) {
                continue;
            }
            let name = format!("{} {}", method.to_uppercase(), route);
            let description = docs
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let docs = if options.dereference {
                dereference(docs, raw, &mut Vec::new())?
            } else {
                docs.clone()
            };

            operations.push(Operation::new(name, description, reduce_endpoint_docs(&docs)));
        }
    }

    let servers = raw
        .get("servers")
        .and_then(Value::as_array)
        .map(|servers| {
            servers
                .iter()
                .filter_map(|s| {
                    let url = s.get("url")?.as_str()?.to_string();
                    let description = s.get("description").and_then(Value::as_str).map(str::to_string);
                    Some(ApiServer { url, description })
                })
                .collect()
        })
        .unwrap_or_default();

    let description = raw
        .pointer("/info/description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    debug!("Reduced OpenAPI document to {} operations", operations.len());

    Ok(OperationCatalog::new(operations)
        .with_servers(servers)
        .with_description(description))
}

/// Strip an operation down to what the step executor needs.
fn reduce_endpoint_docs(docs: &Value) -> Value {
    let mut out = Map::new();

    if let Some(description) = docs.get("description").filter(|d| is_truthy(d)) {
        out.insert("description".to_string(), description.clone());
    }

    if let Some(parameters) = docs.get("parameters").filter(|p| is_truthy(p)) {
        let required: Vec<Value> = parameters
            .as_array()
            .map(|params| {
                params
                    .iter()
                    .filter(|p| p.get("required").and_then(Value::as_bool).unwrap_or(false))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.insert("parameters".to_string(), Value::Array(required));
    }

    if let Some(ok) = docs.pointer("/responses/200") {
        out.insert("responses".to_string(), ok.clone());
    }

    if let Some(body) = docs.get("requestBody").filter(|b| is_truthy(b)) {
        out.insert("requestBody".to_string(), body.clone());
    }

    Value::Object(out)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Inline local `$ref` pointers. `stack` holds the references currently being
/// expanded; meeting one of them again leaves that `$ref` node as-is.
fn dereference(node: &Value, root: &Value, stack: &mut Vec<String>) -> Result<Value, CatalogError> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                if let Some(pointer) = reference.strip_prefix('#') {
                    if stack.iter().any(|r| r == reference) {
                        return Ok(node.clone());
                    }
                    let target = root
                        .pointer(pointer)
                        .ok_or_else(|| CatalogError::BrokenReference(reference.to_string()))?;
                    stack.push(reference.to_string());
                    let resolved = dereference(target, root, stack);
                    stack.pop();
                    return resolved;
                }
                // Remote references are left for the reader.
                return Ok(node.clone());
            }

            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), dereference(value, root, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| dereference(item, root, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Ok(node.clone()),
    }
}

/// YAML allows non-string keys (`200:` is an integer); JSON does not.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, CatalogError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                out.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, CatalogError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        other => Err(CatalogError::Parse(format!(
            "unsupported mapping key: {:?}",
            other
        ))),
    }
}

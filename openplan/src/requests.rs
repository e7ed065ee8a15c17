//! Thin HTTP client used by the API tools.
//!
//! Every verb returns the response body as text, whatever the status: the
//! LLM parsing step reads API errors the same way it reads payloads.

use crate::auth::AuthHeaders;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RequestsWrapper {
    client: Client,
}

impl RequestsWrapper {
    pub fn new(auth: AuthHeaders, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .default_headers(auth.into_header_map())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, params: Option<&Value>) -> Result<String, reqwest::Error> {
        let mut request = self.client.get(url);
        if let Some(query) = params.and_then(query_pairs) {
            request = request.query(&query);
        }
        self.send(Method::GET, url, request).await
    }

    pub async fn post(&self, url: &str, data: &Value) -> Result<String, reqwest::Error> {
        self.send(Method::POST, url, self.client.post(url).json(data)).await
    }

    pub async fn put(&self, url: &str, data: &Value) -> Result<String, reqwest::Error> {
        self.send(Method::PUT, url, self.client.put(url).json(data)).await
    }

    pub async fn patch(&self, url: &str, data: &Value) -> Result<String, reqwest::Error> {
        self.send(Method::PATCH, url, self.client.patch(url).json(data)).await
    }

    pub async fn delete(&self, url: &str) -> Result<String, reqwest::Error> {
        self.send(Method::DELETE, url, self.client.delete(url)).await
    }

    async fn send(&self, method: Method, url: &str, request: RequestBuilder) -> Result<String, reqwest::Error> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        } else {
            warn!("{} {} -> {}", method, url, status);
        }
        Ok(body)
    }
}

/// Flatten a JSON object into query pairs. Arrays become comma lists,
/// which is what Spotify expects for `ids`-style parameters.
fn query_pairs(params: &Value) -> Option<Vec<(String, String)>> {
    let object = params.as_object()?;
    let pairs = object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), query_value(v)))
        .collect::<Vec<_>>();
    (!pairs.is_empty()).then_some(pairs)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(query_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_pairs_flatten_values() {
        let pairs = query_pairs(&json!({"limit": 5, "ids": ["a", "b"], "market": "TR", "skip": null})).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "5".to_string()),
                ("ids".to_string(), "a,b".to_string()),
                ("market".to_string(), "TR".to_string()),
            ]
        );
        assert!(query_pairs(&json!({})).is_none());
        assert!(query_pairs(&json!("limit=5")).is_none());
    }
}

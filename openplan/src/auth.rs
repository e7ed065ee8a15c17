//! Authorization headers for the target API.
//!
//! Token acquisition is out of scope: the operator supplies a user access
//! token (for Spotify, one minted with the scopes the document declares).
//! This module reads the declared scopes and turns a token into headers.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Security scheme '{0}' declares no authorizationCode scopes")]
    MissingScopes(String),

    #[error("Access token not found in environment variable {0}")]
    MissingToken(String),

    #[error("Access token is not a valid header value")]
    InvalidToken,
}

/// Scopes of `components.securitySchemes.<scheme>.flows.authorizationCode`,
/// in document order.
pub fn oauth_scopes(raw_spec: &Value, scheme: &str) -> Result<Vec<String>, AuthError> {
    let pointer = format!(
        "/components/securitySchemes/{}/flows/authorizationCode/scopes",
        scheme.replace('~', "~0").replace('/', "~1")
    );
    raw_spec
        .pointer(&pointer)
        .and_then(Value::as_object)
        .map(|scopes| scopes.keys().cloned().collect())
        .ok_or_else(|| AuthError::MissingScopes(scheme.to_string()))
}

/// Default headers attached to every API request.
#[derive(Debug, Clone, Default)]
pub struct AuthHeaders {
    headers: HeaderMap,
}

impl AuthHeaders {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: &str) -> Result<Self, AuthError> {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| AuthError::InvalidToken)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(Self { headers })
    }

    /// Read the token from `env_var`.
    pub fn bearer_from_env(env_var: &str) -> Result<Self, AuthError> {
        let token = std::env::var(env_var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::MissingToken(env_var.to_string()))?;
        Self::bearer(&token)
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_header_map(self) -> HeaderMap {
        self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_follow_document_order() {
        let spec = json!({
            "components": {"securitySchemes": {"oauth_2_0": {"flows": {"authorizationCode": {
                "scopes": {
                    "user-read-private": "Read profile",
                    "playlist-modify-public": "Edit playlists",
                    "playlist-read-private": "Read playlists"
                }
            }}}}}
        });
        assert_eq!(
            oauth_scopes(&spec, "oauth_2_0").unwrap(),
            vec!["user-read-private", "playlist-modify-public", "playlist-read-private"]
        );
    }

    #[test]
    fn missing_scheme_is_an_error() {
        let spec = json!({"components": {}});
        assert!(matches!(
            oauth_scopes(&spec, "oauth_2_0"),
            Err(AuthError::MissingScopes(s)) if s == "oauth_2_0"
        ));
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let headers = AuthHeaders::bearer("abc123\n").unwrap();
        let value = headers.header_map().get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc123");
        assert!(value.is_sensitive());
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(matches!(AuthHeaders::bearer("a\u{7}b"), Err(AuthError::InvalidToken)));
    }
}

//! Endpoint mention extraction.
//!
//! Grammar, scanned left to right over the input:
//!
//! ```text
//! mention := METHOD WS+ PATH
//! METHOD  := "GET" | "POST" | "PUT" | "PATCH" | "DELETE"   (not preceded by a word character)
//! WS      := any Unicode whitespace
//! PATH    := "/" NON-WS*                                    (truncated at the first '?')
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported HTTP method '{}'", s))
    }
}

/// A `(method, path)` pair found in free text; the path has no query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointMention {
    pub method: HttpMethod,
    pub path: String,
}

impl EndpointMention {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = match path.find('?') {
            Some(idx) => path[..idx].to_string(),
            None => path,
        };
        Self { method, path }
    }

    /// Candidate key matched against catalog names.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EndpointMention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Try to read a mention starting exactly at byte offset `start`.
/// Returns the mention and the byte offset just past it.
fn mention_at(text: &str, start: usize) -> Option<(EndpointMention, usize)> {
    let rest = &text[start..];
    let method = HttpMethod::ALL
        .into_iter()
        .find(|m| rest.starts_with(m.as_str()))?;

    let after_method = &rest[method.as_str().len()..];
    let path_start = after_method.trim_start();
    let ws_len = after_method.len() - path_start.len();
    if ws_len == 0 || !path_start.starts_with('/') {
        return None;
    }

    let path_len = path_start
        .find(char::is_whitespace)
        .unwrap_or(path_start.len());
    let path = &path_start[..path_len];
    let end = start + method.as_str().len() + ws_len + path_len;

    Some((EndpointMention::new(method, path), end))
}

/// Extract every endpoint mention from `text`, in order of appearance.
/// Duplicates are kept.
pub fn extract_mentions(text: &str) -> Vec<EndpointMention> {
    let mut mentions = Vec::new();
    let mut pos = 0;
    let mut prev: Option<char> = None;

    while let Some(ch) = text[pos..].chars().next() {
        let at_boundary = prev.map_or(true, |p| !is_word_char(p));
        if at_boundary && ch.is_ascii_uppercase() {
            if let Some((mention, end)) = mention_at(text, pos) {
                mentions.push(mention);
                prev = text[..end].chars().next_back();
                pos = end;
                continue;
            }
        }
        prev = Some(ch);
        pos += ch.len_utf8();
    }

    mentions
}

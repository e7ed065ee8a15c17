//! Catalog name templates compiled to matchers.
//!
//! `GET /playlists/{playlist_id}/tracks` becomes
//! `^GET /playlists/\S+/tracks$` (or without the `$` under prefix anchoring).

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a template is anchored against a candidate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchoring {
    /// The template must cover the whole candidate.
    #[default]
    Full,
    /// The template must match a prefix of the candidate. `GET /a` then also
    /// matches `GET /a/b`.
    Prefix,
}

#[derive(Debug, Clone)]
pub struct PathTemplate {
    source: String,
    matcher: Regex,
}

impl PathTemplate {
    pub fn compile(template: &str, anchoring: Anchoring) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');

        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));
            pattern.push_str(r"\S+");
            rest = &rest[open + close + 1..];
        }
        pattern.push_str(&regex::escape(rest));

        if anchoring == Anchoring::Full {
            pattern.push('$');
        }

        Ok(Self {
            source: template.to_string(),
            matcher: Regex::new(&pattern)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.matcher.is_match(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_matches_concrete_segment() {
        let t = PathTemplate::compile("GET /playlists/{playlist_id}/tracks", Anchoring::Full).unwrap();
        assert!(t.matches("GET /playlists/37i9dQZF1/tracks"));
        assert!(!t.matches("GET /playlists//tracks"));
        assert!(!t.matches("POST /playlists/37i9dQZF1/tracks"));
    }

    #[test]
    fn literal_regex_characters_are_escaped() {
        let t = PathTemplate::compile("GET /search.json", Anchoring::Full).unwrap();
        assert!(t.matches("GET /search.json"));
        assert!(!t.matches("GET /searchXjson"));
    }

    #[test]
    fn unclosed_brace_is_literal() {
        let t = PathTemplate::compile("GET /odd/{name", Anchoring::Full).unwrap();
        assert!(t.matches("GET /odd/{name"));
        assert!(!t.matches("GET /odd/x"));
    }

    #[test]
    fn prefix_anchoring_accepts_longer_candidates() {
        let full = PathTemplate::compile("GET /me", Anchoring::Full).unwrap();
        let prefix = PathTemplate::compile("GET /me", Anchoring::Prefix).unwrap();
        assert!(!full.matches("GET /me/playlists"));
        assert!(prefix.matches("GET /me/playlists"));
        assert_eq!(prefix.source(), "GET /me");
    }
}

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));

/// One step from a container to one of its entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathToken {
    Index(usize),
    Key(String),
}

impl From<&str> for PathToken {
    fn from(key: &str) -> Self {
        PathToken::Key(key.to_string())
    }
}

impl From<usize> for PathToken {
    fn from(index: usize) -> Self {
        PathToken::Index(index)
    }
}

/// Canonical address of a node: the keys and indices walked from the root.
///
/// Encoded form is a JSON array (`["foo",3,"odd key"]`), which keeps keys containing
/// `.`, `[`, `]` or `/` unambiguous and preserves the key/index distinction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPath(Vec<PathToken>);

impl JsonPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_tokens(tokens: Vec<PathToken>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, token: impl Into<PathToken>) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len() + 1);
        tokens.extend(self.0.iter().cloned());
        tokens.push(token.into());
        Self(tokens)
    }

    pub fn last(&self) -> Option<&PathToken> {
        self.0.last()
    }

    pub fn encode(&self) -> String {
        encode_path_tokens(&self.0)
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        decode_path_tokens(encoded).map(Self)
    }

    pub fn display(&self) -> String {
        format_path_display(&self.0)
    }

    /// JSON Pointer form, accepted by `serde_json::Value::pointer`.
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for token in &self.0 {
            out.push('/');
            match token {
                PathToken::Key(k) => out.push_str(&escape_pointer_token(k)),
                PathToken::Index(i) => out.push_str(&i.to_string()),
            }
        }
        out
    }

    /// Walk `root` token by token. Any missing or mistyped step yields `None`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(root, |node, token| match (node, token) {
            (Value::Object(map), PathToken::Key(k)) => map.get(k),
            (Value::Array(items), PathToken::Index(i)) => items.get(*i),
            _ => None,
        })
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

pub fn encode_path_tokens(tokens: &[PathToken]) -> String {
    // A slice of strings and integers always serializes.
    serde_json::to_string(tokens).unwrap_or_else(|_| String::from("[]"))
}

pub fn decode_path_tokens(encoded: &str) -> Result<Vec<PathToken>> {
    serde_json::from_str(encoded).map_err(|e| Error::InvalidPath(format!("{encoded}: {e}")))
}

/// Human-readable path: `root.foo[3]["odd key"]`.
pub fn format_path_display(tokens: &[PathToken]) -> String {
    let mut out = String::from("root");
    for token in tokens {
        match token {
            PathToken::Key(k) if is_identifier(k) => {
                out.push('.');
                out.push_str(k);
            }
            PathToken::Key(k) => {
                out.push('[');
                out.push_str(&quote(k));
                out.push(']');
            }
            PathToken::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

pub fn is_identifier(key: &str) -> bool {
    IDENTIFIER.is_match(key)
}

fn quote(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""))
}

// JSON Pointer token escape (~0, ~1)
pub fn escape_pointer_token(raw: &str) -> String {
    raw.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;

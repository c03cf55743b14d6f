use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

// Shortest bracket-delimited spans; nesting is not tracked.
static FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}|\[.*?\]").expect("fragment pattern"));

/// Text the page currently shows, by source element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    /// Text of the first `<pre>` element.
    pub pre: Option<String>,
    /// Text of the first `<code>` element.
    pub code: Option<String>,
    /// Full visible text of the document.
    pub body: Option<String>,
}

impl PageContent {
    /// A raw response view: the browser wraps the body in a single `<pre>`.
    pub fn raw(url: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            url: url.into(),
            pre: Some(body.clone()),
            code: None,
            body: Some(body),
        }
    }

    /// First non-blank candidate in priority order: pre, code, visible text.
    pub fn candidate_text(&self) -> Option<&str> {
        [&self.pre, &self.code, &self.body]
            .into_iter()
            .filter_map(|c| c.as_deref())
            .map(str::trim)
            .find(|c| !c.is_empty())
    }
}

/// Live access to the page a renderer is attached to.
pub trait PageSource: Send + Sync {
    fn content(&self) -> PageContent;
}

impl PageSource for PageContent {
    fn content(&self) -> PageContent {
        self.clone()
    }
}

/// A page whose content can change underneath the renderer (single-page apps).
impl PageSource for Arc<RwLock<PageContent>> {
    fn content(&self) -> PageContent {
        self.read().clone()
    }
}

/// Which strategy produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Direct,
    Trimmed,
    Fragment,
}

/// Find the page's JSON document, or `None` when the page is not JSON.
///
/// Oversized candidates are skipped without parsing.
pub fn detect_json(page: &PageContent, max_bytes: usize) -> Option<(Value, Recovery)> {
    let Some(text) = page.candidate_text() else {
        trace!("page has no text");
        return None;
    };
    if text.len() > max_bytes {
        debug!(len = text.len(), max_bytes, "page content over size cap, skipping");
        return None;
    }
    parse_document(text)
}

/// Try each recovery strategy in turn; only a container counts as a document.
pub fn parse_document(text: &str) -> Option<(Value, Recovery)> {
    if let Some(v) = parse_container(text) {
        return Some((v, Recovery::Direct));
    }

    if let Some(trimmed) = trim_to_brackets(text) {
        if let Some(v) = parse_container(trimmed) {
            debug!("parsed after trimming surrounding text");
            return Some((v, Recovery::Trimmed));
        }
    }

    let mut fragments: Vec<&str> = FRAGMENT.find_iter(text).map(|m| m.as_str()).collect();
    // the main payload is assumed to be the largest bracketed span
    fragments.sort_by(|a, b| b.len().cmp(&a.len()));
    trace!(candidates = fragments.len(), "scanning bracketed fragments");
    for fragment in fragments {
        if let Some(v) = parse_container(fragment) {
            debug!(len = fragment.len(), "parsed embedded fragment");
            return Some((v, Recovery::Fragment));
        }
    }

    None
}

/// Slice from the first `{`/`[` through the last matching closer.
pub fn trim_to_brackets(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn parse_container(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        Ok(_) => {
            trace!("top-level scalar is not a page document");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;

//! Metadata-only guesses about whether a response or tab holds JSON.
//!
//! Bodies are not visible here, so false positives are expected; the renderer's
//! real parse attempt has the final word.

use serde::{Deserialize, Serialize};

const JSON_URL_MARKERS: [&str; 4] = [".json", "/json", "/api/", "format=json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// One observed network response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    pub url: String,
    #[serde(default)]
    pub response_headers: Vec<Header>,
    pub tab_id: i64,
}

impl ResponseInfo {
    /// Value of the first `Content-Type` header, matched case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.as_str())
    }
}

/// A tab finished (or changed) navigating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    pub tab_id: i64,
    pub url: String,
    pub status: String,
}

impl TabUpdate {
    pub fn is_complete(&self) -> bool {
        self.status == "complete"
    }
}

pub fn is_likely_json_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    JSON_URL_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn is_likely_json_content_type(content_type: &str, url: &str) -> bool {
    let ct = content_type.to_lowercase();
    ct.contains("json")
        || ct.contains("application/javascript")
        || ct.contains("text/javascript")
        // misconfigured APIs serving JSON as plain text
        || (ct.contains("text/plain") && is_likely_json_url(url))
}

/// Header check first, URL pattern as the fallback.
pub fn is_likely_json_response(response: &ResponseInfo) -> bool {
    if let Some(ct) = response.content_type() {
        if is_likely_json_content_type(ct, &response.url) {
            return true;
        }
    }
    is_likely_json_url(&response.url)
}

#[cfg(test)]
#[path = "heuristic_tests.rs"]
mod tests;

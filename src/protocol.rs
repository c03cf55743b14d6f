use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;

/// Messages a renderer answers, from the observer or the popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "checkForJSON", rename_all = "camelCase")]
    CheckForJson {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default)]
        force: bool,
    },
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "getJsonData")]
    GetJsonData,
    /// Raw settings record; the renderer normalizes it.
    #[serde(rename = "applySettings")]
    ApplySettings { settings: Value },
    #[serde(rename = "getSettings")]
    GetSettings,
    #[serde(rename = "checkStatus")]
    CheckStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Processed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_formatted: bool,
    pub has_toolbar: bool,
    pub has_json_container: bool,
    #[serde(rename = "hasJSON")]
    pub has_json: bool,
}

/// Untagged on the wire; variants are tried in order, so `Data` (whose only
/// field may be absent) must stay last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status { status: Status },
    Settings { settings: Settings },
    Report(StatusReport),
    Data { data: Option<Value> },
}

impl Response {
    pub fn status(status: Status) -> Self {
        Response::Status { status }
    }

    pub fn as_status(&self) -> Option<Status> {
        match self {
            Response::Status { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

use std::path::PathBuf;

/// json-handle error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("io error: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON could not be serialized or deserialized
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// System clipboard unavailable or rejected the write
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// An encoded path-token sequence could not be decoded
    #[error("invalid path encoding: {0}")]
    InvalidPath(String),

    /// An action needs a parsed document but none is loaded
    #[error("no document loaded")]
    NoDocument,

    /// A request could not be delivered to a renderer
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Result type using json-handle Error
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message did not reach a page's renderer.
///
/// These are expected outcomes (the page may not host a renderer yet), so callers
/// log them and move on instead of bubbling them up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// No renderer is registered for the tab, or its inbox is closed.
    #[error("no receiving renderer for tab {0}")]
    NoReceiver(i64),

    /// The renderer accepted the message but did not answer in time.
    #[error("renderer for tab {0} did not answer in time")]
    Timeout(i64),

    /// The renderer dropped the request without answering.
    #[error("renderer for tab {0} dropped the request")]
    Dropped(i64),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

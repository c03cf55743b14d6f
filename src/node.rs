use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::path::JsonPath;
use crate::tree::truncate;
use crate::types::{Inspection, Stats, ValueKind};

/// Destination for copy actions.
pub trait Clipboard: Send {
    fn set_text(&mut self, text: String) -> Result<()>;
}

/// The OS clipboard. A fresh handle is opened per write.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        let mut cb = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
        cb.set_text(text).map_err(|e| Error::Clipboard(e.to_string()))
    }
}

/// Keeps the last copied text; can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
    pub unavailable: bool,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) -> Result<()> {
        if self.unavailable {
            return Err(Error::Clipboard("clipboard unavailable".into()));
        }
        self.contents = Some(text);
        Ok(())
    }
}

/// A clipboard the caller keeps a handle to.
impl<C: Clipboard> Clipboard for Arc<Mutex<C>> {
    fn set_text(&mut self, text: String) -> Result<()> {
        self.lock().set_text(text)
    }
}

/// Type, size and preview of the node at `path`.
///
/// A path that no longer resolves (stale after a rebuild, or simply wrong)
/// yields `value_type == "undefined"` rather than an error.
pub fn inspect(root: &Value, path: &JsonPath, preview_len: usize) -> Inspection {
    let display_path = path.display();
    let pointer = path.pointer();
    let Some(value) = path.resolve(root) else {
        return Inspection {
            display_path,
            pointer,
            value_type: "undefined".into(),
            size: None,
            preview: "undefined".into(),
        };
    };

    let (size, preview) = match value {
        Value::Object(m) => (
            Some(m.len()),
            if m.is_empty() {
                format!("{{}} {} keys", m.len())
            } else {
                format!("{{…}} {} keys", m.len())
            },
        ),
        Value::Array(a) => (
            Some(a.len()),
            if a.is_empty() {
                format!("[] {} items", a.len())
            } else {
                format!("[…] {} items", a.len())
            },
        ),
        Value::String(s) => (Some(s.chars().count()), truncate(s, preview_len)),
        Value::Number(n) => (None, n.to_string()),
        Value::Bool(b) => (None, b.to_string()),
        Value::Null => (None, "null".into()),
    };

    Inspection {
        display_path,
        pointer,
        value_type: ValueKind::of(value).as_str().into(),
        size,
        preview,
    }
}

/// Pretty-printed JSON of the node at `path`.
pub fn node_value_text(root: &Value, path: &JsonPath) -> Result<String> {
    let value = path
        .resolve(root)
        .ok_or_else(|| Error::InvalidPath(path.display()))?;
    Ok(serde_json::to_string_pretty(value)?)
}

// Copy the full JSON value of a node (or the root for an empty path) to the clipboard.
pub fn copy_node_value(root: &Value, path: &JsonPath, clipboard: &mut dyn Clipboard) -> Result<()> {
    let serialized = node_value_text(root, path)?;
    debug!(path = %path, bytes = serialized.len(), "copying node value");
    clipboard.set_text(serialized)
}

pub fn copy_path(path: &JsonPath, clipboard: &mut dyn Clipboard) -> Result<()> {
    clipboard.set_text(path.display())
}

/// Write the document to `dir/data-<millis>.json` and return the file path.
pub fn download_document(root: &Value, dir: &Path, now_millis: u128) -> Result<PathBuf> {
    let path = dir.join(format!("data-{now_millis}.json"));
    let serialized = serde_json::to_string_pretty(root)?;
    if let Err(source) = std::fs::write(&path, serialized) {
        warn!("download failed: {}: {}", path.display(), source);
        // nothing partial may stay behind
        let _ = std::fs::remove_file(&path);
        return Err(Error::Io { path, source });
    }
    Ok(path)
}

pub fn stats(root: &Value) -> Stats {
    let bytes = serde_json::to_vec(root).map(|v| v.len()).unwrap_or(0);
    Stats {
        size: format_size(bytes),
        complexity: format!("{} elements", format_count(count_nodes(root))),
    }
}

pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Containers count themselves plus their descendants; scalars count one.
pub fn count_nodes(value: &Value) -> usize {
    match value {
        Value::Object(m) => 1 + m.values().map(count_nodes).sum::<usize>(),
        Value::Array(a) => 1 + a.iter().map(count_nodes).sum::<usize>(),
        _ => 1,
    }
}

fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;

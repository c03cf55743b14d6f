use serde::Serialize;
use serde_json::Value;

use crate::path::JsonPath;

/// Index of a row inside the current `TreeView`.
pub type RowId = usize;
/// Index of a collapsible block inside the current `TreeView`.
pub type BlockId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl ValueKind {
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Object,
    Array,
}

impl ContainerKind {
    pub fn open(self) -> &'static str {
        match self {
            ContainerKind::Object => "{",
            ContainerKind::Array => "[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            ContainerKind::Object => "}",
            ContainerKind::Array => "]",
        }
    }

    pub fn empty(self) -> &'static str {
        match self {
            ContainerKind::Object => "{}",
            ContainerKind::Array => "[]",
        }
    }
}

/// What a row shows after its key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RowValue {
    /// String, number, boolean or null, already in display form.
    Scalar { kind: ValueKind, text: String },
    /// `{}` or `[]`; not collapsible.
    Empty { kind: ContainerKind },
    /// Opening bracket of a non-empty container whose entries live in `block`.
    Container { kind: ContainerKind, block: BlockId },
}

/// One visual line of the tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    /// Block whose entries include this row; `None` only for a lone scalar root.
    pub block: Option<BlockId>,
    pub depth: usize,
    /// Object key, `None` for array entries.
    pub key: Option<String>,
    pub value: RowValue,
    #[serde(skip)]
    pub path: JsonPath,
    pub encoded_path: String,
    pub display_path: String,
    pub trailing_comma: bool,
    /// Key and value as displayed, used as the search surface.
    pub text: String,
}

/// A non-empty container: bracket pair plus its entry rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    pub parent: Option<BlockId>,
    /// Row that opens this block; `None` for the document root.
    pub owner: Option<RowId>,
    pub kind: ContainerKind,
    pub len: usize,
    pub depth: usize,
    pub collapsed: bool,
    /// Entry rows in document order.
    pub entries: Vec<RowId>,
    #[serde(skip)]
    pub path: JsonPath,
}

/// Type, size and preview of a node looked up by path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub display_path: String,
    pub pointer: String,
    pub value_type: String,       // ValueKind::as_str() or "undefined"
    pub size: Option<usize>,      // entries for containers, chars for strings
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub size: String,
    pub complexity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient user-visible notice raised by toolbar actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Error, message: message.into() }
    }
}

//! Render events emitted by the tree builder and the sinks that materialize them.
//!
//! The builder never touches a UI toolkit. It appends rows and blocks to a
//! [`TreeView`](crate::tree::TreeView) and tells a [`RenderSink`] what changed; a sink
//! may build DOM nodes, widgets, or plain text from those events.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Theme;
use crate::tree::TreeView;
use crate::types::{BlockId, ContainerKind, RowId, RowValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// All previous rows and blocks are gone.
    Cleared,
    BlockOpened(BlockId),
    RowCreated(RowId),
    BlockClosed(BlockId),
    Toggled { block: BlockId, collapsed: bool },
    MatchMarked { row: RowId, active: bool },
    MatchesCleared,
    /// Scroll the row into view; its ancestors are already expanded.
    Revealed(RowId),
    Selected(RowId),
    ThemeChanged(Theme),
}

pub trait RenderSink: Send {
    fn emit(&mut self, view: &TreeView, event: &RenderEvent);
}

/// Records every event, mostly for tests and replay.
impl RenderSink for Vec<RenderEvent> {
    fn emit(&mut self, _view: &TreeView, event: &RenderEvent) {
        self.push(event.clone());
    }
}

/// Shared sink, so the owner can read it back while a renderer holds it.
impl<S: RenderSink> RenderSink for Arc<Mutex<S>> {
    fn emit(&mut self, view: &TreeView, event: &RenderEvent) {
        self.lock().emit(view, event);
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn emit(&mut self, _view: &TreeView, _event: &RenderEvent) {}
}

/// Indented plain-text snapshot; collapsed blocks print as a one-line summary.
#[derive(Debug, Default)]
pub struct TextSink {
    output: String,
}

impl TextSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn snapshot(view: &TreeView) -> String {
        let mut out = String::new();
        if let Some(root) = view.root_block() {
            write_block(view, root, 0, &mut out);
            out.push('\n');
        } else if let Some(row) = view.rows().first() {
            out.push_str(&row.text);
            out.push('\n');
        }
        out
    }
}

impl RenderSink for TextSink {
    fn emit(&mut self, view: &TreeView, event: &RenderEvent) {
        let refresh = match event {
            RenderEvent::Cleared => {
                self.output.clear();
                false
            }
            RenderEvent::BlockClosed(id) => view.block(*id).is_some_and(|b| b.parent.is_none()),
            // a lone scalar or empty root never closes a block
            RenderEvent::RowCreated(_) => view.root_block().is_none(),
            RenderEvent::Toggled { .. } => true,
            _ => false,
        };
        if refresh {
            self.output = Self::snapshot(view);
        }
    }
}

fn write_block(view: &TreeView, id: BlockId, indent: usize, out: &mut String) {
    let Some(block) = view.block(id) else { return };
    if block.collapsed {
        let unit = match block.kind {
            ContainerKind::Object => "keys",
            ContainerKind::Array => "items",
        };
        let _ = write!(out, "{}…{} {} {}", block.kind.open(), block.kind.close(), block.len, unit);
        return;
    }
    out.push_str(block.kind.open());
    out.push('\n');
    for row in view.rows_in(id) {
        out.push_str(&"  ".repeat(indent + 1));
        match &row.value {
            RowValue::Container { block: child, .. } => {
                if let Some(key) = &row.key {
                    let _ = write!(out, "{}: ", quote_key(key));
                }
                write_block(view, *child, indent + 1, out);
            }
            _ => out.push_str(&row.text),
        }
        if row.trailing_comma {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&"  ".repeat(indent));
    out.push_str(block.kind.close());
}

/// Builds escaped markup as rows arrive. Every key and value goes through
/// [`escape_html`], so string values can never inject elements or scripts.
#[derive(Debug, Default)]
pub struct HtmlSink {
    html: String,
}

impl HtmlSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.html
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

impl RenderSink for HtmlSink {
    fn emit(&mut self, view: &TreeView, event: &RenderEvent) {
        match event {
            RenderEvent::Cleared => self.html.clear(),
            RenderEvent::BlockOpened(id) => {
                let Some(block) = view.block(*id) else { return };
                let state = if block.collapsed { " collapsed" } else { "" };
                let _ = write!(
                    self.html,
                    r#"<div class="json-collapsible" data-block="{}"><div class="collapsible"><span class="expand-icon{}"></span><span>{}</span></div><div class="collapsible-content{}">"#,
                    block.id,
                    state,
                    block.kind.open(),
                    state
                );
            }
            RenderEvent::RowCreated(id) => {
                let Some(row) = view.row(*id) else { return };
                let _ = write!(
                    self.html,
                    r#"<div class="json-row" data-path="{}" data-display-path="{}">"#,
                    escape_html(&row.encoded_path),
                    escape_html(&row.display_path)
                );
                if let Some(key) = &row.key {
                    let _ = write!(
                        self.html,
                        r#"<span class="json-key">{}</span>: "#,
                        escape_html(&quote_key(key))
                    );
                }
                match &row.value {
                    RowValue::Scalar { kind, text } => {
                        let _ = write!(
                            self.html,
                            r#"<span class="json-{}">{}</span>"#,
                            kind.as_str(),
                            escape_html(text)
                        );
                    }
                    RowValue::Empty { kind } => {
                        let _ = write!(self.html, "<span>{}</span>", kind.empty());
                    }
                    // Row stays open until its block closes.
                    RowValue::Container { .. } => return,
                }
                if row.trailing_comma {
                    self.html.push(',');
                }
                self.html.push_str("</div>");
            }
            RenderEvent::BlockClosed(id) => {
                let Some(block) = view.block(*id) else { return };
                let _ = write!(self.html, "</div><div class=\"close\">{}</div></div>", block.kind.close());
                if let Some(owner) = block.owner.and_then(|r| view.row(r)) {
                    if owner.trailing_comma {
                        self.html.push(',');
                    }
                    self.html.push_str("</div>");
                }
            }
            _ => {}
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn quote_key(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""))
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;

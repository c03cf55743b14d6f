use serde_json::Value;
use tracing::debug;

use crate::path::{JsonPath, PathToken};
use crate::render::{quote_key, RenderEvent, RenderSink};
use crate::types::{Block, BlockId, ContainerKind, Row, RowId, RowValue, ValueKind};

pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s.to_string(),
    }
}

/// Display form of a scalar: strings quoted and escaped, everything else literal.
pub fn display_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\"")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".into(),
        Value::Object(_) | Value::Array(_) => String::new(),
    }
}

/// Materialized rows and collapsible blocks for one parsed document.
///
/// Rows and blocks are addressed by index; both are only meaningful for the
/// `generation` they were built in. A rebuild produces a new view with a new
/// generation, so ids held from an older view must be discarded.
#[derive(Debug, Default)]
pub struct TreeView {
    generation: u64,
    rows: Vec<Row>,
    blocks: Vec<Block>,
    root: Option<BlockId>,
}

impl TreeView {
    pub fn empty(generation: u64) -> Self {
        Self { generation, ..Self::default() }
    }

    /// Build the view for `value`, emitting events to `sink` in document order.
    pub fn build(
        value: &Value,
        collapse_threshold: usize,
        generation: u64,
        sink: &mut dyn RenderSink,
    ) -> Self {
        let mut builder = Builder {
            view: TreeView::empty(generation),
            threshold: collapse_threshold,
            sink,
        };
        builder.render(value, JsonPath::root());
        let view = builder.view;
        debug!(
            rows = view.rows.len(),
            blocks = view.blocks.len(),
            generation,
            "tree built"
        );
        view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn root_block(&self) -> Option<BlockId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Entry rows of a block, in document order.
    pub fn rows_in(&self, block: BlockId) -> impl Iterator<Item = &Row> {
        self.blocks
            .get(block)
            .map(|b| b.entries.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.rows.get(*id))
    }

    /// Rows directly inside the root container.
    pub fn top_level_rows(&self) -> Vec<&Row> {
        match self.root {
            Some(root) => self.rows_in(root).collect(),
            None => self.rows.iter().collect(),
        }
    }

    pub fn find_by_path(&self, path: &JsonPath) -> Option<RowId> {
        self.rows.iter().find(|r| &r.path == path).map(|r| r.id)
    }

    pub fn find_by_encoded_path(&self, encoded: &str) -> Option<RowId> {
        self.rows.iter().find(|r| r.encoded_path == encoded).map(|r| r.id)
    }

    /// Blocks enclosing `row`, innermost first.
    pub fn ancestors(&self, row: RowId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut next = self.rows.get(row).and_then(|r| r.block);
        while let Some(id) = next {
            chain.push(id);
            next = self.blocks.get(id).and_then(|b| b.parent);
        }
        chain
    }

    /// A row is visible when none of its enclosing blocks is collapsed.
    pub fn is_visible(&self, row: RowId) -> bool {
        self.rows.get(row).is_some()
            && self
                .ancestors(row)
                .iter()
                .all(|b| self.blocks.get(*b).is_some_and(|b| !b.collapsed))
    }

    pub fn set_collapsed(&mut self, block: BlockId, collapsed: bool, sink: &mut dyn RenderSink) -> bool {
        let Some(b) = self.blocks.get_mut(block) else { return false };
        if b.collapsed == collapsed {
            return false;
        }
        b.collapsed = collapsed;
        sink.emit(self, &RenderEvent::Toggled { block, collapsed });
        true
    }

    /// Flip a block; returns the new collapsed state.
    pub fn toggle(&mut self, block: BlockId, sink: &mut dyn RenderSink) -> Option<bool> {
        let collapsed = !self.blocks.get(block)?.collapsed;
        self.set_collapsed(block, collapsed, sink);
        Some(collapsed)
    }

    pub fn expand_all(&mut self, sink: &mut dyn RenderSink) {
        for id in 0..self.blocks.len() {
            self.set_collapsed(id, false, sink);
        }
    }

    pub fn collapse_all(&mut self, sink: &mut dyn RenderSink) {
        for id in 0..self.blocks.len() {
            self.set_collapsed(id, true, sink);
        }
    }

    /// Expand every enclosing block of `row`, then ask the sink to scroll to it.
    pub fn reveal(&mut self, row: RowId, sink: &mut dyn RenderSink) -> bool {
        if row >= self.rows.len() {
            return false;
        }
        for block in self.ancestors(row) {
            self.set_collapsed(block, false, sink);
        }
        sink.emit(self, &RenderEvent::Revealed(row));
        true
    }
}

struct Builder<'s> {
    view: TreeView,
    threshold: usize,
    sink: &'s mut dyn RenderSink,
}

impl Builder<'_> {
    fn render(&mut self, value: &Value, path: JsonPath) {
        match container_kind(value) {
            Some(kind) if entry_count(value) > 0 => {
                let id = self.open_block(kind, value, path, None, None, 0);
                self.view.root = Some(id);
                self.fill_block(id, value);
            }
            _ => {
                self.push_row(None, 0, None, value, path, false);
            }
        }
    }

    fn open_block(
        &mut self,
        kind: ContainerKind,
        value: &Value,
        path: JsonPath,
        parent: Option<BlockId>,
        owner: Option<RowId>,
        depth: usize,
    ) -> BlockId {
        let len = entry_count(value);
        let id = self.view.blocks.len();
        self.view.blocks.push(Block {
            id,
            parent,
            owner,
            kind,
            len,
            depth,
            collapsed: len > self.threshold,
            entries: Vec::with_capacity(len),
            path,
        });
        self.sink.emit(&self.view, &RenderEvent::BlockOpened(id));
        id
    }

    fn fill_block(&mut self, block: BlockId, value: &Value) {
        let (depth, path) = match self.view.blocks.get(block) {
            Some(b) => (b.depth + 1, b.path.clone()),
            None => return,
        };
        match value {
            Value::Object(map) => {
                let last = map.len().saturating_sub(1);
                for (i, (key, child)) in map.iter().enumerate() {
                    let child_path = path.child(PathToken::Key(key.clone()));
                    self.push_row(Some(block), depth, Some(key), child, child_path, i < last);
                }
            }
            Value::Array(items) => {
                let last = items.len().saturating_sub(1);
                for (i, child) in items.iter().enumerate() {
                    let child_path = path.child(PathToken::Index(i));
                    self.push_row(Some(block), depth, None, child, child_path, i < last);
                }
            }
            _ => {}
        }
        self.sink.emit(&self.view, &RenderEvent::BlockClosed(block));
    }

    fn push_row(
        &mut self,
        block: Option<BlockId>,
        depth: usize,
        key: Option<&str>,
        value: &Value,
        path: JsonPath,
        trailing_comma: bool,
    ) {
        let id = self.view.rows.len();
        let nested = match container_kind(value) {
            Some(kind) if entry_count(value) > 0 => Some(kind),
            _ => None,
        };
        let row_value = match (container_kind(value), nested) {
            // the nested block is pushed right after this row
            (_, Some(kind)) => RowValue::Container { kind, block: self.view.blocks.len() },
            (Some(kind), None) => RowValue::Empty { kind },
            (None, _) => RowValue::Scalar { kind: ValueKind::of(value), text: display_scalar(value) },
        };

        let mut text = String::new();
        if let Some(k) = key {
            text.push_str(&quote_key(k));
            text.push_str(": ");
        }
        match &row_value {
            RowValue::Scalar { text: t, .. } => text.push_str(t),
            RowValue::Empty { kind } => text.push_str(kind.empty()),
            RowValue::Container { kind, .. } => text.push_str(kind.open()),
        }

        self.view.rows.push(Row {
            id,
            block,
            depth,
            key: key.map(str::to_string),
            value: row_value,
            encoded_path: path.encode(),
            display_path: path.display(),
            path: path.clone(),
            trailing_comma,
            text,
        });
        if let Some(b) = block.and_then(|b| self.view.blocks.get_mut(b)) {
            b.entries.push(id);
        }
        self.sink.emit(&self.view, &RenderEvent::RowCreated(id));

        if let Some(kind) = nested {
            let child = self.open_block(kind, value, path, block, Some(id), depth);
            self.fill_block(child, value);
        }
    }
}

fn container_kind(v: &Value) -> Option<ContainerKind> {
    match v {
        Value::Object(_) => Some(ContainerKind::Object),
        Value::Array(_) => Some(ContainerKind::Array),
        _ => None,
    }
}

fn entry_count(v: &Value) -> usize {
    match v {
        Value::Object(m) => m.len(),
        Value::Array(a) => a.len(),
        _ => 0,
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;

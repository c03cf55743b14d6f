//! The per-page side: finds the page's JSON, owns the tree view, and runs the
//! search, inspector and toolbar actions against it.

use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Settings, ViewerConfig};
use crate::detect::{detect_json, PageSource, Recovery};
use crate::error::{Error, Result};
use crate::node::{self, Clipboard, SystemClipboard};
use crate::path::JsonPath;
use crate::protocol::{Request, Response, Status, StatusReport};
use crate::render::{RenderEvent, RenderSink};
use crate::search::{DebouncedQuery, Direction, SearchEngine};
use crate::tree::TreeView;
use crate::types::{BlockId, Inspection, RowId, Stats, Toast};

/// The persistent line under the toolbar showing where the selection is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBar {
    pub path: String,
    pub info: String,
}

impl Default for PathBar {
    fn default() -> Self {
        Self { path: "root".into(), info: String::new() }
    }
}

/// Keyboard shortcuts the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    OpenSearch,
    CloseSearch,
    CopySelection,
    NextMatch,
    PrevMatch,
}

impl Shortcut {
    /// `modifier` is Ctrl, or Cmd on macOS.
    pub fn from_key(key: &str, modifier: bool, shift: bool) -> Option<Self> {
        match key {
            "k" | "K" if modifier => Some(Shortcut::OpenSearch),
            "c" | "C" if modifier => Some(Shortcut::CopySelection),
            "Escape" => Some(Shortcut::CloseSearch),
            "Enter" if shift => Some(Shortcut::PrevMatch),
            "Enter" => Some(Shortcut::NextMatch),
            _ => None,
        }
    }
}

pub struct Renderer {
    settings: Settings,
    viewer: ViewerConfig,
    page: Box<dyn PageSource>,
    sink: Box<dyn RenderSink>,
    clipboard: Box<dyn Clipboard>,
    download_dir: PathBuf,

    enabled: bool,
    processed: bool,
    location: String,

    doc: Option<Arc<Value>>,
    recovery: Option<Recovery>,
    view: TreeView,
    generation: u64,

    search: SearchEngine,
    pending: DebouncedQuery,
    search_visible: bool,

    selected: Option<RowId>,
    path_bar: PathBar,
    toasts: Vec<Toast>,
}

impl Renderer {
    pub fn new(page: impl PageSource + 'static, sink: impl RenderSink + 'static) -> Self {
        let viewer = ViewerConfig::default();
        let location = page.content().url;
        Self {
            settings: Settings::default(),
            search: SearchEngine::new(viewer.max_search_results),
            pending: DebouncedQuery::new(viewer.search_debounce),
            viewer,
            page: Box::new(page),
            sink: Box::new(sink),
            clipboard: Box::new(SystemClipboard),
            download_dir: dirs::download_dir().unwrap_or_else(std::env::temp_dir),
            enabled: true,
            processed: false,
            location,
            doc: None,
            recovery: None,
            view: TreeView::empty(0),
            generation: 0,
            search_visible: false,
            selected: None,
            path_bar: PathBar::default(),
            toasts: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_viewer_config(mut self, viewer: ViewerConfig) -> Self {
        self.search = SearchEngine::new(viewer.max_search_results);
        self.pending = DebouncedQuery::new(viewer.search_debounce);
        self.viewer = viewer;
        self
    }

    pub fn with_clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    // ---- document lifecycle ----

    /// Look for JSON in the page and render it.
    ///
    /// Once a document is rendered, further checks are skipped unless `force`.
    pub fn check_for_json(&mut self, force: bool) -> Status {
        if !self.enabled {
            debug!("viewer disabled, skipping check");
            return Status::Skipped;
        }
        if self.processed && !force {
            debug!("page already processed");
            return Status::Skipped;
        }

        let page = self.page.content();
        self.location = page.url.clone();
        match detect_json(&page, self.settings.max_json_size_bytes()) {
            Some((value, recovery)) => {
                info!(url = %page.url, ?recovery, "JSON detected");
                self.recovery = Some(recovery);
                self.load_document(value);
                Status::Processed
            }
            None => {
                debug!(url = %page.url, "page is not JSON");
                Status::Skipped
            }
        }
    }

    /// Replace the current document wholesale and render it.
    pub fn load_document(&mut self, value: Value) {
        self.doc = Some(Arc::new(value));
        self.processed = true;
        self.rebuild();
    }

    /// Rebuild the tree from the parsed document with the current settings.
    ///
    /// Search and selection refer to rows of the old build and are dropped first.
    pub fn rebuild(&mut self) {
        let Some(doc) = self.doc.clone() else { return };
        self.generation += 1;
        self.reset_view_state();
        self.sink.emit(&self.view, &RenderEvent::Cleared);
        self.view = TreeView::build(
            &doc,
            self.settings.collapse_threshold,
            self.generation,
            self.sink.as_mut(),
        );
    }

    /// Drop the document and everything rendered from it.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.reset_view_state();
        self.doc = None;
        self.recovery = None;
        self.processed = false;
        self.view = TreeView::empty(self.generation);
        self.sink.emit(&self.view, &RenderEvent::Cleared);
    }

    fn reset_view_state(&mut self) {
        self.search.reset();
        self.pending.cancel();
        self.selected = None;
        self.path_bar = PathBar::default();
    }

    /// The page navigated without a reload. Returns whether the location changed;
    /// if so the old view is gone and the page must be checked again.
    pub fn on_location_change(&mut self, url: &str) -> bool {
        if url == self.location {
            return false;
        }
        info!(from = %self.location, to = url, "location changed, tearing down");
        self.location = url.to_string();
        self.teardown();
        true
    }

    /// Host toggle. While disabled, checks are skipped; a rendered view stays.
    pub fn show(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "viewer toggled");
        }
        self.enabled = enabled;
    }

    /// Normalize and apply a raw settings record.
    pub fn apply_settings(&mut self, raw: &Value) {
        let settings = Settings::normalize(raw);
        let old = mem::replace(&mut self.settings, settings);
        debug!(settings = ?self.settings, "settings applied");

        if old.theme != self.settings.theme {
            self.sink.emit(&self.view, &RenderEvent::ThemeChanged(self.settings.theme));
        }
        if old.collapse_threshold != self.settings.collapse_threshold && self.doc.is_some() {
            self.rebuild();
        }
    }

    pub fn status_report(&self) -> StatusReport {
        let rendered = self.doc.is_some() && !self.view.is_empty();
        StatusReport {
            is_formatted: self.processed && rendered,
            has_toolbar: rendered,
            has_json_container: !self.view.is_empty(),
            has_json: self.doc.is_some(),
        }
    }

    pub fn json_data(&self) -> Option<Value> {
        self.doc.as_deref().cloned()
    }

    /// Answer one message from the observer or the popup.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::CheckForJson { force, .. } => Response::status(self.check_for_json(force)),
            Request::Ping => Response::status(Status::Ok),
            Request::GetJsonData => Response::Data { data: self.json_data() },
            Request::ApplySettings { settings } => {
                self.apply_settings(&settings);
                Response::status(Status::Ok)
            }
            Request::GetSettings => Response::Settings { settings: self.settings.clone() },
            Request::CheckStatus => Response::Report(self.status_report()),
        }
    }

    // ---- tree ----

    /// Select a row and show where it is in the path bar.
    pub fn select_row(&mut self, row: RowId) -> Option<Inspection> {
        let doc = self.doc.as_ref()?;
        let path = &self.view.row(row)?.path;
        let inspection = node::inspect(doc, path, self.viewer.preview_len);

        self.path_bar = PathBar {
            path: inspection.display_path.clone(),
            info: match inspection.size {
                Some(n) => format!("{} ({n})", inspection.value_type),
                None => inspection.value_type.clone(),
            },
        };
        self.selected = Some(row);
        self.sink.emit(&self.view, &RenderEvent::Selected(row));
        Some(inspection)
    }

    /// Select by the encoded path a UI element carries.
    pub fn select_encoded(&mut self, encoded: &str) -> Option<Inspection> {
        let row = self.view.find_by_encoded_path(encoded)?;
        self.select_row(row)
    }

    /// Inspect any path against the current document; stale paths come back
    /// as `"undefined"`.
    pub fn inspect_path(&self, path: &JsonPath) -> Result<Inspection> {
        let doc = self.doc.as_ref().ok_or(Error::NoDocument)?;
        Ok(node::inspect(doc, path, self.viewer.preview_len))
    }

    pub fn toggle_block(&mut self, block: BlockId) -> Option<bool> {
        self.view.toggle(block, self.sink.as_mut())
    }

    pub fn expand_all(&mut self) {
        self.view.expand_all(self.sink.as_mut());
    }

    pub fn collapse_all(&mut self) {
        self.view.collapse_all(self.sink.as_mut());
    }

    // ---- search ----

    pub fn open_search(&mut self) {
        self.search_visible = true;
    }

    pub fn close_search(&mut self) {
        self.search_visible = false;
        self.pending.cancel();
        self.search.clear(&self.view, self.sink.as_mut());
    }

    /// A keystroke in the search box; the scan runs from [`poll`](Self::poll)
    /// once typing pauses.
    pub fn search_input(&mut self, query: impl Into<String>, now: Instant) {
        self.pending.input(query, now);
    }

    /// Run a debounced query whose quiet period has elapsed. Returns whether
    /// a search ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending.due(now) {
            Some(query) => {
                self.run_search(&query);
                true
            }
            None => false,
        }
    }

    /// Search immediately, bypassing the debounce. Returns the match count.
    pub fn search_now(&mut self, query: &str) -> usize {
        self.pending.cancel();
        self.run_search(query)
    }

    pub fn next_match(&mut self) -> Option<RowId> {
        self.step(Direction::Next)
    }

    pub fn prev_match(&mut self) -> Option<RowId> {
        self.step(Direction::Prev)
    }

    fn step(&mut self, direction: Direction) -> Option<RowId> {
        // typing not yet settled: run it now and land on its first match
        if let Some(query) = self.pending.flush() {
            self.run_search(&query);
            return self.search.current();
        }
        self.search.navigate(&mut self.view, direction, self.sink.as_mut())
    }

    fn run_search(&mut self, query: &str) -> usize {
        self.search.search(&mut self.view, query, self.sink.as_mut()).len()
    }

    /// Returns whether the shortcut was consumed; unconsumed keys keep their
    /// default browser behavior.
    pub fn on_shortcut(&mut self, shortcut: Shortcut) -> bool {
        match shortcut {
            Shortcut::OpenSearch => {
                self.open_search();
                true
            }
            Shortcut::CloseSearch if self.search_visible => {
                self.close_search();
                true
            }
            Shortcut::CopySelection if self.selected.is_some() => {
                self.copy_selected_value();
                true
            }
            Shortcut::NextMatch if self.search_visible => {
                self.next_match();
                true
            }
            Shortcut::PrevMatch if self.search_visible => {
                self.prev_match();
                true
            }
            _ => false,
        }
    }

    // ---- toolbar ----

    /// Copy the whole document, pretty-printed.
    pub fn copy_json(&mut self) -> bool {
        let result = self.with_document(|doc, clipboard| node::copy_node_value(doc, &JsonPath::root(), clipboard));
        self.report(result, "JSON copied to clipboard!", "Failed to copy JSON")
    }

    pub fn copy_selected_value(&mut self) -> bool {
        let path = self.selected_path();
        let result = self.with_document(|doc, clipboard| node::copy_node_value(doc, &path, clipboard));
        self.report(result, "Value copied to clipboard!", "Failed to copy value")
    }

    pub fn copy_selected_path(&mut self) -> bool {
        let path = self.selected_path();
        let result = node::copy_path(&path, self.clipboard.as_mut());
        self.report(result, "Path copied to clipboard!", "Failed to copy path")
    }

    /// Save the document as `data-<millis>.json` in the download directory.
    pub fn download_json(&mut self) -> Option<PathBuf> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let result = match &self.doc {
            Some(doc) => node::download_document(doc, &self.download_dir, millis),
            None => Err(Error::NoDocument),
        };
        match result {
            Ok(path) => {
                info!(path = %path.display(), "document downloaded");
                self.toasts.push(Toast::success("JSON downloaded!"));
                Some(path)
            }
            Err(e) => {
                warn!("download failed: {}", e);
                self.toasts.push(Toast::error("Failed to download JSON"));
                None
            }
        }
    }

    fn selected_path(&self) -> JsonPath {
        self.selected
            .and_then(|row| self.view.row(row))
            .map(|r| r.path.clone())
            .unwrap_or_default()
    }

    fn with_document(&mut self, f: impl FnOnce(&Value, &mut dyn Clipboard) -> Result<()>) -> Result<()> {
        let doc = self.doc.as_ref().ok_or(Error::NoDocument)?;
        f(doc, self.clipboard.as_mut())
    }

    fn report(&mut self, result: Result<()>, success: &str, failure: &str) -> bool {
        match result {
            Ok(()) => {
                self.toasts.push(Toast::success(success));
                true
            }
            Err(e) => {
                warn!("{}: {}", failure, e);
                self.toasts.push(Toast::error(failure));
                false
            }
        }
    }

    /// Toasts raised since the last call.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        mem::take(&mut self.toasts)
    }

    /// Size and node count, when stats are switched on.
    pub fn stats(&self) -> Option<Stats> {
        if !self.settings.show_stats {
            return None;
        }
        self.doc.as_deref().map(node::stats)
    }

    // ---- accessors ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn view(&self) -> &TreeView {
        &self.view
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn document(&self) -> Option<&Arc<Value>> {
        self.doc.as_ref()
    }

    pub fn recovery(&self) -> Option<Recovery> {
        self.recovery
    }

    pub fn selected(&self) -> Option<RowId> {
        self.selected
    }

    pub fn path_bar(&self) -> &PathBar {
        &self.path_bar
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn is_search_visible(&self) -> bool {
        self.search_visible
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::debug;

use crate::render::{RenderEvent, RenderSink};
use crate::tree::TreeView;
use crate::types::RowId;

// Below this many rows a sequential scan beats spinning up the pool.
const PARALLEL_ROWS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Matches over the rendered rows, with a wrapping cursor.
///
/// Collapsed blocks only hide rows, so their rows are searched too; activating a
/// match expands whatever hides it.
#[derive(Debug)]
pub struct SearchEngine {
    max_results: usize,
    query: String,
    generation: u64,
    matches: Vec<RowId>,
    current: usize,
}

impl SearchEngine {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            query: String::new(),
            generation: 0,
            matches: Vec::new(),
            current: 0,
        }
    }

    /// Run `query` against `view` and activate the first match.
    pub fn search(&mut self, view: &mut TreeView, query: &str, sink: &mut dyn RenderSink) -> &[RowId] {
        self.clear(view, sink);
        if query.trim().is_empty() {
            return &self.matches;
        }
        let needle = query.to_lowercase();

        self.query = query.to_string();
        self.generation = view.generation();
        self.matches = find_matches(view, &needle, self.max_results);
        debug!(query, matches = self.matches.len(), cap = self.max_results, "search");

        for (i, row) in self.matches.iter().enumerate() {
            sink.emit(view, &RenderEvent::MatchMarked { row: *row, active: i == 0 });
        }
        if let Some(first) = self.matches.first() {
            view.reveal(*first, sink);
        }
        &self.matches
    }

    /// Step the cursor, wrapping at both ends, and reveal the new current match.
    pub fn navigate(
        &mut self,
        view: &mut TreeView,
        direction: Direction,
        sink: &mut dyn RenderSink,
    ) -> Option<RowId> {
        if self.matches.is_empty() {
            return None;
        }
        if self.generation != view.generation() {
            // rows from an older build must not be touched
            self.reset();
            return None;
        }

        let len = self.matches.len();
        let previous = self.matches[self.current];
        self.current = match direction {
            Direction::Next => (self.current + 1) % len,
            Direction::Prev => (self.current + len - 1) % len,
        };
        let row = self.matches[self.current];

        sink.emit(view, &RenderEvent::MatchMarked { row: previous, active: false });
        sink.emit(view, &RenderEvent::MatchMarked { row, active: true });
        view.reveal(row, sink);
        Some(row)
    }

    pub fn clear(&mut self, view: &TreeView, sink: &mut dyn RenderSink) {
        if !self.matches.is_empty() && self.generation == view.generation() {
            sink.emit(view, &RenderEvent::MatchesCleared);
        }
        self.reset();
    }

    /// Forget all matches without emitting anything; used when the view is torn down.
    pub fn reset(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = 0;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[RowId] {
        &self.matches
    }

    pub fn current(&self) -> Option<RowId> {
        self.matches.get(self.current).copied()
    }

    /// `"2 / 5 results"`, or `"0 results"`.
    pub fn count_label(&self) -> String {
        match self.matches.len() {
            0 => "0 results".to_string(),
            n => format!("{} / {} results", self.current + 1, n),
        }
    }
}

/// Rows whose text contains `needle` (already lowercased), in document order,
/// stopping at `cap`.
pub fn find_matches(view: &TreeView, needle: &str, cap: usize) -> Vec<RowId> {
    let rows = view.rows();
    if rows.len() < PARALLEL_ROWS {
        return rows
            .iter()
            .filter(|r| text_matches(&r.text, needle))
            .map(|r| r.id)
            .take(cap)
            .collect();
    }
    let hits: Vec<bool> = rows.par_iter().map(|r| text_matches(&r.text, needle)).collect();
    hits.into_iter()
        .enumerate()
        .filter_map(|(id, hit)| hit.then_some(id))
        .take(cap)
        .collect()
}

pub fn text_matches(text: &str, needle: &str) -> bool {
    // Case-insensitive substring search; `needle` is already lowercased
    text.to_lowercase().contains(needle)
}

/// Holds the latest keystroke until typing pauses for `delay`.
#[derive(Debug)]
pub struct DebouncedQuery {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl DebouncedQuery {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Record new input; restarts the quiet period.
    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.pending = Some((query.into(), now));
    }

    /// The pending query once the quiet period has elapsed.
    pub fn due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                self.pending.take().map(|(q, _)| q)
            }
            _ => None,
        }
    }

    /// The pending query right away, for Enter and explicit navigation.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(q, _)| q)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;

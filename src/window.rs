//! Sliding window over a large match list.
//!
//! Only a bounded slice of the matches is materialized (line text read) at any
//! time. The presentation layer reports which match indices are on screen and
//! the window loads more in the direction of travel, then evicts entries far
//! from the visible range.

use crate::index::accessor::LineAccessor;
use crate::index::types::LineNo;
use crate::query::engine::MatchList;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Entries materialized right after a search
pub const INITIAL_BATCH_SIZE: usize = 200;
/// Entries loaded per edge load or jump
pub const SLIDING_WINDOW_SIZE: usize = 300;
/// Distance from a loaded edge that triggers loading more
pub const LOAD_BUFFER: usize = 50;
/// Entries kept on each side of the visible range
pub const TRIM_BUFFER: usize = 100;

/// Window sizing, overridable through the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub initial_batch_size: usize,
    pub sliding_window_size: usize,
    pub load_buffer: usize,
    pub trim_buffer: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: INITIAL_BATCH_SIZE,
            sliding_window_size: SLIDING_WINDOW_SIZE,
            load_buffer: LOAD_BUFFER,
            trim_buffer: TRIM_BUFFER,
        }
    }
}

/// Supplies display text for matched lines
pub trait ResultSource {
    fn line_text(&self, line: LineNo) -> String;
}

impl ResultSource for LineAccessor<'_> {
    fn line_text(&self, line: LineNo) -> String {
        self.read_line(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No search results held
    Empty,
    /// Loading the initial batch of a new search
    Populating,
    Ready,
    /// Loading more entries while earlier ones stay readable
    Loading,
}

/// One materialized match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    /// Position in the match list
    pub index: usize,
    pub line_number: LineNo,
    pub text: String,
}

/// Visibility change reported by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportEvent {
    Entered(usize),
    Left(usize),
}

pub struct ResultWindow {
    config: WindowConfig,
    phase: WindowPhase,
    search_id: u64,
    matches: MatchList,
    materialized: BTreeMap<usize, ResultEntry>,
    visible: BTreeSet<usize>,
    first_loaded_index: usize,
    loaded_results_count: usize,
}

impl ResultWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            phase: WindowPhase::Empty,
            search_id: 0,
            matches: MatchList::default(),
            materialized: BTreeMap::new(),
            visible: BTreeSet::new(),
            first_loaded_index: 0,
            loaded_results_count: 0,
        }
    }

    /// Drop every entry and return to `Empty`
    pub fn reset(&mut self) {
        self.phase = WindowPhase::Empty;
        self.matches = MatchList::default();
        self.materialized.clear();
        self.visible.clear();
        self.first_loaded_index = 0;
        self.loaded_results_count = 0;
    }

    /// Start showing the results of search `search_id`
    pub fn populate(&mut self, search_id: u64, matches: MatchList, source: &dyn ResultSource) {
        self.reset();
        self.search_id = search_id;
        self.matches = matches;
        self.phase = WindowPhase::Populating;

        if !self.matches.is_empty() {
            self.load_range(0, self.config.initial_batch_size, source);
        }
        self.phase = WindowPhase::Ready;

        tracing::debug!(
            search_id,
            matches = self.matches.len(),
            loaded = self.materialized.len(),
            "Result window populated"
        );
    }

    /// Materialize matches `[start, start + count)`.
    ///
    /// Ignored when `search_id` is not the search this window shows. Entries
    /// that are already materialized are left as they are.
    pub fn load_batch(&mut self, search_id: u64, start: usize, count: usize, source: &dyn ResultSource) {
        if search_id != self.search_id || self.phase == WindowPhase::Empty {
            tracing::trace!(search_id, current = self.search_id, "Ignoring stale window load");
            return;
        }

        let previous = self.phase;
        self.phase = WindowPhase::Loading;
        self.load_range(start, count, source);
        self.phase = if previous == WindowPhase::Populating {
            WindowPhase::Populating
        } else {
            WindowPhase::Ready
        };
    }

    fn load_range(&mut self, start: usize, count: usize, source: &dyn ResultSource) {
        let end = start.saturating_add(count).min(self.matches.len());
        if start >= end {
            return;
        }

        let mut added = 0;
        for index in start..end {
            if self.materialized.contains_key(&index) {
                continue;
            }
            let Some(line_number) = self.matches.get(index) else {
                break;
            };
            self.materialized.insert(
                index,
                ResultEntry {
                    index,
                    line_number,
                    text: source.line_text(line_number),
                },
            );
            added += 1;
        }

        self.loaded_results_count = self.loaded_results_count.max(end);
        self.first_loaded_index = self.first_loaded_index.min(start);
        tracing::trace!(start, end, added, "Loaded result entries");
    }

    /// Apply entered/left notifications, then load and evict around the
    /// visible range
    pub fn apply_viewport(&mut self, events: &[ViewportEvent], source: &dyn ResultSource) {
        for event in events {
            match *event {
                ViewportEvent::Entered(index) if index < self.matches.len() => {
                    self.visible.insert(index);
                }
                ViewportEvent::Entered(_) => {}
                ViewportEvent::Left(index) => {
                    self.visible.remove(&index);
                }
            }
        }
        self.on_viewport_change(source);
    }

    /// Replace the visible set with `range`, then load and evict around it
    pub fn report_visible_range(&mut self, range: RangeInclusive<usize>, source: &dyn ResultSource) {
        let last = self.matches.len();
        self.visible = range.filter(|&index| index < last).collect();
        self.on_viewport_change(source);
    }

    fn on_viewport_change(&mut self, source: &dyn ResultSource) {
        if self.phase == WindowPhase::Empty {
            return;
        }
        let (Some(&min), Some(&max)) = (self.visible.first(), self.visible.last()) else {
            return;
        };
        let search_id = self.search_id;
        let window = self.config.sliding_window_size;
        let buffer = self.config.load_buffer;

        // Anything on screen must be materialized
        let missing: Vec<usize> = self
            .visible
            .iter()
            .copied()
            .filter(|index| !self.materialized.contains_key(index))
            .collect();
        for index in missing {
            self.load_batch(search_id, index, 1, source);
        }

        // Edge loads stop at the trim bounds so nothing read is evicted at once
        let trim = self.config.trim_buffer;

        if max + buffer >= self.loaded_results_count && self.has_more_after() {
            let keep_end = max.saturating_add(trim).saturating_add(1);
            let count = window.min(keep_end.saturating_sub(self.loaded_results_count));
            if count > 0 {
                self.load_batch(search_id, self.loaded_results_count, count, source);
            }
        }

        if min <= self.first_loaded_index + buffer && self.has_more_before() {
            let start = self
                .first_loaded_index
                .saturating_sub(window)
                .max(min.saturating_sub(trim));
            if start < self.first_loaded_index {
                self.load_batch(search_id, start, self.first_loaded_index - start, source);
            }
        }

        self.evict_outside(min, max);
    }

    fn evict_outside(&mut self, min: usize, max: usize) {
        let keep_start = min.saturating_sub(self.config.trim_buffer);
        let keep_end = max.saturating_add(self.config.trim_buffer);
        let visible = &self.visible;

        let before = self.materialized.len();
        self.materialized
            .retain(|index, _| (keep_start..=keep_end).contains(index) || visible.contains(index));
        let evicted = before - self.materialized.len();

        if evicted > 0 {
            self.first_loaded_index = self.materialized.keys().next().copied().unwrap_or(0);
            self.loaded_results_count = self
                .materialized
                .keys()
                .next_back()
                .map_or(0, |&last| last + 1);
            tracing::trace!(evicted, keep_start, keep_end, "Evicted result entries");
        }
    }

    /// Materialize the match at `index`, loading a window centred on it when
    /// needed. `None` only when `index` is past the end of the match list.
    pub fn jump_to(&mut self, index: usize, source: &dyn ResultSource) -> Option<&ResultEntry> {
        if index >= self.matches.len() {
            return None;
        }
        if !self.materialized.contains_key(&index) {
            let window = self.config.sliding_window_size.max(1);
            let start = index.saturating_sub(window / 2);
            self.load_batch(self.search_id, start, window, source);
        }
        self.materialized.get(&index)
    }

    pub fn has_more_after(&self) -> bool {
        self.loaded_results_count < self.matches.len()
    }

    pub fn has_more_before(&self) -> bool {
        self.first_loaded_index > 0
    }

    /// Materialized entries in match order
    pub fn entries(&self) -> impl Iterator<Item = &ResultEntry> {
        self.materialized.values()
    }

    pub fn entry(&self, index: usize) -> Option<&ResultEntry> {
        self.materialized.get(&index)
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn visible(&self) -> &BTreeSet<usize> {
        &self.visible
    }

    pub fn search_id(&self) -> u64 {
        self.search_id
    }

    pub fn matches(&self) -> &MatchList {
        &self.matches
    }

    pub fn first_loaded_index(&self) -> usize {
        self.first_loaded_index
    }

    pub fn loaded_results_count(&self) -> usize {
        self.loaded_results_count
    }
}

//! One opened file with its index, current search and result window

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::index::accessor::LineAccessor;
use crate::index::build::LineIndexBuilder;
use crate::index::reader::{ByteSource, ChunkReader};
use crate::index::types::{LineIndex, LineNo};
use crate::query::engine::{InlineStrategy, MatchList, SearchEngine};
use crate::query::predicate::SearchPredicate;
use crate::query::worker::{SearchWorker, WorkerStrategy};
use crate::utils::{AbortFlag, Progress};
use crate::window::{ResultEntry, ResultWindow};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where a match sits in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchLocation {
    /// 0-based position in the match list
    pub match_index: usize,
    /// 0-based line number
    pub line_number: LineNo,
    /// 1-based page holding the line
    pub page: usize,
}

/// Forwards only rising percentages, so a search retried inline after a
/// worker failure does not move the indicator backwards
struct Rising<'a> {
    inner: &'a mut dyn Progress,
    last: Option<u8>,
}

impl Progress for Rising<'_> {
    fn report(&mut self, percent: u8) {
        if self.last.is_none_or(|last| percent > last) {
            self.last = Some(percent);
            self.inner.report(percent);
        }
    }
}

/// An opened file: the reader, its line index and the active search
pub struct Session {
    path: Option<PathBuf>,
    reader: ChunkReader,
    index: LineIndex,
    config: AppConfig,
    search_counter: u64,
    matches: MatchList,
    current_match: Option<usize>,
    window: ResultWindow,
    worker: Option<SearchWorker>,
    worker_disabled: bool,
    abort: AbortFlag,
}

impl Session {
    /// Open `path` and build its line index
    pub fn open(path: &Path, config: AppConfig, progress: &mut dyn Progress) -> Result<Self> {
        let reader = ChunkReader::open(path, config.use_mmap)?;
        let mut session = Self::build(reader, config, progress)?;
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    /// Same as [`open`](Self::open) over any byte source
    pub fn from_source(
        source: Box<dyn ByteSource>,
        config: AppConfig,
        progress: &mut dyn Progress,
    ) -> Result<Self> {
        Self::build(ChunkReader::new(source), config, progress)
    }

    fn build(reader: ChunkReader, config: AppConfig, progress: &mut dyn Progress) -> Result<Self> {
        let abort = AbortFlag::new();
        let index = LineIndexBuilder::new(config.effective_chunk_size()).build(&reader, progress, &abort)?;
        let window = ResultWindow::new(config.window.clone());

        Ok(Self {
            path: None,
            reader,
            index,
            config,
            search_counter: 0,
            matches: MatchList::default(),
            current_match: None,
            window,
            worker: None,
            worker_disabled: false,
            abort,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn total_lines(&self) -> usize {
        self.index.total_lines()
    }

    pub fn accessor(&self) -> LineAccessor<'_> {
        LineAccessor::new(&self.reader, &self.index)
    }

    /// Handle another thread can use to abort the running operation
    pub fn abort_handle(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Id of the most recent search; 0 before the first one
    pub fn search_id(&self) -> u64 {
        self.search_counter
    }

    pub fn matches(&self) -> &MatchList {
        &self.matches
    }

    pub fn window(&self) -> &ResultWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> (&mut ResultWindow, LineAccessor<'_>) {
        (&mut self.window, LineAccessor::new(&self.reader, &self.index))
    }

    pub fn current_match(&self) -> Option<usize> {
        self.current_match
    }

    /// Run a new search, aborting any earlier one.
    ///
    /// On success the match list and result window are replaced. On any
    /// error, including cancellation, both keep their previous contents.
    pub fn search(&mut self, predicate: &SearchPredicate, progress: &mut dyn Progress) -> Result<&MatchList> {
        self.search_with_abort(predicate, progress, AbortFlag::new())
    }

    /// [`search`](Self::search) controlled by a caller-supplied abort flag
    pub fn search_with_abort(
        &mut self,
        predicate: &SearchPredicate,
        progress: &mut dyn Progress,
        abort: AbortFlag,
    ) -> Result<&MatchList> {
        self.abort.abort();
        self.abort = abort.clone();
        self.search_counter += 1;
        let search_id = self.search_counter;

        if self.config.use_worker && !self.worker_disabled && self.worker.is_none() {
            match SearchWorker::spawn() {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    tracing::debug!(error = %e, "Search worker unavailable, searching inline");
                    self.worker_disabled = true;
                }
            }
        }

        let mut progress = Rising {
            inner: progress,
            last: None,
        };
        let engine = SearchEngine::new(&self.reader, &self.index)
            .with_batch_size(self.config.effective_lines_per_batch())
            .with_job_id(search_id);

        let worker = if self.config.use_worker { self.worker.as_ref() } else { None };
        let mut result = match worker {
            Some(worker) => engine.search(predicate, &mut WorkerStrategy::new(worker), &mut progress, &abort),
            None => engine.search(predicate, &mut InlineStrategy::new(), &mut progress, &abort),
        };

        if matches!(result, Err(Error::WorkerUnavailable(_))) {
            tracing::debug!(search_id, "Search worker failed, retrying inline");
            result = engine.search(predicate, &mut InlineStrategy::new(), &mut progress, &abort);
            self.worker = None;
            self.worker_disabled = true;
        }

        let matches = result?;
        self.current_match = if matches.is_empty() { None } else { Some(0) };
        self.matches = matches;
        self.window.populate(
            search_id,
            self.matches.clone(),
            &LineAccessor::new(&self.reader, &self.index),
        );
        Ok(&self.matches)
    }

    /// Move the current match by `direction`, wrapping at either end
    pub fn navigate(&mut self, direction: i64) -> Option<MatchLocation> {
        let len = self.matches.len() as i64;
        if len == 0 {
            return None;
        }
        let from = self.current_match.map_or(-1, |i| i as i64);
        let target = (from + direction).rem_euclid(len) as usize;
        self.select(target)
    }

    /// Jump to match `number` (1-based)
    pub fn go_to_match(&mut self, number: usize) -> Option<MatchLocation> {
        if number == 0 || number > self.matches.len() {
            return None;
        }
        self.select(number - 1)
    }

    fn select(&mut self, match_index: usize) -> Option<MatchLocation> {
        let line_number = self.matches.get(match_index)?;
        self.current_match = Some(match_index);
        self.window
            .jump_to(match_index, &LineAccessor::new(&self.reader, &self.index));

        let accessor = LineAccessor::new(&self.reader, &self.index);
        Some(MatchLocation {
            match_index,
            line_number,
            page: accessor.page_of_line(line_number, self.config.effective_lines_per_page()),
        })
    }

    /// The materialized entry for the current match
    pub fn current_entry(&self) -> Option<&ResultEntry> {
        self.current_match.and_then(|i| self.window.entry(i))
    }

    /// Abort any running search and release the file
    pub fn close(self) {
        self.abort.abort();
        tracing::debug!(path = ?self.path, "Session closed");
    }
}

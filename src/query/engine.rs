use crate::config::DEFAULT_LINES_PER_BATCH;
use crate::error::Result;
use crate::index::lines::split_lines;
use crate::index::reader::ChunkReader;
use crate::index::types::{LineIndex, LineNo};
use crate::query::predicate::{CompiledPredicate, SearchPredicate};
use crate::query::protocol::JobId;
use crate::utils::{AbortFlag, PercentTracker, Progress};
use std::iter;
use std::sync::Arc;
use std::time::Instant;

/// Ascending line numbers of every line a predicate matched.
///
/// Immutable once produced; clones share the same storage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchList(Arc<[LineNo]>);

impl MatchList {
    pub fn new(lines: Vec<LineNo>) -> Self {
        debug_assert!(lines.windows(2).all(|w| w[0] < w[1]));
        Self(lines.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Line number of the `index`-th match
    pub fn get(&self, index: usize) -> Option<LineNo> {
        self.0.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = LineNo> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[LineNo] {
        &self.0
    }

    /// Match index of `line`, if it matched
    pub fn position_of_line(&self, line: LineNo) -> Option<usize> {
        self.0.binary_search(&line).ok()
    }
}

/// A contiguous run of whole lines read for evaluation
#[derive(Debug, Clone)]
pub struct Batch {
    pub start_line: LineNo,
    pub line_count: usize,
    pub text: String,
}

impl Batch {
    pub fn lines(&self) -> Vec<&str> {
        split_batch(&self.text, self.line_count)
    }
}

/// Split batch text into exactly `line_count` lines.
///
/// The final line of an empty file has no bytes and no terminator, so the
/// splitter does not yield it; missing lines are padded as empty.
pub(crate) fn split_batch(text: &str, line_count: usize) -> Vec<&str> {
    split_lines(text)
        .map(|line| line.text)
        .chain(iter::repeat(""))
        .take(line_count)
        .collect()
}

/// Line numbers in `lines` (the first being `start_line`) that match
pub(crate) fn evaluate_lines(predicate: &CompiledPredicate, start_line: LineNo, lines: &[&str]) -> Vec<LineNo> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| predicate.is_match(line))
        .map(|(i, _)| start_line + i)
        .collect()
}

/// Where predicate evaluation happens.
///
/// The engine reads batches sequentially and hands each one over with
/// `submit`. A strategy may evaluate immediately or concurrently, but
/// `finish` must return matches in ascending line order.
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn begin(&mut self, job: JobId, predicate: &SearchPredicate) -> Result<()>;

    fn submit(&mut self, batch: Batch) -> Result<()>;

    fn finish(&mut self) -> Result<Vec<LineNo>>;

    /// Drop the current job; late results for it are ignored
    fn abandon(&mut self);
}

/// Evaluates every batch on the calling thread as soon as it is read
#[derive(Default)]
pub struct InlineStrategy {
    predicate: Option<CompiledPredicate>,
    matches: Vec<LineNo>,
}

impl InlineStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SearchStrategy for InlineStrategy {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn begin(&mut self, _job: JobId, predicate: &SearchPredicate) -> Result<()> {
        self.predicate = Some(predicate.compile()?);
        self.matches.clear();
        Ok(())
    }

    fn submit(&mut self, batch: Batch) -> Result<()> {
        if let Some(predicate) = &self.predicate {
            let found = evaluate_lines(predicate, batch.start_line, &batch.lines());
            self.matches.extend(found);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<LineNo>> {
        self.predicate = None;
        Ok(std::mem::take(&mut self.matches))
    }

    fn abandon(&mut self) {
        self.predicate = None;
        self.matches.clear();
    }
}

/// Scans a file in fixed-size line batches and collects matching line numbers
pub struct SearchEngine<'a> {
    reader: &'a ChunkReader,
    index: &'a LineIndex,
    lines_per_batch: usize,
    job_id: JobId,
}

impl<'a> SearchEngine<'a> {
    pub fn new(reader: &'a ChunkReader, index: &'a LineIndex) -> Self {
        Self {
            reader,
            index,
            lines_per_batch: DEFAULT_LINES_PER_BATCH,
            job_id: 0,
        }
    }

    pub fn with_batch_size(mut self, lines_per_batch: usize) -> Self {
        self.lines_per_batch = lines_per_batch.max(1);
        self
    }

    /// Tag the search with a job id so a worker can tell it apart from
    /// earlier searches
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }

    /// Run `predicate` over every line of the file.
    ///
    /// Reports `batches done / total batches` after each batch. On abort the
    /// strategy's job is abandoned and no partial result is returned.
    pub fn search(
        &self,
        predicate: &SearchPredicate,
        strategy: &mut dyn SearchStrategy,
        progress: &mut dyn Progress,
        abort: &AbortFlag,
    ) -> Result<MatchList> {
        let started = Instant::now();
        let total_lines = self.index.total_lines();
        let total_batches = total_lines.div_ceil(self.lines_per_batch);

        tracing::debug!(
            job = self.job_id,
            strategy = strategy.name(),
            query = %predicate.describe(),
            total_lines,
            "Search started"
        );

        strategy.begin(self.job_id, predicate)?;

        let mut tracker = PercentTracker::new(progress, total_batches as u64);
        if let Err(e) = self.submit_batches(strategy, &mut tracker, abort) {
            strategy.abandon();
            tracing::debug!(job = self.job_id, error = %e, "Search stopped");
            return Err(e);
        }

        let matches = strategy.finish()?;
        tracker.update(total_batches as u64);

        tracing::debug!(
            job = self.job_id,
            strategy = strategy.name(),
            matches = matches.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(MatchList::new(matches))
    }

    fn submit_batches(
        &self,
        strategy: &mut dyn SearchStrategy,
        tracker: &mut PercentTracker<'_>,
        abort: &AbortFlag,
    ) -> Result<()> {
        let total_lines = self.index.total_lines();
        let mut start_line = 0;
        let mut done = 0u64;

        while start_line < total_lines {
            abort.check()?;

            let end_line = (start_line + self.lines_per_batch).min(total_lines);
            let text = match self.index.range_bytes(start_line, end_line) {
                Some(range) => self.reader.read_text(range.start, range.end)?,
                None => String::new(),
            };

            strategy.submit(Batch {
                start_line,
                line_count: end_line - start_line,
                text,
            })?;

            start_line = end_line;
            done += 1;
            tracker.update(done);
        }
        abort.check()
    }
}

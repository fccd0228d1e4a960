use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::Result;
use crate::index::lines::TerminatorScanner;
use crate::index::reader::ChunkReader;
use crate::index::types::LineIndex;
use crate::utils::{AbortFlag, PercentTracker, Progress};
use std::time::Instant;

/// Builds a [`LineIndex`] with one streaming pass over the file.
///
/// The file is read in fixed-size byte chunks and scanned for terminators.
/// Only the offsets are kept, so memory use is proportional to the line
/// count rather than the file size.
pub struct LineIndexBuilder {
    chunk_size: usize,
}

impl Default for LineIndexBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl LineIndexBuilder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Index every line of `reader`.
    ///
    /// Checks `abort` before each chunk and fails with `Cancelled` without
    /// publishing anything. Reports the percentage of bytes processed after
    /// each chunk.
    pub fn build(
        &self,
        reader: &ChunkReader,
        progress: &mut dyn Progress,
        abort: &AbortFlag,
    ) -> Result<LineIndex> {
        let started = Instant::now();
        let file_size = reader.len();
        let mut tracker = PercentTracker::new(progress, file_size);

        tracing::debug!(file_size, chunk_size = self.chunk_size, "Building line index");

        let mut offsets = vec![0u64];
        let mut scanner = TerminatorScanner::new();
        let mut position = 0u64;

        while position < file_size {
            abort.check()?;

            let end = (position + self.chunk_size as u64).min(file_size);
            let chunk = reader.read_bytes(position, end)?;
            scanner.scan(&chunk, position, |offset| offsets.push(offset));

            position = end;
            tracker.update(position);
        }
        scanner.finish(|offset| offsets.push(offset));

        // Unterminated tail counts as one more line
        if file_size > 0 && offsets.last() != Some(&file_size) {
            offsets.push(file_size);
        }

        if file_size == 0 {
            tracker.update(0);
        }

        let index = LineIndex::from_parts(offsets, file_size);
        tracing::debug!(
            total_lines = index.total_lines(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Line index complete"
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::NoProgress;
    use crate::Error;

    fn build(text: &str, chunk_size: usize) -> LineIndex {
        let reader = ChunkReader::from_bytes(text);
        LineIndexBuilder::new(chunk_size)
            .build(&reader, &mut NoProgress, &AbortFlag::new())
            .unwrap()
    }

    #[test]
    fn test_mixed_terminators() {
        let index = build("a\nBB\r\nccc", 1024);
        assert_eq!(index.offsets(), &[0, 2, 6, 9]);
        assert_eq!(index.total_lines(), 3);
    }

    #[test]
    fn test_empty_file() {
        let index = build("", 1024);
        assert_eq!(index.offsets(), &[0]);
        assert_eq!(index.total_lines(), 1);
    }

    #[test]
    fn test_trailing_terminator_counts_terminators() {
        let index = build("a\nb\n", 1024);
        assert_eq!(index.offsets(), &[0, 2, 4]);
        assert_eq!(index.total_lines(), 2);
    }

    #[test]
    fn test_no_trailing_terminator_adds_one() {
        let index = build("a\nb\nc", 1024);
        assert_eq!(index.total_lines(), 3);
    }

    #[test]
    fn test_lone_cr_lines() {
        let index = build("x\ry\r", 1024);
        assert_eq!(index.offsets(), &[0, 2, 4]);
    }

    #[test]
    fn test_chunk_size_does_not_change_index() {
        let text = "first\r\nsecond\rthird\n\r\nfinal line without end";
        let expected = build(text, 1 << 20);
        for chunk_size in 1..=text.len() {
            assert_eq!(build(text, chunk_size), expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let text = "αβγ\n日本語\r\nend";
        let expected = build(text, 1 << 20);
        assert_eq!(expected.offsets(), &[0, 7, 18, 21]);
        for chunk_size in 1..8 {
            assert_eq!(build(text, chunk_size), expected);
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_completes() {
        let reader = ChunkReader::from_bytes("line\n".repeat(100));
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        LineIndexBuilder::new(64)
            .build(&reader, &mut sink, &AbortFlag::new())
            .unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_abort_before_first_chunk() {
        let reader = ChunkReader::from_bytes("a\nb\n");
        let abort = AbortFlag::new();
        abort.abort();
        let result = LineIndexBuilder::new(1).build(&reader, &mut NoProgress, &abort);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_abort_mid_build() {
        let reader = ChunkReader::from_bytes("line\n".repeat(1000));
        let abort = AbortFlag::new();
        let trigger = abort.clone();
        let mut sink = move |p: u8| {
            if p >= 10 {
                trigger.abort();
            }
        };
        let result = LineIndexBuilder::new(100).build(&reader, &mut sink, &abort);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}

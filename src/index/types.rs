use serde::Serialize;
use std::ops::Range;

/// Zero-based line number
pub type LineNo = usize;

/// Byte offsets of every line start in a file, plus a trailing sentinel.
///
/// `offsets[i]` is where line `i` starts and `offsets[i + 1] - offsets[i]`
/// is its encoded length including the terminator. The sentinel is the file
/// size. An empty file is modelled as a single empty line with `offsets ==
/// [0]`; every range lookup falls back to the file size when the next offset
/// is missing.
///
/// Built once per opened file and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    offsets: Vec<u64>,
    total_lines: usize,
    file_size: u64,
}

impl LineIndex {
    /// Assemble an index from builder output.
    ///
    /// `offsets` must start at 0 and be strictly increasing. For a non-empty
    /// file the last entry must equal `file_size`.
    pub(crate) fn from_parts(offsets: Vec<u64>, file_size: u64) -> Self {
        debug_assert_eq!(offsets.first(), Some(&0));
        debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let total_lines = if file_size == 0 { 1 } else { offsets.len() - 1 };
        Self {
            offsets,
            total_lines,
            file_size,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Byte offset where `line` starts
    pub fn line_start(&self, line: LineNo) -> Option<u64> {
        if line < self.total_lines {
            self.offsets.get(line).copied()
        } else {
            None
        }
    }

    /// Byte range of `line`, terminator included
    pub fn byte_range(&self, line: LineNo) -> Option<Range<u64>> {
        self.range_bytes(line, line + 1)
    }

    /// Byte range covering lines `[start, end)`, clamped to the file.
    ///
    /// Returns `None` when the clamped range holds no lines.
    pub fn range_bytes(&self, start: LineNo, end: LineNo) -> Option<Range<u64>> {
        let end = end.min(self.total_lines);
        if start >= end {
            return None;
        }
        let from = self.offsets[start];
        let to = self.offsets.get(end).copied().unwrap_or(self.file_size);
        Some(from..to)
    }

    /// Line containing the byte at `offset`
    pub fn line_at_offset(&self, offset: u64) -> Option<LineNo> {
        if offset >= self.file_size {
            return None;
        }
        let line = self.offsets.partition_point(|&start| start <= offset);
        Some(line.saturating_sub(1))
    }

    pub fn stats(&self) -> IndexStats {
        let longest_line_bytes = (0..self.total_lines)
            .filter_map(|line| self.byte_range(line))
            .map(|range| range.end - range.start)
            .max()
            .unwrap_or(0);

        IndexStats {
            total_lines: self.total_lines,
            file_size: self.file_size,
            longest_line_bytes,
            mean_line_bytes: self.file_size as f64 / self.total_lines as f64,
        }
    }
}

/// Summary numbers about an indexed file
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_lines: usize,
    pub file_size: u64,
    pub longest_line_bytes: u64,
    pub mean_line_bytes: f64,
}

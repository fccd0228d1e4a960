use crate::error::Result;
use crate::index::lines::{split_lines, strip_terminators};
use crate::index::reader::ChunkReader;
use crate::index::types::{LineIndex, LineNo};

/// One page of a paginated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: usize,
    /// First line on the page (0-based)
    pub start_line: LineNo,
    /// One past the last line on the page
    pub end_line: LineNo,
}

impl Page {
    pub fn len(&self) -> usize {
        self.end_line - self.start_line
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves line numbers to text on demand using a [`LineIndex`].
///
/// Out-of-range requests are clamped or produce empty strings instead of
/// errors, so a page render never fails because of a stale line number.
#[derive(Clone, Copy)]
pub struct LineAccessor<'a> {
    reader: &'a ChunkReader,
    index: &'a LineIndex,
}

impl<'a> LineAccessor<'a> {
    pub fn new(reader: &'a ChunkReader, index: &'a LineIndex) -> Self {
        Self { reader, index }
    }

    pub fn index(&self) -> &'a LineIndex {
        self.index
    }

    pub fn total_lines(&self) -> usize {
        self.index.total_lines()
    }

    /// Text of lines `[start, end)` without terminators.
    ///
    /// The range is clamped to the file. The result has exactly one entry per
    /// line in the clamped range; the last one may be an unterminated tail.
    pub fn read_lines(&self, start: LineNo, end: LineNo) -> Result<Vec<String>> {
        let end = end.min(self.total_lines());
        let Some(range) = self.index.range_bytes(start, end) else {
            return Ok(Vec::new());
        };

        let expected = end - start;
        let text = self.reader.read_text(range.start, range.end)?;

        let mut lines: Vec<String> = split_lines(&text)
            .take(expected)
            .map(|line| line.text.to_string())
            .collect();
        lines.resize(expected, String::new());
        Ok(lines)
    }

    /// Text of a single line with trailing terminators stripped.
    ///
    /// Out-of-range lines and read failures both yield an empty string.
    pub fn read_line(&self, line: LineNo) -> String {
        let Some(range) = self.index.byte_range(line) else {
            return String::new();
        };

        match self.reader.read_text(range.start, range.end) {
            Ok(text) => strip_terminators(&text).to_string(),
            Err(e) => {
                tracing::warn!(line, error = %e, "Failed to read line");
                String::new()
            }
        }
    }

    /// [`read_line`](Self::read_line) for signed line numbers from UI input
    pub fn read_line_signed(&self, line: i64) -> String {
        usize::try_from(line)
            .map(|line| self.read_line(line))
            .unwrap_or_default()
    }

    /// Raw bytes of a line, terminator included
    pub fn read_raw(&self, line: LineNo) -> Result<Option<Vec<u8>>> {
        match self.index.byte_range(line) {
            Some(range) => Ok(Some(self.reader.read_bytes(range.start, range.end)?)),
            None => Ok(None),
        }
    }

    /// Number of pages; an empty file still has one
    pub fn total_pages(&self, lines_per_page: usize) -> usize {
        let lines_per_page = lines_per_page.max(1);
        self.total_lines().div_ceil(lines_per_page).max(1)
    }

    /// Bounds of a 1-based page, or `None` past the last page
    pub fn page(&self, number: usize, lines_per_page: usize) -> Option<Page> {
        let lines_per_page = lines_per_page.max(1);
        if number == 0 || number > self.total_pages(lines_per_page) {
            return None;
        }
        let start_line = (number - 1) * lines_per_page;
        let end_line = (start_line + lines_per_page).min(self.total_lines());
        Some(Page {
            number,
            start_line,
            end_line,
        })
    }

    /// 1-based page containing `line`
    pub fn page_of_line(&self, line: LineNo, lines_per_page: usize) -> usize {
        line / lines_per_page.max(1) + 1
    }

    pub fn read_page(&self, page: &Page) -> Result<Vec<String>> {
        self.read_lines(page.start_line, page.end_line)
    }
}

//! Writing a range of lines to a new file

use crate::config::DEFAULT_EXPORT_CHUNK_LINES;
use crate::error::{Error, Result};
use crate::index::accessor::LineAccessor;
use crate::utils::{AbortFlag, PercentTracker, Progress};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Smallest progress step reported during export
const PROGRESS_STEP: u8 = 5;

/// What an export wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub first_line: usize,
    pub last_line: usize,
    pub lines_written: usize,
    pub bytes_written: u64,
}

/// Copies a 1-based inclusive line range to a writer in fixed-size chunks
pub struct Exporter {
    chunk_lines: usize,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_CHUNK_LINES)
    }
}

impl Exporter {
    pub fn new(chunk_lines: usize) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
        }
    }

    /// Write lines `first..=last` (1-based) joined with `\n`.
    ///
    /// The range must satisfy `1 <= first <= last <= total_lines`. Abort is
    /// checked before each chunk; on abort the writer may hold a prefix of
    /// the output.
    pub fn export(
        &self,
        accessor: &LineAccessor<'_>,
        first: usize,
        last: usize,
        out: &mut dyn Write,
        progress: &mut dyn Progress,
        abort: &AbortFlag,
    ) -> Result<ExportSummary> {
        let total = accessor.total_lines();
        if first < 1 || last < first || last > total {
            return Err(Error::InvalidRange {
                start: first,
                end: last,
                total,
            });
        }

        let start = first - 1;
        let end = last;
        let mut tracker =
            PercentTracker::new(progress, (end - start) as u64).with_min_step(PROGRESS_STEP);

        let mut lines_written = 0;
        let mut bytes_written = 0u64;
        let mut chunk_start = start;

        while chunk_start < end {
            abort.check()?;

            let chunk_end = (chunk_start + self.chunk_lines).min(end);
            for line in accessor.read_lines(chunk_start, chunk_end)? {
                if lines_written > 0 {
                    out.write_all(b"\n")?;
                    bytes_written += 1;
                }
                out.write_all(line.as_bytes())?;
                bytes_written += line.len() as u64;
                lines_written += 1;
            }

            chunk_start = chunk_end;
            tracker.update((chunk_start - start) as u64);
        }
        out.flush()?;

        tracing::debug!(first, last, lines_written, bytes_written, "Exported line range");
        Ok(ExportSummary {
            first_line: first,
            last_line: last,
            lines_written,
            bytes_written,
        })
    }
}

/// Export with the default chunk size
pub fn export_lines(
    accessor: &LineAccessor<'_>,
    first: usize,
    last: usize,
    out: &mut dyn Write,
    progress: &mut dyn Progress,
    abort: &AbortFlag,
) -> Result<ExportSummary> {
    Exporter::default().export(accessor, first, last, out, progress, abort)
}

/// Default output name: `<stem>_lines_<first>-<last>.<ext>`
pub fn export_file_name(original: &Path, first: usize, last: usize) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let ext = original
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    format!("{}_lines_{}-{}.{}", stem, first, last, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::LineIndexBuilder;
    use crate::index::reader::ChunkReader;
    use crate::index::types::LineIndex;
    use crate::utils::NoProgress;

    fn open(text: &str) -> (ChunkReader, LineIndex) {
        let reader = ChunkReader::from_bytes(text);
        let index = LineIndexBuilder::default()
            .build(&reader, &mut NoProgress, &AbortFlag::new())
            .unwrap();
        (reader, index)
    }

    #[test]
    fn test_export_range_normalizes_terminators() {
        let (reader, index) = open("one\r\ntwo\rthree\nfour\n");
        let accessor = LineAccessor::new(&reader, &index);
        let mut out = Vec::new();
        let summary = export_lines(&accessor, 2, 4, &mut out, &mut NoProgress, &AbortFlag::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "two\nthree\nfour");
        assert_eq!(summary.lines_written, 3);
        assert_eq!(summary.bytes_written, 14);
    }

    #[test]
    fn test_export_rejects_bad_ranges() {
        let (reader, index) = open("a\nb\nc");
        let accessor = LineAccessor::new(&reader, &index);
        for (first, last) in [(0, 2), (3, 2), (1, 4)] {
            let result = export_lines(&accessor, first, last, &mut Vec::new(), &mut NoProgress, &AbortFlag::new());
            assert!(matches!(result, Err(Error::InvalidRange { .. })), "{}-{}", first, last);
        }
    }

    #[test]
    fn test_export_chunks_and_progress() {
        let text: String = (1..=1000).map(|i| format!("{}\n", i)).collect();
        let (reader, index) = open(&text);
        let accessor = LineAccessor::new(&reader, &index);

        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        let mut out = Vec::new();
        Exporter::new(10)
            .export(&accessor, 1, 1000, &mut out, &mut sink, &AbortFlag::new())
            .unwrap();

        let written = String::from_utf8(out).unwrap();
        assert_eq!(written.lines().count(), 1000);
        assert!(written.ends_with("999\n1000"));
        assert!(seen.windows(2).all(|w| w[1] - w[0] >= 5 || w[1] == 100));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_export_abort() {
        let (reader, index) = open(&"x\n".repeat(100));
        let accessor = LineAccessor::new(&reader, &index);
        let abort = AbortFlag::new();
        abort.abort();
        let result = Exporter::new(10).export(&accessor, 1, 100, &mut Vec::new(), &mut NoProgress, &abort);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(Path::new("/var/log/app.log"), 10, 20),
            "app_lines_10-20.log"
        );
        assert_eq!(export_file_name(Path::new("trace.txt"), 1, 1), "trace_lines_1-1.txt");
        assert_eq!(export_file_name(Path::new("syslog"), 5, 9), "syslog_lines_5-9.log");
        assert_eq!(
            export_file_name(Path::new("server.2024.log"), 1, 2),
            "server.2024_lines_1-2.log"
        );
    }
}

//! Line terminator classification.
//!
//! A line ends at `\n`, at `\r\n` (one two-byte terminator), or at a `\r` not
//! followed by `\n`. Index building, line access and search batch splitting
//! all go through this module so that line numbers and byte offsets agree.

use memchr::memchr2_iter;

/// Terminator that ended a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Lf,
    Cr,
    CrLf,
    /// Unterminated tail at end of input
    None,
}

impl Terminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminator::Lf => "\n",
            Terminator::Cr => "\r",
            Terminator::CrLf => "\r\n",
            Terminator::None => "",
        }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Terminator::None)
    }
}

/// A line borrowed from a larger text, without its terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub terminator: Terminator,
}

/// Iterator over the lines of a text.
///
/// Yields a final unterminated line only if it is non-empty, so `"a\n"` is
/// one line and `""` is none.
pub struct LineSplit<'a> {
    text: &'a str,
    pos: usize,
}

/// Split `text` into lines using the shared terminator rule
pub fn split_lines(text: &str) -> LineSplit<'_> {
    LineSplit { text, pos: 0 }
}

impl<'a> Iterator for LineSplit<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        let bytes = self.text.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        match memchr2_iter(b'\n', b'\r', &bytes[start..]).next() {
            Some(rel) => {
                let at = start + rel;
                let terminator = if bytes[at] == b'\n' {
                    Terminator::Lf
                } else if bytes.get(at + 1) == Some(&b'\n') {
                    Terminator::CrLf
                } else {
                    Terminator::Cr
                };
                self.pos = at + terminator.len();
                Some(Line {
                    text: &self.text[start..at],
                    terminator,
                })
            }
            None => {
                self.pos = bytes.len();
                Some(Line {
                    text: &self.text[start..],
                    terminator: Terminator::None,
                })
            }
        }
    }
}

/// Incremental byte-level terminator scanner.
///
/// Feeds arbitrary chunks of a stream and reports the absolute offset just
/// past every terminator. A `\r` at the very end of a chunk is held back until
/// the next byte is seen, so a `\r\n` split across two chunks still counts
/// once.
#[derive(Debug, Default)]
pub struct TerminatorScanner {
    /// Absolute offset of a trailing `\r` not yet classified
    pending_cr: Option<u64>,
}

impl TerminatorScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `chunk`, whose first byte sits at absolute offset `base`
    pub fn scan(&mut self, chunk: &[u8], base: u64, mut emit: impl FnMut(u64)) {
        let mut skip_lf_at = None;

        if let Some(cr_at) = self.pending_cr.take() {
            match chunk.first() {
                Some(b'\n') => {
                    emit(cr_at + 2);
                    skip_lf_at = Some(0);
                }
                Some(_) => emit(cr_at + 1),
                None => {
                    self.pending_cr = Some(cr_at);
                    return;
                }
            }
        }

        let mut iter = memchr2_iter(b'\n', b'\r', chunk);
        while let Some(i) = iter.next() {
            if skip_lf_at == Some(i) {
                continue;
            }
            if chunk[i] == b'\n' {
                emit(base + i as u64 + 1);
            } else if i + 1 == chunk.len() {
                self.pending_cr = Some(base + i as u64);
            } else if chunk[i + 1] == b'\n' {
                emit(base + i as u64 + 2);
                // The '\n' of this pair is the next hit
                iter.next();
            } else {
                emit(base + i as u64 + 1);
            }
        }
    }

    /// Flush a `\r` held back at end of stream
    pub fn finish(&mut self, emit: impl FnOnce(u64)) {
        if let Some(cr_at) = self.pending_cr.take() {
            emit(cr_at + 1);
        }
    }
}

/// Remove any trailing run of `\r`/`\n` characters
pub fn strip_terminators(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        split_lines(input).map(|l| l.text).collect()
    }

    fn scan_all(chunks: &[&str]) -> Vec<u64> {
        let mut scanner = TerminatorScanner::new();
        let mut out = Vec::new();
        let mut base = 0u64;
        for chunk in chunks {
            scanner.scan(chunk.as_bytes(), base, |o| out.push(o));
            base += chunk.len() as u64;
        }
        scanner.finish(|o| out.push(o));
        out
    }

    #[test]
    fn test_split_mixed_terminators() {
        let lines: Vec<_> = split_lines("a\nBB\r\nccc").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "a");
        assert_eq!(lines[0].terminator, Terminator::Lf);
        assert_eq!(lines[1].terminator, Terminator::CrLf);
        assert_eq!(lines[2].text, "ccc");
        assert!(lines[2].terminator.is_none());
    }

    #[test]
    fn test_split_lone_cr() {
        assert_eq!(texts("a\rb\r"), vec!["a", "b"]);
        assert_eq!(texts("\r\r\n\n"), vec!["", "", ""]);
    }

    #[test]
    fn test_split_trailing_terminator_adds_no_line() {
        assert_eq!(texts("x\n"), vec!["x"]);
        assert!(texts("").is_empty());
        assert_eq!(texts("\n"), vec![""]);
    }

    #[test]
    fn test_split_reconstructs_input() {
        let input = "one\r\ntwo\rthree\n\nfour";
        let rebuilt: String = split_lines(input)
            .map(|l| format!("{}{}", l.text, l.terminator.as_str()))
            .collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_scanner_single_chunk() {
        assert_eq!(scan_all(&["a\nBB\r\nccc"]), vec![2, 6]);
        assert_eq!(scan_all(&["a\rb"]), vec![2]);
    }

    #[test]
    fn test_scanner_crlf_split_across_chunks() {
        assert_eq!(scan_all(&["ab\r", "\ncd"]), vec![4]);
    }

    #[test]
    fn test_scanner_cr_at_chunk_end_then_text() {
        assert_eq!(scan_all(&["ab\r", "cd"]), vec![3]);
    }

    #[test]
    fn test_scanner_cr_at_end_of_stream() {
        assert_eq!(scan_all(&["ab\r"]), vec![3]);
        assert_eq!(scan_all(&["ab\r", ""]), vec![3]);
    }

    #[test]
    fn test_scanner_matches_splitter_for_every_split_point() {
        let input = "x\r\ny\rz\n\r\n\rw";
        let expected = scan_all(&[input]);
        for cut in 0..=input.len() {
            let (a, b) = input.split_at(cut);
            assert_eq!(scan_all(&[a, b]), expected, "cut at {}", cut);
        }
    }

    #[test]
    fn test_strip_terminators() {
        assert_eq!(strip_terminators("abc\r\n"), "abc");
        assert_eq!(strip_terminators("abc\n\n"), "abc");
        assert_eq!(strip_terminators("abc"), "abc");
    }
}

use crate::error::{Error, Result};
use crate::query::predicate::TermFlags;
use regex::{Regex, RegexBuilder};

/// A literal search term compiled to a regex.
///
/// The term is always escaped, so `.` or `*` in user input match themselves.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    regex: Regex,
}

impl TermMatcher {
    pub fn new(term: &str, flags: TermFlags) -> Result<Self> {
        let escaped = regex::escape(term);
        let pattern = if flags.whole_word {
            format!(r"\b{}\b", escaped)
        } else {
            escaped
        };

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!flags.case_sensitive)
            .build()
            .map_err(|e| Error::InvalidQuery(format!("cannot compile {:?}: {}", term, e)))?;

        Ok(Self { regex })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Byte ranges of every occurrence in `line`
    pub fn find_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(line)
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

//! Log level detection and line rendering for display

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Severity tag inferred from a line's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in order; the first level whose pattern matches wins
const LEVEL_PATTERNS: [(LogLevel, &str, &str); 5] = [
    (
        LogLevel::Error,
        "ERROR|FAIL|FAILURE|FATAL|CRITICAL|ALERT|EMERGENCY|EE",
        "ERROR|EROR|ERR|FATAL|FATL|FTL|E|F",
    ),
    (LogLevel::Warning, "WARNING|WARN|WW", "WARNING|WARN|WRN|W"),
    (LogLevel::Info, "INFO|INFORMATION|NOTICE|II", "INFO|INF|I"),
    (LogLevel::Debug, "DEBUG", "DEBUG|DBG|D"),
    (LogLevel::Trace, "TRACE|VERBOSE", "TRACE|VERBOSE|V"),
];

fn level_regexes() -> &'static [(LogLevel, Regex)] {
    static REGEXES: OnceLock<Vec<(LogLevel, Regex)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        LEVEL_PATTERNS
            .iter()
            .filter_map(|&(level, words, brackets)| {
                let pattern = format!(r"(?i)\b(?:{})\b|\[\s*(?:{})\s*\]", words, brackets);
                Regex::new(&pattern).ok().map(|re| (level, re))
            })
            .collect()
    })
}

/// Severity of a log line, from level words (`ERROR`, `warn`) or bracketed
/// tags (`[E]`, `[ DBG ]`)
pub fn detect_log_level(line: &str) -> Option<LogLevel> {
    level_regexes()
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(level, _)| *level)
}

/// Lines to render, numbered from `start_line_number`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub job_id: u64,
    pub lines: Vec<String>,
    pub start_line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedLine {
    pub line_number: usize,
    pub markup: String,
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightResponse {
    Rendered {
        job_id: u64,
        rendered_lines: Vec<RenderedLine>,
    },
    Failed {
        job_id: u64,
        error: String,
    },
}

/// Turns raw lines into display markup
pub trait Highlighter {
    fn highlight(&self, request: &HighlightRequest) -> HighlightResponse;
}

/// HTML-escapes each line and wraps it in a span classed by log level
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, request: &HighlightRequest) -> HighlightResponse {
        let rendered_lines = request
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let level = detect_log_level(line);
                let escaped = escape_html(line);
                let markup = match level {
                    Some(level) => format!(r#"<span class="log-{}">{}</span>"#, level, escaped),
                    None => escaped,
                };
                RenderedLine {
                    line_number: request.start_line_number + i,
                    markup,
                    level,
                }
            })
            .collect();

        HighlightResponse::Rendered {
            job_id: request.job_id,
            rendered_lines,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_level_patterns_compile() {
        assert_eq!(level_regexes().len(), LEVEL_PATTERNS.len());
    }

    #[test]
    fn test_detect_level_words() {
        assert_eq!(detect_log_level("2024-01-01 ERROR disk full"), Some(LogLevel::Error));
        assert_eq!(detect_log_level("request failure"), Some(LogLevel::Error));
        assert_eq!(detect_log_level("Warning: slow"), Some(LogLevel::Warning));
        assert_eq!(detect_log_level("notice: started"), Some(LogLevel::Info));
        assert_eq!(detect_log_level("debug value=3"), Some(LogLevel::Debug));
        assert_eq!(detect_log_level("VERBOSE dump"), Some(LogLevel::Trace));
        assert_eq!(detect_log_level("plain text"), None);
    }

    #[test]
    fn test_detect_level_brackets() {
        assert_eq!(detect_log_level("[E] boom"), Some(LogLevel::Error));
        assert_eq!(detect_log_level("[ wrn ] hmm"), Some(LogLevel::Warning));
        assert_eq!(detect_log_level("[I] ok"), Some(LogLevel::Info));
        assert_eq!(detect_log_level("[DBG] x"), Some(LogLevel::Debug));
        assert_eq!(detect_log_level("[V] y"), Some(LogLevel::Trace));
    }

    #[test]
    fn test_error_wins_over_lower_levels() {
        assert_eq!(detect_log_level("INFO retry failed with ERROR"), Some(LogLevel::Error));
    }

    #[test]
    fn test_words_need_boundaries() {
        assert_eq!(detect_log_level("terrorist"), None);
        assert_eq!(detect_log_level("information"), Some(LogLevel::Info));
    }

    #[test]
    fn test_plain_highlighter() {
        let request = HighlightRequest {
            job_id: 4,
            lines: vec!["<b> & ERROR".to_string(), "quiet".to_string()],
            start_line_number: 10,
        };
        let HighlightResponse::Rendered { job_id, rendered_lines } = PlainHighlighter.highlight(&request) else {
            panic!("expected rendered lines");
        };
        assert_eq!(job_id, 4);
        assert_eq!(rendered_lines[0].line_number, 10);
        assert_eq!(
            rendered_lines[0].markup,
            r#"<span class="log-error">&lt;b&gt; &amp; ERROR</span>"#
        );
        assert_eq!(rendered_lines[1].markup, "quiet");
        assert_eq!(rendered_lines[1].level, None);
    }
}

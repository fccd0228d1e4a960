//! Terminal output for pages and search matches

use crate::highlight::{detect_log_level, LogLevel};
use crate::index::accessor::Page;
use crate::utils::format_number;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, WriteColor};

/// Longest match preview before the line is cut around the first hit
const MAX_PREVIEW_LENGTH: usize = 300;
const PREVIEW_CONTEXT_BEFORE: usize = 50;
const PREVIEW_CONTEXT_AFTER: usize = 100;

pub fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn level_color(level: LogLevel) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        LogLevel::Error => spec.set_fg(Some(Color::Red)).set_bold(true),
        LogLevel::Warning => spec.set_fg(Some(Color::Yellow)),
        LogLevel::Info => spec.set_fg(Some(Color::Blue)),
        LogLevel::Debug => spec.set_fg(Some(Color::Cyan)),
        LogLevel::Trace => spec.set_dimmed(true),
    };
    spec
}

fn write_line_number(out: &mut dyn WriteColor, line_number: usize, width: usize, sep: char) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{:>width$}", line_number, width = width)?;
    out.reset()?;
    write!(out, "{}", sep)
}

/// Print a page, numbering lines from 1 and colouring them by log level
pub fn print_page(out: &mut dyn WriteColor, page: &Page, total_pages: usize, lines: &[String]) -> io::Result<()> {
    let width = page.end_line.to_string().len();

    for (i, line) in lines.iter().enumerate() {
        write_line_number(out, page.start_line + i + 1, width, ':')?;
        match detect_log_level(line) {
            Some(level) => {
                out.set_color(&level_color(level))?;
                write!(out, "{}", line)?;
                out.reset()?;
                writeln!(out)?;
            }
            None => writeln!(out, "{}", line)?,
        }
    }

    out.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(
        out,
        "-- page {} of {} (lines {}-{}) --",
        format_number(page.number),
        format_number(total_pages),
        format_number(page.start_line + 1),
        format_number(page.end_line)
    )?;
    out.reset()?;
    Ok(())
}

/// Print one matching line with every highlighted range in bold red.
///
/// Long lines are cut to a window around the first highlight.
pub fn print_match_line(
    out: &mut dyn WriteColor,
    line_number: usize,
    content: &str,
    ranges: &[(usize, usize)],
) -> io::Result<()> {
    write_line_number(out, line_number, 0, ':')?;

    let (start, end) = preview_bounds(content, ranges);
    if start > 0 {
        write!(out, "...")?;
    }

    let mut pos = start;
    for &(from, to) in ranges {
        let from = from.clamp(pos, end);
        let to = to.clamp(from, end);
        if from == to {
            continue;
        }
        write!(out, "{}", &content[pos..from])?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", &content[from..to])?;
        out.reset()?;
        pos = to;
    }
    write!(out, "{}", &content[pos..end])?;

    if end < content.len() {
        write!(out, "...")?;
    }
    writeln!(out)
}

fn preview_bounds(content: &str, ranges: &[(usize, usize)]) -> (usize, usize) {
    if content.len() <= MAX_PREVIEW_LENGTH {
        return (0, content.len());
    }
    let (first, first_end) = ranges.first().copied().unwrap_or((0, 0));
    let start = floor_char_boundary(content, first.saturating_sub(PREVIEW_CONTEXT_BEFORE));
    let end = floor_char_boundary(content, (first_end + PREVIEW_CONTEXT_AFTER).min(content.len()));
    (start, end.max(start))
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Print the number of matching lines
pub fn print_match_count(out: &mut dyn Write, count: usize) -> io::Result<()> {
    writeln!(out, "{}", count)
}

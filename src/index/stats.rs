use crate::index::types::IndexStats;
use crate::utils::{format_file_size, format_number};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Print a summary of an indexed file
pub fn show_stats(
    out: &mut dyn Write,
    path: &Path,
    stats: &IndexStats,
    elapsed: Duration,
) -> io::Result<()> {
    writeln!(out, "Index Statistics")?;
    writeln!(out, "================")?;
    writeln!(out)?;
    writeln!(out, "File:             {}", path.display())?;
    writeln!(out, "File size:        {}", format_file_size(stats.file_size))?;
    writeln!(out, "Lines:            {}", format_number(stats.total_lines))?;
    writeln!(
        out,
        "Longest line:     {}",
        format_file_size(stats.longest_line_bytes)
    )?;
    writeln!(out, "Mean line:        {:.1} bytes", stats.mean_line_bytes)?;
    writeln!(out, "Indexed in:       {:.2?}", elapsed)?;
    Ok(())
}

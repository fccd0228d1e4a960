use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use loglens::config::{AppConfig, get_config_path};
use loglens::export::{Exporter, export_file_name};
use loglens::index::stats::show_stats;
use loglens::output;
use loglens::query::{QueryBuilder, TermFlags};
use loglens::session::Session;
use loglens::utils::progress::{BarProgress, percent_bar};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use termcolor::StandardStream;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loglens")]
#[command(about = "Page through and search text files of any size")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file and print line statistics
    Index {
        /// File to index
        file: PathBuf,
    },
    /// Print one page of a file
    Page {
        /// File to read
        file: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Lines per page (defaults to the configured value)
        #[arg(long)]
        lines_per_page: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Search a file and print matching lines
    Search {
        /// File to search
        file: PathBuf,

        /// Search term
        term: Option<String>,

        /// Match whole words only
        #[arg(short = 'w', long)]
        whole_word: bool,

        /// Match case exactly
        #[arg(short = 's', long)]
        case_sensitive: bool,

        /// Additional term every matching line must contain
        #[arg(short = 'I', long = "include")]
        include: Vec<String>,

        /// Term that excludes a line when present
        #[arg(short = 'X', long = "exclude")]
        exclude: Vec<String>,

        /// Evaluate on the calling thread instead of the worker
        #[arg(long)]
        inline: bool,

        /// Print only the number of matching lines
        #[arg(short, long)]
        count: bool,

        /// Print at most this many matches
        #[arg(short, long)]
        limit: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Write a range of lines to a new file
    Export {
        /// Source file
        file: PathBuf,

        /// First line to export (1-based)
        #[arg(long)]
        from: usize,

        /// Last line to export (inclusive)
        #[arg(long)]
        to: usize,

        /// Output path (defaults to <name>_lines_<from>-<to>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Commands::Index { file } => run_index(&file, config)?,
        Commands::Page {
            file,
            page,
            lines_per_page,
            no_color,
        } => run_page(&file, config, page, lines_per_page, !no_color)?,
        Commands::Search {
            file,
            term,
            whole_word,
            case_sensitive,
            include,
            exclude,
            inline,
            count,
            limit,
            no_color,
        } => {
            let flags = TermFlags {
                whole_word,
                case_sensitive,
            };
            let mut builder = QueryBuilder::new().main_term(term.as_deref().unwrap_or(""), flags);
            for term in &include {
                builder = builder.include(term, flags);
            }
            for term in &exclude {
                builder = builder.exclude(term, flags);
            }
            let predicate = builder.build()?;

            let mut config = config;
            if inline {
                config.use_worker = false;
            }
            run_search(&file, config, &predicate, count, limit, !no_color)?;
        }
        Commands::Export { file, from, to, output } => run_export(&file, config, from, to, output)?,
        Commands::Config => {
            let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("{}", json);
            if let Some(path) = cli.config.or_else(get_config_path) {
                eprintln!("Config file: {}", path.display());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("loglens=debug")
    } else {
        EnvFilter::try_from_env("LOGLENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn open_session(file: &Path, config: AppConfig) -> Result<Session> {
    let bar = percent_bar("Indexing");
    let session = Session::open(file, config, &mut BarProgress(bar.clone()))
        .with_context(|| format!("Failed to open {}", file.display()))?;
    bar.finish_and_clear();
    Ok(session)
}

fn run_index(file: &Path, config: AppConfig) -> Result<()> {
    let started = Instant::now();
    let session = open_session(file, config)?;
    let stats = session.index().stats();
    show_stats(&mut io::stdout().lock(), file, &stats, started.elapsed())?;
    Ok(())
}

fn run_page(
    file: &Path,
    config: AppConfig,
    page: usize,
    lines_per_page: Option<usize>,
    color: bool,
) -> Result<()> {
    let lines_per_page = lines_per_page.unwrap_or_else(|| config.effective_lines_per_page());
    let session = open_session(file, config)?;
    let accessor = session.accessor();

    let total_pages = accessor.total_pages(lines_per_page);
    let Some(page) = accessor.page(page, lines_per_page) else {
        bail!("Page {} is out of range (1-{})", page, total_pages);
    };
    let lines = accessor.read_page(&page)?;

    let mut stdout = StandardStream::stdout(output::color_choice(color));
    output::print_page(&mut stdout, &page, total_pages, &lines)?;
    Ok(())
}

fn run_search(
    file: &Path,
    config: AppConfig,
    predicate: &loglens::query::SearchPredicate,
    count: bool,
    limit: Option<usize>,
    color: bool,
) -> Result<()> {
    let mut session = open_session(file, config)?;

    let bar = percent_bar("Searching");
    let matches = session
        .search(predicate, &mut BarProgress(bar.clone()))
        .context("Search failed")?
        .clone();
    bar.finish_and_clear();

    if count {
        output::print_match_count(&mut io::stdout().lock(), matches.len())?;
        return Ok(());
    }

    let compiled = predicate.compile()?;
    let accessor = session.accessor();
    let mut stdout = StandardStream::stdout(output::color_choice(color));
    for line in matches.iter().take(limit.unwrap_or(usize::MAX)) {
        let text = accessor.read_line(line);
        let ranges = compiled.highlight_ranges(&text);
        output::print_match_line(&mut stdout, line + 1, &text, &ranges)?;
    }
    Ok(())
}

fn run_export(
    file: &Path,
    config: AppConfig,
    from: usize,
    to: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let chunk_lines = config.effective_export_chunk_lines();
    let session = open_session(file, config)?;
    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(file, from, to)));

    let handle = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(handle);

    let bar = percent_bar("Exporting");
    let summary = Exporter::new(chunk_lines).export(
        &session.accessor(),
        from,
        to,
        &mut writer,
        &mut BarProgress(bar.clone()),
        &session.abort_handle(),
    )?;
    writer.flush()?;
    bar.finish_and_clear();

    eprintln!(
        "Wrote {} lines to {}",
        loglens::utils::format_number(summary.lines_written),
        output.display()
    );
    Ok(())
}

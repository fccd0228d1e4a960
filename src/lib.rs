//! # loglens - Large log file viewer core
//!
//! loglens opens text files far larger than memory, indexes every line start
//! in one streaming pass and then serves random line access, paging and
//! full-file search without loading the file.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Byte sources, line terminator rules, index building and line access
//! - [`query`] - Search predicates, the batch search engine and its worker thread
//! - [`window`] - Sliding window over large match lists
//! - [`session`] - One opened file with its current search
//! - [`export`] - Writing a line range to a new file
//! - [`highlight`] - Log level detection and line rendering
//! - [`output`] - Terminal output for the CLI
//! - [`config`] - User configuration
//! - [`utils`] - Abort flags, progress reporting and formatting
//!
//! ## Quick Start
//!
//! ```no_run
//! use loglens::config::AppConfig;
//! use loglens::query::{SearchPredicate, TermFlags};
//! use loglens::session::Session;
//! use loglens::utils::NoProgress;
//! use std::path::Path;
//!
//! # fn main() -> loglens::Result<()> {
//! let mut session = Session::open(Path::new("/var/log/app.log"), AppConfig::default(), &mut NoProgress)?;
//! println!("{} lines", session.total_lines());
//!
//! let query = SearchPredicate::simple("timeout", TermFlags::default())?;
//! let matches = session.search(&query, &mut NoProgress)?.clone();
//! for line in matches.iter().take(10) {
//!     println!("{}: {}", line + 1, session.accessor().read_line(line));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Line model
//!
//! A line ends at `\n`, `\r\n` or a lone `\r`. Index building, line access and
//! search all split text with the same rule, so line numbers and byte offsets
//! always agree. An empty file is one empty line.

pub mod config;
pub mod error;
pub mod export;
pub mod highlight;
pub mod index;
pub mod output;
pub mod query;
pub mod session;
pub mod utils;
pub mod window;

pub use error::{Error, Result};

use crate::window::WindowConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "loglens";
const CONFIG_FILE: &str = "config.json";

/// Bytes read per index-building chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// Lines per search batch
pub const DEFAULT_LINES_PER_BATCH: usize = 5000;
/// Lines shown per page
pub const DEFAULT_LINES_PER_PAGE: usize = 1000;
/// Lines read per export chunk
pub const DEFAULT_EXPORT_CHUNK_LINES: usize = 10_000;

/// Application configuration stored in the user config directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bytes read per chunk while building the line index
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Lines handed to the search predicate per batch
    #[serde(default = "default_lines_per_batch")]
    pub lines_per_batch: usize,

    /// Lines per page for pagination and jump-to-match
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,

    /// Evaluate search batches on a dedicated worker thread
    #[serde(default = "default_use_worker")]
    pub use_worker: bool,

    /// Memory-map the file instead of using positional reads. Truncation is
    /// checked before each read, but a file shrinking during a read can
    /// still crash the process with SIGBUS.
    #[serde(default)]
    pub use_mmap: bool,

    /// Lines read per chunk when exporting a line range
    #[serde(default = "default_export_chunk_lines")]
    pub export_chunk_lines: usize,

    /// Result window sizing
    #[serde(default)]
    pub window: WindowConfig,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_lines_per_batch() -> usize {
    DEFAULT_LINES_PER_BATCH
}

fn default_lines_per_page() -> usize {
    DEFAULT_LINES_PER_PAGE
}

fn default_use_worker() -> bool {
    true
}

fn default_export_chunk_lines() -> usize {
    DEFAULT_EXPORT_CHUNK_LINES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            lines_per_batch: default_lines_per_batch(),
            lines_per_page: default_lines_per_page(),
            use_worker: default_use_worker(),
            use_mmap: false,
            export_chunk_lines: default_export_chunk_lines(),
            window: WindowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from the user config directory, or return default if not found
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the user config directory
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Chunk size with zero resolved to the default
    pub fn effective_chunk_size(&self) -> usize {
        nonzero_or(self.chunk_size, DEFAULT_CHUNK_SIZE)
    }

    pub fn effective_lines_per_batch(&self) -> usize {
        nonzero_or(self.lines_per_batch, DEFAULT_LINES_PER_BATCH)
    }

    pub fn effective_lines_per_page(&self) -> usize {
        nonzero_or(self.lines_per_page, DEFAULT_LINES_PER_PAGE)
    }

    pub fn effective_export_chunk_lines(&self) -> usize {
        nonzero_or(self.export_chunk_lines, DEFAULT_EXPORT_CHUNK_LINES)
    }
}

fn nonzero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

/// Get the path to the config file (`<config_dir>/loglens/config.json`)
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_NAME).join(CONFIG_FILE))
}

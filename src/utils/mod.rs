//! Utility functions shared by the core and the CLI.
//!
//! ## Modules
//!
//! - [`signal`] - Abort flag and percentage progress reporting
//! - [`progress`] - Terminal progress bars (no-op without the `progress` feature)
//! - [`format`] - Human-readable sizes and counts

pub mod format;
pub mod progress;
pub mod signal;

pub use format::*;
pub use signal::*;

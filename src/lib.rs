//! # srcpatch
//!
//! Batch-edits the source files of a directory tree in place.
//!
//! ## Features
//!
//! - Recursive file selection by extension, with directory and file name exclusions
//! - Prepends an `#include "<header>"` line (typically a precompiled header)
//! - Converts files to UTF-8, detecting the source encoding in-process
//! - Atomic write-back with optional backups and a dry-run mode
//!
//! ## Quick Start
//!
//! ```no_run
//! use srcpatch::{Config, FileFilterConfig, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./src")
//!     .file_filter_config(
//!         FileFilterConfig::new()
//!             .extensions(vec!["cpp".into(), "h".into()])
//!             .exclude_directories(vec!["third_party".into()]),
//!     )
//!     .normalize_encoding(true)
//!     .prepend_header("stdafx.h")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Scanner**: walks the tree and selects files
//! 2. **Workers**: transform each selected file in order, encoding first
//! 3. **Pipeline**: drives the workers and isolates per-file failures

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod file;
mod filter;
mod pipeline;
mod scanner;

pub mod encoding;
pub mod header;
pub mod worker;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use file::{FileRef, FileWriter};
pub use filter::FileFilterConfig;
pub use pipeline::{FileFailure, Pipeline, PipelineStats};
pub use scanner::{ScanStats, Selection, select};
pub use worker::{Outcome, Worker, WorkerKind};

/// Runs the complete pipeline with the given configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
///
/// # Examples
///
/// ```no_run
/// use srcpatch::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .normalize_encoding(true)
///     .build()?;
///
/// let stats = run(config)?;
/// println!("Modified {} files", stats.modified_files);
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}

//! File selection criteria.
//!
//! Decides which regular files are handed to the workers and which
//! directories the scanner descends into. Exclusions are matched against
//! the bare entry name, never the full path, so an excluded directory name
//! prunes every subtree that carries it.
//!
//! Backups and temporary files left by the writer are never selected.

use crate::error::{Error, Result};
use crate::file::{BACKUP_MARKER, TEMP_SUFFIX};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration for file selection.
///
/// An empty extension list selects every file regardless of extension.
#[derive(Debug, Clone, Default)]
pub struct FileFilterConfig {
    extensions: Vec<String>,
    exclude_directories: Vec<String>,
    exclude_files: Vec<String>,
}

impl FileFilterConfig {
    /// Creates an empty configuration that selects every file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extension allow-list. Leading dots are ignored.
    #[must_use]
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Sets directory names to skip.
    #[must_use]
    pub fn exclude_directories(mut self, names: Vec<String>) -> Self {
        self.exclude_directories = names;
        self
    }

    /// Sets file names to skip.
    #[must_use]
    pub fn exclude_files(mut self, names: Vec<String>) -> Self {
        self.exclude_files = names;
        self
    }

    /// Returns the normalized extension allow-list.
    #[must_use]
    pub fn allowed_extensions(&self) -> BTreeSet<String> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FileFilter {
    extensions: BTreeSet<String>,
    exclude_files: GlobSet,
    exclude_directories: GlobSet,
    artifacts: GlobSet,
}

impl FileFilter {
    /// Compiles the name patterns of a selection configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclusion name is not a valid pattern.
    pub(crate) fn new(config: &FileFilterConfig) -> Result<Self> {
        Ok(Self {
            extensions: config.allowed_extensions(),
            exclude_files: Self::build_globset(&config.exclude_files)?,
            exclude_directories: Self::build_globset(&config.exclude_directories)?,
            artifacts: Self::build_globset(&[
                format!("*{BACKUP_MARKER}[0-9]*"),
                format!(".*{TEMP_SUFFIX}"),
            ])?,
        })
    }

    fn build_globset(names: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let glob = GlobBuilder::new(name)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::invalid_pattern(name, e.to_string()))?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build name matcher: {e}")))
    }

    /// Returns true if a regular file at `path` should be selected.
    pub(crate) fn matches_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };

        if self.exclude_files.is_match(name) || self.artifacts.is_match(name) {
            return false;
        }

        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext))
    }

    /// Returns true if the scanner should recurse into the directory at `path`.
    pub(crate) fn should_descend(&self, path: &Path) -> bool {
        path.file_name()
            .is_none_or(|name| !self.exclude_directories.is_match(name))
    }
}

use crate::{
    config::Config,
    error::{Error, Result},
    file::FileRef,
    filter::{FileFilter, FileFilterConfig},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanStats {
    /// Regular files encountered
    pub total_files: usize,

    /// Files that passed the filter
    pub selected_files: usize,

    /// Directories pruned by name
    pub pruned_directories: usize,

    /// Unreadable or missing entries
    pub errors: usize,
}

/// Result of a directory scan.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    /// Selected files in walk order
    pub files: Vec<FileRef>,

    /// Scan statistics
    pub stats: ScanStats,
}

/// Walks a directory tree and selects files for processing.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    file_filter: FileFilter,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the exclusion patterns are invalid.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Self::with_filter(&config.root_dir, &config.file_filter_config)
    }

    pub(crate) fn with_filter(root: &Path, filter: &FileFilterConfig) -> Result<Self> {
        Ok(Self {
            root_dir: root.to_path_buf(),
            file_filter: FileFilter::new(filter)?,
        })
    }

    /// Walks the root directory depth-first and returns the selected files.
    ///
    /// Entries are visited in file-name order within each directory, so the
    /// result is stable between runs. A missing root or an unreadable
    /// subdirectory is logged and skipped; it never aborts the scan.
    pub(crate) fn scan(&self) -> Selection {
        let mut selection = Selection::default();

        if !self.root_dir.is_dir() {
            warn!("{}", Error::directory_not_found(&self.root_dir));
            selection.stats.errors += 1;
            return selection;
        }

        debug!("Starting scan of {}", self.root_dir.display());

        let filter = &self.file_filter;
        let mut pruned = 0;
        let walker = WalkDir::new(&self.root_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let descend = filter.should_descend(entry.path());
                if !descend {
                    trace!("Pruning directory: {}", entry.path().display());
                    pruned += 1;
                }
                descend
            });

        for result in walker {
            match result {
                Ok(entry) if entry.file_type().is_file() => {
                    selection.stats.total_files += 1;

                    if filter.matches_file(entry.path()) {
                        trace!("Selected: {}", entry.path().display());
                        selection
                            .files
                            .push(FileRef::new(entry.into_path(), &self.root_dir));
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Walk error: {}", Error::from(e));
                    selection.stats.errors += 1;
                }
            }
        }

        selection.stats.pruned_directories = pruned;
        selection.stats.selected_files = selection.files.len();

        debug!(
            "Scan complete: {} files, {} selected, {} directories pruned, {} errors",
            selection.stats.total_files,
            selection.stats.selected_files,
            selection.stats.pruned_directories,
            selection.stats.errors
        );

        selection
    }
}

/// Selects the files under `root` that pass `filter`.
///
/// # Errors
///
/// Returns an error only if the filter's name patterns are invalid; walk
/// problems are logged and yield a partial result.
///
/// # Examples
///
/// ```no_run
/// use srcpatch::{select, FileFilterConfig};
///
/// let filter = FileFilterConfig::new()
///     .extensions(vec!["cpp".into(), "h".into()])
///     .exclude_directories(vec!["third_party".into()]);
///
/// for file in select("./src", &filter)? {
///     println!("{}", file.relative_path);
/// }
/// # Ok::<(), srcpatch::Error>(())
/// ```
pub fn select(root: impl AsRef<Path>, filter: &FileFilterConfig) -> Result<Vec<FileRef>> {
    Ok(Scanner::with_filter(root.as_ref(), filter)?.scan().files)
}

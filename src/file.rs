use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Suffix of the temporary file written next to a file being replaced.
pub(crate) const TEMP_SUFFIX: &str = ".srcpatch.tmp";

/// Marker between a file name and the timestamp of its backup copy.
pub(crate) const BACKUP_MARKER: &str = ".backup.";

/// A selected regular file.
///
/// Only the location is kept; the pipeline reads the content once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Path to the file as found by the scanner
    pub absolute_path: PathBuf,

    /// Path relative to the scan root, for display
    pub relative_path: String,
}

impl FileRef {
    /// Creates a file reference, computing the display path against `root`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, root: &Path) -> Self {
        let absolute_path = path.into();
        let relative_path = pathdiff::diff_paths(&absolute_path, root)
            .unwrap_or_else(|| absolute_path.clone())
            .to_string_lossy()
            .to_string();

        Self {
            absolute_path,
            relative_path,
        }
    }

    /// Returns the path on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.absolute_path
    }

    /// Reads the raw bytes of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        fs::read(&self.absolute_path).map_err(|e| Error::io(&self.absolute_path, e))
    }
}

/// Replaces the content of files in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter {
    dry_run: bool,
    backup_existing: bool,
}

impl FileWriter {
    /// Creates a writer.
    #[must_use]
    pub const fn new(dry_run: bool, backup_existing: bool) -> Self {
        Self {
            dry_run,
            backup_existing,
        }
    }

    /// Returns true if writes are suppressed.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Replaces the content of `file` with `content`.
    ///
    /// # Process
    ///
    /// 1. Refuses read-only targets
    /// 2. Creates a backup if enabled
    /// 3. Writes content to a sibling temporary file
    /// 4. Syncs the temporary file and gives it the target's permissions
    /// 5. Renames the temporary file over the target
    ///
    /// A failure at any step leaves the original file intact and removes
    /// the temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the target is read-only or any step fails.
    pub fn replace(&self, file: &FileRef, content: &[u8]) -> Result<()> {
        let path = file.path();

        if self.dry_run {
            debug!("Dry run: not writing {} bytes to {}", content.len(), path.display());
            return Ok(());
        }

        let permissions = fs::metadata(path)
            .map_err(|e| Error::io(path, e))?
            .permissions();

        if permissions.readonly() {
            return Err(Error::write(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "file is read-only"),
            ));
        }

        if self.backup_existing {
            Self::backup_file(path)?;
        }

        let temp_path = Self::temp_path(path)?;
        let result = Self::write_temp(&temp_path, content)
            .and_then(|()| {
                fs::set_permissions(&temp_path, permissions)
                    .map_err(|e| Error::write(&temp_path, e))
            })
            .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::write(path, e)));

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }

        result
    }

    fn write_temp(temp_path: &Path, content: &[u8]) -> Result<()> {
        let mut temp_file =
            fs::File::create(temp_path).map_err(|e| Error::write(temp_path, e))?;

        temp_file
            .write_all(content)
            .map_err(|e| Error::write(temp_path, e))?;

        temp_file
            .sync_all()
            .map_err(|e| Error::write(temp_path, e))
    }

    fn temp_path(path: &Path) -> Result<PathBuf> {
        let filename = path
            .file_name()
            .ok_or_else(|| Error::config(format!("Invalid file path: {}", path.display())))?
            .to_string_lossy();

        Ok(path.with_file_name(format!(".{filename}{TEMP_SUFFIX}")))
    }

    /// Creates a timestamped backup of an existing file.
    fn backup_file(path: &Path) -> Result<PathBuf> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let filename = path
            .file_name()
            .ok_or_else(|| Error::config(format!("Invalid file path: {}", path.display())))?
            .to_string_lossy();

        let backup_path = path.with_file_name(format!("{filename}{BACKUP_MARKER}{timestamp}"));

        fs::copy(path, &backup_path).map_err(|e| Error::write(&backup_path, e))?;

        debug!("Created backup: {}", backup_path.display());
        Ok(backup_path)
    }
}

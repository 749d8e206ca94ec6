use crate::error::{Error, Result};
use crate::filter::{FileFilter, FileFilterConfig};
use encoding_rs::Encoding;
use std::path::PathBuf;

/// Configuration for a srcpatch run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to scan for files
    pub root_dir: PathBuf,

    /// File selection criteria
    pub file_filter_config: FileFilterConfig,

    /// Header name to include at the top of every selected file
    pub prepend_header: Option<String>,

    /// Convert selected files to UTF-8
    pub normalize_encoding: bool,

    /// Source encoding to assume instead of detecting one
    pub source_encoding: Option<&'static Encoding>,

    /// Prepend even if the file already starts with the include line
    pub force_prepend: bool,

    /// Dry run mode (no file writes)
    pub dry_run: bool,

    /// Create backups of modified files
    pub backup_existing: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use srcpatch::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir("./src")
    ///     .prepend_header("stdafx.h")
    ///     .normalize_encoding(true)
    ///     .build()
    ///     .expect("valid configuration");
    ///
    /// assert!(config.has_workers());
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns true if at least one worker is enabled.
    #[must_use]
    pub const fn has_workers(&self) -> bool {
        self.prepend_header.is_some() || self.normalize_encoding
    }

    /// Validates the configuration.
    ///
    /// The root directory is not checked here: a missing root is reported
    /// by the scanner and yields an empty selection.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The header name is empty or contains a quote or line break
    /// - An exclusion pattern is invalid
    pub fn validate(&self) -> Result<()> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(Error::config("Root directory must not be empty"));
        }

        if let Some(ref header) = self.prepend_header {
            if header.trim().is_empty() {
                return Err(Error::config("Header name must not be empty"));
            }

            if header.contains(['"', '\r', '\n']) {
                return Err(Error::config(format!(
                    "Header name must not contain quotes or line breaks: {header:?}"
                )));
            }
        }

        FileFilter::new(&self.file_filter_config)?;

        if self.source_encoding.is_some() && !self.normalize_encoding {
            tracing::warn!("source_encoding is only used when encoding normalization is enabled");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            file_filter_config: FileFilterConfig::default(),
            prepend_header: None,
            normalize_encoding: false,
            source_encoding: None,
            force_prepend: false,
            dry_run: false,
            backup_existing: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    file_filter_config: Option<FileFilterConfig>,
    prepend_header: Option<String>,
    normalize_encoding: bool,
    source_encoding: Option<String>,
    force_prepend: bool,
    dry_run: bool,
    backup_existing: bool,
}

impl ConfigBuilder {
    /// Sets the root directory to scan.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the file selection criteria.
    #[must_use]
    pub fn file_filter_config(mut self, config: FileFilterConfig) -> Self {
        self.file_filter_config = Some(config);
        self
    }

    /// Enables the header worker with the given header name.
    #[must_use]
    pub fn prepend_header(mut self, header: impl Into<String>) -> Self {
        self.prepend_header = Some(header.into());
        self
    }

    /// Enables or disables conversion to UTF-8.
    #[must_use]
    pub fn normalize_encoding(mut self, enabled: bool) -> Self {
        self.normalize_encoding = enabled;
        self
    }

    /// Sets the source encoding label (e.g. `windows-1251`) to use instead of detection.
    #[must_use]
    pub fn source_encoding(mut self, label: impl Into<String>) -> Self {
        self.source_encoding = Some(label.into());
        self
    }

    /// Prepends the header even when it is already present.
    #[must_use]
    pub fn force_prepend(mut self, enabled: bool) -> Self {
        self.force_prepend = enabled;
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding label is unknown or validation fails.
    pub fn build(self) -> Result<Config> {
        let source_encoding = self
            .source_encoding
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or(Error::UnknownEncoding { label })
            })
            .transpose()?;

        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            file_filter_config: self.file_filter_config.unwrap_or_default(),
            prepend_header: self.prepend_header,
            normalize_encoding: self.normalize_encoding,
            source_encoding,
            force_prepend: self.force_prepend,
            dry_run: self.dry_run,
            backup_existing: self.backup_existing,
        };

        config.validate()?;
        Ok(config)
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the srcpatch library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Directory to scan does not exist.
    #[error("Directory not found: '{path}'")]
    DirectoryNotFound {
        /// Missing directory
        path: PathBuf,
    },

    /// Bytes could not be decoded with the named encoding.
    #[error("Failed to decode '{path}' as {encoding}")]
    Decode {
        /// File being decoded
        path: PathBuf,
        /// Encoding used for the attempt
        encoding: String,
    },

    /// Encoding could not be classified with enough confidence to convert.
    #[error("Cannot determine encoding of '{path}': {reason}")]
    AmbiguousEncoding {
        /// File left untouched
        path: PathBuf,
        /// Why detection was rejected
        reason: String,
    },

    /// Writing the transformed content back failed.
    #[error("Failed to write '{path}': {message}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Encoding label not known to the encoding registry.
    #[error("Unknown encoding label '{label}'")]
    UnknownEncoding {
        /// Label as given by the user
        label: String,
    },

    /// Multiple errors occurred during processing.
    #[error("Multiple errors occurred during processing ({count} errors)")]
    Multiple {
        /// Number of errors
        count: usize,
        /// Collection of errors
        errors: Vec<Error>,
    },

    /// Invalid name pattern.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a write error with path context.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a directory-not-found error.
    #[must_use]
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(path: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            encoding: encoding.into(),
        }
    }

    /// Creates an ambiguous-encoding error.
    #[must_use]
    pub fn ambiguous(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::AmbiguousEncoding {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Combines multiple errors into a single error.
    #[must_use]
    pub fn multiple(errors: Vec<Self>) -> Self {
        let count = errors.len();
        Self::Multiple { count, errors }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::UnknownEncoding { .. })
    }

    /// Returns true if processing of other files can safely continue after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Config { .. } | Self::UnknownEncoding { .. } | Self::InvalidPattern { .. }
        )
    }
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_default();
        Self::Io {
            path,
            message: e.to_string(),
        }
    }
}

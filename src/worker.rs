//! File transformations applied by the pipeline.

use crate::{
    config::Config,
    encoding::{EncodingNormalizer, Normalized},
    error::{Error, Result},
    file::{FileRef, FileWriter},
    header::HeaderPrepender,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Effect of applying a worker to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File content was replaced
    Modified {
        /// Human-readable description of the change
        detail: String,
    },
    /// Nothing to do
    Unchanged,
    /// File was deliberately left alone; later workers do not run on it
    Skipped {
        /// Why the file was skipped
        reason: String,
    },
}

/// Kind of worker, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Encoding normalization
    NormalizeEncoding,
    /// Header prepending
    PrependHeader,
}

/// A single file transformation.
#[derive(Debug, Clone)]
pub enum Worker {
    /// Converts files to UTF-8
    NormalizeEncoding(EncodingNormalizer),
    /// Inserts an include line at the top of files
    PrependHeader(HeaderPrepender),
}

impl Worker {
    /// Builds the worker list for `config`.
    ///
    /// Encoding normalization always comes first so that the ASCII include
    /// line is never run through a conversion.
    #[must_use]
    pub fn ordered(config: &Config) -> Vec<Self> {
        let mut workers = Vec::with_capacity(2);

        if config.normalize_encoding {
            workers.push(Self::NormalizeEncoding(EncodingNormalizer::new(
                config.source_encoding,
            )));
        }

        if let Some(ref header) = config.prepend_header {
            workers.push(Self::PrependHeader(HeaderPrepender::new(
                header,
                config.force_prepend,
            )));
        }

        workers
    }

    /// Returns the kind of this worker.
    #[must_use]
    pub const fn kind(&self) -> WorkerKind {
        match self {
            Self::NormalizeEncoding(_) => WorkerKind::NormalizeEncoding,
            Self::PrependHeader(_) => WorkerKind::PrependHeader,
        }
    }

    /// Reads `file`, transforms it and writes it back through `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, decoded or written.
    /// An encoding that cannot be classified is not an error: the file is
    /// reported as [`Outcome::Skipped`].
    pub fn apply(&self, file: &FileRef, writer: &FileWriter) -> Result<Outcome> {
        let mut content = file.read_bytes()?;
        let outcome = self.transform(file, &mut content)?;

        if matches!(outcome, Outcome::Modified { .. }) {
            writer.replace(file, &content)?;
        }

        Ok(outcome)
    }

    /// Transforms the bytes of `file` in memory.
    ///
    /// `content` is replaced only when the outcome is [`Outcome::Modified`].
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be decoded.
    pub fn transform(&self, file: &FileRef, content: &mut Vec<u8>) -> Result<Outcome> {
        match self {
            Self::NormalizeEncoding(normalizer) => match normalizer.normalize(content, file.path()) {
                Ok(Normalized::Unchanged) => Ok(Outcome::Unchanged),
                Ok(Normalized::Binary) => {
                    debug!("Skipping binary file: {}", file.relative_path);
                    Ok(Outcome::Skipped {
                        reason: "binary content".to_string(),
                    })
                }
                Ok(Normalized::Converted { from, bytes }) => {
                    *content = bytes;
                    Ok(Outcome::Modified {
                        detail: format!("converted {} to UTF-8", from.name()),
                    })
                }
                Err(e @ Error::AmbiguousEncoding { .. }) => {
                    warn!("{e}; leaving file untouched");
                    Ok(Outcome::Skipped {
                        reason: e.to_string(),
                    })
                }
                Err(e) => Err(e),
            },
            Self::PrependHeader(prepender) => match prepender.prepend(content) {
                Some(bytes) => {
                    *content = bytes;
                    Ok(Outcome::Modified {
                        detail: format!("prepended {}", prepender.include_line().trim_end()),
                    })
                }
                None => {
                    debug!("Header already present: {}", file.relative_path);
                    Ok(Outcome::Unchanged)
                }
            },
        }
    }
}

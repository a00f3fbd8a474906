//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = MergeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, grouping, reading or writing.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Merge or ingest configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An input path does not carry a parent directory segment to derive a domain from.
    #[error("cannot derive a domain from {path:?}: no parent directory segment")]
    MalformedPath {
        /// Offending input identifier.
        path: PathBuf,
    },
    /// An input file of a domain could not be read.
    #[error("domain {domain}: failed to read input #{index} {path:?}: {source}")]
    Read {
        /// Domain being merged when the failure occurred.
        domain: String,
        /// Zero-based position of the file within the domain.
        index: usize,
        /// Input file that failed.
        path: PathBuf,
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
    },
    /// An input file of a domain is not valid UTF-8.
    #[error("domain {domain}: input #{index} {path:?} is not valid UTF-8")]
    Encoding {
        /// Domain being merged when the failure occurred.
        domain: String,
        /// Zero-based position of the file within the domain.
        index: usize,
        /// Input file that failed to decode.
        path: PathBuf,
    },
    /// An output directory or file could not be created or written.
    #[error("domain {domain}: failed to write {path:?}: {source}")]
    Write {
        /// Domain whose output failed.
        domain: String,
        /// Output path that could not be written.
        path: PathBuf,
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
    },
    /// Filesystem IO error outside of a domain merge, with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MergeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Returns the domain the error was raised for, when it happened inside a domain merge.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::Read { domain, .. } | Self::Encoding { domain, .. } | Self::Write { domain, .. } => {
                Some(domain.as_str())
            }
            _ => None,
        }
    }
}

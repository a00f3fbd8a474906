//! Deterministic naming and placement of merged output files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};

/// Writes `<root>/<domain>/<domain>.<index:04>.txt` files.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    /// Creates a writer rooted at `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Output root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every output file of `domain`.
    #[must_use]
    pub fn domain_dir(&self, domain: &str) -> PathBuf {
        self.root.join(domain)
    }

    /// Path of the `index`-th output file of `domain`.
    #[must_use]
    pub fn output_path(&self, domain: &str, index: usize) -> PathBuf {
        self.domain_dir(domain).join(output_file_name(domain, index))
    }

    /// Creates the domain directory if it does not exist yet. Safe to call concurrently.
    pub fn ensure_domain_dir(&self, domain: &str) -> Result<PathBuf> {
        let dir = self.domain_dir(domain);
        fs::create_dir_all(&dir).map_err(|source| MergeError::Write {
            domain: domain.to_string(),
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Writes `text` as the `index`-th output of `domain`, replacing any existing file.
    pub fn write(&self, domain: &str, index: usize, text: &str) -> Result<PathBuf> {
        let path = self.output_path(domain, index);
        fs::write(&path, text).map_err(|source| MergeError::Write {
            domain: domain.to_string(),
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// File name of the `index`-th output of `domain`.
#[must_use]
pub fn output_file_name(domain: &str, index: usize) -> String {
    format!("{domain}.{index:04}.txt")
}

//! Configuration builders controlling corpus discovery and domain merging.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dedup::EmptySessionPolicy;
use crate::error::{MergeError, Result};
use crate::normalize::SeparatorMode;

/// Number of bytes in one mebibyte, the unit of the size threshold.
pub const MIB: u64 = 1024 * 1024;

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "corpus_merged";

/// Default per-domain flush threshold in mebibytes of input.
pub const DEFAULT_SIZE_LIMIT_MIB: u64 = 300;

/// Configuration for merging domains into size-bounded output files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeConfig {
    /// Root directory receiving one subdirectory per domain.
    pub output_dir: PathBuf,
    /// Cumulative input size (bytes) that must be exceeded before a flush is triggered.
    pub size_limit_bytes: u64,
    /// How session separators are canonicalised before deduplication.
    pub separator_mode: SeparatorMode,
    /// Whether zero-length sessions are dropped or fingerprinted like any other.
    pub empty_sessions: EmptySessionPolicy,
    /// Processes independent domains on the Rayon pool.
    pub parallel: bool,
}

impl MergeConfig {
    /// Returns a builder initialised with [`MergeConfig::default`].
    #[must_use]
    pub fn builder() -> MergeBuilder {
        MergeBuilder::default()
    }

    /// Validates the invariants required for merging.
    pub fn validate(&self) -> Result<()> {
        if self.size_limit_bytes == 0 {
            return Err(MergeError::InvalidConfig(
                "size_limit_bytes must be greater than zero".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(MergeError::InvalidConfig(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Threshold expressed in mebibytes, for display.
    #[must_use]
    pub fn size_limit_mib(&self) -> f64 {
        self.size_limit_bytes as f64 / MIB as f64
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            size_limit_bytes: DEFAULT_SIZE_LIMIT_MIB * MIB,
            separator_mode: SeparatorMode::default(),
            empty_sessions: EmptySessionPolicy::default(),
            parallel: false,
        }
    }
}

/// Builder for [`MergeConfig`].
#[derive(Debug, Default, Clone)]
pub struct MergeBuilder {
    cfg: MergeConfig,
}

impl MergeBuilder {
    /// Creates a builder with [`MergeConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from JSON.
    #[must_use]
    pub fn from_config(cfg: MergeConfig) -> Self {
        Self { cfg }
    }

    /// Sets the output root directory.
    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cfg.output_dir = dir.into();
        self
    }

    /// Sets the flush threshold in mebibytes; fractional values are allowed.
    #[must_use]
    pub fn size_limit_mib(mut self, mib: f64) -> Self {
        self.cfg.size_limit_bytes = (mib.max(0.0) * MIB as f64).round() as u64;
        self
    }

    /// Sets the flush threshold in bytes.
    #[must_use]
    pub fn size_limit_bytes(mut self, bytes: u64) -> Self {
        self.cfg.size_limit_bytes = bytes;
        self
    }

    /// Selects the separator normalisation mode.
    #[must_use]
    pub fn separator_mode(mut self, mode: SeparatorMode) -> Self {
        self.cfg.separator_mode = mode;
        self
    }

    /// Selects how empty sessions are treated by the duplicate filter.
    #[must_use]
    pub fn empty_sessions(mut self, policy: EmptySessionPolicy) -> Self {
        self.cfg.empty_sessions = policy;
        self
    }

    /// Enables or disables processing domains in parallel.
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.cfg.parallel = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`MergeConfig`].
    pub fn build(self) -> Result<MergeConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how input files are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// File extension (without the dot) an input must carry; empty accepts every file.
    pub extension: String,
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
    /// Directories whose contents are never treated as input, such as the output root.
    pub exclude: Vec<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extension: "txt".into(),
            recursive: true,
            follow_symlinks: false,
            exclude: Vec::new(),
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }

    /// Returns `true` when `path` carries the configured extension.
    #[must_use]
    pub fn accepts(&self, path: &std::path::Path) -> bool {
        if self.extension.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the required file extension; an empty string accepts every file.
    #[must_use]
    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        let extension: String = extension.into();
        self.cfg.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Skips everything under `dir` during discovery.
    #[must_use]
    pub fn exclude<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cfg.exclude.push(dir.into());
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults_match_reference_layout() {
        let cfg = MergeConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("corpus_merged"));
        assert_eq!(cfg.size_limit_bytes, 300 * MIB);
        assert!((cfg.size_limit_mib() - 300.0).abs() < f64::EPSILON);
        assert_eq!(cfg.empty_sessions, EmptySessionPolicy::Drop);
        assert_eq!(cfg.separator_mode, SeparatorMode::Canonical);
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let err = MergeConfig::builder()
            .size_limit_bytes(0)
            .build()
            .expect_err("validation should fail");
        assert!(matches!(
            err,
            MergeError::InvalidConfig(message) if message.contains("size_limit_bytes")
        ));
    }

    #[test]
    fn fractional_mib_limit_rounds_to_bytes() {
        let cfg = MergeConfig::builder()
            .size_limit_mib(0.5)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.size_limit_bytes, MIB / 2);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: MergeConfig =
            serde_json::from_str(r#"{"size_limit_bytes": 1024, "empty_sessions": "keep"}"#)
                .expect("parse config");
        assert_eq!(cfg.size_limit_bytes, 1024);
        assert_eq!(cfg.empty_sessions, EmptySessionPolicy::Keep);
        assert_eq!(cfg.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn ingest_builder_overrides_defaults() {
        let cfg = IngestConfig::builder()
            .extension(".md")
            .recursive(false)
            .follow_symlinks(true)
            .exclude("out")
            .build();
        assert_eq!(cfg.extension, "md");
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
        assert_eq!(cfg.exclude, vec![PathBuf::from("out")]);
        assert!(cfg.accepts(Path::new("a/b.md")));
        assert!(!cfg.accepts(Path::new("a/b.txt")));
    }

    #[test]
    fn empty_extension_accepts_everything() {
        let cfg = IngestConfig::builder().extension("").build();
        assert!(cfg.accepts(Path::new("a/b")));
        assert!(cfg.accepts(Path::new("a/b.bin")));
    }
}

//! Facilities for discovering input files and reading their text.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{MergeError, Result};

/// A readable text source together with its on-disk size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path of the file as discovered.
    pub path: PathBuf,
    /// Size reported by the filesystem at discovery time.
    pub size_bytes: u64,
}

impl InputFile {
    /// Builds an input reference from already known parts.
    pub fn new<P: Into<PathBuf>>(path: P, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Stats `path` to capture its on-disk size.
    pub fn stat<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata =
            std::fs::metadata(path).map_err(|err| MergeError::io(err, Some(path.to_path_buf())))?;
        Ok(Self::new(path, metadata.len()))
    }
}

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Directories are traversed recursively by default; set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level. Entries are visited in file-name order so repeated
/// runs see the same sequence. Files passed explicitly are kept regardless of their extension.
/// Anything under a directory listed in [`IngestConfig::exclude`] is skipped.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    // An excluded directory that does not exist yet holds nothing to skip.
    let excluded: Vec<PathBuf> = cfg
        .exclude
        .iter()
        .filter_map(|dir| dir.canonicalize().ok())
        .collect();
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(MergeError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        if is_excluded(path, &excluded) {
            continue;
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| MergeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            if cfg.recursive {
                let walker = WalkDir::new(path)
                    .follow_links(cfg.follow_symlinks)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| {
                        !(entry.file_type().is_dir() && is_excluded(entry.path(), &excluded))
                    });
                for entry in walker {
                    let entry = entry.map_err(|err| MergeError::Internal(err.to_string()))?;
                    if entry.file_type().is_file() && cfg.accepts(entry.path()) {
                        files.push(entry.path().to_path_buf());
                    }
                }
            } else {
                let mut level = Vec::new();
                for entry in std::fs::read_dir(path)
                    .map_err(|err| MergeError::io(err, Some(path.to_path_buf())))?
                {
                    let entry =
                        entry.map_err(|err| MergeError::io(err, Some(path.to_path_buf())))?;
                    let entry_path = entry.path();
                    if entry_path.is_file()
                        && cfg.accepts(&entry_path)
                        && !is_excluded(&entry_path, &excluded)
                    {
                        level.push(entry_path);
                    }
                }
                level.sort();
                files.extend(level);
            }
        } else if metadata.is_file() || (cfg.follow_symlinks && path.is_file()) {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(MergeError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    if excluded.is_empty() {
        return false;
    }
    path.canonicalize()
        .is_ok_and(|resolved| excluded.iter().any(|dir| resolved.starts_with(dir)))
}

/// Discovers input files and captures their on-disk sizes.
pub fn collect_inputs<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<InputFile>> {
    collect_paths(inputs, cfg)?
        .into_iter()
        .map(InputFile::stat)
        .collect()
}

/// Reads the full content of the `index`-th input of `domain` as UTF-8 text.
///
/// Returns the text along with the current on-disk size of the file.
pub fn read_text(domain: &str, index: usize, input: &InputFile) -> Result<(String, u64)> {
    let read_err = |source| MergeError::Read {
        domain: domain.to_string(),
        index,
        path: input.path.clone(),
        source,
    };
    let bytes = std::fs::read(&input.path).map_err(read_err)?;
    let size = std::fs::metadata(&input.path).map_err(read_err)?.len();
    let text = String::from_utf8(bytes).map_err(|_| MergeError::Encoding {
        domain: domain.to_string(),
        index,
        path: input.path.clone(),
    })?;
    Ok((text, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collect_paths_discovers_matching_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        let skipped = nested.join("c.json");
        fs::write(&file_a, "a").expect("write a");
        fs::write(&file_b, "b").expect("write b");
        fs::write(&skipped, "{}").expect("write c");

        let cfg = IngestConfig::default();
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![file_a, file_b]);
    }

    #[test]
    fn collect_paths_respects_non_recursive() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        fs::write(dir.path().join("top.txt"), "t").expect("write top");
        fs::write(nested.join("deep.txt"), "d").expect("write deep");

        let cfg = IngestConfig::builder().recursive(false).build();
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![dir.path().join("top.txt")]);
    }

    #[test]
    fn collect_paths_skips_excluded_directories() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("news").join("a.txt");
        let previous = dir.path().join("merged").join("news").join("news.0000.txt");
        fs::create_dir_all(input.parent().expect("parent")).expect("create news");
        fs::create_dir_all(previous.parent().expect("parent")).expect("create merged");
        fs::write(&input, "a").expect("write input");
        fs::write(&previous, "a\n\n").expect("write earlier output");

        let cfg = IngestConfig::builder()
            .exclude(dir.path().join("merged"))
            .build();
        let paths = collect_paths(&[dir.path()], &cfg).expect("collect paths");
        assert_eq!(paths, vec![input]);

        let err = collect_paths(&[dir.path().join("merged")], &cfg)
            .expect_err("only excluded files");
        assert!(matches!(err, MergeError::InvalidConfig(_)));
    }

    #[test]
    fn collect_paths_rejects_missing_input() {
        let dir = tempdir().expect("tempdir");
        let err = collect_paths(&[dir.path().join("missing")], &IngestConfig::default())
            .expect_err("missing input should fail");
        assert!(matches!(err, MergeError::InvalidConfig(_)));
    }

    #[test]
    fn read_text_reports_size_and_encoding_errors() {
        let dir = tempdir().expect("tempdir");
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.txt");
        fs::write(&good, "héllo").expect("write good");
        fs::write(&bad, [0xffu8, 0xfe, 0x00]).expect("write bad");

        let input = InputFile::stat(&good).expect("stat good");
        assert_eq!(input.size_bytes, 6);
        let (text, size) = read_text("news", 0, &input).expect("read good");
        assert_eq!(text, "héllo");
        assert_eq!(size, 6);

        let err = read_text("news", 3, &InputFile::new(&bad, 3)).expect_err("invalid utf-8");
        assert!(matches!(
            err,
            MergeError::Encoding { ref domain, index: 3, .. } if domain == "news"
        ));
    }

    #[test]
    fn read_text_missing_file_is_read_error() {
        let dir = tempdir().expect("tempdir");
        let input = InputFile::new(dir.path().join("gone.txt"), 0);
        let err = read_text("blog", 1, &input).expect_err("missing file");
        assert_eq!(err.domain(), Some("blog"));
        assert!(matches!(err, MergeError::Read { index: 1, .. }));
    }
}

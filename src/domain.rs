//! Partitioning of input files into domains.
//!
//! A domain is named after the immediate parent directory of its files. Grouping preserves
//! discovery order both for the domains themselves (first appearance) and for the files inside
//! each domain, since that order decides which copy of a duplicate session is kept.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::corpus::InputFile;
use crate::error::{MergeError, Result};

/// Ordered input files sharing one domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGroup {
    /// Domain name, used for the output subdirectory and file prefix.
    pub name: String,
    /// Member files in discovery order.
    pub files: Vec<InputFile>,
}

impl DomainGroup {
    /// Creates a domain from an already resolved name and its files.
    pub fn new<S: Into<String>>(name: S, files: Vec<InputFile>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }

    /// Total on-disk size of the member files.
    #[must_use]
    pub fn input_bytes(&self) -> u64 {
        self.files.iter().map(|file| file.size_bytes).sum()
    }

    /// Number of output files a merge with `limit_bytes` will write, judged from the sizes
    /// recorded at discovery: one per threshold crossing plus the remainder.
    #[must_use]
    pub fn planned_outputs(&self, limit_bytes: u64) -> usize {
        let mut running = 0u64;
        let mut flushes = 0;
        for file in &self.files {
            running = running.saturating_add(file.size_bytes);
            if running > limit_bytes {
                flushes += 1;
                running = 0;
            }
        }
        flushes + 1
    }
}

/// Derives the domain of `path`: the name of its immediate parent directory.
///
/// Names that are not valid UTF-8 are converted lossily.
pub fn domain_of(path: &Path) -> Result<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| MergeError::MalformedPath {
            path: path.to_path_buf(),
        })
}

/// Groups `files` by domain, keeping the first-seen order of domains and of files within them.
pub fn group_by_domain<I>(files: I) -> Result<Vec<DomainGroup>>
where
    I: IntoIterator<Item = InputFile>,
{
    let mut groups: Vec<DomainGroup> = Vec::new();
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();
    for file in files {
        let name = domain_of(&file.path)?;
        match positions.get(&name) {
            Some(&position) => groups[position].files.push(file),
            None => {
                positions.insert(name.clone(), groups.len());
                groups.push(DomainGroup::new(name, vec![file]));
            }
        }
    }
    Ok(groups)
}

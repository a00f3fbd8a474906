//! Merge and deduplicate text corpora split across many small files.
//!
//! The crate exposes both a library API and a `corpus-merge` command line interface. Input files
//! are grouped into domains by their parent directory; each domain is streamed into an
//! accumulator that is flushed to a new output file whenever the accumulated input size exceeds a
//! threshold. Before each flush, blank-line separators are canonicalised and sessions already
//! emitted for the domain are dropped.
//!
//! ```no_run
//! use corpus_merge::{IngestConfig, MergeConfig, Merger};
//!
//! # fn main() -> corpus_merge::Result<()> {
//! let cfg = MergeConfig::builder()
//!     .output_dir("corpus_merged")
//!     .size_limit_mib(300.0)
//!     .build()?;
//! let metrics = Merger::new(cfg).merge_paths(&["./corpus"], &IngestConfig::default())?;
//! println!("wrote {} files", metrics.output_files());
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Users targeting the library portion
//! only can disable default features to avoid the CLI dependencies.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod accumulator;
pub mod config;
pub mod corpus;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod merger;
pub mod metrics;
pub mod normalize;
pub mod writer;

pub use config::{IngestConfig, MergeBuilder, MergeConfig};
pub use corpus::InputFile;
pub use dedup::{filter_duplicates, EmptySessionPolicy, Fingerprint, FingerprintSet};
pub use domain::{domain_of, group_by_domain, DomainGroup};
pub use error::{MergeError, Result};
pub use merger::{DomainMerger, Merger};
pub use metrics::{DomainMetrics, FlushMetrics, FlushTrigger, RunMetrics};
pub use normalize::{normalize_separators, SeparatorMode, SESSION_SEPARATOR};
pub use writer::OutputWriter;

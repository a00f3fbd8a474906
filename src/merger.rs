//! Domain merging: streams a domain's files into size-bounded, deduplicated output files.

use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::accumulator::Accumulator;
use crate::config::{IngestConfig, MergeBuilder, MergeConfig};
use crate::corpus::{collect_inputs, read_text, InputFile};
use crate::dedup::{filter_duplicates, FingerprintSet};
use crate::domain::{group_by_domain, DomainGroup};
use crate::error::Result;
use crate::metrics::{sample_rss_kb, DomainMetrics, FlushMetrics, FlushTrigger, RunMetrics};
use crate::writer::OutputWriter;

/// High-level façade configuring and executing merge runs.
#[derive(Debug, Clone)]
pub struct Merger {
    cfg: MergeConfig,
}

impl Merger {
    /// Creates a new merger for the supplied configuration.
    #[must_use]
    pub fn new(cfg: MergeConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`MergeBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> MergeBuilder {
        MergeConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.cfg
    }

    /// Discovers files under `inputs`, groups them by domain and merges every domain.
    ///
    /// The output root is excluded from discovery so earlier outputs are never read back.
    pub fn merge_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<RunMetrics> {
        let mut ingest = ingest.clone();
        ingest.exclude.push(self.cfg.output_dir.clone());
        let files = collect_inputs(inputs, &ingest)?;
        let groups = group_by_domain(files)?;
        self.merge_domains(&groups)
    }

    /// Merges every domain in `groups`.
    pub fn merge_domains(&self, groups: &[DomainGroup]) -> Result<RunMetrics> {
        self.merge_domains_with(groups, |_| {})
    }

    /// Merges every domain in `groups`, calling `on_domain` as each one completes.
    ///
    /// Domains are independent. Sequentially, the first failing domain stops the run. In
    /// parallel mode every domain is attempted and the first error in input order is returned.
    /// Either way, outputs of domains that completed stay on disk.
    pub fn merge_domains_with<F>(&self, groups: &[DomainGroup], on_domain: F) -> Result<RunMetrics>
    where
        F: Fn(&DomainMetrics) + Sync,
    {
        self.cfg.validate()?;
        let run_start = Instant::now();
        let domains = if self.cfg.parallel {
            groups
                .par_iter()
                .map(|group| -> Result<DomainMetrics> {
                    let metrics = self.merge_domain(group)?;
                    on_domain(&metrics);
                    Ok(metrics)
                })
                .collect::<Vec<Result<DomainMetrics>>>()
                .into_iter()
                .collect::<Result<Vec<_>>>()?
        } else {
            let mut domains = Vec::with_capacity(groups.len());
            for group in groups {
                let metrics = self.merge_domain(group)?;
                on_domain(&metrics);
                domains.push(metrics);
            }
            domains
        };
        let metrics = RunMetrics {
            domains,
            total_duration: run_start.elapsed(),
        };
        info!(
            "merged {} domains into {} files in {:.2?}",
            metrics.domains.len(),
            metrics.output_files(),
            metrics.total_duration
        );
        Ok(metrics)
    }

    /// Merges a single domain, writing its output files under the configured root.
    pub fn merge_domain(&self, group: &DomainGroup) -> Result<DomainMetrics> {
        let start = Instant::now();
        let writer = OutputWriter::new(&self.cfg.output_dir);
        let output_dir = writer.ensure_domain_dir(&group.name)?;
        info!(
            "processing {} ({} files)... writing to {}",
            group.name,
            group.files.len(),
            output_dir.display()
        );

        let mut merger = DomainMerger::new(&self.cfg, &writer, &group.name);
        for (index, input) in group.files.iter().enumerate() {
            merger.feed(index, input)?;
        }
        let summary = merger.finish()?;

        let metrics = DomainMetrics {
            domain: group.name.clone(),
            output_dir,
            files: group.files.len(),
            input_bytes: summary.input_bytes,
            distinct_sessions: summary.distinct_sessions,
            flushes: summary.flushes,
            elapsed: start.elapsed(),
            rss_kb: sample_rss_kb(),
        };
        info!(
            "finished {}: {} files, {} sessions kept, {} duplicates dropped in {:.2?}",
            metrics.domain,
            metrics.flushes.len(),
            metrics.sessions_kept(),
            metrics.sessions_duplicate(),
            metrics.elapsed
        );
        Ok(metrics)
    }
}

/// What a [`DomainMerger`] produced once all its inputs were consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSummary {
    /// Output files in index order.
    pub flushes: Vec<FlushMetrics>,
    /// On-disk size of every input consumed.
    pub input_bytes: u64,
    /// Size of the fingerprint set when the domain completed.
    pub distinct_sessions: usize,
}

/// Merge state of a single domain.
///
/// Owns the accumulator and the fingerprint set for the lifetime of the domain. The accumulator
/// is reset after each flush; the fingerprint set is not, so a session written to an earlier
/// output file is still recognised as a duplicate in later ones.
#[derive(Debug)]
pub struct DomainMerger<'a> {
    cfg: &'a MergeConfig,
    writer: &'a OutputWriter,
    domain: &'a str,
    accumulator: Accumulator,
    seen: FingerprintSet,
    flushes: Vec<FlushMetrics>,
    input_bytes: u64,
}

impl<'a> DomainMerger<'a> {
    /// Starts merging `domain`. The domain directory must already exist.
    #[must_use]
    pub fn new(cfg: &'a MergeConfig, writer: &'a OutputWriter, domain: &'a str) -> Self {
        Self {
            cfg,
            writer,
            domain,
            accumulator: Accumulator::new(cfg.separator_mode),
            seen: FingerprintSet::new(),
            flushes: Vec::new(),
            input_bytes: 0,
        }
    }

    /// Index the next output file will be written at.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.flushes.len()
    }

    /// Reads the `index`-th input and appends it, flushing once the size limit is exceeded.
    pub fn feed(&mut self, index: usize, input: &InputFile) -> Result<()> {
        let (text, size) = read_text(self.domain, index, input)?;
        self.accumulator.push_file(&text, size);
        self.input_bytes += size;
        debug!(
            "{}: appended {} ({} bytes, {} accumulated)",
            self.domain,
            input.path.display(),
            size,
            self.accumulator.input_bytes()
        );
        if self.accumulator.exceeds(self.cfg.size_limit_bytes) {
            self.flush(FlushTrigger::Threshold)?;
        }
        Ok(())
    }

    /// Writes the remainder, even when empty, and returns the domain summary.
    pub fn finish(mut self) -> Result<DomainSummary> {
        self.flush(FlushTrigger::Remainder)?;
        Ok(DomainSummary {
            flushes: self.flushes,
            input_bytes: self.input_bytes,
            distinct_sessions: self.seen.len(),
        })
    }

    fn flush(&mut self, trigger: FlushTrigger) -> Result<()> {
        let index = self.next_index();
        let files = self.accumulator.files();
        let input_bytes = self.accumulator.input_bytes();
        let raw = self.accumulator.take();
        let normalized = self.cfg.separator_mode.normalize(&raw);
        drop(raw);
        let outcome = filter_duplicates(&normalized, &mut self.seen, self.cfg.empty_sessions);
        let path = self.writer.write(self.domain, index, &outcome.text)?;

        if outcome.kept == 0 && outcome.duplicates > 0 {
            warn!(
                "{}: every session of output #{index} was a duplicate",
                self.domain
            );
        }
        info!(
            "{}: wrote {} ({:?}, {} files, {} sessions, {} duplicates)",
            self.domain,
            path.display(),
            trigger,
            files,
            outcome.kept,
            outcome.duplicates
        );
        self.flushes.push(FlushMetrics {
            index,
            path,
            trigger,
            files,
            input_bytes,
            sessions_kept: outcome.kept,
            sessions_duplicate: outcome.duplicates,
            bytes_written: outcome.text.len() as u64,
        });
        Ok(())
    }
}

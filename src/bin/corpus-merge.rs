use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use corpus_merge::config::{DEFAULT_OUTPUT_DIR, MIB};
use corpus_merge::corpus::collect_inputs;
use corpus_merge::{
    group_by_domain, DomainGroup, EmptySessionPolicy, IngestConfig, MergeBuilder, MergeConfig,
    Merger, SeparatorMode,
};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::ThreadPoolBuilder;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Merge and deduplicate text corpora per domain", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge input files into deduplicated, size-bounded files per domain
    Merge(MergeArgs),
    /// List discovered domains without writing anything
    Domains(DomainsArgs),
}

#[derive(Args, Debug)]
struct DiscoveryArgs {
    /// Files or directories to ingest
    #[arg(default_value = ".")]
    inputs: Vec<PathBuf>,

    /// Extension input files must carry (empty string accepts all)
    #[arg(long, value_name = "EXT", default_value = "txt")]
    extension: String,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

impl DiscoveryArgs {
    fn ingest_config(&self, output_dir: &Path) -> IngestConfig {
        IngestConfig::builder()
            .extension(self.extension.clone())
            .recursive(!self.no_recursive)
            .follow_symlinks(self.follow_symlinks)
            .exclude(output_dir)
            .build()
    }

    fn domains(&self, output_dir: &Path) -> Result<Vec<DomainGroup>> {
        let files = collect_inputs(&self.inputs, &self.ingest_config(output_dir))
            .context("failed to discover input files")?;
        let groups = group_by_domain(files).context("failed to group inputs by domain")?;
        Ok(groups)
    }
}

#[derive(Args, Debug)]
struct MergeArgs {
    #[command(flatten)]
    discovery: DiscoveryArgs,

    /// Output root directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Flush threshold in MiB of cumulative input per domain
    #[arg(long, value_name = "MIB")]
    size_limit: Option<f64>,

    /// Load merge settings from a JSON file before applying flags
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Fingerprint and keep empty sessions instead of dropping them
    #[arg(long)]
    keep_empty_sessions: bool,

    /// Use the historical separator handling for byte-identical output
    #[arg(long)]
    legacy_separators: bool,

    /// Merge domains in parallel
    #[arg(long)]
    parallel: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the run metrics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DomainsArgs {
    #[command(flatten)]
    discovery: DiscoveryArgs,

    /// Output root skipped during discovery
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Flush threshold in MiB used to estimate output counts
    #[arg(long, value_name = "MIB")]
    size_limit: Option<f64>,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct DomainListing<'a> {
    domain: &'a str,
    files: usize,
    input_bytes: u64,
    planned_outputs: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Merge(args) => run_merge(args),
        Commands::Domains(args) => run_domains(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn merge_config(args: &MergeArgs) -> Result<MergeConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let loaded: MergeConfig = serde_json::from_str(&data)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            MergeBuilder::from_config(loaded)
        }
        None => MergeConfig::builder(),
    };
    if let Some(output) = &args.output {
        cfg = cfg.output_dir(output.clone());
    }
    if let Some(limit) = args.size_limit {
        cfg = cfg.size_limit_mib(limit);
    }
    if args.keep_empty_sessions {
        cfg = cfg.empty_sessions(EmptySessionPolicy::Keep);
    }
    if args.legacy_separators {
        cfg = cfg.separator_mode(SeparatorMode::Legacy);
    }
    if args.parallel {
        cfg = cfg.parallel(true);
    }
    Ok(cfg.build()?)
}

fn run_merge(args: MergeArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let cfg = merge_config(&args)?;
    let groups = args.discovery.domains(&cfg.output_dir)?;
    info!(
        "discovered {} domains; flushing every {:.2} MiB of input into {}",
        groups.len(),
        cfg.size_limit_mib(),
        cfg.output_dir.display()
    );

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(groups.len() as u64);
        let style = ProgressStyle::with_template("{spinner} {pos}/{len} domains {wide_bar} {elapsed} {msg}")
            .context("invalid progress template")?;
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    };

    let merger = Merger::new(cfg);
    let metrics = merger
        .merge_domains_with(&groups, |domain| {
            progress.set_message(domain.domain.clone());
            progress.inc(1);
        })
        .context("merge failed")?;
    progress.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let kept: usize = metrics.domains.iter().map(|d| d.sessions_kept()).sum();
    let dropped: usize = metrics.domains.iter().map(|d| d.sessions_duplicate()).sum();
    println!(
        "wrote {} files for {} domains to {}",
        metrics.output_files(),
        metrics.domains.len(),
        merger.config().output_dir.display()
    );
    println!(
        "   sessions kept {} | duplicates dropped {} | duration {:.2?}",
        kept, dropped, metrics.total_duration
    );
    Ok(())
}

fn run_domains(args: DomainsArgs) -> Result<()> {
    let limit_bytes = match args.size_limit {
        Some(mib) => MergeConfig::builder().size_limit_mib(mib).build()?.size_limit_bytes,
        None => MergeConfig::default().size_limit_bytes,
    };
    let groups = args.discovery.domains(&args.output)?;
    let listings: Vec<DomainListing<'_>> = groups
        .iter()
        .map(|group| DomainListing {
            domain: &group.name,
            files: group.files.len(),
            input_bytes: group.input_bytes(),
            planned_outputs: group.planned_outputs(limit_bytes),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    println!("{:<24} {:>8} {:>12} {:>8}", "Domain", "Files", "MiB", "Outputs");
    for listing in &listings {
        println!(
            "{:<24} {:>8} {:>12.2} {:>8}",
            listing.domain,
            listing.files,
            listing.input_bytes as f64 / MIB as f64,
            listing.planned_outputs
        );
    }
    Ok(())
}

//! imagededup - Find visually similar images and keep only the best copy.
//!
//! Usage:
//!   imagededup analyze [ROOTS...]        Index images into the signature store
//!   imagededup deduplicate [ROOTS...]    Resolve duplicate groups
//!   imagededup daemon [ROOTS...]         Batch pass, then watch for changes
//!   imagededup --help                    Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use imagededup_core::{DedupConfig, PrioritizationRule, SignatureStore};
use imagededup_daemon::{Daemon, watch};
use imagededup_pipeline::{Pipeline, PipelineError, RunOptions, RunResult};
use imagededup_scan::{FileWalker, LogObserver};
use imagededup_store::{ContentFingerprinter, MemoryStore};

#[derive(Parser)]
#[command(
    name = "imagededup",
    version,
    about = "Find visually similar images and keep only the best copy",
    long_about = "imagededup groups similar images, ranks each group with an ordered \
                  list of quality rules and deletes or moves everything but the best \
                  copy.\n\nRuns are dry by default; pass --no-dry-run to change files."
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/imagededup/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Root directories (replace the configured roots)
    roots: Vec<PathBuf>,

    /// Comma-separated prioritization rules, best first
    #[arg(long, value_delimiter = ',')]
    rules: Vec<String>,

    /// Analysis worker count (0 = number of cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Count and analyze files without resolving duplicates
    Analyze {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Run the full pipeline
    Deduplicate {
        #[command(flatten)]
        overrides: Overrides,

        /// Reuse existing store records instead of analyzing
        #[arg(long)]
        skip_analyze: bool,

        /// Only report what would change
        #[arg(long, overrides_with = "no_dry_run")]
        dry_run: bool,

        /// Apply deletes and moves
        #[arg(long, overrides_with = "dry_run")]
        no_dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run once, then watch the roots and process changes
    Daemon {
        #[command(flatten)]
        overrides: Overrides,

        /// Only report what would change
        #[arg(long, overrides_with = "no_dry_run")]
        dry_run: bool,

        /// Apply deletes and moves
        #[arg(long, overrides_with = "dry_run")]
        no_dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Analyze { overrides } => {
            let config = load_config(cli.config.as_deref(), &overrides, None)?;
            run_analyze(config)?;
        }
        Command::Deduplicate {
            overrides,
            skip_analyze,
            dry_run,
            no_dry_run,
            format,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                &overrides,
                dry_run_flag(dry_run, no_dry_run),
            )?;
            run_deduplicate(config, skip_analyze, format)?;
        }
        Command::Daemon {
            overrides,
            dry_run,
            no_dry_run,
        } => {
            let config = load_config(
                cli.config.as_deref(),
                &overrides,
                dry_run_flag(dry_run, no_dry_run),
            )?;
            run_daemon(config)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn dry_run_flag(dry_run: bool, no_dry_run: bool) -> Option<bool> {
    match (dry_run, no_dry_run) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Resolve the configuration file and apply command-line overrides.
fn load_config(
    explicit: Option<&Path>,
    overrides: &Overrides,
    dry_run: Option<bool>,
) -> Result<DedupConfig> {
    let default_path = dirs::config_dir().map(|dir| dir.join("imagededup").join("config.toml"));

    let mut config = match (explicit, default_path) {
        (Some(path), _) => DedupConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        (None, Some(path)) if path.is_file() => {
            info!("Using config {}", path.display());
            DedupConfig::load(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        _ => DedupConfig::new(Vec::new()),
    };

    if !overrides.roots.is_empty() {
        config.roots = overrides.roots.clone();
    }
    if !overrides.rules.is_empty() {
        config.prioritization_rules = PrioritizationRule::parse_list(&overrides.rules)
            .with_context(|| format!("Known rules: {}", PrioritizationRule::names().join(", ")))?;
    }
    if let Some(threads) = overrides.threads {
        config.threads = threads;
    }
    if let Some(dry_run) = dry_run {
        config.dry_run = dry_run;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_store(config: &DedupConfig) -> Result<Arc<MemoryStore>> {
    let store = match config.store_path {
        Some(ref path) => MemoryStore::open(path, ContentFingerprinter)
            .with_context(|| format!("Failed to open store {}", path.display()))?,
        None => MemoryStore::new(ContentFingerprinter),
    };
    Ok(Arc::new(store.with_max_distance(config.max_distance)))
}

fn save_store(store: &MemoryStore) {
    if let Err(e) = store.save() {
        warn!("Failed to save store: {}", e);
    }
}

fn build_pipeline(config: DedupConfig, store: &Arc<MemoryStore>) -> Result<Pipeline> {
    let store: Arc<dyn SignatureStore> = store.clone();
    let pipeline = Pipeline::new(config, store)
        .context("Failed to prepare pipeline")?
        .with_observer(Arc::new(LogObserver::new()));
    Ok(pipeline)
}

/// Phases 2-3 only.
fn run_analyze(config: DedupConfig) -> Result<()> {
    let store = open_store(&config)?;
    let pipeline = build_pipeline(config, &store)?;

    let report = pipeline.analyze().context("Analysis failed")?;
    save_store(&store);

    println!();
    println!("{}", "─".repeat(60));
    println!(" Analysis Report");
    println!("{}", "─".repeat(60));
    println!(" {} files found", report.files);
    println!(" {} stored, {} unchanged", report.stored, report.unchanged);
    println!(" {} skipped, {} failed", report.skipped, report.failed);
    println!(" {} records in store", store.len());
    println!();

    Ok(())
}

fn run_deduplicate(config: DedupConfig, skip_analyze: bool, format: OutputFormat) -> Result<()> {
    let store = open_store(&config)?;
    let pipeline = build_pipeline(config, &store)?;

    let options = RunOptions {
        analyze: !skip_analyze,
        ..RunOptions::default()
    };
    let result = pipeline.run(&options).context("Deduplication failed")?;
    save_store(&store);

    match format {
        OutputFormat::Text => print_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

fn run_daemon(config: DedupConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(serve(config))
}

async fn serve(config: DedupConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let store = open_store(&config)?;
    let walker = FileWalker::from_config(&config).context("Invalid exclusions")?;
    let daemon_config = config.daemon.clone();
    let pipeline = Arc::new(build_pipeline(config, &store)?.with_cancellation(cancel.clone()));

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
        }
        ctrl_c.cancel();
    });

    // Watch first so changes made during the batch pass queue up.
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let watchers = watch(pipeline.roots(), &daemon_config, walker, tx)?;

    let batch = Arc::clone(&pipeline);
    let initial = tokio::task::spawn_blocking(move || batch.run(&RunOptions::default())).await?;
    save_store(&store);
    match initial {
        Ok(result) => print_result(&result),
        Err(PipelineError::Cancelled { phase }) => {
            info!("Cancelled before {}", phase);
            return Ok(());
        }
        Err(e) => return Err(e).context("Initial pass failed"),
    }

    let stats = Daemon::new(Arc::clone(&pipeline), daemon_config.quiescence)
        .with_cancellation(cancel)
        .run(rx)
        .await;
    drop(watchers);
    save_store(&store);

    info!(
        "Daemon stopped: {} processed, {} forgotten, {} failed",
        stats.processed, stats.forgotten, stats.failed
    );
    Ok(())
}

fn print_result(result: &RunResult) {
    let summary = result.summary();

    println!();
    println!("{}", "─".repeat(90));
    println!(
        " Duplicate Report{}",
        if result.dry_run { " (dry run)" } else { "" }
    );
    println!("{}", "─".repeat(90));
    println!();

    let groups: Vec<_> = result
        .groups
        .values()
        .filter(|g| !g.members.is_empty())
        .collect();

    if groups.is_empty() {
        println!(" No duplicate images found.");
    } else {
        for (i, group) in groups.iter().enumerate() {
            println!(" Group {} ({} files)", i + 1, group.members.len() + 1);
            println!(
                "   {:<8} {:>8} {:>10} {:>12}  {}",
                "ACTION", "DISTANCE", "SIZE", "PIXELS", "PATH"
            );
            for record in std::iter::once(&group.kept).chain(group.members.iter()) {
                let action = result
                    .action(&record.path)
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "   {:<8} {:>8.3} {:>10} {:>12}  {}",
                    action,
                    record.distance,
                    format_size(record.metadata.file_size),
                    record.metadata.pixel_count,
                    record.path.display()
                );
            }
            println!();
        }
    }

    if !result.reclaimed.is_empty() {
        println!(" Empty folders:");
        for folder in &result.reclaimed {
            println!("   {}", folder.display());
        }
        println!();
    }

    if !result.failures.is_empty() {
        println!(" Failures:");
        for failure in &result.failures {
            println!("   {}: {}", failure.path.display(), failure.message);
        }
        println!();
    }

    println!(
        " {} groups with duplicates, {} deleted, {} moved, {} folders removed, {} failed",
        summary.groups_with_duplicates,
        summary.deleted,
        summary.moved,
        summary.reclaimed_folders,
        summary.failed
    );
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde_json::json;
use wordgroups::config::{
    CorpusConfig, GroupingConfig, DEFAULT_CHUNK_COUNT, DEFAULT_CONCURRENCY, DEFAULT_DELIMITER,
    DEFAULT_THRESHOLD,
};
use wordgroups::corpus::load_tokens;
use wordgroups::{
    load_embeddings, save_groups, CancellationToken, EmbeddingTable, GroupingEngine,
    ProgressTracker, WordGroupError,
};

const DEFAULT_OUTPUT: &str = "word_groups.txt";

#[derive(Parser, Debug)]
#[command(author, version, about = "Embedding-based word grouping toolkit", long_about = None)]
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
    /// Group similar tokens from token files
    Group(GroupArgs),
    /// Inspect an embedding table
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct GroupArgs {
    /// Token files or directories to read
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Embedding table (word followed by vector components per line)
    #[arg(short = 'e', long, value_name = "PATH")]
    embeddings: PathBuf,

    /// Output path for the group file
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Cosine similarity a token must exceed to join a group
    #[arg(long, value_name = "FLOAT", default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Number of chunks the token stream is split into
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CHUNK_COUNT)]
    chunks: usize,

    /// Maximum chunks processed concurrently
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    threads: usize,

    /// Separator written between group members
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_DELIMITER)]
    delimiter: String,

    /// Disable the progress bar and run logging
    #[arg(long)]
    no_progress: bool,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,

    /// Keep token case instead of lower-casing
    #[arg(long)]
    keep_case: bool,

    /// Optional path for a JSON run summary
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Embedding table to inspect
    #[arg(short = 'e', long, value_name = "PATH")]
    embeddings: PathBuf,

    /// Emit JSON instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Number of words to list, in lexicographic order
    #[arg(long, default_value_t = 5)]
    sample: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Group(args) => run_group(args),
        Commands::Info(args) => run_info(args),
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

fn load_table(path: &Path) -> Result<EmbeddingTable> {
    load_embeddings(path).map_err(|err| {
        let stage = match err {
            WordGroupError::Io { .. } => "open",
            _ => "parse",
        };
        anyhow::Error::new(err).context(format!(
            "failed to {stage} embeddings {}",
            path.display()
        ))
    })
}

fn run_group(args: GroupArgs) -> Result<()> {
    let cfg = GroupingConfig::builder()
        .threshold(args.threshold)
        .chunk_count(args.chunks)
        .concurrency(args.threads)
        .delimiter(args.delimiter.clone())
        .show_progress(!args.no_progress)
        .build()?;
    let corpus_cfg = CorpusConfig::builder()
        .recursive(!args.no_recursive)
        .follow_symlinks(args.follow_symlinks)
        .lowercase(!args.keep_case)
        .build();

    let start = Instant::now();
    let table = load_table(&args.embeddings)?;
    let tokens = load_tokens(&args.inputs, &corpus_cfg).context("failed to load tokens")?;
    info!("loaded {} tokens", tokens.len());

    let bar = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new(tokens.len() as u64);
        let style = ProgressStyle::with_template(
            "{pos}/{len} [{bar:40.cyan/blue}] {percent}% {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        pb.set_style(style);
        Some(pb)
    };
    let progress = match &bar {
        Some(pb) => {
            let pb = pb.clone();
            ProgressTracker::with_observer(move |n| pb.inc(n))
        }
        None => ProgressTracker::new(),
    };

    let engine = GroupingEngine::new(cfg.clone());
    let artifacts =
        engine.group_tokens_with(&table, &tokens, &progress, &CancellationToken::new())?;
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    let report = &artifacts.report;
    save_groups(&args.output, &report.groups, &cfg.delimiter)
        .with_context(|| format!("failed to write groups to {}", args.output.display()))?;

    if let Some(path) = &args.summary {
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| json!({ "chunk": f.index, "error": f.error.to_string() }))
            .collect();
        let summary = json!({
            "embeddings": args.embeddings.display().to_string(),
            "output": args.output.display().to_string(),
            "config": cfg,
            "metrics": artifacts.metrics,
            "failures": failures,
        });
        write_summary(path, &summary)?;
    }

    let elapsed = start.elapsed();
    println!(
        "wrote {} groups ({} tokens grouped) to {}",
        artifacts.metrics.groups,
        artifacts.metrics.grouped_tokens,
        args.output.display()
    );
    println!(
        "   tokens {} | out of vocabulary {} | chunks {} | duration {:.2?}",
        artifacts.metrics.tokens, artifacts.metrics.oov_tokens, artifacts.metrics.chunks, elapsed
    );

    if !report.is_complete() {
        for failure in &report.failures {
            warn!("chunk {} failed: {}", failure.index, failure.error);
        }
        return Err(anyhow!(
            "{} of {} chunks failed; partial output written to {}",
            report.failures.len(),
            artifacts.metrics.chunks,
            args.output.display()
        ));
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let table = load_table(&args.embeddings)?;
    let mut words: Vec<&str> = table.words().collect();
    words.sort_unstable();
    words.truncate(args.sample);
    let summary = json!({
        "path": args.embeddings.display().to_string(),
        "words": table.len(),
        "dimension": table.dimension(),
        "zero_vectors": table.zero_vectors(),
        "duplicates": table.duplicates(),
        "sample": words,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Words        : {}", table.len());
        println!("Dimension    : {}", table.dimension());
        println!("Zero vectors : {}", table.zero_vectors());
        println!("Duplicates   : {}", table.duplicates());
        if !words.is_empty() {
            println!("Sample       : {}", words.join(" "));
        }
    }

    Ok(())
}

fn write_summary(path: &Path, summary: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, summary)
        .with_context(|| format!("failed to serialise {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use title_match::driver::{match_prefetched, Pipeline, PrefetchedTitle};
use title_match::embedding::EmbeddingModel;
use title_match::progress::{create_spinner, format_duration, set_log_only};
use title_match::safety::validate_report_path;
use title_match::{parse, MatchConfig};

#[derive(Parser)]
#[command(name = "title-match")]
#[command(about = "Match video titles to catalog tracks and report confidence")]
struct Args {
    /// JSON array of {"title": ..., "candidates": [...]}
    #[arg(required_unless_present = "queries")]
    input: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Score at or above which a match is HIGH confidence
    #[arg(long)]
    threshold: Option<f64>,

    /// Embedding model id (string_only, hashed-trigram, all-mpnet-base-v2, ...)
    #[arg(long)]
    model: Option<EmbeddingModel>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and print periodic log lines instead
    #[arg(long)]
    log_only: bool,

    /// Print the parse and query plan for one title and exit
    #[arg(long, value_name = "TITLE")]
    queries: Option<String>,
}

fn load_config(args: &Args) -> Result<MatchConfig> {
    let mut config = match &args.config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(model) = args.model {
        config.embedding_model = model;
    }
    config.validate().context("Invalid settings")?;
    Ok(config)
}

fn print_query_plan(config: &MatchConfig, title: &str) {
    let cleaned = config.cleaner().clean(title);
    println!("Raw:     {title}");
    println!("Cleaned: {cleaned}");
    match parse(&cleaned).artist_title() {
        Some((artist, track)) => println!("Parsed:  artist={artist:?} title={track:?}"),
        None => println!("Parsed:  (no artist/title separator)"),
    }
    println!("Queries:");
    for (i, query) in config.query_builder().build(title).iter().enumerate() {
        println!("  {}. {}", i + 1, query);
    }
}

fn read_titles(path: &Path) -> Result<Vec<PrefetchedTitle>> {
    let spinner = create_spinner("Reading titles");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    let titles: Vec<PrefetchedTitle> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse input {}", path.display()))?;
    spinner.finish_with_message(format!("Read {} titles", titles.len()));
    Ok(titles)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    set_log_only(args.log_only);

    let config = load_config(&args)?;

    if let Some(title) = &args.queries {
        print_query_plan(&config, title);
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("an input file is required unless --queries is given");
    };

    if let Some(output) = &args.output {
        let mut inputs: Vec<&Path> = vec![input];
        if let Some(config_path) = &args.config {
            inputs.push(config_path);
        }
        validate_report_path(output, &inputs)?;
    }

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();
    if !config.embedding_model.is_available() {
        warn!(
            "{} needs the `semantic` feature; scores will fall back to lexical",
            config.embedding_model
        );
    }

    let titles = read_titles(input)?;
    let pipeline = Pipeline::from_config(&config);
    info!(
        "Matching with threshold {:.2}, {} [{}, {}]",
        config.threshold,
        pipeline.scorer().describe(),
        config.embedding_model.display_name(),
        config.embedding_model.approx_size()
    );
    let report = match_prefetched(&pipeline, titles);

    report.log_summary();
    if report.semantic_scored > 0 {
        info!("{} of {} results scored semantically", report.semantic_scored, report.total());
    }

    if let Some(output) = &args.output {
        report
            .write_to_file(output)
            .with_context(|| format!("Failed to write report {}", output.display()))?;
        info!("Report written to {}", output.display());
    }

    info!("Done in {}", format_duration(start.elapsed()));
    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{read_input, render_code, render_description, render_report, render_rows, render_summary};
use hsindex_core::config::{self, AppConfig};
use hsindex_core::extractor::RecordSource;
use hsindex_core::pipeline::{self, parse_batch_input};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hs-index")]
#[command(about = "Index HS classification codes and look them up", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the relational source and show sample rows
    Check {
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },
    /// Rebuild the search index from the source table
    Index,
    /// Find codes matching a description
    Ask { description: String },
    /// Look up the description of a code
    Code { code: String },
    /// One description per line (`-` for stdin)
    BatchAsk { file: String },
    /// One code per line (`-` for stdin)
    BatchCodes { file: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    info!(index = %cfg.search.index, table = %cfg.source.table, "configuration loaded");

    match cli.command {
        Commands::Check { sample } => run_check(&cfg, sample, cli.json).await,
        Commands::Index => run_index(&cfg, cli.json).await,
        Commands::Ask { description } => {
            let orchestrator = pipeline::build_orchestrator(&cfg)?;
            let result = orchestrator.lookup_description(&description).await?;
            emit(cli.json, &result, || render_description(&result))
        }
        Commands::Code { code } => {
            let orchestrator = pipeline::build_orchestrator(&cfg)?;
            let result = orchestrator.lookup_code(&code).await?;
            emit(cli.json, &result, || render_code(&result))
        }
        Commands::BatchAsk { file } => {
            let queries = parse_batch_input(&read_input(&file).context("read batch input")?);
            let orchestrator = pipeline::build_orchestrator(&cfg)?;
            info!(count = queries.len(), "batch description lookup");
            let rows = orchestrator.batch_descriptions(&queries).await;
            emit(cli.json, &rows, || render_rows(&rows))
        }
        Commands::BatchCodes { file } => {
            let codes = parse_batch_input(&read_input(&file).context("read batch input")?);
            let orchestrator = pipeline::build_orchestrator(&cfg)?;
            info!(count = codes.len(), "batch code lookup");
            let rows = orchestrator.batch_codes(&codes).await;
            emit(cli.json, &rows, || render_rows(&rows))
        }
    }
}

async fn run_check(cfg: &AppConfig, sample: usize, json: bool) -> Result<()> {
    let source = pipeline::connect_source(cfg).await.context("source connect")?;
    let summary = source.inspect(sample).await?;
    emit(json, &summary, || render_summary(&summary))
}

async fn run_index(cfg: &AppConfig, json: bool) -> Result<()> {
    let source = pipeline::connect_source(cfg).await.context("source connect")?;
    let embedder = pipeline::build_embedder(cfg).context("embedding provider")?;
    let orchestrator = pipeline::build_orchestrator(cfg)?;
    let report = orchestrator.reindex_all(&source, &embedder).await?;
    info!(
        indexed = report.indexed_count,
        failed = report.failures.len(),
        "reindex finished"
    );
    emit(json, &report, || render_report(&report))
}

fn emit<T: serde::Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

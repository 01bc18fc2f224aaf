use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use partsearch::config::State;
use partsearch::embedding::{EmbeddingProvider, HashingLoader};
use partsearch::normalizer::TextNormalizer;
use partsearch::persistence::{CatalogPersistence, LmdbCatalogStore};
use partsearch::search::SearchEngine;
use partsearch::terms::TermDictionary;
use partsearch::{ingest, parser};

#[derive(Parser)]
#[command(name = "partsearch")]
#[command(version = "0.1")]
#[command(about = "Repair and parts catalog search with priced quotes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the catalog from fixed-width export files
    Ingest {
        #[arg(long, required = true, num_args = 1..)]
        repairs: Vec<PathBuf>,
        #[arg(long)]
        parts: PathBuf,
        #[arg(long)]
        markup: PathBuf,
        /// Overrides the configured labor rate
        #[arg(long)]
        labor_rate: Option<f64>,
    },
    /// Search the catalog and print priced matches as JSON
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Print a text after trade-term expansion
    Expand { text: String },
    Status,
    Clear,
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn normalizer(state: &State) -> TextNormalizer {
    TextNormalizer::new(Arc::new(TermDictionary::trade_defaults()), state.match_mode)
}

fn open_engine(state: &State) -> Result<SearchEngine> {
    let persistence: Arc<dyn CatalogPersistence> = Arc::new(
        LmdbCatalogStore::open(&state.path)
            .with_context(|| format!("failed to open catalog store at {}", state.path))?,
    );
    let provider = EmbeddingProvider::new(
        Arc::new(HashingLoader::new(state.dimensions)),
        state.retry_policy(),
    )
    .with_max_input_chars(state.max_input_chars);

    Ok(SearchEngine::new(normalizer(state), Arc::new(provider), persistence))
}

async fn ingest_command(
    state: &State,
    repairs: &[PathBuf],
    parts: &Path,
    markup: &Path,
    labor_rate: Option<f64>,
) -> Result<()> {
    let labor_rate = labor_rate.unwrap_or(state.labor_rate);
    if !labor_rate.is_finite() || labor_rate < 0.0 {
        anyhow::bail!("labor rate must be a non-negative number");
    }

    let catalog = parser::load_catalog(repairs, parts, markup)?;
    let mut engine = open_engine(state)?;
    let report = ingest::ingest(&mut engine, catalog, labor_rate, state.batch_size)
        .await
        .context("ingestion failed")?;

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

async fn search_command(state: &State, query: &str, top_k: Option<usize>) -> Result<()> {
    let mut engine = open_engine(state)?;
    engine.initialize().await.context("failed to initialize search engine")?;

    let top_k = top_k.unwrap_or(state.top_k);
    let quotes = engine.search(query, top_k).await?;

    let output = serde_json::json!({
        "query": query,
        "expanded_query": engine.store().normalizer().enhance(query),
        "catalog_size": engine.store().len(),
        "labor_rate": engine.pricing().labor_rate(),
        "results": quotes,
        "actual_results_count": quotes.len(),
        "requested_results_count": top_k,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn expand_command(state: &State, text: &str) -> Result<()> {
    println!("{}", normalizer(state).enhance(text));
    Ok(())
}

async fn status_command(state: &State) -> Result<()> {
    let mut engine = open_engine(state)?;
    let populated = engine.initialize().await?;

    let output = serde_json::json!({
        "path": state.path,
        "ready": engine.has_data(),
        "catalog_loaded": populated,
        "items": engine.store().len(),
        "tiers": engine.pricing().tiers().len(),
        "labor_rate": engine.pricing().labor_rate(),
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn clear_command(state: &State) -> Result<()> {
    let mut engine = open_engine(state)?;
    engine.clear_cache()?;
    info!(path = %state.path, "catalog cleared");
    Ok(())
}

fn config_command(state: &State) -> Result<()> {
    state.print_config();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();
    let state = State::new()?;

    match args.command {
        Commands::Ingest {
            repairs,
            parts,
            markup,
            labor_rate,
        } => ingest_command(&state, &repairs, &parts, &markup, labor_rate).await?,
        Commands::Search { query, top_k } => search_command(&state, &query, top_k).await?,
        Commands::Expand { text } => expand_command(&state, &text)?,
        Commands::Status => status_command(&state).await?,
        Commands::Clear => clear_command(&state)?,
        Commands::Config => config_command(&state)?,
    }
    Ok(())
}

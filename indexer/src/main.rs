use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use searchcore::persist::{load_index, save_index};
use searchcore::{search, Config, ExtractorRegistry, IndexBuilder, SearchHit};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a document index", long_about = None)]
struct Cli {
    /// Index directory (defaults to $RECIPE_INDEX_HOME/index or ~/.recipe-index/index)
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from every supported file under a directory
    Build {
        /// Directory containing the documents to index
        #[arg(long)]
        root: PathBuf,
        /// Keep term case instead of lowercasing
        #[arg(long, default_value_t = false)]
        case_sensitive: bool,
    },
    /// Run a query against a persisted index
    Search {
        /// Query text; every term must appear in a matching document
        query: String,
        /// Maximum number of results to print
        #[arg(long, default_value_t = 1000)]
        limit: usize,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    total_hits: usize,
    results: &'a [SearchHit],
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { root, case_sensitive } => {
            let mut config = Config::new(Some(root), cli.index);
            config.fold_case = !case_sensitive;
            build(&config)
        }
        Commands::Search { query, limit, json } => {
            let mut config = Config::new(None, cli.index);
            config.max_results = limit;
            run_search(&config, &query, json)
        }
    }
}

fn build(config: &Config) -> Result<()> {
    let root = config.doc_root.as_deref().context("no document directory configured")?;
    let (sealed, stats) = IndexBuilder::new(ExtractorRegistry::default())
        .with_tokenizer(config.tokenizer())
        .build(root)
        .with_context(|| format!("indexing {}", root.display()))?;
    save_index(&config.index_dir, &sealed)
        .with_context(|| format!("writing index to {}", config.index_dir.display()))?;

    println!(
        "indexed {} of {} files ({} unsupported, {} failed) into {}",
        stats.indexed,
        stats.scanned,
        stats.skipped,
        stats.failed,
        config.index_dir.display()
    );
    Ok(())
}

fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let sealed = load_index(&config.index_dir)
        .with_context(|| format!("loading index from {}", config.index_dir.display()))?;
    let hits = search(&sealed, query, &config.search_options());
    tracing::debug!(hits = hits.len(), "search finished");

    if json {
        let out = SearchOutput { query, total_hits: hits.len(), results: &hits };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for hit in &hits {
            println!("{:>4}  {}  {}", hit.score, hit.title, hit.path.display());
        }
    }
    Ok(())
}

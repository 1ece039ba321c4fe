use clap::{Parser, Subcommand};
use quarry_embed::{CacheConfig, EmbedConfig, Embedder, build_provider, open_cache_store};
use quarry_retriever::{Retriever, RetrieverConfig, ScoredChunk, build_retriever};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// A CLI tool to load a text corpus and run semantic queries against it.
///
/// Provider, cache and backend settings come from the environment
/// (COHERE_API_KEY, HUGGINGFACE_MODEL, CACHE_DB_PATH, USE_CHROMADB, ...).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Corpus file to load before running the command
    #[arg(short, long, env = "KNOWLEDGE_PATH")]
    knowledge: Option<PathBuf>,

    /// Words per chunk
    #[arg(long, env = "CHUNK_MAX_WORDS")]
    max_words: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the passages most similar to a query
    Query {
        /// Free-text query
        query: String,
        /// Maximum number of results [default: TOP_K or 3]
        #[arg(short)]
        k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Load the corpus and report what was indexed
    Stats,
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct IndexStats {
    backend: &'static str,
    knowledge_path: String,
    chunks: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = RetrieverConfig::from_env()?;
    if let Some(knowledge) = args.knowledge {
        config = config.with_knowledge_path(knowledge);
    }
    if let Some(max_words) = args.max_words {
        config = config.with_max_words(max_words);
    }
    let embed_config = EmbedConfig::from_env()?;
    let cache_config = CacheConfig::from_env()?;

    let provider = build_provider(&embed_config).await?;
    let store = open_cache_store(&cache_config).await?;
    let embedder = Arc::new(
        Embedder::new(provider, store, cache_config.ttl).with_timeout(embed_config.timeout),
    );

    let retriever = build_retriever(&config, embedder).await?;
    let loaded = retriever.load_from_file(&config.knowledge_path).await?;
    tracing::info!(
        "Loaded {} chunks from {}",
        loaded,
        config.knowledge_path.display()
    );

    match args.command {
        Commands::Query { query, k, format } => {
            let k = k.unwrap_or(config.top_k);
            let results = retriever.top_k_similar(&query, k).await?;
            print_results(&results, &format)?;
        }
        Commands::Stats => {
            let stats = IndexStats {
                backend: retriever.backend_name(),
                knowledge_path: config.knowledge_path.display().to_string(),
                chunks: retriever.chunk_count().await?,
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

fn print_results(results: &[ScoredChunk], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Summary | OutputFormat::Full => {
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, result) in results.iter().enumerate() {
                let text = if *format == OutputFormat::Summary {
                    truncate(&result.chunk.text, 100)
                } else {
                    result.chunk.text.clone()
                };
                println!(
                    "{}. [{:.4}] {} ({}#{})",
                    rank + 1,
                    result.score,
                    text,
                    result.chunk.source_file,
                    result.chunk.source_index
                );
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

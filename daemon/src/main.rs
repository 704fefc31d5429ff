//! txindex: index committed transaction results and search them.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};

use txindex_query::Query;
use txindex_search::{SearchMetrics, TxSearch};
use txindex_store::{SearchContext, TxIndexer, TxStore};
use txindex_store_lmdb::LmdbTxStore;
use txindex_types::{TxHash, TxResult};
use txindex_utils::LogFormat;

use crate::config::IndexerConfig;

#[derive(Parser)]
#[command(name = "txindex", about = "Transaction result indexer and search tool")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TXINDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the index database.
    #[arg(long, env = "TXINDEX_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TXINDEX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TXINDEX_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Index a JSON array of transaction results as one batch.
    Index {
        /// File containing `[TxResult, ...]` as JSON.
        file: PathBuf,
    },
    /// Search with a query such as "tx.height = 5 AND transfer.amount > 100".
    Search {
        query: String,

        /// Give up (returning nothing) after this many milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print search metrics to stderr afterwards.
        #[arg(long)]
        metrics: bool,
    },
    /// Print the result stored under a transaction hash.
    Get {
        /// 64 hex characters, optionally prefixed with 0x.
        hash: String,
    },
    /// Print the estimated number of distinct indexed values of a tag.
    Cardinality {
        /// Composite event tag, e.g. "transfer.recipient".
        tag: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<IndexerConfig> {
    let mut config = match &cli.config {
        Some(path) => IndexerConfig::from_toml_file(path)?,
        None => IndexerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

async fn open_store(config: &IndexerConfig) -> anyhow::Result<Arc<LmdbTxStore>> {
    let path = config.data_dir.clone();
    let store_config = config.store_config();
    let store = tokio::task::spawn_blocking(move || LmdbTxStore::open(&path, &store_config))
        .await?
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    Ok(Arc::new(store))
}

async fn index(store: Arc<LmdbTxStore>, file: PathBuf) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let batch: Vec<TxResult> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
    let count = batch.len();
    tokio::task::spawn_blocking(move || store.add_batch(&batch)).await??;
    tracing::info!(count, file = %file.display(), "indexed transaction results");
    Ok(())
}

async fn search(
    store: Arc<LmdbTxStore>,
    text: &str,
    timeout_ms: Option<u64>,
    print_metrics: bool,
) -> anyhow::Result<()> {
    let query = Query::parse(text).with_context(|| format!("parsing query {:?}", text))?;
    let metrics = Arc::new(SearchMetrics::new());
    let searcher = TxSearch::new(store).with_metrics(Arc::clone(&metrics));

    let ctx = match timeout_ms {
        Some(ms) => SearchContext::with_timeout(Duration::from_millis(ms)),
        None => SearchContext::new(),
    };
    let worker_ctx = ctx.clone();
    let mut task = tokio::task::spawn_blocking(move || searcher.search(&worker_ctx, &query));

    let results = tokio::select! {
        joined = &mut task => joined??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, cancelling search");
            ctx.cancel();
            task.await??
        }
    };

    println!("{}", serde_json::to_string_pretty(&results)?);
    tracing::info!(count = results.len(), "search finished");

    if print_metrics {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&metrics.registry.gather(), &mut buf)?;
        eprint!("{}", String::from_utf8_lossy(&buf));
    }
    Ok(())
}

async fn get(store: Arc<LmdbTxStore>, hash: &str) -> anyhow::Result<()> {
    let hash: TxHash = hash.parse()?;
    match tokio::task::spawn_blocking(move || store.get(&hash)).await?? {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        None => bail!("no transaction stored under {}", hash),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    txindex_utils::init_logging(config.log_format, &config.log_level)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let store = open_store(&config).await?;

    match cli.command {
        Command::Index { file } => index(store, file).await?,
        Command::Search {
            query,
            timeout_ms,
            metrics,
        } => search(store, &query, timeout_ms, metrics).await?,
        Command::Get { hash } => get(store, &hash).await?,
        Command::Cardinality { tag } => {
            println!("{}", store.cardinality(&tag)?);
        }
    }

    Ok(())
}

//! # Transcript Index CLI (`tidx`)
//!
//! The `tidx` binary drives the ingestion and retrieval pipeline over a
//! transcript corpus.
//!
//! ## Usage
//!
//! ```bash
//! tidx [--config ./config/tidx.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tidx ingest` | Scan the corpus and (re-)index new or changed documents |
//! | `tidx query "<text>"` | Similarity search; prints ranked results as JSON |
//! | `tidx stats` | Summarize the manifest and the vector store |
//!
//! The config file is optional; built-in defaults apply when it is
//! absent, and the `--corpus`/`--store`/`-k` flags override the
//! corresponding config values.
//!
//! ## Examples
//!
//! ```bash
//! # Index a transcript directory into ./data/index
//! tidx ingest --corpus ./transcripts --store ./data/index
//!
//! # Discard the manifest and reprocess everything
//! tidx ingest --corpus ./transcripts --store ./data/index --rebuild
//!
//! # Top 5 matches as a JSON array on stdout
//! tidx query "motion to dismiss" --store ./data/index -k 5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use transcript_index::{config, ingest, query, stats};

/// Transcript Index — incremental ingestion and semantic retrieval over
/// a document corpus.
#[derive(Parser)]
#[command(
    name = "tidx",
    about = "Transcript Index — incremental ingestion and semantic retrieval over a document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/tidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest new or changed documents from the corpus.
    ///
    /// Scans the corpus root, skips documents whose manifest entry is
    /// up to date, extracts and chunks the rest, embeds the chunks, and
    /// writes them to the vector store. Exit code 0 includes "nothing
    /// new to ingest".
    Ingest {
        /// Corpus root directory (overrides `corpus.root`).
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Store directory (overrides `store.dir`).
        #[arg(long)]
        store: Option<PathBuf>,

        /// Discard the manifest and the store contents, then reprocess
        /// every document from scratch.
        #[arg(long)]
        rebuild: bool,

        /// Show document and chunk estimates without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Query the store for the most similar chunks.
    ///
    /// Embeds the query with the same model the corpus was indexed with
    /// and prints a JSON array of ranked results to stdout.
    Query {
        /// The query text.
        query: String,

        /// Store directory (overrides `store.dir`).
        #[arg(long)]
        store: Option<PathBuf>,

        /// Number of results to return.
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Print manifest and store statistics.
    Stats {
        /// Store directory (overrides `store.dir`).
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            corpus,
            store,
            rebuild,
            dry_run,
        } => {
            if let Some(corpus) = corpus {
                cfg.corpus.root = corpus;
            }
            if let Some(store) = store {
                cfg.store.dir = store;
            }
            ingest::run_ingest(&cfg, rebuild, dry_run).await?;
        }
        Commands::Query { query, store, k } => {
            if let Some(store) = store {
                cfg.store.dir = store;
            }
            let k = k.unwrap_or(cfg.retrieval.default_k);
            query::run_query(&cfg, &query, k).await?;
        }
        Commands::Stats { store } => {
            if let Some(store) = store {
                cfg.store.dir = store;
            }
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

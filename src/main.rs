//! # DOCX Harness CLI (`dxh`)
//!
//! Ingests a DOCX document into labeled text+image chunks and answers
//! questions against the resulting chunk set.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dxh ingest <file.docx>` | Chunk a document and write the chunk set as JSON |
//! | `dxh search "<query>"` | Rank chunks from a chunk set |
//! | `dxh ask "<query>"` | Search, then generate an answer from the evidence |
//! | `dxh fetch <repo_url>` | Download a chunk set from a GitHub repository |
//! | `dxh chunks` | Browse a chunk set page by page |
//!
//! ## Examples
//!
//! ```bash
//! dxh ingest ./sop.docx --output chunks.json --images-dir ./images
//! dxh search "battery pricing in ohio" --chunks chunks.json
//! dxh ask "how many states have an order limit?" --chunks chunks.json
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `docx_harness=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docx_harness::{config, ingest, llm, remote, search, store};

/// DOCX Harness: DOCX ingestion into labeled text+image chunks, with
/// lexical retrieval on top.
#[derive(Parser)]
#[command(name = "dxh", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/dxh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a DOCX file into a chunk set.
    Ingest {
        /// Path to the .docx file.
        file: PathBuf,

        /// Maximum characters per chunk (overrides `[chunking] chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Where to write the chunk set.
        #[arg(long, short, default_value = "chunks.json")]
        output: PathBuf,

        /// Keep extracted images in this directory. Without it images go to a
        /// temporary directory removed when the command exits.
        #[arg(long)]
        images_dir: Option<PathBuf>,
    },

    /// Rank chunks against a query.
    Search {
        query: String,

        /// Chunk set to search.
        #[arg(long, default_value = "chunks.json")]
        chunks: PathBuf,

        /// Number of results (analytical queries may return more).
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question from the chunk set.
    ///
    /// Requires `[llm] provider = "openai"` (`OPENAI_API_KEY`) or `"gemini"` (`GEMINI_API_KEY`).
    Ask {
        query: String,

        #[arg(long, default_value = "chunks.json")]
        chunks: PathBuf,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Fetch a chunk set from a GitHub repository.
    ///
    /// Requires `GITHUB_TOKEN`.
    Fetch {
        /// Repository URL, e.g. `https://github.com/owner/repo`.
        repo_url: String,

        /// File path inside the repository (defaults to `[remote] default_path`).
        #[arg(long)]
        path: Option<String>,

        #[arg(long, short, default_value = "chunks.json")]
        output: PathBuf,
    },

    /// Browse a chunk set.
    Chunks {
        #[arg(long, default_value = "chunks.json")]
        chunks: PathBuf,

        /// Only show chunks containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 5)]
        per_page: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "docx_harness=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            file,
            chunk_size,
            output,
            images_dir,
        } => {
            ingest::run_ingest(&cfg, &file, chunk_size, &output, images_dir.as_deref())?;
        }
        Commands::Search {
            query,
            chunks,
            top_k,
            json,
        } => {
            search::run_search(&cfg, &query, &chunks, top_k, json)?;
        }
        Commands::Ask {
            query,
            chunks,
            top_k,
        } => {
            llm::run_ask(&cfg, &query, &chunks, top_k).await?;
        }
        Commands::Fetch {
            repo_url,
            path,
            output,
        } => {
            remote::run_fetch(&cfg, &repo_url, path.as_deref(), &output).await?;
        }
        Commands::Chunks {
            chunks,
            filter,
            page,
            per_page,
        } => {
            store::run_chunks(&chunks, filter.as_deref(), page, per_page)?;
        }
    }

    Ok(())
}

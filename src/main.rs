mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lore::config::LoreConfig;
use lore::server;

#[derive(Parser)]
#[command(name = "lore", version, about = "Shared knowledge store MCP server for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport unless --http)
    Serve {
        /// Serve Streamable HTTP on server.host:server.port instead of stdio
        #[arg(long)]
        http: bool,
    },
    /// Search the store from the terminal
    Search {
        query: String,
        #[arg(long)]
        source: Option<String>,
        /// Required tag; repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show counts, retention distribution and stale candidates
    Health,
    /// List topics with counts and average retention
    Topics {
        #[arg(long)]
        source: Option<String>,
    },
    /// List near-duplicate pairs
    Duplicates {
        /// Similarity threshold between 0.3 and 0.95
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Report entries that decayed away; delete them with --apply
    Prune {
        #[arg(long)]
        apply: bool,
    },
    /// Run database diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LoreConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { http } => {
            if http || config.server.transport == "http" {
                server::serve_http(config).await?;
            } else {
                server::serve_stdio(config).await?;
            }
        }
        Command::Search {
            query,
            source,
            tags,
            limit,
        } => cli::search::search(config, query, source, tags, limit).await?,
        Command::Health => cli::health::health(&config)?,
        Command::Topics { source } => cli::topics::topics(&config, source.as_deref())?,
        Command::Duplicates { threshold } => cli::duplicates::duplicates(&config, threshold)?,
        Command::Prune { apply } => cli::prune::prune(&config, apply)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}

//! Researcher CLI: iterative, cited research reports from the terminal.

mod commands;
mod research;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Researcher: multi-cycle web research with cited reports
#[derive(Parser, Debug)]
#[command(name = "researcher", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Research question
    question: Option<String>,

    /// Model to use (gpt-4o, gpt-4o-mini, o1, o3-mini, ...)
    #[arg(short, long)]
    model: Option<String>,

    /// Follow-up questions requested per cycle (1-20)
    #[arg(long)]
    follow_up_questions: Option<i64>,

    /// Search results kept per query (1-20)
    #[arg(long)]
    search_results: Option<i64>,

    /// Character cap on each fetched page (1000-16000)
    #[arg(long)]
    max_content_length: Option<i64>,

    /// Number of research cycles (1-3)
    #[arg(short, long)]
    depth: Option<i64>,

    /// API key for this run (overrides stored and environment keys)
    #[arg(long)]
    api_key: Option<String>,

    /// Write the final report to a file (defaults to <question-slug>-report.md)
    #[arg(short, long)]
    output: Option<Option<PathBuf>>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Browse saved reports
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage the stored API key
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum HistoryAction {
    /// List saved reports, newest first
    List,
    /// Print a saved report
    Show {
        /// Report id (from `history list`)
        id: i64,
    },
    /// Delete a saved report
    Delete {
        /// Report id (from `history list`)
        id: i64,
    },
}

#[derive(clap::Subcommand, Debug)]
enum AuthAction {
    /// Store an API key in the OS keyring
    Set {
        /// The API key
        key: String,
    },
    /// Remove the stored API key
    Clear,
    /// Show where the API key would come from
    Status,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config file to the workspace
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = researcher_core::config::data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "researcher.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace).await;
    }

    let Some(question) = cli.question.as_deref().map(str::trim).filter(|q| !q.is_empty())
    else {
        anyhow::bail!("No research question given. Run `researcher --help` for usage.");
    };

    let mut config = researcher_core::config::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(n) = cli.follow_up_questions {
        config.research.follow_up_questions = n;
    }
    if let Some(n) = cli.search_results {
        config.research.search_results = n;
    }
    if let Some(n) = cli.max_content_length {
        config.research.max_content_length = n;
    }
    if let Some(n) = cli.depth {
        config.research.depth_cycle = n;
    }

    let options = research::RunOptions {
        api_key: cli.api_key,
        output: cli.output,
        quiet: cli.quiet,
    };
    research::run_research(question, config, options).await
}

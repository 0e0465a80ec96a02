//! LogPilot CLI
//!
//! A command-line front-end for asking questions about logs and viewing
//! the live statistics dashboard.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{ask, chat, dashboard, health};
use logpilot_core::EndpointConfig;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// LogPilot CLI
#[derive(Parser)]
#[command(name = "lp")]
#[command(author, version, about = "CLI for the LogPilot log assistant", long_about = None)]
pub struct Cli {
    /// Backend URL (can also be set via LOGPILOT_API_URL env var)
    #[arg(long, env = "LOGPILOT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question about the logs
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Fetch statistics once and print every dashboard panel
    Stats,

    /// Keep the dashboard live and re-print it on every refresh
    Watch {
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Interactive chat; panels relevant to each question are highlighted
    Chat {
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Check that the backend is alive
    Health,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = config::Config::load()?;
    let endpoints = EndpointConfig::with_base_url(file_config.resolve_api_url(cli.api_url));
    let poll_interval = |flag: Option<u64>| {
        flag.or(file_config.poll_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| logpilot_core::DashboardConfig::default().poll_interval)
    };

    let result = match cli.command {
        Commands::Ask { query } => ask::ask(&endpoints, &query.join(" "), cli.format).await,
        Commands::Stats => dashboard::show_stats(&endpoints, cli.format).await,
        Commands::Watch { interval_ms } => {
            dashboard::watch(&endpoints, poll_interval(interval_ms), cli.format).await
        }
        Commands::Chat { interval_ms } => chat::run(&endpoints, poll_interval(interval_ms)).await,
        Commands::Health => health::check(&endpoints, cli.format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

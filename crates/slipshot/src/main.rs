//! Slipshot - diagnostic client for the Slipshot backend
//!
//! Main entry point for the slipshot CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, cache, dashboard, probe, slips, tags};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Slipshot - session-aware client for the Slipshot expense tracker
#[derive(Parser)]
#[command(name = "slipshot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend URL (overrides the config file)
    #[arg(long, global = true, env = "SLIPSHOT_SERVER_URL")]
    pub server: Option<String>,

    /// Sign in as this user before running the command
    #[arg(short, long, global = true, env = "SLIPSHOT_USERNAME")]
    pub username: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign out and inspect the session
    Auth(auth::AuthArgs),

    /// Manage tags
    Tags(tags::TagsArgs),

    /// Manage slips
    Slips(slips::SlipsArgs),

    /// Show dashboard aggregates
    Dashboard(dashboard::DashboardArgs),

    /// Inspect or clear the local cache
    Cache(cache::CacheArgs),

    /// Walk through login, auth check, profile and renewal
    Probe(probe::ProbeArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "slipshot=debug,slipshot_client=debug,slipshot_session=debug,slipshot_cache=debug,slipshot_config=debug,info"
    } else {
        "slipshot=info,slipshot_client=info,slipshot_session=info,warn"
    };

    let log_dir = slipshot_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "slipshot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "slipshot=trace,slipshot_client=trace,slipshot_session=trace,slipshot_cache=debug,info",
                )),
        )
        .init();

    let loaded = slipshot_config::load_config(std::env::current_dir().ok().as_deref())?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    for path in loaded.loaded_from() {
        tracing::debug!(path = %path.display(), "Loaded config layer");
    }

    let mut config = loaded.config;
    if let Some(server) = cli.server {
        config.server = Some(slipshot_config::ServerSection {
            base_url: server,
            ..config.server()
        });
    }

    let client = slipshot_client::ClientBuilder::from_config(&config)?.build()?;
    let _sweeper = client.spawn_cache_sweeper();

    let ctx = commands::Context {
        client,
        config,
        username: cli.username,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Tags(args) => tags::run(args, &ctx).await,
        Commands::Slips(args) => slips::run(args, &ctx).await,
        Commands::Dashboard(args) => dashboard::run(args, &ctx).await,
        Commands::Cache(args) => cache::run(args, &ctx).await,
        Commands::Probe(args) => probe::run(args, &ctx).await,
    }
}

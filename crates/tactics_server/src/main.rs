//! Skirmish Tactics - headless authority server

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_core::events::MatchEvent;
use tactics_server::script::{load_script, run_script};
use tactics_server::{spawn_authority, Result, ServerConfig, ServerError};

/// Headless authority for Skirmish Tactics matches.
#[derive(Debug, Parser)]
#[command(name = "tactics-server", version, about)]
struct Cli {
    /// Server configuration file (RON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unit catalog file (RON); overrides the configuration.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Single-player mode: ownership checks are skipped.
    #[arg(long)]
    local: bool,

    /// Write the command log here on shutdown.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Play a RON command script, then shut down.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }
    if cli.local {
        config.match_config.local_authority = true;
    }
    if let Some(replay) = cli.replay {
        config.replay_path = Some(replay);
    }

    let catalog = config.load_catalog()?;
    info!(
        tick_rate = config.tick_rate,
        unit_types = catalog.len(),
        local = config.match_config.local_authority,
        "Starting Skirmish Tactics authority"
    );

    let (handle, join) = spawn_authority(&config, catalog)?;
    let observer = tokio::spawn(observe(handle.subscribe()));

    match &cli.script {
        Some(path) => {
            let commands = load_script(path)?;
            let accepted = run_script(&handle, commands, config.tick_period()).await?;
            let snapshot = handle.snapshot().await?;
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => info!(accepted, "Script finished\n{json}"),
                Err(error) => warn!(%error, "Failed to encode snapshot"),
            }
        }
        None => {
            info!("Press Ctrl-C to stop");
            tokio::signal::ctrl_c().await.map_err(ServerError::Signal)?;
        }
    }

    observer.abort();
    drop(handle);

    let replay = join.await.map_err(ServerError::Join)??;
    info!(commands = replay.command_count(), "Shutdown complete");
    Ok(())
}

async fn observe(mut events: broadcast::Receiver<MatchEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!(?event, "Match event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event observer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

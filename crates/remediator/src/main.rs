use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alert_remediator::{config::Config, remediation::PlaybookRunner, server::Server};

/// Listens for alert webhooks and runs a remediation playbook for each one
#[derive(Debug, Parser)]
#[command(name = "alert-remediator", version)]
struct Args {
    /// Address to listen on (overrides SERVER_ADDR)
    #[arg(long)]
    addr: Option<String>,

    /// Playbook passed to the remediation command (overrides PLAYBOOK_PATH)
    #[arg(long)]
    playbook: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(playbook) = args.playbook {
        config.remediation.playbook_path = playbook;
    }
    config.remediation.validate()?;
    info!("Loaded configuration: {:?}", config);

    let runner = Arc::new(PlaybookRunner::new(config.remediation.clone()));
    let server = Server::new(&config, runner);

    info!("Starting server on {}", config.server.addr);
    server
        .start(&config.server.addr)
        .await
        .with_context(|| format!("server on {} failed", config.server.addr))?;

    Ok(())
}

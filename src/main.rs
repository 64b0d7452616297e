//! Meta Scraper: HTTP service extracting link-preview metadata

use anyhow::{Context, Result};
use clap::Parser;
use meta_scraper::{
    config::{Config, LogFormat, LoggingConfig},
    http::HttpServer,
    scraping::MetaScraper,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meta-scraper")]
#[command(about = "Extract title, description, canonical URL and preview image from web pages")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Listen port (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if cli.dump_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize config")?
        );
        return Ok(());
    }

    init_logging(&config.logging, cli.verbose)?;

    let scraper = MetaScraper::from_config(&config).context("Failed to build HTTP client")?;
    let config = Arc::new(config);
    let server = HttpServer::new(config.clone(), Arc::new(scraper));

    info!(
        port = config.server.port,
        environment = %config.server.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Server started"
    );

    server.run(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` takes precedence over config
fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = logging.level.more_verbose(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = wait_for_sigterm() => {
            info!("Received SIGTERM, shutting down");
        }
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}. Falling back to pending future.", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
